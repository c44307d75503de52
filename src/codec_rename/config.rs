//! Configuration for codec rename operations.
//!
//! Settings are read from the `[codec_rename]` section of the user config file
//! (`~/.config/video-codec-tools.toml`). CLI arguments take priority.
//!
//! # Example config file section
//!
//! ```toml
//! [codec_rename]
//! extensions = ["mov", "mp4", "mkv", "avi", "m4v", "mpg"]
//! target_codec = "hevc"
//! ffprobe = "ffprobe"
//! dryrun = false
//! overwrite = false
//! verbose = false
//! log = true
//! ```

use std::fs;

use anyhow::{Result, anyhow};
use serde::Deserialize;

use crate::codec_rename::classify;
use crate::codec_rename::probe::DEFAULT_FFPROBE;

/// Codec that find-non-target-codec compares against by default.
pub const DEFAULT_TARGET_CODEC: &str = "hevc";

/// User configuration from the config file.
#[derive(Debug, Default, Deserialize)]
pub struct CodecRenameConfig {
    /// Video file extensions, with or without a leading dot.
    #[serde(default)]
    pub extensions: Vec<String>,
    #[serde(default)]
    pub target_codec: Option<String>,
    /// Probe program name or path.
    #[serde(default)]
    pub ffprobe: Option<String>,
    #[serde(default)]
    pub dryrun: bool,
    #[serde(default)]
    pub overwrite: bool,
    #[serde(default)]
    pub verbose: bool,
    /// Write a log file for each run.
    #[serde(default = "default_true")]
    pub log: bool,
}

/// Wrapper needed for parsing the config section.
#[derive(Debug, Default, Deserialize)]
struct UserConfig {
    #[serde(default)]
    codec_rename: Option<CodecRenameConfig>,
}

/// Options that control how a run processes files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOptions {
    /// Lowercase video extensions without the leading dot.
    pub extensions: Vec<String>,
    /// Lowercase codec name that counts as on-target.
    pub target_codec: String,
    /// Compute renames without touching files.
    pub dryrun: bool,
    /// Replace existing files when renaming.
    pub overwrite: bool,
}

const fn default_true() -> bool {
    true
}

impl CodecRenameConfig {
    /// Read the `[codec_rename]` section from the user config file.
    ///
    /// Returns default configuration if the file does not exist.
    ///
    /// # Errors
    /// Returns an error if the config file exists but cannot be read or parsed.
    pub fn get_user_config() -> Result<Self> {
        let Some(path) = crate::config::CONFIG_PATH.as_deref() else {
            return Ok(Self::with_defaults());
        };

        match fs::read_to_string(path) {
            Ok(content) => Self::from_toml_str(&content)
                .map_err(|e| anyhow!("Failed to parse config file {}:\n{e}", path.display())),
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => Ok(Self::with_defaults()),
            Err(error) => Err(anyhow!("Failed to read config file {}: {error}", path.display())),
        }
    }

    /// Parse configuration from a TOML string.
    ///
    /// # Errors
    /// Returns an error if the TOML string is invalid.
    pub fn from_toml_str(toml_str: &str) -> Result<Self> {
        toml::from_str::<UserConfig>(toml_str)
            .map(|config| config.codec_rename.unwrap_or_else(Self::with_defaults))
            .map_err(|e| anyhow!("Failed to parse config: {e}"))
    }

    /// Config used when the file or section is missing.
    fn with_defaults() -> Self {
        Self {
            log: true,
            ..Self::default()
        }
    }
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            extensions: classify::default_extensions(),
            target_codec: DEFAULT_TARGET_CODEC.to_string(),
            dryrun: false,
            overwrite: false,
        }
    }
}

impl RunOptions {
    /// Combine CLI values with the user config. CLI values take priority.
    ///
    /// An empty extension list falls back to the config file list, then to the defaults.
    #[must_use]
    pub fn resolve(
        user_config: &CodecRenameConfig,
        extensions: &[String],
        target_codec: Option<&str>,
        dryrun: bool,
        overwrite: bool,
    ) -> Self {
        let resolved = normalized_or_none(extensions)
            .or_else(|| normalized_or_none(&user_config.extensions))
            .unwrap_or_else(classify::default_extensions);

        let target_codec = target_codec
            .or(user_config.target_codec.as_deref())
            .map(|codec| codec.trim().to_lowercase())
            .filter(|codec| !codec.is_empty())
            .unwrap_or_else(|| DEFAULT_TARGET_CODEC.to_string());

        Self {
            extensions: resolved,
            target_codec,
            dryrun: dryrun || user_config.dryrun,
            overwrite: overwrite || user_config.overwrite,
        }
    }
}

impl CodecRenameConfig {
    /// Probe program from the config, or the default `ffprobe`.
    #[must_use]
    pub fn ffprobe_program(&self) -> String {
        self.ffprobe
            .as_deref()
            .map(str::trim)
            .filter(|program| !program.is_empty())
            .unwrap_or(DEFAULT_FFPROBE)
            .to_string()
    }
}

fn normalized_or_none(extensions: &[String]) -> Option<Vec<String>> {
    let normalized = classify::normalize_extensions(extensions);
    (!normalized.is_empty()).then_some(normalized)
}

#[cfg(test)]
mod codec_rename_config_tests {
    use super::*;

    #[test]
    fn from_toml_str_parses_empty_config() {
        let config = CodecRenameConfig::from_toml_str("").expect("should parse empty config");
        assert!(config.extensions.is_empty());
        assert!(config.target_codec.is_none());
        assert!(config.ffprobe.is_none());
        assert!(!config.dryrun);
        assert!(!config.overwrite);
        assert!(!config.verbose);
        assert!(config.log);
    }

    #[test]
    fn from_toml_str_parses_section() {
        let toml = r#"
[codec_rename]
extensions = [".MP4", "webm"]
target_codec = "AV1"
ffprobe = "/opt/ffmpeg/bin/ffprobe"
dryrun = true
overwrite = true
verbose = true
log = false
"#;
        let config = CodecRenameConfig::from_toml_str(toml).expect("should parse config");
        assert_eq!(config.extensions, vec![".MP4", "webm"]);
        assert_eq!(config.target_codec.as_deref(), Some("AV1"));
        assert_eq!(config.ffprobe_program(), "/opt/ffmpeg/bin/ffprobe");
        assert!(config.dryrun);
        assert!(config.overwrite);
        assert!(config.verbose);
        assert!(!config.log);
    }

    #[test]
    fn log_defaults_to_true_in_section() {
        let toml = r"
[codec_rename]
verbose = true
";
        let config = CodecRenameConfig::from_toml_str(toml).expect("should parse config");
        assert!(config.log);
        assert_eq!(config.ffprobe_program(), DEFAULT_FFPROBE);
    }

    #[test]
    fn from_toml_str_invalid_toml_returns_error() {
        assert!(CodecRenameConfig::from_toml_str("this is not valid toml {{{").is_err());
    }

    #[test]
    fn from_toml_str_ignores_other_sections() {
        let toml = r"
[resolution]
verbose = false

[codec_rename]
verbose = true
";
        let config = CodecRenameConfig::from_toml_str(toml).expect("should parse config");
        assert!(config.verbose);
    }

    #[test]
    fn resolve_uses_defaults() {
        let options = RunOptions::resolve(&CodecRenameConfig::with_defaults(), &[], None, false, false);
        assert_eq!(options, RunOptions::default());
    }

    #[test]
    fn resolve_prefers_cli_values() {
        let user_config = CodecRenameConfig::from_toml_str(
            r#"
[codec_rename]
extensions = ["mkv"]
target_codec = "av1"
"#,
        )
        .expect("should parse config");

        let options = RunOptions::resolve(&user_config, &[".TS".to_string()], Some("H264"), true, false);
        assert_eq!(options.extensions, vec!["ts"]);
        assert_eq!(options.target_codec, "h264");
        assert!(options.dryrun);
        assert!(!options.overwrite);

        let options = RunOptions::resolve(&user_config, &[], None, false, false);
        assert_eq!(options.extensions, vec!["mkv"]);
        assert_eq!(options.target_codec, "av1");
    }

    #[test]
    fn resolve_combines_flags_with_or() {
        let user_config = CodecRenameConfig {
            dryrun: true,
            overwrite: true,
            ..CodecRenameConfig::with_defaults()
        };
        let options = RunOptions::resolve(&user_config, &[], None, false, false);
        assert!(options.dryrun);
        assert!(options.overwrite);
    }
}
