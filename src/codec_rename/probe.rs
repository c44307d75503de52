//! Query the video codec of a file with `ffprobe`.

use std::fmt;
use std::path::Path;
use std::process::{Command, Stdio};

use anyhow::{Context, Result, anyhow};
use serde::Deserialize;

pub const DEFAULT_FFPROBE: &str = "ffprobe";

/// Outcome of a single probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CodecResult {
    /// Codec name of the first video stream, e.g. `h264`.
    Codec(String),
    /// The file has no video stream.
    Unknown,
    /// The probe could not run or its output could not be parsed.
    Failed(String),
}

/// Looks up the video codec of a single file.
///
/// Implementations do one lookup per call with no retries or caching.
pub trait CodecProbe: Send + Sync {
    fn probe(&self, path: &Path) -> CodecResult;
}

/// Probe backed by the external `ffprobe` program.
#[derive(Debug, Clone)]
pub struct FfprobeCodecProbe {
    program: String,
}

/// Subset of `ffprobe -of json` output.
#[derive(Debug, Deserialize)]
struct FfprobeOutput {
    #[serde(default)]
    streams: Vec<FfprobeStream>,
}

#[derive(Debug, Deserialize)]
struct FfprobeStream {
    codec_name: Option<String>,
}

impl fmt::Display for CodecResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Codec(codec) => write!(f, "{codec}"),
            Self::Unknown => write!(f, "unknown"),
            Self::Failed(error) => write!(f, "probe failed: {error}"),
        }
    }
}

impl Default for FfprobeCodecProbe {
    fn default() -> Self {
        Self::new(DEFAULT_FFPROBE)
    }
}

impl FfprobeCodecProbe {
    #[must_use]
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    #[must_use]
    pub fn program(&self) -> &str {
        &self.program
    }

    /// Check that the probe program can be executed.
    #[must_use]
    pub fn is_available(&self) -> bool {
        Command::new(&self.program)
            .arg("-version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .is_ok_and(|status| status.success())
    }

    fn run(&self, path: &Path) -> Result<CodecResult> {
        let output = Command::new(&self.program)
            .args([
                "-v",
                "error",
                "-select_streams",
                "v:0",
                "-show_entries",
                "stream=codec_name",
                "-of",
                "json",
            ])
            .arg(path)
            .stdin(Stdio::null())
            .output()
            .with_context(|| format!("Failed to execute {}", self.program))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            anyhow::bail!(
                "{} failed with status {}: {}",
                self.program,
                output.status.code().unwrap_or(-1),
                stderr.trim()
            );
        }

        parse_ffprobe_json(&output.stdout)
    }
}

impl CodecProbe for FfprobeCodecProbe {
    fn probe(&self, path: &Path) -> CodecResult {
        self.run(path).unwrap_or_else(|error| CodecResult::Failed(format!("{error:#}")))
    }
}

/// Parse `ffprobe -of json` output and extract `streams[0].codec_name`.
///
/// An empty stream list means the file has no video stream.
///
/// # Errors
/// Returns an error if the output is not valid JSON or the first stream has no codec name.
pub fn parse_ffprobe_json(output: &[u8]) -> Result<CodecResult> {
    let parsed: FfprobeOutput =
        serde_json::from_slice(output).map_err(|error| anyhow!("Failed to parse ffprobe output: {error}"))?;

    let Some(stream) = parsed.streams.into_iter().next() else {
        return Ok(CodecResult::Unknown);
    };

    match stream.codec_name.map(|name| name.trim().to_lowercase()) {
        Some(codec) if !codec.is_empty() => Ok(CodecResult::Codec(codec)),
        _ => Err(anyhow!("Missing codec name in ffprobe output")),
    }
}
