use std::path::PathBuf;

use anyhow::{Context, Result};

use video_codec_tools::codec_rename::{CodecRenameConfig, OperationKind, RunOptions};

use crate::Args;

/// Final configuration combined from CLI arguments and user config file.
#[derive(Debug)]
pub struct Config {
    pub kind: OperationKind,
    /// Root directory to walk.
    pub path: PathBuf,
    pub options: RunOptions,
    /// Probe program name or path.
    pub ffprobe: String,
    pub verbose: bool,
    /// Write a log file for the run.
    pub log: bool,
}

impl Config {
    /// Create configuration from CLI arguments and user config file.
    ///
    /// CLI arguments take priority over config file settings.
    /// Boolean flags are combined with OR, except `--no-log` which always disables logging.
    ///
    /// # Errors
    /// Returns an error if the operation is missing or the path cannot be resolved.
    pub fn try_from_args(args: &Args, user_config: &CodecRenameConfig) -> Result<Self> {
        let kind = args.operation.context("Missing operation")?.into();
        let path = video_codec_tools::resolve_input_path(args.path.as_deref())?;
        if !path.is_dir() {
            anyhow::bail!("Input path is not a directory: {}", path.display());
        }

        let options = RunOptions::resolve(
            user_config,
            &args.extension,
            args.target.as_deref(),
            args.print,
            args.force,
        );

        Ok(Self {
            kind,
            path,
            options,
            ffprobe: user_config.ffprobe_program(),
            verbose: args.verbose || user_config.verbose,
            log: user_config.log && !args.no_log,
        })
    }
}
