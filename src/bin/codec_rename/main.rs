mod cli;
mod config;
mod logger;

use std::path::PathBuf;

use clap::{CommandFactory, Parser, ValueEnum};
use clap_complete::Shell;

use video_codec_tools::codec_rename::{CodecRenameConfig, OperationKind};

use crate::config::Config;

/// Operation to run over the directory tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Operation {
    /// List all files
    List,
    /// Print the codec of each video file
    Find,
    /// Find video files that do not use the target codec
    NonTarget,
    /// Add the codec tag to video file names
    Add,
    /// Remove the codec tag from file names
    Remove,
}

#[derive(Parser, Debug)]
#[command(author, version, name = env!("CARGO_BIN_NAME"), about = "Tag video file names with their codec")]
pub struct Args {
    /// Operation to run
    #[arg(value_enum, required_unless_present = "SHELL")]
    operation: Option<Operation>,

    /// Optional input directory
    #[arg(value_hint = clap::ValueHint::DirPath)]
    path: Option<PathBuf>,

    /// Override video file extensions
    #[arg(short = 'e', long, num_args = 1, action = clap::ArgAction::Append, name = "EXTENSION")]
    extension: Vec<String>,

    /// Overwrite existing files when renaming
    #[arg(short, long)]
    force: bool,

    /// Only print changes without renaming files
    #[arg(short, long)]
    print: bool,

    /// Target codec for the non-target search
    #[arg(short, long, name = "CODEC")]
    target: Option<String>,

    /// Do not write a log file
    #[arg(long)]
    no_log: bool,

    /// Generate shell completion
    #[arg(short = 'l', long, name = "SHELL")]
    completion: Option<Shell>,

    /// Print verbose output
    #[arg(short, long)]
    verbose: bool,
}

impl From<Operation> for OperationKind {
    fn from(operation: Operation) -> Self {
        match operation {
            Operation::List => Self::ListAll,
            Operation::Find => Self::FindVideos,
            Operation::NonTarget => Self::FindNonTargetCodec,
            Operation::Add => Self::AddTag,
            Operation::Remove => Self::RemoveTag,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    if let Some(shell) = args.completion {
        return video_codec_tools::generate_shell_completion(shell, Args::command(), true, env!("CARGO_BIN_NAME"));
    }
    let user_config = CodecRenameConfig::get_user_config()?;
    let config = Config::try_from_args(&args, &user_config)?;
    cli::run(config).await
}
