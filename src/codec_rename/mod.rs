//! Tag video files with their codec.
//!
//! A run walks a directory tree, classifies each file by extension,
//! queries the codec of video files with `ffprobe`,
//! and adds or removes a `[codec]` tag in the file name.
//! Runs are sequential, cancellable between files,
//! and report progress through an [`EventSink`].

pub mod classify;
pub mod config;
pub mod controller;
pub mod probe;
pub mod rename;
pub mod runner;
pub mod stats;
pub mod walk;

pub use classify::{FileEntry, has_tag, is_tagged, is_video_file};
pub use config::{CodecRenameConfig, RunOptions};
pub use controller::{RunController, RunState, RunStateStatus};
pub use probe::{CodecProbe, CodecResult, FfprobeCodecProbe, parse_ffprobe_json};
pub use rename::{compute_add_name, compute_error_name, compute_remove_name, rename_file};
pub use runner::{
    BatchRunner, CancellationToken, ChannelSink, EventSink, FileOutcome, LogLevel, OperationKind, RunEvent, SkipReason,
};
pub use stats::{FolderReport, OperationCounters, RunStatus, RunSummary};
pub use walk::walk;
