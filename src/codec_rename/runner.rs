//! Batch operation runner.
//!
//! Walks the tree, processes each file sequentially for the chosen operation,
//! and publishes log lines, progress and a final summary to an [`EventSink`].
//! Cancellation is cooperative and checked once before each file.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use chrono::Local;
use tokio::sync::mpsc::UnboundedSender;

use crate::codec_rename::classify::FileEntry;
use crate::codec_rename::config::RunOptions;
use crate::codec_rename::probe::{CodecProbe, CodecResult};
use crate::codec_rename::rename;
use crate::codec_rename::stats::{OperationCounters, RunStatus, RunSummary};
use crate::codec_rename::walk;

/// The operations a run can perform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationKind {
    /// List every file.
    ListAll,
    /// Report the codec of every video file.
    FindVideos,
    /// Report video files whose codec is not the target codec.
    FindNonTargetCodec,
    /// Add `[codec]` to video file names.
    AddTag,
    /// Remove the first `[...]` tag from file names.
    RemoveTag,
}

/// Reasons why a file was skipped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// File name already has a tag.
    AlreadyTagged,
    /// The probe found no video stream.
    NoVideoStream,
    /// Removing the tag would leave an empty name.
    NothingToRemove,
}

/// Result of processing a single file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileOutcome {
    /// File does not apply to this operation.
    Ignored,
    /// File was listed.
    Listed,
    /// Video file with its codec.
    Found { codec: String },
    /// Video file with a non-target codec.
    Matched { codec: String, folder: String },
    /// Video file already using the target codec.
    OnTarget { codec: String },
    /// File was renamed, or would be renamed in a dry run.
    Renamed { new_path: PathBuf, codec: Option<String> },
    Skipped(SkipReason),
    /// Probe failed. `error_path` is set if the file was renamed with the error tag.
    ProbeFailed { error: String, error_path: Option<PathBuf> },
    /// Rename failed. `error_path` is set if the file was renamed with the error tag.
    RenameFailed { error: String, error_path: Option<PathBuf> },
}

/// Severity of a log line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Info,
    Warning,
    Error,
}

/// Events published by a run, in order.
#[derive(Debug, Clone)]
pub enum RunEvent {
    /// Run started and the walk found `total` files.
    Started { kind: OperationKind, root: PathBuf, total: usize },
    Log { level: LogLevel, message: String },
    /// Emitted once after each processed file. `processed` is 1-based.
    Progress { processed: usize, total: usize },
    /// Rename performed, or planned in a dry run.
    Renamed { from: PathBuf, to: PathBuf },
    /// Final event of every run.
    Finished(RunSummary),
}

/// Receiver of run events.
///
/// Called synchronously on the run's thread, so implementations should not block.
pub trait EventSink: Send {
    fn emit(&mut self, event: RunEvent);
}

/// Sink that posts events to an unbounded channel without blocking.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    sender: UnboundedSender<RunEvent>,
}

/// Shared cancellation flag for a run.
///
/// Set by the controller, read by the runner before each file.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    flag: Arc<AtomicBool>,
}

/// Drives one operation over a directory tree.
pub struct BatchRunner<'a> {
    options: &'a RunOptions,
    probe: &'a dyn CodecProbe,
    cancel: CancellationToken,
}

impl OperationKind {
    /// Short name used in logs.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::ListAll => "list",
            Self::FindVideos => "find",
            Self::FindNonTargetCodec => "non-target",
            Self::AddTag => "add",
            Self::RemoveTag => "remove",
        }
    }

    /// True if the operation invokes the codec probe.
    #[must_use]
    pub const fn uses_probe(self) -> bool {
        matches!(self, Self::FindVideos | Self::FindNonTargetCodec | Self::AddTag)
    }

    /// True if the operation renames files.
    #[must_use]
    pub const fn renames(self) -> bool {
        matches!(self, Self::AddTag | Self::RemoveTag)
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::ListAll => "File List",
            Self::FindVideos => "Video Search",
            Self::FindNonTargetCodec => "Codec Search",
            Self::AddTag => "Add Codec",
            Self::RemoveTag => "Remove Codec",
        };
        write!(f, "{name}")
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Info => "INFO",
            Self::Warning => "WARN",
            Self::Error => "ERROR",
        };
        f.pad(label)
    }
}

impl ChannelSink {
    #[must_use]
    pub const fn new(sender: UnboundedSender<RunEvent>) -> Self {
        Self { sender }
    }
}

impl EventSink for ChannelSink {
    fn emit(&mut self, event: RunEvent) {
        // Receiver may already be gone if the controller stopped listening.
        let _ = self.sender.send(event);
    }
}

impl<F> EventSink for F
where
    F: FnMut(RunEvent) + Send,
{
    fn emit(&mut self, event: RunEvent) {
        self(event);
    }
}

impl CancellationToken {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. Takes effect at the next file boundary.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    /// Clear the flag before a new run.
    pub fn reset(&self) {
        self.flag.store(false, Ordering::SeqCst);
    }
}

impl<'a> BatchRunner<'a> {
    #[must_use]
    pub const fn new(options: &'a RunOptions, probe: &'a dyn CodecProbe, cancel: CancellationToken) -> Self {
        Self { options, probe, cancel }
    }

    /// Run one operation over the tree under `root`.
    ///
    /// Never fails: per-file errors are counted and logged, and processing continues.
    /// Returns the same summary that is emitted as the final event.
    pub fn run(&self, kind: OperationKind, root: &Path, sink: &mut dyn EventSink) -> RunSummary {
        let start = Instant::now();
        let mut counters = OperationCounters::default();

        let files = walk::walk(root);
        let total = files.len();
        sink.emit(RunEvent::Started {
            kind,
            root: root.to_path_buf(),
            total,
        });
        info(
            sink,
            format!(
                "{kind} Operation Started: {}",
                Local::now().format("%Y-%m-%d %H:%M:%S")
            ),
        );
        if total == 0 {
            warn(sink, format!("No files found under {}", crate::path_to_string(root)));
        }

        let mut status = RunStatus::Completed;
        for (index, file) in files.iter().enumerate() {
            if self.cancel.is_cancelled() {
                warn(sink, "Operation stopped by user".to_string());
                status = RunStatus::Cancelled;
                break;
            }

            let outcome = self.process_file(kind, file, sink);
            report_outcome(kind, file, &outcome, sink);
            counters.add_outcome(&outcome);

            sink.emit(RunEvent::Progress {
                processed: index + 1,
                total,
            });
        }

        let summary = RunSummary::new(kind, status, total, counters, start.elapsed(), self.options.dryrun);
        sink.emit(RunEvent::Finished(summary.clone()));
        summary
    }

    /// Process a single file for the given operation.
    fn process_file(&self, kind: OperationKind, file: &FileEntry, sink: &mut dyn EventSink) -> FileOutcome {
        match kind {
            OperationKind::ListAll => FileOutcome::Listed,
            OperationKind::FindVideos => {
                if !file.is_video(&self.options.extensions) {
                    return FileOutcome::Ignored;
                }
                match self.probe.probe(&file.path) {
                    CodecResult::Codec(codec) => FileOutcome::Found { codec },
                    CodecResult::Unknown => FileOutcome::Found {
                        codec: "unknown".to_string(),
                    },
                    CodecResult::Failed(error) => FileOutcome::ProbeFailed {
                        error,
                        error_path: None,
                    },
                }
            }
            OperationKind::FindNonTargetCodec => {
                if !file.is_video(&self.options.extensions) {
                    return FileOutcome::Ignored;
                }
                match self.probe.probe(&file.path) {
                    CodecResult::Codec(codec) if codec == self.options.target_codec => FileOutcome::OnTarget { codec },
                    CodecResult::Codec(codec) => FileOutcome::Matched {
                        codec,
                        folder: file.folder_name(),
                    },
                    CodecResult::Unknown => FileOutcome::Matched {
                        codec: "unknown".to_string(),
                        folder: file.folder_name(),
                    },
                    CodecResult::Failed(error) => FileOutcome::ProbeFailed {
                        error,
                        error_path: None,
                    },
                }
            }
            OperationKind::AddTag => self.add_tag(file, sink),
            OperationKind::RemoveTag => self.remove_tag(file, sink),
        }
    }

    fn add_tag(&self, file: &FileEntry, sink: &mut dyn EventSink) -> FileOutcome {
        if !file.is_video(&self.options.extensions) {
            return FileOutcome::Ignored;
        }
        if file.tagged {
            return FileOutcome::Skipped(SkipReason::AlreadyTagged);
        }

        let codec = match self.probe.probe(&file.path) {
            CodecResult::Codec(codec) => codec,
            CodecResult::Unknown => return FileOutcome::Skipped(SkipReason::NoVideoStream),
            CodecResult::Failed(error) => {
                let error_path = self.rename_with_error_tag(file, sink);
                return FileOutcome::ProbeFailed { error, error_path };
            }
        };

        let Some(new_path) = rename::compute_add_name(&file.path, &codec) else {
            return FileOutcome::Skipped(SkipReason::AlreadyTagged);
        };

        match self.rename(&file.path, &new_path, sink) {
            Ok(()) => FileOutcome::Renamed {
                new_path,
                codec: Some(codec),
            },
            Err(error) => {
                let error_path = self.rename_with_error_tag(file, sink);
                FileOutcome::RenameFailed {
                    error: format!("{error:#}"),
                    error_path,
                }
            }
        }
    }

    fn remove_tag(&self, file: &FileEntry, sink: &mut dyn EventSink) -> FileOutcome {
        if !file.tagged {
            return FileOutcome::Ignored;
        }
        let Some(new_path) = rename::compute_remove_name(&file.path) else {
            return FileOutcome::Skipped(SkipReason::NothingToRemove);
        };
        match self.rename(&file.path, &new_path, sink) {
            Ok(()) => FileOutcome::Renamed { new_path, codec: None },
            Err(error) => FileOutcome::RenameFailed {
                error: format!("{error:#}"),
                error_path: None,
            },
        }
    }

    /// Best-effort rename to `stem[ERROR].ext`. Returns the new path on success.
    fn rename_with_error_tag(&self, file: &FileEntry, sink: &mut dyn EventSink) -> Option<PathBuf> {
        let error_path = rename::compute_error_name(&file.path)?;
        match self.rename(&file.path, &error_path, sink) {
            Ok(()) => Some(error_path),
            Err(error) => {
                warn(sink, format!("Error tag rename failed: {error:#}"));
                None
            }
        }
    }

    /// Rename unless running in dry-run mode. Emits a rename event on success.
    fn rename(&self, from: &Path, to: &Path, sink: &mut dyn EventSink) -> anyhow::Result<()> {
        if self.options.dryrun {
            rename::check_target(to, self.options.overwrite)?;
        } else {
            rename::rename_file(from, to, self.options.overwrite)?;
        }
        sink.emit(RunEvent::Renamed {
            from: from.to_path_buf(),
            to: to.to_path_buf(),
        });
        Ok(())
    }
}

/// Emit the log line for a processed file.
fn report_outcome(kind: OperationKind, file: &FileEntry, outcome: &FileOutcome, sink: &mut dyn EventSink) {
    let path = crate::path_to_string(&file.path);
    match outcome {
        FileOutcome::Ignored => {}
        FileOutcome::Listed => info(sink, path),
        FileOutcome::Found { codec } | FileOutcome::Matched { codec, .. } => info(sink, format!("{path} [{codec}]")),
        FileOutcome::OnTarget { .. } => {}
        FileOutcome::Renamed { new_path, .. } => {
            info(sink, format!("New name: {}", crate::path_to_string(new_path)));
        }
        FileOutcome::Skipped(reason) => info(sink, format!("Skipped: {path} ({reason})")),
        FileOutcome::ProbeFailed { error, error_path } | FileOutcome::RenameFailed { error, error_path } => {
            let message = match error_path {
                Some(error_path) if kind == OperationKind::AddTag => {
                    format!("Error renaming: {} ({error})", crate::path_to_string(error_path))
                }
                _ => format!("Error: {path} ({error})"),
            };
            sink.emit(RunEvent::Log {
                level: LogLevel::Error,
                message,
            });
        }
    }
}

fn info(sink: &mut dyn EventSink, message: String) {
    sink.emit(RunEvent::Log {
        level: LogLevel::Info,
        message,
    });
}

fn warn(sink: &mut dyn EventSink, message: String) {
    sink.emit(RunEvent::Log {
        level: LogLevel::Warning,
        message,
    });
}
