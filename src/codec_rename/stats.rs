use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Local};
use colored::Colorize;

use crate::codec_rename::runner::{FileOutcome, OperationKind, SkipReason};

/// Counters for a single run. A fresh instance is created at the start of every run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct OperationCounters {
    /// Every walked file that was processed.
    pub scanned: usize,
    /// Video files found, or non-target codec files found.
    pub matched: usize,
    /// Files renamed, or files that would be renamed in a dry run.
    pub renamed: usize,
    pub skipped: usize,
    pub errors: usize,
    /// Renamed files per detected codec.
    pub codecs: BTreeMap<String, usize>,
    /// Non-target codec files per parent folder name.
    pub folders: BTreeMap<String, usize>,
}

/// Terminal status of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Completed,
    Cancelled,
}

/// Result of a find-non-target-codec run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FolderReport {
    /// No files with a non-target codec were found.
    AllClear,
    /// Non-target codec file count per folder name.
    Matches(BTreeMap<String, usize>),
}

/// Final record of a run, emitted once when the run ends.
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub kind: OperationKind,
    pub status: RunStatus,
    /// Files processed before the run ended.
    pub processed: usize,
    /// Files found by the walk.
    pub total: usize,
    pub counters: OperationCounters,
    pub elapsed: Duration,
    pub finished_at: DateTime<Local>,
    /// Present only for find-non-target-codec runs.
    pub folder_report: Option<FolderReport>,
    pub dryrun: bool,
}

impl OperationCounters {
    /// Update counters from a single file result.
    pub fn add_outcome(&mut self, outcome: &FileOutcome) {
        self.scanned += 1;
        match outcome {
            FileOutcome::Ignored | FileOutcome::Listed | FileOutcome::OnTarget { .. } => {}
            FileOutcome::Found { .. } => self.matched += 1,
            FileOutcome::Matched { folder, .. } => {
                self.matched += 1;
                *self.folders.entry(folder.clone()).or_default() += 1;
            }
            FileOutcome::Renamed { codec, .. } => {
                self.renamed += 1;
                if let Some(codec) = codec {
                    *self.codecs.entry(codec.clone()).or_default() += 1;
                }
            }
            FileOutcome::Skipped(_) => self.skipped += 1,
            FileOutcome::ProbeFailed { .. } | FileOutcome::RenameFailed { .. } => self.errors += 1,
        }
    }

    /// Sum of the per-folder counts.
    #[must_use]
    pub fn folder_total(&self) -> usize {
        self.folders.values().sum()
    }
}

impl FolderReport {
    #[must_use]
    pub fn from_counters(counters: &OperationCounters) -> Self {
        if counters.folders.is_empty() {
            Self::AllClear
        } else {
            Self::Matches(counters.folders.clone())
        }
    }

    #[must_use]
    pub const fn is_all_clear(&self) -> bool {
        matches!(self, Self::AllClear)
    }
}

impl RunSummary {
    /// Build the summary of a finished or cancelled run.
    #[must_use]
    pub fn new(
        kind: OperationKind,
        status: RunStatus,
        total: usize,
        counters: OperationCounters,
        elapsed: Duration,
        dryrun: bool,
    ) -> Self {
        let folder_report =
            (kind == OperationKind::FindNonTargetCodec).then(|| FolderReport::from_counters(&counters));
        Self {
            kind,
            status,
            processed: counters.scanned,
            total,
            counters,
            elapsed,
            finished_at: Local::now(),
            folder_report,
            dryrun,
        }
    }

    #[must_use]
    pub const fn is_cancelled(&self) -> bool {
        matches!(self.status, RunStatus::Cancelled)
    }

    /// Print a colored summary to stdout.
    pub fn print_summary(&self) {
        println!("{}", format!("\n--- {} Summary ---", self.kind).bold().magenta());
        println!("Files scanned:          {}", self.counters.scanned);
        match self.kind {
            OperationKind::ListAll => {}
            OperationKind::FindVideos => {
                println!("Videos found:           {}", self.counters.matched);
            }
            OperationKind::FindNonTargetCodec => {
                println!("Non-target videos:      {}", self.counters.matched);
                match &self.folder_report {
                    Some(FolderReport::Matches(folders)) => {
                        for (folder, count) in folders {
                            println!("  - {folder}: {count}");
                        }
                    }
                    Some(FolderReport::AllClear) => println!("{}", "All clear".green().bold()),
                    None => {}
                }
            }
            OperationKind::AddTag | OperationKind::RemoveTag => {
                let label = if self.dryrun { "Files to rename:" } else { "Files renamed:" };
                println!("{label:<24}{}", self.counters.renamed);
                for (codec, count) in &self.counters.codecs {
                    println!("  - {codec}: {count}");
                }
                println!("Files skipped:          {}", self.counters.skipped);
            }
        }
        if self.kind != OperationKind::ListAll {
            println!(
                "Errors encountered:     {}",
                if self.counters.errors > 0 {
                    self.counters.errors.to_string().red()
                } else {
                    "0".normal()
                }
            );
        }
        println!("Total time:             {}", crate::format_duration(self.elapsed));
        match self.status {
            RunStatus::Completed => println!(
                "{}",
                format!("{} completed: {}", self.kind, self.finished_at.format("%Y-%m-%d %H:%M:%S")).green()
            ),
            RunStatus::Cancelled => println!(
                "{}",
                format!("{} cancelled after {}/{} files", self.kind, self.processed, self.total)
                    .yellow()
                    .bold()
            ),
        }
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Completed => write!(f, "completed"),
            Self::Cancelled => write!(f, "cancelled"),
        }
    }
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AlreadyTagged => write!(f, "Already tagged"),
            Self::NoVideoStream => write!(f, "No video stream"),
            Self::NothingToRemove => write!(f, "Nothing to remove"),
        }
    }
}
