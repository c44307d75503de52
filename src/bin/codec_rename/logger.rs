use std::fs;
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Local;

use video_codec_tools::codec_rename::{FolderReport, RunEvent, RunSummary};

use crate::config::Config;

/// File logger for a single run with buffered writes.
pub struct FileLogger {
    writer: BufWriter<File>,
    path: PathBuf,
}

impl FileLogger {
    /// Create a new file logger, writing to ~/logs/video-codec-tools/codec_rename_<timestamp>.log
    pub(crate) fn new() -> Result<Self> {
        let log_dir = video_codec_tools::config::LOG_DIR
            .clone()
            .context("Failed to get home directory")?;

        if !log_dir.exists() {
            fs::create_dir_all(&log_dir).context("Failed to create log directory")?;
        }

        let path = log_dir.join(format!(
            "codec_rename_{}.log",
            Local::now().format("%Y-%m-%d_%H-%M-%S")
        ));

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("Failed to create log file: {}", path.display()))?;

        Ok(Self {
            writer: BufWriter::new(file),
            path,
        })
    }

    pub(crate) fn path(&self) -> &Path {
        &self.path
    }

    fn timestamp() -> String {
        Local::now().format("%Y-%m-%d %H:%M:%S").to_string()
    }

    /// Log the resolved configuration before the run starts
    pub(crate) fn log_init(&mut self, config: &Config) {
        let _ = writeln!(
            self.writer,
            "[{}] INIT {} \"{}\"",
            Self::timestamp(),
            config.kind.name(),
            config.path.display()
        );
        let _ = writeln!(self.writer, "  extensions: {:?}", config.options.extensions);
        let _ = writeln!(self.writer, "  target_codec: {}", config.options.target_codec);
        let _ = writeln!(self.writer, "  ffprobe: {}", config.ffprobe);
        let _ = writeln!(self.writer, "  dryrun: {}", config.options.dryrun);
        let _ = writeln!(self.writer, "  overwrite: {}", config.options.overwrite);
        let _ = writeln!(self.writer, "  verbose: {}", config.verbose);
        let _ = self.writer.flush();
    }

    /// Log a run event. Progress events are not logged.
    pub(crate) fn log_event(&mut self, event: &RunEvent) {
        match event {
            RunEvent::Started { kind, root, total } => {
                let _ = writeln!(
                    self.writer,
                    "[{}] START   {kind} - \"{}\" | {total} files",
                    Self::timestamp(),
                    root.display()
                );
            }
            RunEvent::Log { level, message } => {
                let _ = writeln!(self.writer, "[{}] {level:<7} {message}", Self::timestamp());
            }
            RunEvent::Renamed { from, to } => {
                let _ = writeln!(
                    self.writer,
                    "[{}] RENAME  \"{}\" -> \"{}\"",
                    Self::timestamp(),
                    from.display(),
                    to.display()
                );
            }
            RunEvent::Progress { .. } => return,
            RunEvent::Finished(summary) => {
                self.log_summary(summary);
                return;
            }
        }
        let _ = self.writer.flush();
    }

    /// Log final statistics
    fn log_summary(&mut self, summary: &RunSummary) {
        let counters = &summary.counters;
        let _ = writeln!(self.writer, "[{}] STATISTICS", Self::timestamp());
        let _ = writeln!(self.writer, "  Status:        {}", summary.status);
        let _ = writeln!(
            self.writer,
            "  Processed:     {}/{}",
            summary.processed, summary.total
        );
        let _ = writeln!(self.writer, "  Files matched: {}", counters.matched);
        let _ = writeln!(self.writer, "  Files renamed: {}", counters.renamed);
        for (codec, count) in &counters.codecs {
            let _ = writeln!(self.writer, "    - {codec}: {count}");
        }
        let _ = writeln!(self.writer, "  Files skipped: {}", counters.skipped);
        let _ = writeln!(self.writer, "  Errors:        {}", counters.errors);
        match &summary.folder_report {
            Some(FolderReport::AllClear) => {
                let _ = writeln!(self.writer, "  All clear");
            }
            Some(FolderReport::Matches(folders)) => {
                for (folder, count) in folders {
                    let _ = writeln!(self.writer, "    - {folder}: {count}");
                }
            }
            None => {}
        }
        let _ = writeln!(
            self.writer,
            "  Total time: {}",
            video_codec_tools::format_duration(summary.elapsed)
        );
        let _ = writeln!(self.writer, "[{}] END", Self::timestamp());
        let _ = self.writer.flush();
    }
}
