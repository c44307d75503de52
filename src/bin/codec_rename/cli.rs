use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::{Context, Result};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use tokio::sync::mpsc::unbounded_channel;

use video_codec_tools::codec_rename::{
    ChannelSink, FfprobeCodecProbe, LogLevel, OperationKind, RunController, RunEvent, RunSummary,
};
use video_codec_tools::{print_error, print_warning};

use crate::config::Config;
use crate::logger::FileLogger;

const PROGRESS_BAR_CHARS: &str = "=>-";
const PROGRESS_BAR_TEMPLATE: &str = "[{elapsed_precise}] {bar:80.magenta/blue} {pos}/{len} {percent}%";

/// Renders run events in the terminal.
struct Terminal {
    kind: OperationKind,
    verbose: bool,
    bar: ProgressBar,
    logger: Option<FileLogger>,
}

/// Run the configured operation and print its events until it finishes.
pub async fn run(config: Config) -> Result<()> {
    let probe = FfprobeCodecProbe::new(&config.ffprobe);
    if config.kind.uses_probe() && !probe.is_available() {
        anyhow::bail!("{} not found, install ffmpeg or set `ffprobe` in the config file", probe.program());
    }

    let logger = if config.log {
        match FileLogger::new() {
            Ok(mut logger) => {
                logger.log_init(&config);
                if config.verbose {
                    println!("Logging to {}", logger.path().display());
                }
                Some(logger)
            }
            Err(error) => {
                print_warning!("Failed to create log file: {error:#}");
                None
            }
        }
    } else {
        None
    };

    if config.options.dryrun && config.kind.renames() {
        println!("{}", "Dryrun: files will not be renamed".yellow());
    }

    let controller = RunController::new(config.options, Arc::new(probe));
    set_ctrlc_handler(controller.clone())?;

    let (sender, mut receiver) = unbounded_channel();
    let handle = controller.start(config.kind, config.path, ChannelSink::new(sender))?;

    let mut terminal = Terminal::new(config.kind, config.verbose, logger)?;
    while let Some(event) = receiver.recv().await {
        terminal.handle(event);
    }

    let summary = handle.await.context("Run task failed")?;
    if summary.is_cancelled() {
        println!("\n{}", "Aborted by user".bold().red());
    }
    Ok(())
}

/// First Ctrl+C cancels after the current file, the second one exits immediately.
fn set_ctrlc_handler(controller: RunController) -> Result<()> {
    let requested = AtomicBool::new(false);
    ctrlc::set_handler(move || {
        if requested.swap(true, Ordering::SeqCst) {
            std::process::exit(130);
        }
        if controller.request_cancel() {
            println!("\n{}", "Received Ctrl+C, finishing current file...".yellow().bold());
        }
    })
    .context("Failed to set Ctrl+C handler")
}

impl Terminal {
    fn new(kind: OperationKind, verbose: bool, logger: Option<FileLogger>) -> Result<Self> {
        let bar = ProgressBar::hidden();
        bar.set_style(
            ProgressStyle::default_bar()
                .template(PROGRESS_BAR_TEMPLATE)?
                .progress_chars(PROGRESS_BAR_CHARS),
        );
        Ok(Self {
            kind,
            verbose,
            bar,
            logger,
        })
    }

    fn handle(&mut self, event: RunEvent) {
        if let Some(logger) = self.logger.as_mut() {
            logger.log_event(&event);
        }

        match event {
            RunEvent::Started { total, .. } => {
                // Listing prints a line per file, so the bar is only shown for probing and renaming.
                if total > 0 && self.kind != OperationKind::ListAll {
                    self.bar.set_length(total as u64);
                    self.bar.set_draw_target(indicatif::ProgressDrawTarget::stderr());
                }
            }
            RunEvent::Log { level, message } => self.print_log(level, &message),
            RunEvent::Progress { processed, .. } => self.bar.set_position(processed as u64),
            RunEvent::Renamed { from, to } => {
                let old = video_codec_tools::path_to_string_relative(&from);
                let new = video_codec_tools::path_to_string_relative(&to);
                self.bar.suspend(|| video_codec_tools::show_diff(&old, &new));
            }
            RunEvent::Finished(summary) => self.finish(&summary),
        }
    }

    fn print_log(&self, level: LogLevel, message: &str) {
        match level {
            // Rename operations show a diff per file instead of info lines.
            LogLevel::Info if self.kind.renames() && !self.verbose => {}
            LogLevel::Info => self.bar.suspend(|| println!("{message}")),
            LogLevel::Warning => self.bar.suspend(|| print_warning!("{message}")),
            LogLevel::Error => self.bar.suspend(|| print_error!("{message}")),
        }
    }

    fn finish(&self, summary: &RunSummary) {
        self.bar.finish_and_clear();
        summary.print_summary();
        if summary.dryrun && summary.kind.renames() {
            println!("{}", "Dryrun: no files were renamed".yellow());
        }
    }
}
