//! Background execution of runs.
//!
//! The controller owns the run lifecycle: it starts the blocking runner on the
//! Tokio blocking pool, tracks the current [`RunState`], and forwards cancellation
//! requests to the runner's token. At most one run is active at a time.

use std::fmt;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;

use anyhow::Result;
use tokio::task::JoinHandle;

use crate::codec_rename::config::RunOptions;
use crate::codec_rename::probe::CodecProbe;
use crate::codec_rename::runner::{BatchRunner, CancellationToken, EventSink, OperationKind, RunEvent};
use crate::codec_rename::stats::RunSummary;

/// Lifecycle status of the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RunStateStatus {
    #[default]
    Idle,
    Running,
    /// Cancel requested, waiting for the runner to reach the next file boundary.
    Cancelling,
    Completed,
}

/// Snapshot of the current or most recent run.
#[derive(Debug, Clone, Default)]
pub struct RunState {
    pub status: RunStateStatus,
    pub kind: Option<OperationKind>,
    pub processed: usize,
    pub total: usize,
    pub started: Option<Instant>,
}

/// Start and cancel runs from outside the run's execution context.
///
/// Cloning gives another handle to the same controller.
#[derive(Clone)]
pub struct RunController {
    options: Arc<RunOptions>,
    probe: Arc<dyn CodecProbe>,
    cancel: CancellationToken,
    state: Arc<Mutex<RunState>>,
}

/// Wraps the caller's sink and mirrors progress into the shared state.
struct TrackingSink<S> {
    inner: S,
    state: Arc<Mutex<RunState>>,
}

impl RunStateStatus {
    /// True while a run occupies the controller.
    #[must_use]
    pub const fn is_active(self) -> bool {
        matches!(self, Self::Running | Self::Cancelling)
    }
}

impl fmt::Display for RunStateStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Running => write!(f, "running"),
            Self::Cancelling => write!(f, "cancelling"),
            Self::Completed => write!(f, "completed"),
        }
    }
}

impl RunController {
    #[must_use]
    pub fn new(options: RunOptions, probe: Arc<dyn CodecProbe>) -> Self {
        Self {
            options: Arc::new(options),
            probe,
            cancel: CancellationToken::new(),
            state: Arc::new(Mutex::new(RunState::default())),
        }
    }

    /// Start a run on the blocking thread pool.
    ///
    /// Must be called from within a Tokio runtime.
    /// The returned handle resolves to the run summary, which is also the last event sent to `sink`.
    ///
    /// # Errors
    /// Returns an error if another run is still active.
    pub fn start<S>(&self, kind: OperationKind, root: PathBuf, sink: S) -> Result<JoinHandle<RunSummary>>
    where
        S: EventSink + 'static,
    {
        {
            let mut state = lock(&self.state);
            if state.status.is_active() {
                anyhow::bail!("Another operation is already {}", state.status);
            }
            *state = RunState {
                status: RunStateStatus::Running,
                kind: Some(kind),
                processed: 0,
                total: 0,
                started: Some(Instant::now()),
            };
        }
        self.cancel.reset();

        let options = Arc::clone(&self.options);
        let probe = Arc::clone(&self.probe);
        let cancel = self.cancel.clone();
        let state = Arc::clone(&self.state);

        Ok(tokio::task::spawn_blocking(move || {
            let mut sink = TrackingSink {
                inner: sink,
                state: Arc::clone(&state),
            };
            let runner = BatchRunner::new(&options, probe.as_ref(), cancel);
            let summary = runner.run(kind, &root, &mut sink);

            let mut state = lock(&state);
            if summary.is_cancelled() {
                // A cancelled run leaves the controller idle and ready for the next start.
                *state = RunState::default();
            } else {
                state.status = RunStateStatus::Completed;
                state.processed = summary.processed;
                state.total = summary.total;
            }
            summary
        }))
    }

    /// Request cancellation of the active run.
    ///
    /// Returns false if no run is active.
    pub fn request_cancel(&self) -> bool {
        let mut state = lock(&self.state);
        if state.status != RunStateStatus::Running {
            return state.status == RunStateStatus::Cancelling;
        }
        state.status = RunStateStatus::Cancelling;
        self.cancel.cancel();
        true
    }

    /// Current state snapshot.
    #[must_use]
    pub fn state(&self) -> RunState {
        lock(&self.state).clone()
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        lock(&self.state).status.is_active()
    }
}

impl<S: EventSink> EventSink for TrackingSink<S> {
    fn emit(&mut self, event: RunEvent) {
        match &event {
            RunEvent::Started { total, .. } => lock(&self.state).total = *total,
            RunEvent::Progress { processed, .. } => lock(&self.state).processed = *processed,
            _ => {}
        }
        self.inner.emit(event);
    }
}

fn lock(state: &Mutex<RunState>) -> MutexGuard<'_, RunState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod controller_tests {
    use super::*;

    use std::fs;
    use std::path::Path;
    use std::sync::mpsc;

    use tempfile::tempdir;
    use tokio::sync::mpsc::{UnboundedSender, unbounded_channel};

    use crate::codec_rename::probe::CodecResult;
    use crate::codec_rename::runner::ChannelSink;
    use crate::codec_rename::stats::RunStatus;

    struct FixedProbe;

    impl CodecProbe for FixedProbe {
        fn probe(&self, _path: &Path) -> CodecResult {
            CodecResult::Codec("h264".to_string())
        }
    }

    /// Probe that reports when it is entered and blocks until released.
    struct GateProbe {
        entered: UnboundedSender<()>,
        release: Mutex<mpsc::Receiver<()>>,
    }

    impl CodecProbe for GateProbe {
        fn probe(&self, _path: &Path) -> CodecResult {
            let _ = self.entered.send(());
            let _ = self.release.lock().unwrap().recv();
            CodecResult::Codec("h264".to_string())
        }
    }

    fn tree(names: &[&str]) -> tempfile::TempDir {
        let dir = tempdir().unwrap();
        for name in names {
            fs::write(dir.path().join(name), b"").unwrap();
        }
        dir
    }

    #[tokio::test]
    async fn run_completes_and_updates_state() {
        let dir = tree(&["a.mp4", "b.mkv", "c.txt"]);
        let controller = RunController::new(RunOptions::default(), Arc::new(FixedProbe));
        assert_eq!(controller.state().status, RunStateStatus::Idle);

        let handle = controller
            .start(OperationKind::FindVideos, dir.path().to_path_buf(), |_event: RunEvent| {})
            .unwrap();
        let summary = handle.await.unwrap();

        assert_eq!(summary.status, RunStatus::Completed);
        assert_eq!(summary.counters.matched, 2);
        let state = controller.state();
        assert_eq!(state.status, RunStateStatus::Completed);
        assert_eq!(state.processed, 3);
        assert_eq!(state.total, 3);
        assert_eq!(state.kind, Some(OperationKind::FindVideos));
    }

    #[tokio::test]
    async fn channel_sink_receives_events_in_order() {
        let dir = tree(&["a.mp4", "b.mp4"]);
        let controller = RunController::new(RunOptions::default(), Arc::new(FixedProbe));
        let (sender, mut receiver) = unbounded_channel();

        let handle = controller
            .start(OperationKind::ListAll, dir.path().to_path_buf(), ChannelSink::new(sender))
            .unwrap();
        handle.await.unwrap();

        let mut events = Vec::new();
        while let Some(event) = receiver.recv().await {
            events.push(event);
        }
        assert!(matches!(events.first(), Some(RunEvent::Started { total: 2, .. })));
        assert!(matches!(events.last(), Some(RunEvent::Finished(_))));
        let progress: Vec<usize> = events
            .iter()
            .filter_map(|event| match event {
                RunEvent::Progress { processed, .. } => Some(*processed),
                _ => None,
            })
            .collect();
        assert_eq!(progress, vec![1, 2]);
    }

    #[tokio::test]
    async fn counters_are_fresh_for_every_run() {
        let dir = tree(&["a.mp4", "b.mp4"]);
        let controller = RunController::new(RunOptions::default(), Arc::new(FixedProbe));

        for _ in 0..2 {
            let summary = controller
                .start(OperationKind::FindVideos, dir.path().to_path_buf(), |_event: RunEvent| {})
                .unwrap()
                .await
                .unwrap();
            assert_eq!(summary.counters.scanned, 2);
            assert_eq!(summary.counters.matched, 2);
        }
    }

    #[tokio::test]
    async fn cancel_without_run_has_no_effect() {
        let controller = RunController::new(RunOptions::default(), Arc::new(FixedProbe));
        assert!(!controller.request_cancel());
        assert_eq!(controller.state().status, RunStateStatus::Idle);
    }

    #[tokio::test]
    async fn second_start_is_rejected_and_cancel_stops_run() {
        let dir = tree(&["1.mp4", "2.mp4", "3.mp4"]);
        let (entered_sender, mut entered) = unbounded_channel();
        let (release, release_receiver) = mpsc::channel();
        let probe = GateProbe {
            entered: entered_sender,
            release: Mutex::new(release_receiver),
        };
        let controller = RunController::new(RunOptions::default(), Arc::new(probe));

        let handle = controller
            .start(OperationKind::AddTag, dir.path().to_path_buf(), |_event: RunEvent| {})
            .unwrap();

        // Wait until the first file is being probed.
        entered.recv().await.unwrap();
        assert!(controller.is_running());
        assert!(
            controller
                .start(OperationKind::ListAll, dir.path().to_path_buf(), |_event: RunEvent| {})
                .is_err()
        );

        assert!(controller.request_cancel());
        assert_eq!(controller.state().status, RunStateStatus::Cancelling);
        release.send(()).unwrap();
        drop(release);

        let summary = handle.await.unwrap();
        assert_eq!(summary.status, RunStatus::Cancelled);
        assert_eq!(summary.processed, 1);
        assert!(dir.path().join("1[h264].mp4").exists());
        assert!(dir.path().join("2.mp4").exists());
        assert!(dir.path().join("3.mp4").exists());

        let state = controller.state();
        assert_eq!(state.status, RunStateStatus::Idle);
        assert!(!controller.is_running());
    }
}
