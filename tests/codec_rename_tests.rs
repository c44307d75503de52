//! End-to-end runs over temporary directory trees with a scripted codec probe.

use std::collections::HashMap;
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tempfile::{TempDir, tempdir};

use video_codec_tools::codec_rename::{
    BatchRunner, CancellationToken, CodecProbe, CodecResult, FolderReport, OperationKind, RunController, RunEvent,
    RunOptions, RunStateStatus, RunStatus, RunSummary, walk,
};

/// Answers by file name, `h264` for everything else.
#[derive(Default)]
struct NameProbe {
    answers: HashMap<String, CodecResult>,
}

impl NameProbe {
    fn with(answers: &[(&str, CodecResult)]) -> Self {
        Self {
            answers: answers
                .iter()
                .map(|(name, result)| ((*name).to_string(), result.clone()))
                .collect(),
        }
    }
}

impl CodecProbe for NameProbe {
    fn probe(&self, path: &Path) -> CodecResult {
        let name = path.file_name().unwrap().to_string_lossy().to_string();
        self.answers
            .get(&name)
            .cloned()
            .unwrap_or_else(|| CodecResult::Codec("h264".to_string()))
    }
}

fn tree(names: &[&str]) -> TempDir {
    let dir = tempdir().unwrap();
    for name in names {
        let path = dir.path().join(name);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, name.as_bytes()).unwrap();
    }
    dir
}

fn file_names(root: &Path) -> Vec<String> {
    walk(root)
        .into_iter()
        .map(|entry| {
            entry
                .path
                .strip_prefix(root)
                .unwrap()
                .to_string_lossy()
                .replace('\\', "/")
        })
        .collect()
}

/// Raw file names in `root`, sorted.
fn raw_file_names(root: &Path) -> Vec<OsString> {
    let mut names: Vec<OsString> = fs::read_dir(root)
        .unwrap()
        .map(|entry| entry.unwrap().file_name())
        .collect();
    names.sort();
    names
}

fn run(kind: OperationKind, root: &Path, probe: &NameProbe) -> RunSummary {
    let options = RunOptions::default();
    BatchRunner::new(&options, probe, CancellationToken::new()).run(kind, root, &mut |_event: RunEvent| {})
}

#[test]
fn list_all_counts_every_walked_file() {
    let dir = tree(&["a.mp4", "b.txt", "nested/c.mkv", "nested/deeper/README"]);
    let summary = run(OperationKind::ListAll, dir.path(), &NameProbe::default());
    assert_eq!(summary.counters.scanned, walk(dir.path()).len());
    assert_eq!(summary.total, 4);
}

#[test]
fn add_then_remove_round_trips() {
    let dir = tree(&["movie.mp4"]);
    let probe = NameProbe::default();

    let summary = run(OperationKind::AddTag, dir.path(), &probe);
    assert_eq!(summary.counters.renamed, 1);
    assert_eq!(file_names(dir.path()), vec!["movie[h264].mp4"]);

    let summary = run(OperationKind::RemoveTag, dir.path(), &probe);
    assert_eq!(summary.counters.renamed, 1);
    assert_eq!(file_names(dir.path()), vec!["movie.mp4"]);
    assert_eq!(fs::read(dir.path().join("movie.mp4")).unwrap(), b"movie.mp4");
}

#[test]
fn decomposed_name_round_trips_byte_exact() {
    let name = "Cafe\u{301}.mp4";
    let dir = tree(&[name]);
    let codecs = NameProbe::default();

    let summary = run(OperationKind::AddTag, dir.path(), &codecs);
    assert_eq!(summary.counters.renamed, 1);
    assert_eq!(raw_file_names(dir.path()), vec![OsString::from("Cafe\u{301}[h264].mp4")]);

    let summary = run(OperationKind::RemoveTag, dir.path(), &codecs);
    assert_eq!(summary.counters.renamed, 1);
    assert_eq!(raw_file_names(dir.path()), vec![OsString::from(name)]);
}

#[cfg(target_os = "linux")]
#[test]
fn non_utf8_names_keep_their_bytes() {
    use std::os::unix::ffi::{OsStrExt, OsStringExt};

    let dir = tempdir().unwrap();
    for name in [&b"clip\xff.mp4"[..], &b"clip\xfe.mp4"[..]] {
        fs::write(dir.path().join(std::ffi::OsStr::from_bytes(name)), name).unwrap();
    }
    let codecs = NameProbe::default();

    let summary = run(OperationKind::AddTag, dir.path(), &codecs);
    assert_eq!(summary.counters.renamed, 2);
    assert_eq!(summary.counters.errors, 0);
    assert_eq!(
        raw_file_names(dir.path()),
        vec![
            OsString::from_vec(b"clip\xfe[h264].mp4".to_vec()),
            OsString::from_vec(b"clip\xff[h264].mp4".to_vec()),
        ]
    );

    let summary = run(OperationKind::RemoveTag, dir.path(), &codecs);
    assert_eq!(summary.counters.renamed, 2);
    let names = raw_file_names(dir.path());
    assert_eq!(
        names,
        vec![
            OsString::from_vec(b"clip\xfe.mp4".to_vec()),
            OsString::from_vec(b"clip\xff.mp4".to_vec()),
        ]
    );
    for name in &names {
        assert_eq!(fs::read(dir.path().join(name)).unwrap(), name.as_bytes());
    }
}

#[test]
fn add_tag_twice_is_idempotent() {
    let dir = tree(&["movie.mp4"]);
    let probe = NameProbe::default();

    let first = run(OperationKind::AddTag, dir.path(), &probe);
    assert_eq!(first.counters.renamed, 1);
    let names_after_first = file_names(dir.path());

    let second = run(OperationKind::AddTag, dir.path(), &probe);
    assert_eq!(second.counters.renamed, 0);
    assert_eq!(second.counters.skipped, 1);
    assert_eq!(file_names(dir.path()), names_after_first);
}

#[test]
fn probe_error_does_not_abort_run() {
    let names = ["1.mp4", "2.mp4", "3.mp4", "4.mp4", "5.mp4"];
    let probe = NameProbe::with(&[("3.mp4", CodecResult::Failed("moov atom not found".to_string()))]);

    let dir = tree(&names);
    let summary = run(OperationKind::FindVideos, dir.path(), &probe);
    assert_eq!(summary.status, RunStatus::Completed);
    assert_eq!(summary.processed, 5);
    assert_eq!(summary.counters.matched, 4);
    assert_eq!(summary.counters.errors, 1);

    let summary = run(OperationKind::AddTag, dir.path(), &probe);
    assert_eq!(summary.counters.renamed, 4);
    assert_eq!(summary.counters.errors, 1);
    assert_eq!(
        file_names(dir.path()),
        vec!["1[h264].mp4", "2[h264].mp4", "3[ERROR].mp4", "4[h264].mp4", "5[h264].mp4"]
    );
}

#[test]
fn non_target_all_clear() {
    let dir = tree(&["a.mkv", "season/b.mp4", "notes.txt"]);
    let probe = NameProbe::with(&[
        ("a.mkv", CodecResult::Codec("hevc".to_string())),
        ("b.mp4", CodecResult::Codec("hevc".to_string())),
    ]);
    let summary = run(OperationKind::FindNonTargetCodec, dir.path(), &probe);
    assert_eq!(summary.folder_report, Some(FolderReport::AllClear));
    assert!(summary.counters.folders.is_empty());
}

#[test]
fn non_target_folder_counts_sum_to_matches() {
    let dir = tree(&["one/a.mkv", "one/b.mkv", "two/c.mp4", "two/d.mp4", "two/e.avi"]);
    let probe = NameProbe::with(&[("d.mp4", CodecResult::Codec("hevc".to_string()))]);
    let summary = run(OperationKind::FindNonTargetCodec, dir.path(), &probe);

    let Some(FolderReport::Matches(folders)) = summary.folder_report else {
        panic!("expected folder matches");
    };
    assert_eq!(folders.values().sum::<usize>(), summary.counters.matched);
    assert_eq!(folders.get("one"), Some(&2));
    assert_eq!(folders.get("two"), Some(&2));
}

#[tokio::test]
async fn cancel_after_k_files_leaves_rest_untouched() {
    let names = ["1.mp4", "2.mp4", "3.mp4", "4.mp4", "5.mp4", "6.mp4"];
    let dir = tree(&names);
    let controller = RunController::new(RunOptions::default(), Arc::new(NameProbe::default()));
    let cancel_handle = controller.clone();
    let k = 3;

    let summary = controller
        .start(OperationKind::AddTag, dir.path().to_path_buf(), move |event: RunEvent| {
            if let RunEvent::Progress { processed, .. } = event
                && processed == k
            {
                cancel_handle.request_cancel();
            }
        })
        .unwrap()
        .await
        .unwrap();

    assert_eq!(summary.status, RunStatus::Cancelled);
    assert_eq!(summary.processed, k);
    assert_eq!(summary.counters.renamed, k);
    for name in &names[k..] {
        assert!(dir.path().join(name).exists(), "{name} should be untouched");
    }
    let tagged: Vec<PathBuf> = (1..=k).map(|i| dir.path().join(format!("{i}[h264].mp4"))).collect();
    assert!(tagged.iter().all(|path| path.exists()));
    assert_eq!(controller.state().status, RunStateStatus::Idle);
}
