use std::path::Path;

use walkdir::WalkDir;

use crate::codec_rename::FileEntry;

/// Collect all files under `root` in a deterministic order.
///
/// Directories are visited top-down and the entries of each directory are sorted by name,
/// so repeated walks over an unchanged tree give the same sequence.
/// A root that does not exist or is not a directory gives an empty list.
/// Unreadable entries are skipped.
#[must_use]
pub fn walk(root: &Path) -> Vec<FileEntry> {
    if !root.is_dir() {
        return Vec::new();
    }

    WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_file())
        .map(FileEntry::from)
        .collect()
}
