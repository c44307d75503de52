//! Classify walked paths: video extension check and codec tag detection.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;

/// Video file extensions recognized by default, without the leading dot.
pub const DEFAULT_VIDEO_EXTENSIONS: [&str; 6] = ["mov", "mp4", "mkv", "avi", "m4v", "mpg"];

/// Matches the first bracketed segment, e.g. `[h264]`.
pub(crate) static RE_BRACKETED_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[.*?\]").expect("Failed to create regex pattern for bracketed tag"));

/// A walked file with its parsed name components.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct FileEntry {
    pub path: PathBuf,
    /// File name without extension.
    pub stem: String,
    /// Lowercase extension without the leading dot. Empty if the file has none.
    pub extension: String,
    /// True when the stem contains any bracketed tag.
    pub tagged: bool,
}

impl FileEntry {
    /// Create a new `FileEntry` from a path, extracting name and extension.
    #[must_use]
    pub fn new(path: &Path) -> Self {
        let path = path.to_owned();
        let (stem, extension) = crate::get_normalized_file_name_and_extension(&path)
            .unwrap_or_else(|_| (crate::path_to_filename_string(&path), String::new()));
        let extension = extension.to_lowercase();
        let tagged = has_tag(&stem);

        Self {
            path,
            stem,
            extension,
            tagged,
        }
    }

    /// Check if the extension is in the given allow-list.
    #[must_use]
    pub fn is_video(&self, extensions: &[String]) -> bool {
        is_video_file(&self.path, extensions)
    }

    /// Name of the directory containing this file.
    #[must_use]
    pub fn folder_name(&self) -> String {
        self.path
            .parent()
            .and_then(|parent| crate::get_normalized_dir_name(parent).ok())
            .unwrap_or_default()
    }
}

impl fmt::Display for FileEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.path.display())
    }
}

impl From<walkdir::DirEntry> for FileEntry {
    fn from(entry: walkdir::DirEntry) -> Self {
        Self::new(&entry.into_path())
    }
}

/// Check if the path has a video file extension from the allow-list.
///
/// The comparison is case-insensitive: `A.MP4` and `a.mp4` classify the same.
#[must_use]
pub fn is_video_file(path: &Path, extensions: &[String]) -> bool {
    let extension = crate::path_to_file_extension_string(path);
    !extension.is_empty() && extensions.iter().any(|ext| ext == &extension)
}

/// Check if the stem contains the exact bracketed tag `[tag]`.
#[must_use]
pub fn is_tagged(stem: &str, tag: &str) -> bool {
    stem.contains(&format!("[{tag}]"))
}

/// Check if the stem contains any bracketed tag.
#[must_use]
pub fn has_tag(stem: &str) -> bool {
    RE_BRACKETED_TAG.is_match(stem)
}

/// Normalize extensions to lowercase without a leading dot, dropping empty and duplicate values.
#[must_use]
pub fn normalize_extensions<S: AsRef<str>>(extensions: &[S]) -> Vec<String> {
    let mut normalized: Vec<String> = Vec::with_capacity(extensions.len());
    for ext in extensions {
        let ext = ext.as_ref().trim().trim_start_matches('.').to_lowercase();
        if !ext.is_empty() && !normalized.contains(&ext) {
            normalized.push(ext);
        }
    }
    normalized
}

/// Default extension allow-list as owned strings.
#[must_use]
pub fn default_extensions() -> Vec<String> {
    DEFAULT_VIDEO_EXTENSIONS.iter().map(ToString::to_string).collect()
}
