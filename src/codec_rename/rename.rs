//! Compute tagged and untagged file names and perform renames.
//!
//! New names are built from the raw `OsStr` parts of the path,
//! so everything outside the tag keeps its exact bytes.

use std::ffi::{OsStr, OsString};
use std::fs;
use std::ops::Range;
use std::path::{Path, PathBuf};

use anyhow::Result;

use crate::codec_rename::classify;

/// Tag used when probing or renaming a file fails during add-tag.
pub const ERROR_TAG: &str = "ERROR";

/// Build `stem.ext` next to the original file, reusing its raw extension.
fn with_stem(path: &Path, stem: OsString) -> PathBuf {
    let mut new_name = stem;
    if let Some(extension) = path.extension() {
        new_name.push(".");
        new_name.push(extension);
    }
    path.with_file_name(new_name)
}

/// Byte range of the first `[...]` segment.
fn tag_range(bytes: &[u8]) -> Option<Range<usize>> {
    let start = bytes.iter().position(|&byte| byte == b'[')?;
    let length = bytes[start..].iter().position(|&byte| byte == b']')?;
    Some(start..start + length + 1)
}

/// Remove the first `[...]` segment from a raw stem.
///
/// Brackets are ASCII, so cutting at them keeps the remaining bytes valid.
fn strip_first_tag(stem: &OsStr) -> Option<OsString> {
    let bytes = stem.as_encoded_bytes();
    let range = tag_range(bytes)?;
    let mut stripped = bytes[..range.start].to_vec();
    stripped.extend_from_slice(&bytes[range.end..]);
    if stripped.iter().all(u8::is_ascii_whitespace) {
        return None;
    }
    os_string_from_bytes(stripped)
}

#[cfg(unix)]
fn os_string_from_bytes(bytes: Vec<u8>) -> Option<OsString> {
    use std::os::unix::ffi::OsStringExt;
    Some(OsString::from_vec(bytes))
}

#[cfg(not(unix))]
fn os_string_from_bytes(bytes: Vec<u8>) -> Option<OsString> {
    String::from_utf8(bytes).ok().map(OsString::from)
}

/// Returns the path with `[codec]` appended to the stem,
/// or `None` if the stem already contains that exact tag.
///
/// ```rust
/// use std::path::Path;
/// use video_codec_tools::codec_rename::compute_add_name;
///
/// let new_path = compute_add_name(Path::new("videos/movie.mp4"), "h264");
/// assert_eq!(new_path, Some(Path::new("videos/movie[h264].mp4").to_path_buf()));
///
/// assert_eq!(compute_add_name(Path::new("movie[h264].mp4"), "h264"), None);
/// ```
#[must_use]
pub fn compute_add_name(path: &Path, codec: &str) -> Option<PathBuf> {
    let stem = path.file_stem()?;
    if classify::is_tagged(&stem.to_string_lossy(), codec) {
        return None;
    }
    let mut tagged = stem.to_os_string();
    tagged.push(format!("[{codec}]"));
    Some(with_stem(path, tagged))
}

/// Returns the path with `[ERROR]` appended to the stem.
///
/// Only needs the file's own name, so it works when no codec was ever detected.
#[must_use]
pub fn compute_error_name(path: &Path) -> Option<PathBuf> {
    compute_add_name(path, ERROR_TAG)
}

/// Returns the path with the first bracketed segment removed from the stem.
///
/// Only the file stem is inspected; brackets in parent directories are left alone.
/// Returns `None` if the stem has no tag or would become empty.
///
/// ```rust
/// use std::path::Path;
/// use video_codec_tools::codec_rename::compute_remove_name;
///
/// let new_path = compute_remove_name(Path::new("[x]/movie[h264].mp4"));
/// assert_eq!(new_path, Some(Path::new("[x]/movie.mp4").to_path_buf()));
/// ```
#[must_use]
pub fn compute_remove_name(path: &Path) -> Option<PathBuf> {
    let stripped = strip_first_tag(path.file_stem()?)?;
    Some(with_stem(path, stripped))
}

/// Fail if `to` already exists and `overwrite` is false.
///
/// This is a check followed by a separate rename, not an atomic operation:
/// a file created at `to` in between is still replaced on Unix.
///
/// # Errors
/// Returns an error if the target exists and may not be overwritten.
pub fn check_target(to: &Path, overwrite: bool) -> Result<()> {
    if to.exists() && !overwrite {
        anyhow::bail!("File already exists: {}", crate::path_to_string(to));
    }
    Ok(())
}

/// Rename `from` to `to` with a single filesystem rename.
///
/// Fails without touching anything if the target already exists and `overwrite` is false.
///
/// # Errors
/// Returns an error if the target exists or the rename fails.
pub fn rename_file(from: &Path, to: &Path, overwrite: bool) -> Result<()> {
    check_target(to, overwrite)?;
    fs::rename(from, to).map_err(|error| {
        anyhow::anyhow!(
            "Failed to rename {} -> {}: {error}",
            crate::path_to_string(from),
            crate::path_to_string(to)
        )
    })
}
