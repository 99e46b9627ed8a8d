//! Directory classification: which directories are albums, which are
//! multi-disc (complex) albums, and which files inside them matter.
//!
//! Classification is purely structural; no tags are read here.

use std::path::{Path, PathBuf};

use tracing::debug;
use walkdir::WalkDir;

use crate::error::Result;

/// Directory names treated as albums regardless of their shape.
const SPECIAL_NAMES: &[&str] = &["Misc", "Miscellaneous", "Various", "Bonus CD"];

fn extension_lower(path: &Path) -> Option<String> {
    path.extension().map(|e| e.to_string_lossy().to_lowercase())
}

/// Audio files the tool manages.
pub fn is_audio_file(path: &Path) -> bool {
    matches!(extension_lower(path).as_deref(), Some("flac" | "mp3" | "m4a"))
}

pub fn is_cuesheet(path: &Path) -> bool {
    extension_lower(path).as_deref() == Some("cue")
}

pub fn is_image_file(path: &Path) -> bool {
    matches!(
        extension_lower(path).as_deref(),
        Some("jpg" | "jpeg" | "png" | "bmp" | "webp")
    )
}

/// Immediate children of a directory, sorted by file name.
pub fn sorted_entries(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut entries: Vec<PathBuf> = WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
        .map(|e| e.into_path())
        .collect();
    entries.sort();
    Ok(entries)
}

/// Count of audio files directly inside a directory.
pub fn audio_count(dir: &Path) -> usize {
    WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| is_audio_file(e.path()))
        .count()
}

/// Album directory names carry a separator (`Year - Title`, `NN. Title`) or
/// are one of the whitelisted grab-bag names.
pub fn looks_like_album_name(name: &str) -> bool {
    name.contains("- ")
        || name.contains(". ")
        || SPECIAL_NAMES.iter().any(|s| name.eq_ignore_ascii_case(s))
}

fn dir_name(dir: &Path) -> String {
    dir.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// A directory qualifies as an album when its name looks like one (unless
/// the name check is waived: single-album mode, or a sub-directory of a
/// complex album) and it holds enough audio files.
pub fn can_be_album(dir: &Path, min_tracks: usize, waive_name_check: bool) -> bool {
    if !dir.is_dir() {
        return false;
    }
    if !waive_name_check && !looks_like_album_name(&dir_name(dir)) {
        return false;
    }
    audio_count(dir) >= min_tracks
}

/// Sub-directories of a complex album candidate that hold enough audio.
pub fn sub_albums(dir: &Path, min_tracks: usize) -> Vec<PathBuf> {
    WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
        .map(|e| e.into_path())
        .filter(|p| can_be_album(p, min_tracks, true))
        .collect()
}

/// A complex album is a directory whose name looks like an album (or is
/// whitelisted) holding at least two qualifying sub-albums.
pub fn can_be_complex_album(dir: &Path, min_tracks: usize, waive_name_check: bool) -> bool {
    if !dir.is_dir() {
        return false;
    }
    if !waive_name_check && !looks_like_album_name(&dir_name(dir)) {
        return false;
    }
    sub_albums(dir, min_tracks).len() >= 2
}

/// Classified top-level contents of a collection directory.
#[derive(Debug, Default)]
pub struct CollectionScan {
    /// Simple album directories
    pub albums: Vec<PathBuf>,
    /// Multi-disc directories that need flattening first
    pub complex_albums: Vec<PathBuf>,
    /// Directories that match neither shape
    pub unclassified: Vec<PathBuf>,
}

/// Classify the children of an artist/collection directory.
pub fn scan_collection(base: &Path, min_tracks: usize) -> Result<CollectionScan> {
    let mut scan = CollectionScan::default();
    for entry in sorted_entries(base)? {
        if !entry.is_dir() {
            continue;
        }
        if can_be_complex_album(&entry, min_tracks, false) {
            debug!(dir = %entry.display(), "classified as complex album");
            scan.complex_albums.push(entry);
        } else if can_be_album(&entry, min_tracks, false) {
            debug!(dir = %entry.display(), "classified as album");
            scan.albums.push(entry);
        } else {
            scan.unclassified.push(entry);
        }
    }
    Ok(scan)
}
