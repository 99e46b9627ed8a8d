//! Cover image selection and correction flags.
//!
//! Every image in the album directory is scored for suitability as the
//! front cover; the best one becomes the cover candidate and gets its
//! RENAME/RESIZE flags computed against the canonical `cover.jpg` form.

use std::path::Path;

use crate::model::{CoverFlags, CoverImage};

/// JPEG quality above this is wasted space for a cover and triggers RESIZE.
const QUALITY_LIMIT: u32 = 89;

/// Asymmetric distance from a reference value: undershooting is penalized
/// ten times harder than overshooting.
fn asym_criterion(value: f64, reference: f64) -> f64 {
    let deviation = value / reference - 1.0;
    if value < reference {
        -10.0 * deviation * deviation
    } else {
        -deviation * deviation
    }
}

/// Rank of a file name as a cover candidate, by keyword.
fn name_rank(stem: &str) -> f64 {
    let stem = stem.to_lowercase();
    if stem.contains("cover") {
        0.0
    } else if stem.contains("folder") {
        -1.0
    } else if stem.contains("front") {
        -2.0
    } else if stem.contains("image") {
        -5.0
    } else if stem.contains("artist") {
        -100.0
    } else if stem.contains("logo") {
        -110.0
    } else if stem.contains("back") {
        -130.0
    } else {
        -50.0
    }
}

/// Score an image and compute its correction flags.
///
/// `edge` is the target cover edge length, `quality_ref` the target JPEG
/// quality. A reported quality of 0 means unknown and is scored as the
/// reference value.
pub fn evaluate(
    path: &Path,
    width: u32,
    height: u32,
    quality: u32,
    edge: u32,
    quality_ref: u32,
) -> CoverImage {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let extension = path
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    let quality = if quality == 0 { quality_ref } else { quality };

    let suitability = asym_criterion(f64::from(width), f64::from(edge))
        + asym_criterion(f64::from(height), f64::from(edge))
        + name_rank(&stem)
        + asym_criterion(f64::from(quality), f64::from(quality_ref));

    let mut flags = CoverFlags::empty();
    if stem != "cover" || extension != "jpg" {
        flags |= CoverFlags::RENAME;
    }
    if width > edge || height > edge || width != height || quality > QUALITY_LIMIT {
        flags |= CoverFlags::RESIZE;
    }

    CoverImage {
        path: path.to_path_buf(),
        width,
        height,
        quality,
        suitability,
        flags,
    }
}

/// The edge length the cover will have after resizing.
pub fn target_edge(width: u32, height: u32, edge: u32) -> u32 {
    width.min(edge).min(height.min(edge))
}

/// Pick the most suitable cover among the candidates.
pub fn select_best(candidates: Vec<CoverImage>) -> Option<CoverImage> {
    candidates.into_iter().reduce(|best, candidate| {
        if candidate.suitability > best.suitability {
            candidate
        } else {
            best
        }
    })
}
