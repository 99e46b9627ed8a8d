//! Canonical album metadata inference.
//!
//! Field values are pulled from sources in a fixed precedence order:
//! explicit overrides, then the cuesheet header, then directory-name
//! heuristics, then the first usable track-tag value. Lower-precedence
//! sources can still refine a value through the better-value rule; they
//! never replace a resolved one outright.

use std::path::Path;

use chrono::Datelike;
use tracing::debug;

use crate::config::RunConfig;
use crate::cuesheet::CuesheetDocument;
use crate::diagnostics::Diagnostic;
use crate::model::{CanonicalAlbumMetadata, ObservedTag};
use crate::titling::{coerce_title, safe_name};

/// Directory names that resolve to the grab-bag "Misc" album.
const MISC_NAMES: &[&str] = &["Misc", "Miscellaneous", "Various"];

/// A candidate refines the current value when the current one is empty, or
/// when the candidate is a richer spelling of it: at least as long,
/// sanitizing to the same string, and not identical.
fn better_value(current: &str, candidate: &str) -> bool {
    if candidate.is_empty() {
        return false;
    }
    if current.is_empty() {
        return true;
    }
    candidate.chars().count() >= current.chars().count()
        && safe_name(candidate) == current
        && candidate != current
}

fn refine(current: &mut String, candidate: &str) {
    if better_value(current, candidate) {
        *current = candidate.to_string();
    }
}

fn current_year() -> i32 {
    chrono::Local::now().year()
}

fn plausible_year(year: i32) -> bool {
    (1..=current_year()).contains(&year)
}

/// Parse directory-name heuristics into (artist, title, year).
///
/// Collection mode reads `YYYY - Title` or `Artist - Title`; single-album
/// mode additionally accepts `Artist - YYYY - Title`.
fn parse_directory_name(name: &str, single_album: bool) -> (String, String, i32) {
    if MISC_NAMES.iter().any(|m| name.eq_ignore_ascii_case(m)) {
        return (String::new(), "Misc".to_string(), 0);
    }
    let parts: Vec<&str> = name.split('-').map(str::trim).collect();
    if single_album {
        let mut artist = String::new();
        let mut year = 0;
        let title = parts.last().map(|p| p.to_string()).unwrap_or_default();
        if parts.len() > 1 {
            artist = parts[0].to_string();
        }
        for part in &parts {
            if let Ok(y) = part.parse::<i32>()
                && plausible_year(y)
            {
                year = y;
                // a numeric first token is a year, not an artist
                if parts.first() == Some(part) {
                    artist.clear();
                }
                break;
            }
        }
        (artist, title, year)
    } else {
        // `YYYY - Title`, or `Artist - Title` when the head is not a year
        if let Some((head, tail)) = name.split_once('-') {
            let (head, tail) = (head.trim(), tail.trim());
            if let Ok(year) = head.parse::<i32>()
                && plausible_year(year)
            {
                return (String::new(), tail.to_string(), year);
            }
            return (head.to_string(), tail.to_string(), 0);
        }
        (String::new(), name.to_string(), 0)
    }
}

/// Resolve canonical album metadata.
///
/// `track_tags` must be in file order; `track_count` is the number of audio
/// files actually present.
pub fn resolve(
    config: &RunConfig,
    album_dir: &Path,
    cuesheet: Option<&CuesheetDocument>,
    track_tags: &[&ObservedTag],
    track_count: usize,
    diagnostics: &mut Vec<Diagnostic>,
) -> CanonicalAlbumMetadata {
    let dir_name = album_dir
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let entity = dir_name.clone();

    let mut title = String::new();
    let mut artist = String::new();
    let mut composer = String::new();
    let mut year = 0;
    let mut genre = String::new();

    // 1. Overrides beat everything
    if let Some(v) = &config.overrides.album {
        title = v.clone();
    }
    if let Some(v) = &config.overrides.artist {
        artist = v.clone();
    }
    if let Some(v) = &config.overrides.composer {
        composer = v.clone();
    }
    if let Some(v) = config.overrides.year {
        year = v;
    }
    if let Some(v) = &config.overrides.genre {
        genre = v.clone();
    }

    // 2. Cuesheet header
    if let Some(doc) = cuesheet {
        if title.is_empty() {
            title = doc.title.clone();
        }
        if artist.is_empty() {
            artist = doc.performer.clone();
        }
        if composer.is_empty() && config.unify_composer {
            composer = doc.composer.clone();
        }
        if year == 0 && plausible_year(doc.year) {
            year = doc.year;
        }
        if genre.is_empty() {
            genre = doc.genre.clone();
        }
    }

    // 3. Directory name
    let (dir_artist, dir_title, dir_year) =
        parse_directory_name(&dir_name, config.single_album);
    let dir_title = coerce_title(&dir_title, config.caps_mode);
    if title.is_empty() {
        title = dir_title;
    } else {
        refine(&mut title, &dir_title);
    }
    if artist.is_empty() {
        artist = dir_artist;
    }
    if year == 0 {
        year = dir_year;
    }

    // 4. Parent (artist) directory in collection mode
    if artist.is_empty() && !config.single_album {
        artist = album_dir
            .parent()
            .and_then(|p| p.file_name())
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
    }

    // 5. Track tags: refine strings, fill year and genre from the first
    //    usable value
    for tag in track_tags {
        if let Some(v) = &tag.album {
            refine(&mut title, &coerce_title(v, config.caps_mode));
        }
        if let Some(v) = &tag.artist {
            refine(&mut artist, v);
        }
        if config.unify_composer
            && let Some(v) = &tag.composer
        {
            refine(&mut composer, v);
        }
    }
    if year == 0 && title != "Misc" {
        year = track_tags
            .iter()
            .filter_map(|t| t.date.as_deref())
            .filter_map(|d| d.get(..4).and_then(|y| y.parse::<i32>().ok()))
            .find(|y| plausible_year(*y))
            .unwrap_or(0);
    }
    if genre.is_empty() {
        genre = track_tags
            .iter()
            .filter_map(|t| t.genre.clone())
            .find(|g| !g.is_empty())
            .unwrap_or_default();
    }

    for (field, value) in [("title", &title), ("artist", &artist)] {
        if value.is_empty() {
            diagnostics.push(Diagnostic::note(&entity, format!("unresolved album {field}")));
        }
    }
    if year == 0 && title != "Misc" {
        diagnostics.push(Diagnostic::note(&entity, "unresolved album year"));
    }

    let track_total = cuesheet
        .map(|doc| doc.track_total)
        .filter(|t| *t > 0)
        .unwrap_or(track_count);
    let numbering_width = if track_total > 0 {
        track_total.to_string().len()
    } else {
        1
    };

    let metadata = CanonicalAlbumMetadata {
        name: safe_name(&title),
        title,
        artist,
        composer,
        year,
        genre,
        track_total,
        numbering_width,
    };
    debug!(
        dir = %album_dir.display(),
        title = %metadata.title,
        artist = %metadata.artist,
        year = metadata.year,
        tracks = metadata.track_total,
        "resolved album metadata"
    );
    metadata
}
