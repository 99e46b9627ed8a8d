//! Complex (multi-disc) album flattening.
//!
//! A complex album is a directory of sub-albums (`CD1/`, `CD2/`, …) that
//! should be one album. Flattening merges the sub-cuesheets into a single
//! renumbered document, moves every sub-element up with its track number
//! shifted by the running offset, demotes the old cuesheets, and renames
//! the album directory last.

use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::config::RunConfig;
use crate::cuesheet::{self, CuesheetDocument, FileSection};
use crate::cuesheet::merge::{self, SubCuesheet};
use crate::diagnostics::Diagnostic;
use crate::error::Result;
use crate::model::{CanonicalAlbumMetadata, CueEntry};
use crate::scanner;
use crate::titling::{coerce_title, safe_name, split_numbered_stem};

/// One file move of the flattening plan.
#[derive(Debug, Clone)]
pub struct FlattenAction {
    pub from: PathBuf,
    pub to: PathBuf,
}

/// Everything the apply step needs, precomputed.
#[derive(Debug)]
pub struct FlattenPlan {
    pub album_dir: PathBuf,
    pub moves: Vec<FlattenAction>,
    pub remove_dirs: Vec<PathBuf>,
    pub cuesheet_path: PathBuf,
    pub cuesheet_text: String,
    /// New album directory path, when the current name is not canonical
    pub rename_dir_to: Option<PathBuf>,
    pub merged: CuesheetDocument,
    pub diagnostics: Vec<Diagnostic>,
}

/// The shape is "normal" when the sub-albums share a name affix and the
/// outer directory carries more than just the sub-directories (a cover,
/// a log). Abnormal shapes still flatten, with a diagnostic.
fn is_normal_shape(subs: &[PathBuf], element_count: usize) -> bool {
    let names: Vec<String> = subs
        .iter()
        .filter_map(|s| s.file_name().map(|n| n.to_string_lossy().into_owned()))
        .collect();
    let refs: Vec<&str> = names.iter().map(String::as_str).collect();
    let shared_affix = !merge::common_prefix(&refs).trim().is_empty()
        || !merge::common_postfix(&refs).trim().is_empty();
    shared_affix && element_count > subs.len()
}

/// Sub-album cuesheet, or entries synthesized from the audio filenames.
fn sub_document(
    config: &RunConfig,
    sub: &Path,
    diagnostics: &mut Vec<Diagnostic>,
) -> Result<CuesheetDocument> {
    let entries = scanner::sorted_entries(sub)?;
    let cues: Vec<PathBuf> = entries
        .iter()
        .filter(|p| scanner::is_cuesheet(p))
        .cloned()
        .collect();

    let mut selected: Option<(PathBuf, u64)> = None;
    for cue in &cues {
        let size = std::fs::metadata(cue)?.len();
        if selected.as_ref().is_none_or(|(_, best)| size > *best) {
            selected = Some((cue.clone(), size));
        }
    }
    if cues.len() > 1 {
        diagnostics.push(Diagnostic::structural(
            sub.display().to_string(),
            format!("{} cuesheets in sub-album, keeping the largest", cues.len()),
        ));
    }

    if let Some((path, _)) = selected {
        let text = String::from_utf8_lossy(&std::fs::read(&path)?).into_owned();
        let entity = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        return Ok(cuesheet::parse(
            &text,
            &entity,
            config.caps_mode,
            config.unify_composer,
            diagnostics,
        ));
    }

    // No cuesheet: build entries from the filenames
    let audio: Vec<&PathBuf> = entries.iter().filter(|p| scanner::is_audio_file(p)).collect();
    let doc_entries: Vec<CueEntry> = audio
        .iter()
        .enumerate()
        .map(|(i, path)| {
            let stem = path
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default();
            let (_, title) = split_numbered_stem(&stem);
            CueEntry {
                number: i + 1,
                title: coerce_title(&title, config.caps_mode),
                index00: None,
                index01: None,
            }
        })
        .collect();
    Ok(CuesheetDocument {
        title: coerce_title(
            &sub.file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default(),
            config.caps_mode,
        ),
        track_total: doc_entries.len(),
        entries: doc_entries,
        ..Default::default()
    })
}

/// Unique target path inside the album dir: a colliding name gets the
/// sub-directory name appended before the extension.
fn unique_target(album_dir: &Path, name: &str, sub_name: &str, taken: &[PathBuf]) -> PathBuf {
    let plain = album_dir.join(name);
    if !plain.exists() && !taken.contains(&plain) {
        return plain;
    }
    let (stem, ext) = match name.rfind('.') {
        Some(dot) => (&name[..dot], &name[dot..]),
        None => (name, ""),
    };
    album_dir.join(format!("{stem} ({sub_name}){ext}"))
}

/// Rewrite one sub-element's file name for the flat layout.
fn flat_name(name: &str, offset: usize, width: usize) -> String {
    let (stem, ext) = match name.rfind('.') {
        Some(dot) => (&name[..dot], name[dot + 1..].to_lowercase()),
        None => (name, String::new()),
    };
    // Old per-disc cuesheets are demoted, not deleted
    let ext = if ext == "cue" { "cdcue".to_string() } else { ext };

    let (number, title) = split_numbered_stem(stem);
    let stem = if number > 0 {
        format!("{:0w$}. {}", number + offset, title, w = width)
    } else {
        stem.to_string()
    };
    if ext.is_empty() { stem } else { format!("{stem}.{ext}") }
}

/// Build the flattening plan for a complex album directory.
pub fn plan(config: &RunConfig, dir: &Path) -> Result<FlattenPlan> {
    let mut diagnostics = Vec::new();
    let subs = scanner::sub_albums(dir, config.min_tracks);
    let element_count = scanner::sorted_entries(dir)?.len();
    if !is_normal_shape(&subs, element_count) {
        diagnostics.push(Diagnostic::structural(
            dir.display().to_string(),
            "unusual multi-disc layout",
        ));
    }

    let mut sub_sheets = Vec::new();
    for sub in &subs {
        let document = sub_document(config, sub, &mut diagnostics)?;
        sub_sheets.push(SubCuesheet {
            sub_name: sub
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default(),
            document,
        });
    }
    let dir_name = dir
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let merged = merge::merge(&sub_sheets, &dir_name, config.caps_mode, &mut diagnostics);
    let width = merged.track_total.max(1).to_string().len();

    let metadata = CanonicalAlbumMetadata {
        name: safe_name(&merged.title),
        title: merged.title.clone(),
        artist: merged.performer.clone(),
        composer: merged.composer.clone(),
        year: merged.year,
        genre: merged.genre.clone(),
        track_total: merged.track_total,
        numbering_width: width,
    };

    // File moves, with the track-number offset running across the discs
    let mut moves = Vec::new();
    let mut taken = Vec::new();
    let mut offset = 0usize;
    let mut sections = Vec::new();
    for (sub, sheet) in subs.iter().zip(&sub_sheets) {
        for element in scanner::sorted_entries(sub)? {
            let Some(name) = element.file_name().map(|n| n.to_string_lossy().into_owned()) else {
                continue;
            };
            let new_name = flat_name(&name, offset, width);
            let target = unique_target(dir, &new_name, &sheet.sub_name, &taken);
            taken.push(target.clone());
            moves.push(FlattenAction {
                from: element,
                to: target,
            });
        }
        sections.push(FileSection {
            file_name: format!("{} ({}).flac", metadata.name, sheet.sub_name),
            entries: sheet
                .document
                .entries
                .iter()
                .map(|e| CueEntry {
                    number: e.number + offset,
                    ..e.clone()
                })
                .collect(),
        });
        offset += sheet.document.entries.len();
    }

    let cuesheet_text = cuesheet::render(&metadata, &sections);
    let cuesheet_path = dir.join(format!("{}.cue", metadata.name));

    let good_dir = metadata.directory_name(config.single_album, config.unify_composer);
    let rename_dir_to = if !good_dir.is_empty() && dir_name != good_dir {
        dir.parent().map(|p| p.join(good_dir))
    } else {
        None
    };

    Ok(FlattenPlan {
        album_dir: dir.to_path_buf(),
        moves,
        remove_dirs: subs,
        cuesheet_path,
        cuesheet_text,
        rename_dir_to,
        merged,
        diagnostics,
    })
}

/// Execute a flattening plan. The directory rename comes last so every
/// earlier step works with stable paths.
pub fn apply(plan: &FlattenPlan) -> Result<()> {
    info!(dir = %plan.album_dir.display(), moves = plan.moves.len(), "flattening complex album");
    for action in &plan.moves {
        debug!(from = %action.from.display(), to = %action.to.display(), "moving");
        std::fs::rename(&action.from, &action.to)?;
    }
    std::fs::write(&plan.cuesheet_path, &plan.cuesheet_text)?;
    for sub in &plan.remove_dirs {
        std::fs::remove_dir(sub)?;
    }
    if let Some(new_dir) = &plan.rename_dir_to {
        std::fs::rename(&plan.album_dir, new_dir)?;
    }
    Ok(())
}
