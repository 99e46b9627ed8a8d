//! Album analysis: assembling everything known about one album directory
//! into an [`Album`] with its correction flags and diagnostics.
//!
//! The passes run in a fixed order: classify files, pick and parse the
//! cuesheet, probe the tracks, resolve canonical metadata, match tracks to
//! cue entries, score the covers, and finally plan the corrective flags.

pub mod cover;
pub mod matcher;
pub mod planner;
pub mod resolver;

use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::collab::Collaborators;
use crate::config::RunConfig;
use crate::cuesheet::{self, CuesheetDocument};
use crate::diagnostics::Diagnostic;
use crate::error::Result;
use crate::model::{Album, AudioInfo, Codec, ObservedTag, Track, TrackFlags};
use crate::scanner;
use crate::titling::split_numbered_stem;

/// Pick the cuesheet to trust: the first one in name order, displaced by
/// any strictly larger one.
fn select_cuesheet(
    cues: &[PathBuf],
    diagnostics: &mut Vec<Diagnostic>,
) -> Result<Option<PathBuf>> {
    let mut selected: Option<(PathBuf, u64)> = None;
    for cue in cues {
        let size = std::fs::metadata(cue)?.len();
        match &selected {
            None => selected = Some((cue.clone(), size)),
            Some((_, best)) if size > *best => selected = Some((cue.clone(), size)),
            _ => {}
        }
    }
    if cues.len() > 1 {
        diagnostics.push(Diagnostic::structural(
            cues[0]
                .parent()
                .map(|p| p.display().to_string())
                .unwrap_or_default(),
            format!("{} cuesheet candidates", cues.len()),
        ));
    }
    Ok(selected.map(|(path, _)| path))
}

/// Load cuesheet text: UTF-8 with lossy fallback, the fallback diagnosed.
fn load_cuesheet_text(path: &Path, diagnostics: &mut Vec<Diagnostic>) -> Result<String> {
    let bytes = std::fs::read(path)?;
    match String::from_utf8(bytes) {
        Ok(text) => Ok(text),
        Err(err) => {
            let entity = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            diagnostics.push(Diagnostic::parse(
                entity,
                "not valid UTF-8, decoded lossily",
            ));
            Ok(String::from_utf8_lossy(err.as_bytes()).into_owned())
        }
    }
}

fn build_track(collab: &Collaborators, path: &Path) -> Track {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let (file_number, file_title) = split_numbered_stem(&stem);
    let mut diagnostics = Vec::new();
    let entity = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    let audio = match collab.prober.probe(path) {
        Ok(info) => info,
        Err(err) => {
            warn!(file = %path.display(), error = %err, "audio probe failed");
            diagnostics.push(Diagnostic::collaborator(&entity, err.to_string()));
            AudioInfo {
                codec: Codec::Unknown,
                sample_length: 0,
                duration_secs: 0.0,
                has_obsolete_blocks: false,
            }
        }
    };
    let tag = match collab.tags.read(path) {
        Ok(tag) => tag,
        Err(err) => {
            warn!(file = %path.display(), error = %err, "tag read failed");
            diagnostics.push(Diagnostic::collaborator(&entity, err.to_string()));
            ObservedTag::default()
        }
    };

    Track {
        path: path.to_path_buf(),
        file_number,
        file_title,
        tag,
        audio,
        number: 0,
        title: String::new(),
        flags: TrackFlags::empty(),
        diagnostics,
    }
}

/// Analyze one album directory. Never writes anything.
pub fn analyze(config: &RunConfig, collab: &Collaborators, dir: &Path) -> Result<Album> {
    debug!(dir = %dir.display(), "analyzing album");
    let mut diagnostics = Vec::new();

    let entries = scanner::sorted_entries(dir)?;
    let audio_files: Vec<&PathBuf> = entries.iter().filter(|p| scanner::is_audio_file(p)).collect();
    let cue_files: Vec<PathBuf> = entries
        .iter()
        .filter(|p| scanner::is_cuesheet(p))
        .cloned()
        .collect();
    let image_files: Vec<&PathBuf> = entries.iter().filter(|p| scanner::is_image_file(p)).collect();

    let many_cuesheets = cue_files.len() > 1;
    let cuesheet_path = select_cuesheet(&cue_files, &mut diagnostics)?;
    let cuesheet: Option<CuesheetDocument> = match &cuesheet_path {
        Some(path) => {
            let text = load_cuesheet_text(path, &mut diagnostics)?;
            let entity = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            Some(cuesheet::parse(
                &text,
                &entity,
                config.caps_mode,
                config.unify_composer,
                &mut diagnostics,
            ))
        }
        None => None,
    };

    // A file whose stream cannot be classified is no track at all; it is
    // excluded here so an album full of them ends up critical
    let mut tracks: Vec<Track> = Vec::new();
    for path in &audio_files {
        let track = build_track(collab, path);
        if track.audio.codec == Codec::Unknown {
            let entity = track
                .path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            warn!(file = %track.path.display(), "unclassifiable audio stream");
            diagnostics.extend(track.diagnostics);
            diagnostics.push(Diagnostic::structural(
                entity,
                "unclassifiable audio stream, left untouched",
            ));
            continue;
        }
        tracks.push(track);
    }

    let metadata = {
        let tag_refs: Vec<&ObservedTag> = tracks.iter().map(|t| &t.tag).collect();
        resolver::resolve(
            config,
            dir,
            cuesheet.as_ref(),
            &tag_refs,
            tracks.len(),
            &mut diagnostics,
        )
    };

    let usable_cue = cuesheet.as_ref().is_some_and(CuesheetDocument::is_usable);
    if usable_cue {
        let entries = &cuesheet.as_ref().map(|d| d.entries.clone()).unwrap_or_default();
        matcher::match_tracks(&mut tracks, entries);
    } else {
        matcher::fallback_identities(&mut tracks, config.caps_mode, &mut diagnostics);
    }

    let mut candidates = Vec::new();
    for path in &image_files {
        match collab.images.probe(path) {
            Ok((width, height, quality)) => candidates.push(cover::evaluate(
                path,
                width,
                height,
                quality,
                config.cover_edge,
                config.cover_quality,
            )),
            Err(err) => {
                let entity = path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default();
                diagnostics.push(Diagnostic::collaborator(entity, err.to_string()));
            }
        }
    }
    let best_cover = cover::select_best(candidates);
    if best_cover.is_none() {
        diagnostics.push(Diagnostic::structural(
            dir.display().to_string(),
            "no cover image found",
        ));
    }

    let expected_picture = best_cover.as_ref().map(|c| {
        let edge = cover::target_edge(c.width, c.height, config.cover_edge);
        (edge, edge)
    });
    for (i, track) in tracks.iter_mut().enumerate() {
        planner::plan_track(config, &metadata, track, i + 1, expected_picture);
    }

    let dir_name = dir
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let flags = planner::plan_album(
        config,
        &metadata,
        &dir_name,
        cuesheet.as_ref(),
        many_cuesheets,
        tracks.len(),
    );

    Ok(Album {
        path: dir.to_path_buf(),
        metadata,
        tracks,
        cover: best_cover,
        cuesheet,
        cuesheet_path,
        many_cuesheets,
        flags,
        diagnostics,
    })
}
