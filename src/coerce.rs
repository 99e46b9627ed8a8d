//! The apply pass: executing the planned corrections of one album.
//!
//! Strictly sequential, collaborator by collaborator: cover first, then
//! every track (re-encode, rename, re-tag, re-picture, block cleanup),
//! then batched replay gain, then the album directory rename, and last the
//! cuesheet reconstruction. A collaborator failure leaves the flag set,
//! keeps the source file, and isolates that entity; the rest of the album
//! still gets its corrections.

use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::album;
use crate::collab::{CanonicalTagSet, Collaborators};
use crate::config::RunConfig;
use crate::cuesheet::{self, FileSection};
use crate::diagnostics::Diagnostic;
use crate::error::Result;
use crate::model::{Album, AlbumFlags, Codec, CoverFlags, CueEntry, Track, TrackFlags};

/// Outcome of coercing one album.
#[derive(Debug)]
pub struct CoerceOutcome {
    /// Album directory after any rename
    pub final_dir: PathBuf,
    /// Entities whose collaborators failed
    pub failures: Vec<Diagnostic>,
    /// Flags still set after the confirming re-analysis
    pub unresolved: usize,
}

fn entity(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Bring the cover to `cover.jpg` at canonical size. Returns the cover's
/// final path when a cover exists.
fn coerce_cover(
    config: &RunConfig,
    collab: &Collaborators,
    album: &Album,
) -> Result<Option<PathBuf>> {
    let Some(cover) = &album.cover else {
        return Ok(None);
    };
    let dir = &album.path;
    let mut current = cover.path.clone();

    if cover.flags.contains(CoverFlags::RENAME) {
        let target = dir.join("cover.jpg");
        if target.exists() && target != current {
            // Some other file occupies the canonical name; swap it aside
            let displaced = dir.join("cover (intermediate).jpg");
            std::fs::rename(&target, &displaced)?;
        }
        info!(from = %current.display(), "renaming cover");
        std::fs::rename(&current, &target)?;
        current = target;
    }

    if cover.flags.contains(CoverFlags::RESIZE) {
        // The original stays next to the resized one
        let original = dir.join("Cover (larger).jpg");
        std::fs::rename(&current, &original)?;
        collab
            .images
            .resize_square(&original, &current, config.cover_edge, config.cover_quality)?;
    }

    Ok(Some(current))
}

/// All corrections of one track. Returns the track's final path.
fn coerce_track(
    config: &RunConfig,
    collab: &Collaborators,
    metadata_dir: &Path,
    metadata: &crate::model::CanonicalAlbumMetadata,
    track: &Track,
    cover_path: Option<&Path>,
) -> Result<PathBuf> {
    let mut current = track.path.clone();

    if track.flags.contains(TrackFlags::REENCODE) {
        let ext = track.audio.codec.target_extension();
        let temp = metadata_dir.join(format!("tmp.{ext}"));
        collab.transcoder.reencode(&current, &temp)?;
        let replacement = current.with_extension(ext);
        std::fs::remove_file(&current)?;
        std::fs::rename(&temp, &replacement)?;
        current = replacement;
    }

    if track.flags.contains(TrackFlags::RENAME) || current != track.path {
        let target = metadata_dir.join(track.good_file_name(metadata.numbering_width));
        if target != current {
            info!(from = %entity(&current), to = %entity(&target), "renaming track");
            std::fs::rename(&current, &target)?;
            current = target;
        }
    }

    if track.flags.contains(TrackFlags::REMARK) {
        collab.tags.write(
            &current,
            &CanonicalTagSet {
                title: track.title.clone(),
                artist: metadata.artist.clone(),
                album: metadata.title.clone(),
                composer: if config.unify_composer && !metadata.composer.is_empty() {
                    Some(metadata.composer.clone())
                } else {
                    None
                },
                number: track.number,
                numbering_width: metadata.numbering_width,
                track_total: metadata.track_total,
                year: metadata.year,
                genre: metadata.genre.clone(),
            },
        )?;
    }

    if track.flags.contains(TrackFlags::REPICTURE)
        && let Some(cover) = cover_path
    {
        let jpeg = collab.images.to_jpeg(cover, config.cover_quality)?;
        collab.tags.embed_picture(&current, &jpeg)?;
    }

    if track.flags.contains(TrackFlags::CLEAN_BLOCKS) {
        collab.transcoder.strip_obsolete_blocks(&current)?;
    }

    Ok(current)
}

/// Write a reconstructed cuesheet with index times accumulated from the
/// probed track durations.
fn recue(dir: &Path, album: &Album, final_paths: &[PathBuf]) -> Result<()> {
    let mut sections = Vec::new();
    let mut elapsed = 0.0f64;
    for (track, path) in album.tracks.iter().zip(final_paths) {
        sections.push(FileSection {
            file_name: entity(path),
            entries: vec![CueEntry {
                number: track.number,
                title: track.title.clone(),
                index00: None,
                index01: Some(cuesheet::format_index(elapsed)),
            }],
        });
        elapsed += track.audio.duration_secs;
    }
    let path = dir.join(format!("{}.cue", album.metadata.name));
    info!(cue = %path.display(), "reconstructing cuesheet");
    std::fs::write(path, cuesheet::render(&album.metadata, &sections))?;
    Ok(())
}

/// Apply every planned correction of an already analyzed album, then
/// re-analyze to confirm the fixed point.
pub fn coerce_album(
    config: &RunConfig,
    collab: &Collaborators,
    album: &Album,
) -> Result<CoerceOutcome> {
    let mut failures = Vec::new();

    let cover_path = match coerce_cover(config, collab, album) {
        Ok(path) => path,
        Err(err) => {
            warn!(album = %album.path.display(), error = %err, "cover coercion failed");
            failures.push(Diagnostic::collaborator(
                entity(&album.path),
                format!("cover: {err}"),
            ));
            album.cover.as_ref().map(|c| c.path.clone())
        }
    };

    let mut final_paths = Vec::with_capacity(album.tracks.len());
    let mut gain_flac = Vec::new();
    let mut gain_mp3 = Vec::new();
    for track in &album.tracks {
        match coerce_track(
            config,
            collab,
            &album.path,
            &album.metadata,
            track,
            cover_path.as_deref(),
        ) {
            Ok(path) => {
                if track.flags.contains(TrackFlags::REPLAY_GAIN) {
                    match track.audio.codec {
                        Codec::Mp3 => gain_mp3.push(path.clone()),
                        _ => gain_flac.push(path.clone()),
                    }
                }
                final_paths.push(path);
            }
            Err(err) => {
                warn!(file = %track.path.display(), error = %err, "track coercion failed");
                failures.push(Diagnostic::collaborator(entity(&track.path), err.to_string()));
                final_paths.push(track.path.clone());
            }
        }
    }

    if !config.skip_replay_gain {
        if let Err(err) = collab.replay_gain.add_replay_gain_flac(&gain_flac) {
            failures.push(Diagnostic::collaborator(entity(&album.path), err.to_string()));
        }
        if let Err(err) = collab.replay_gain.add_replay_gain_mp3(&gain_mp3) {
            failures.push(Diagnostic::collaborator(entity(&album.path), err.to_string()));
        }
    }

    // Directory rename comes late so every per-file path above stays valid
    let mut final_dir = album.path.clone();
    if album.flags.contains(AlbumFlags::RENAME) {
        let good = album
            .metadata
            .directory_name(config.single_album, config.unify_composer);
        if let Some(parent) = album.path.parent() {
            let target = parent.join(good);
            info!(from = %album.path.display(), to = %target.display(), "renaming album directory");
            std::fs::rename(&album.path, &target)?;
            // Re-anchor the track paths we collected
            final_paths = final_paths
                .iter()
                .map(|p| target.join(entity(p)))
                .collect();
            final_dir = target;
        }
    }

    if album.flags.contains(AlbumFlags::RECUE) && !album.tracks.is_empty() {
        if let Err(err) = recue(&final_dir, album, &final_paths) {
            failures.push(Diagnostic::collaborator(entity(&final_dir), err.to_string()));
        }
    }

    // Confirm the fixed point
    let recheck = album::analyze(config, collab, &final_dir)?;
    let unresolved = recheck
        .tracks
        .iter()
        .map(|t| t.flags.bits().count_ones() as usize)
        .sum::<usize>()
        + recheck.flags.bits().count_ones() as usize
        + recheck
            .cover
            .as_ref()
            .map(|c| c.flags.bits().count_ones() as usize)
            .unwrap_or(0);

    Ok(CoerceOutcome {
        final_dir,
        failures,
        unresolved,
    })
}
