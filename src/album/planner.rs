//! Correction-flag planning: pure comparison of observed state against the
//! canonical album metadata. Nothing here touches the filesystem; the flags
//! and diagnostics computed here drive both the report and the apply pass.

use chrono::Datelike;

use crate::config::RunConfig;
use crate::cuesheet::CuesheetDocument;
use crate::diagnostics::Diagnostic;
use crate::model::{AlbumFlags, CanonicalAlbumMetadata, Codec, Track, TrackFlags};
use crate::titling::safe_name;

fn entity(track: &Track) -> String {
    track
        .path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn remark(track: &mut Track, message: String) {
    track.flags |= TrackFlags::REMARK;
    let entity = entity(track);
    track.diagnostics.push(Diagnostic::mismatch(entity, message));
}

/// Compute the flags of one track.
///
/// `position` is the 1-based index in filename order; `expected_picture` is
/// the dimensions the embedded cover will have after the album cover is
/// coerced, or `None` when the album has no cover at all.
pub fn plan_track(
    config: &RunConfig,
    metadata: &CanonicalAlbumMetadata,
    track: &mut Track,
    position: usize,
    expected_picture: Option<(u32, u32)>,
) {
    if track.file_number != position {
        track.flags |= TrackFlags::MISNUMBERED;
    }

    if !track.audio.codec.is_canonical() || track.audio.sample_length == 0 {
        track.flags |= TrackFlags::REENCODE;
        if track.audio.sample_length == 0 {
            let e = entity(track);
            track
                .diagnostics
                .push(Diagnostic::structural(e, "stream reports zero samples"));
        }
    }

    let good_name = track.good_file_name(metadata.numbering_width);
    if entity(track) != good_name {
        track.flags |= TrackFlags::RENAME;
    }

    plan_track_tags(config, metadata, track);

    match (track.tag.has_picture, expected_picture) {
        (_, None) => {}
        (false, Some(_)) => {
            track.flags |= TrackFlags::REPICTURE;
        }
        (true, Some(expected)) => {
            if track.tag.picture_dimensions != Some(expected) {
                track.flags |= TrackFlags::REPICTURE;
            }
        }
    }

    if track.audio.has_obsolete_blocks {
        track.flags |= TrackFlags::CLEAN_BLOCKS;
    }

    if !config.skip_replay_gain {
        // mp3 gain headers cannot be trusted; always re-verify them
        if track.audio.codec == Codec::Mp3 || !track.tag.has_replay_gain {
            track.flags |= TrackFlags::REPLAY_GAIN;
        }
    }

    // Re-encoding invalidates tags, picture, and gain wholesale
    if track.audio.codec == Codec::Mp4 {
        track.flags |= TrackFlags::REMARK;
        if expected_picture.is_some() {
            track.flags |= TrackFlags::REPICTURE;
        }
        if !config.skip_replay_gain {
            track.flags |= TrackFlags::REPLAY_GAIN;
        }
    }
}

/// Mandatory-field reconciliation (the REMARK flag).
fn plan_track_tags(config: &RunConfig, metadata: &CanonicalAlbumMetadata, track: &mut Track) {
    for field in track.tag.duplicates.clone() {
        remark(track, format!("duplicate {field} field"));
    }

    if track.tag.title.as_deref() != Some(track.title.as_str()) {
        remark(
            track,
            format!(
                "title tag {:?} should be {:?}",
                track.tag.title.as_deref().unwrap_or(""),
                track.title
            ),
        );
    }

    // Compilation albums legitimately carry per-track artists
    let various = metadata.artist.to_lowercase() == "various artists";
    if !metadata.artist.is_empty() && !various {
        let matches = track
            .tag
            .artist
            .as_deref()
            .is_some_and(|a| safe_name(a) == safe_name(&metadata.artist));
        if !matches {
            remark(
                track,
                format!(
                    "artist tag {:?} should be {:?}",
                    track.tag.artist.as_deref().unwrap_or(""),
                    metadata.artist
                ),
            );
        }
    }

    if !metadata.name.is_empty() {
        let matches = track
            .tag
            .album
            .as_deref()
            .is_some_and(|a| safe_name(a) == metadata.name);
        if !matches {
            remark(
                track,
                format!(
                    "album tag {:?} should be {:?}",
                    track.tag.album.as_deref().unwrap_or(""),
                    metadata.title
                ),
            );
        }
    }

    if track.number > 0 {
        let expected = format!("{:0w$}", track.number, w = metadata.numbering_width);
        if track.tag.track_number.as_deref() != Some(expected.as_str()) {
            remark(
                track,
                format!(
                    "track number tag {:?} should be {:?}",
                    track.tag.track_number.as_deref().unwrap_or(""),
                    expected
                ),
            );
        }
    } else if track.tag.track_number.is_some() {
        remark(track, "track number will be removed".to_string());
    }

    if metadata.track_total > 0 {
        let observed: usize = track
            .tag
            .track_total
            .as_deref()
            .and_then(|s| s.trim().parse().ok())
            .unwrap_or(0);
        if observed != metadata.track_total {
            remark(
                track,
                format!("track total should be {}", metadata.track_total),
            );
        }
    }

    let now_year = chrono::Local::now().year();
    if metadata.year > 0 && metadata.year <= now_year {
        let observed = track
            .tag
            .date
            .as_deref()
            .and_then(|d| d.get(..4))
            .and_then(|y| y.parse::<i32>().ok());
        if observed != Some(metadata.year) {
            remark(track, format!("date should be {}", metadata.year));
        }
    }

    if !metadata.genre.is_empty() && track.tag.genre.as_deref() != Some(metadata.genre.as_str()) {
        remark(track, format!("genre should be {:?}", metadata.genre));
    }

    if config.unify_composer && !metadata.composer.is_empty() {
        if track.tag.composer.as_deref() != Some(metadata.composer.as_str()) {
            remark(track, format!("composer should be {:?}", metadata.composer));
        }
    }

    if track.tag.has_log_tag {
        remark(track, "parasitic ripping-log tag".to_string());
    }
}

/// Compute the album-level flags.
pub fn plan_album(
    config: &RunConfig,
    metadata: &CanonicalAlbumMetadata,
    album_dir_name: &str,
    cuesheet: Option<&CuesheetDocument>,
    many_cuesheets: bool,
    track_count: usize,
) -> AlbumFlags {
    let mut flags = AlbumFlags::empty();

    if !metadata.name.is_empty() {
        let good = metadata.directory_name(config.single_album, config.unify_composer);
        if album_dir_name != good {
            flags |= AlbumFlags::RENAME;
        }
    }

    let cue_ok = cuesheet.is_some_and(|doc| doc.is_usable() && doc.track_total == track_count);
    if !cue_ok || many_cuesheets {
        flags |= AlbumFlags::RECUE;
    }

    flags
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{FileConfig, Overrides, RunConfig};
    use crate::model::{AudioInfo, ObservedTag};
    use std::path::PathBuf;

    fn config() -> RunConfig {
        RunConfig::merge(
            &FileConfig::default(),
            PathBuf::from("/music"),
            false,
            false,
            false,
            false,
            None,
            Overrides::default(),
        )
        .unwrap()
    }

    fn metadata() -> CanonicalAlbumMetadata {
        CanonicalAlbumMetadata {
            title: "The Dark Side of the Moon".into(),
            name: "The Dark Side of the Moon".into(),
            artist: "Pink Floyd".into(),
            composer: String::new(),
            year: 1973,
            genre: "Rock".into(),
            track_total: 10,
            numbering_width: 2,
        }
    }

    fn canonical_track() -> Track {
        Track {
            path: PathBuf::from("/a/04. Time.flac"),
            file_number: 4,
            file_title: "Time".into(),
            tag: ObservedTag {
                title: Some("Time".into()),
                artist: Some("Pink Floyd".into()),
                album: Some("The Dark Side of the Moon".into()),
                track_number: Some("04".into()),
                track_total: Some("10".into()),
                date: Some("1973".into()),
                genre: Some("Rock".into()),
                has_picture: true,
                picture_dimensions: Some((1000, 1000)),
                has_replay_gain: true,
                ..Default::default()
            },
            audio: AudioInfo {
                codec: Codec::Flac,
                sample_length: 1_000_000,
                duration_secs: 421.0,
                has_obsolete_blocks: false,
            },
            number: 4,
            title: "Time".into(),
            flags: TrackFlags::empty(),
            diagnostics: Vec::new(),
        }
    }

    #[test]
    fn test_canonical_track_has_no_flags() {
        let mut track = canonical_track();
        plan_track(&config(), &metadata(), &mut track, 4, Some((1000, 1000)));
        assert!(track.flags.is_empty(), "flags: {:?}", track.flags);
        assert!(track.diagnostics.is_empty());
    }

    #[test]
    fn test_tag_number_disagreement_is_a_tag_fix() {
        let mut track = canonical_track();
        track.tag.track_number = Some("07".into());
        plan_track(&config(), &metadata(), &mut track, 4, Some((1000, 1000)));
        assert!(track.flags.contains(TrackFlags::REMARK));
        assert!(!track.flags.contains(TrackFlags::MISNUMBERED));
    }

    #[test]
    fn test_wrong_width_number_tag() {
        let mut track = canonical_track();
        track.tag.track_number = Some("4".into());
        plan_track(&config(), &metadata(), &mut track, 4, Some((1000, 1000)));
        assert!(track.flags.contains(TrackFlags::REMARK));
        assert!(!track.flags.contains(TrackFlags::RENAME));
    }

    #[test]
    fn test_wrong_filename_triggers_rename() {
        let mut track = canonical_track();
        track.path = PathBuf::from("/a/04 - time.flac");
        plan_track(&config(), &metadata(), &mut track, 4, Some((1000, 1000)));
        assert!(track.flags.contains(TrackFlags::RENAME));
    }

    #[test]
    fn test_misnumbered_position() {
        let mut track = canonical_track();
        plan_track(&config(), &metadata(), &mut track, 5, Some((1000, 1000)));
        assert!(track.flags.contains(TrackFlags::MISNUMBERED));
    }

    #[test]
    fn test_various_artists_skips_artist_check() {
        let mut meta = metadata();
        meta.artist = "Various Artists".into();
        let mut track = canonical_track();
        track.tag.artist = Some("Some Guest".into());
        plan_track(&config(), &meta, &mut track, 4, Some((1000, 1000)));
        assert!(!track.flags.contains(TrackFlags::REMARK));
    }

    #[test]
    fn test_mp4_forces_reencode_cascade() {
        let mut track = canonical_track();
        track.audio.codec = Codec::Mp4;
        track.path = PathBuf::from("/a/04. Time.m4a");
        plan_track(&config(), &metadata(), &mut track, 4, Some((1000, 1000)));
        assert!(track.flags.contains(TrackFlags::REENCODE));
        assert!(track.flags.contains(TrackFlags::REMARK));
        assert!(track.flags.contains(TrackFlags::REPICTURE));
        assert!(track.flags.contains(TrackFlags::REPLAY_GAIN));
        // renaming targets the .flac it will become
        assert!(track.flags.contains(TrackFlags::RENAME));
    }

    #[test]
    fn test_zero_samples_triggers_reencode() {
        let mut track = canonical_track();
        track.audio.sample_length = 0;
        plan_track(&config(), &metadata(), &mut track, 4, Some((1000, 1000)));
        assert!(track.flags.contains(TrackFlags::REENCODE));
    }

    #[test]
    fn test_stale_picture_triggers_repicture() {
        let mut track = canonical_track();
        track.tag.picture_dimensions = Some((500, 500));
        plan_track(&config(), &metadata(), &mut track, 4, Some((1000, 1000)));
        assert!(track.flags.contains(TrackFlags::REPICTURE));
    }

    #[test]
    fn test_no_cover_no_picture_requirement() {
        let mut track = canonical_track();
        track.tag.has_picture = false;
        plan_track(&config(), &metadata(), &mut track, 4, None);
        assert!(!track.flags.contains(TrackFlags::REPICTURE));
    }

    #[test]
    fn test_mp3_always_reverifies_gain() {
        let mut track = canonical_track();
        track.audio.codec = Codec::Mp3;
        track.path = PathBuf::from("/a/04. Time.mp3");
        track.tag.has_replay_gain = true;
        plan_track(&config(), &metadata(), &mut track, 4, Some((1000, 1000)));
        assert!(track.flags.contains(TrackFlags::REPLAY_GAIN));
    }

    #[test]
    fn test_unnumbered_track_number_removal() {
        let mut track = canonical_track();
        track.number = 0;
        track.path = PathBuf::from("/a/Time.flac");
        track.file_number = 0;
        plan_track(&config(), &metadata(), &mut track, 4, Some((1000, 1000)));
        assert!(track.flags.contains(TrackFlags::REMARK));
        assert!(
            track
                .diagnostics
                .iter()
                .any(|d| d.message.contains("will be removed"))
        );
    }

    #[test]
    fn test_log_tag_flagged() {
        let mut track = canonical_track();
        track.tag.has_log_tag = true;
        plan_track(&config(), &metadata(), &mut track, 4, Some((1000, 1000)));
        assert!(track.flags.contains(TrackFlags::REMARK));
    }

    #[test]
    fn test_album_rename_flag() {
        let flags = plan_album(
            &config(),
            &metadata(),
            "1973 - The Dark Side of the Moon",
            Some(&CuesheetDocument {
                track_total: 10,
                entries: (1..=10)
                    .map(|i| crate::model::CueEntry {
                        number: i,
                        title: format!("T{i}"),
                        index00: None,
                        index01: None,
                    })
                    .collect(),
                ..Default::default()
            }),
            false,
            10,
        );
        assert!(flags.is_empty());

        let flags = plan_album(&config(), &metadata(), "wrong name", None, false, 10);
        assert!(flags.contains(AlbumFlags::RENAME));
        assert!(flags.contains(AlbumFlags::RECUE));
    }

    #[test]
    fn test_ambiguous_cuesheets_force_recue() {
        let doc = CuesheetDocument {
            track_total: 1,
            entries: vec![crate::model::CueEntry {
                number: 1,
                title: "T".into(),
                index00: None,
                index01: None,
            }],
            ..Default::default()
        };
        let flags = plan_album(
            &config(),
            &metadata(),
            "1973 - The Dark Side of the Moon",
            Some(&doc),
            true,
            1,
        );
        assert!(flags.contains(AlbumFlags::RECUE));
    }
}
