//! Core domain types: tracks, albums, covers, and their correction flags.
//!
//! Flags encode pending corrective actions, one bitflags set per entity kind.
//! `.is_empty()` means the entity is already in canonical form. Planning sets
//! flags; the apply pass clears them by performing the actions.

use std::path::PathBuf;

use bitflags::bitflags;

use crate::diagnostics::Diagnostic;

bitflags! {
    /// Pending corrective actions for one audio file.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct TrackFlags: u32 {
        /// Filename number disagrees with the file's position. A tag number
        /// disagreeing with the assigned number is a tag fix (REMARK).
        const MISNUMBERED = 1 << 0;
        /// Codec not in the canonical set, or stream is unreadable
        const REENCODE = 1 << 1;
        /// Filename differs from the canonical `NN. Title.ext`
        const RENAME = 1 << 2;
        /// One or more tag fields need rewriting
        const REMARK = 1 << 3;
        /// Replay-gain fields absent or unverified
        const REPLAY_GAIN = 1 << 4;
        /// Embedded cover missing or stale
        const REPICTURE = 1 << 5;
        /// Obsolete FLAC blocks (seektable, application, oversized padding)
        const CLEAN_BLOCKS = 1 << 6;
    }
}

impl TrackFlags {
    /// Human-readable descriptions of all set flags.
    pub fn descriptions(&self) -> Vec<&'static str> {
        let mut descs = Vec::new();
        if self.contains(Self::MISNUMBERED) {
            descs.push("misnumbered");
        }
        if self.contains(Self::REENCODE) {
            descs.push("needs re-encoding");
        }
        if self.contains(Self::RENAME) {
            descs.push("needs renaming");
        }
        if self.contains(Self::REMARK) {
            descs.push("needs re-tagging");
        }
        if self.contains(Self::REPLAY_GAIN) {
            descs.push("needs replay gain");
        }
        if self.contains(Self::REPICTURE) {
            descs.push("needs embedded cover");
        }
        if self.contains(Self::CLEAN_BLOCKS) {
            descs.push("has obsolete blocks");
        }
        descs
    }
}

bitflags! {
    /// Pending corrective actions for the album cover image.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct CoverFlags: u32 {
        /// Name is not `cover.jpg`
        const RENAME = 1 << 0;
        /// Oversized, non-square, or over-quality
        const RESIZE = 1 << 1;
    }
}

impl CoverFlags {
    /// Human-readable descriptions of all set flags.
    pub fn descriptions(&self) -> Vec<&'static str> {
        let mut descs = Vec::new();
        if self.contains(Self::RENAME) {
            descs.push("needs renaming");
        }
        if self.contains(Self::RESIZE) {
            descs.push("needs resizing");
        }
        descs
    }
}

bitflags! {
    /// Pending corrective actions for the album directory.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct AlbumFlags: u32 {
        /// Directory name differs from the canonical form
        const RENAME = 1 << 0;
        /// Cuesheet missing, empty, ambiguous, or inconsistent with the files
        const RECUE = 1 << 1;
    }
}

impl AlbumFlags {
    /// Human-readable descriptions of all set flags.
    pub fn descriptions(&self) -> Vec<&'static str> {
        let mut descs = Vec::new();
        if self.contains(Self::RENAME) {
            descs.push("directory needs renaming");
        }
        if self.contains(Self::RECUE) {
            descs.push("cuesheet needs reconstruction");
        }
        descs
    }
}

/// Audio codec of a track, as probed from the stream (never from the
/// extension alone).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Codec {
    Flac,
    Mp3,
    /// AAC or ALAC in an MP4 container; always re-encoded to FLAC
    Mp4,
    Unknown,
}

impl Codec {
    /// Canonical file extension for this codec after coercion.
    pub fn target_extension(&self) -> &'static str {
        match self {
            Codec::Mp3 => "mp3",
            // MP4 audio is re-encoded, so its target is flac
            _ => "flac",
        }
    }

    /// Codecs that stay as they are; anything else triggers REENCODE.
    pub fn is_canonical(&self) -> bool {
        matches!(self, Codec::Flac | Codec::Mp3)
    }
}

/// Raw tag values observed on a file, before reconciliation.
///
/// Values are kept as raw strings so width anomalies ("3" vs "03") stay
/// visible. `duplicates` lists field names that occur more than once.
#[derive(Debug, Clone, Default)]
pub struct ObservedTag {
    pub title: Option<String>,
    pub artist: Option<String>,
    pub album: Option<String>,
    pub composer: Option<String>,
    /// Raw track-number string (width matters)
    pub track_number: Option<String>,
    pub track_total: Option<String>,
    pub date: Option<String>,
    pub genre: Option<String>,
    /// Field names present more than once
    pub duplicates: Vec<String>,
    /// An embedded picture exists
    pub has_picture: bool,
    /// Dimensions of the first embedded picture, when decodable
    pub picture_dimensions: Option<(u32, u32)>,
    /// A parasitic `LOG=` ripping-log tag is present
    pub has_log_tag: bool,
    /// The replay-gain fields for the file's format are all present
    pub has_replay_gain: bool,
}

impl ObservedTag {
    /// Track number parsed as an integer, 0 when absent or non-numeric.
    pub fn number(&self) -> usize {
        self.track_number
            .as_deref()
            .and_then(|s| s.trim().parse().ok())
            .unwrap_or(0)
    }
}

/// Low-level stream facts from the audio prober.
#[derive(Debug, Clone)]
pub struct AudioInfo {
    pub codec: Codec,
    /// Total samples; zero means the stream header is broken
    pub sample_length: u64,
    pub duration_secs: f64,
    /// FLAC only: seektable/application blocks or oversized padding
    pub has_obsolete_blocks: bool,
}

/// One entry of a cuesheet: the canonical identity of a track.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CueEntry {
    /// 1-based position
    pub number: usize,
    /// Coerced title
    pub title: String,
    /// Captured `INDEX 00` timestamp, verbatim
    pub index00: Option<String>,
    /// Captured `INDEX 01` timestamp, verbatim
    pub index01: Option<String>,
}

/// Canonical album-level metadata after inference.
///
/// Immutable once resolved; empty strings mean the field stayed unresolved.
#[derive(Debug, Clone, Default)]
pub struct CanonicalAlbumMetadata {
    /// Display title
    pub title: String,
    /// Filesystem-safe title
    pub name: String,
    pub artist: String,
    pub composer: String,
    /// 0 when unresolved (e.g. Misc directories)
    pub year: i32,
    pub genre: String,
    pub track_total: usize,
    /// Digit count of `track_total`; zero-pad track numbers to this width
    pub numbering_width: usize,
}

impl CanonicalAlbumMetadata {
    /// Canonical directory name: `YYYY - Name`, or just the name when the
    /// year is unknown. In single-album mode the performer is prefixed.
    pub fn directory_name(&self, single_album: bool, prefer_composer: bool) -> String {
        let base = if self.year > 0 {
            format!("{:04} - {}", self.year, self.name)
        } else {
            self.name.clone()
        };
        if single_album && self.title != "Misc" {
            let performer = if prefer_composer && !self.composer.is_empty() {
                &self.composer
            } else {
                &self.artist
            };
            if !performer.is_empty() {
                return format!("{} - {}", crate::titling::safe_name(performer), base);
            }
        }
        base
    }
}

/// One audio file of an album.
#[derive(Debug, Clone)]
pub struct Track {
    pub path: PathBuf,
    /// Number parsed from the filename prefix, 0 when absent
    pub file_number: usize,
    /// Filename with number prefix and extension stripped
    pub file_title: String,
    pub tag: ObservedTag,
    pub audio: AudioInfo,
    /// Canonical number after matching (1-based), 0 to drop numbering
    pub number: usize,
    /// Canonical title after matching
    pub title: String,
    pub flags: TrackFlags,
    pub diagnostics: Vec<Diagnostic>,
}

impl Track {
    pub fn is_ok(&self) -> bool {
        self.flags.is_empty()
    }

    /// Canonical filename `NN. Title.ext` (no number part when number is 0).
    pub fn good_file_name(&self, width: usize) -> String {
        let safe = crate::titling::safe_name(&self.title);
        let ext = self.audio.codec.target_extension();
        if self.number > 0 {
            format!("{:0w$}. {}.{}", self.number, safe, ext, w = width)
        } else {
            format!("{safe}.{ext}")
        }
    }
}

/// An image found in the album directory, scored for cover suitability.
#[derive(Debug, Clone)]
pub struct CoverImage {
    pub path: PathBuf,
    pub width: u32,
    pub height: u32,
    /// JPEG quality estimate; probers that cannot read it report 80
    pub quality: u32,
    pub suitability: f64,
    pub flags: CoverFlags,
}

impl CoverImage {
    pub fn is_ok(&self) -> bool {
        self.flags.is_empty()
    }
}

/// A fully analyzed album directory.
#[derive(Debug)]
pub struct Album {
    pub path: PathBuf,
    pub metadata: CanonicalAlbumMetadata,
    pub tracks: Vec<Track>,
    pub cover: Option<CoverImage>,
    /// The selected cuesheet, when one parsed
    pub cuesheet: Option<crate::cuesheet::CuesheetDocument>,
    pub cuesheet_path: Option<PathBuf>,
    /// More than one cuesheet candidate was present
    pub many_cuesheets: bool,
    pub flags: AlbumFlags,
    pub diagnostics: Vec<Diagnostic>,
}

impl Album {
    /// The album is fully canonical: nothing to rename, re-cue, re-tag, or
    /// re-encode, cover present and correct.
    pub fn is_ok(&self) -> bool {
        !self.metadata.name.is_empty()
            && self.flags.is_empty()
            && !self.many_cuesheets
            && self.cuesheet.is_some()
            && self.metadata.track_total > 0
            && self.tracks.iter().all(Track::is_ok)
            && self.cover.as_ref().is_some_and(CoverImage::is_ok)
    }

    /// No classified tracks, or all album metadata unresolved. Critical
    /// albums are reported and skipped by the apply pass.
    pub fn is_critical(&self) -> bool {
        self.tracks.is_empty()
            || (self.metadata.title.is_empty()
                && self.metadata.artist.is_empty()
                && self.metadata.year == 0)
    }

    /// There is at least one action the apply pass could take.
    pub fn has_something_to_do(&self) -> bool {
        if self.is_ok() || self.is_critical() {
            return false;
        }
        self.flags.contains(AlbumFlags::RENAME)
            || self.tracks.iter().any(|t| !t.is_ok())
            || self.cover.as_ref().is_some_and(|c| !c.is_ok())
            || (self.flags.contains(AlbumFlags::RECUE) && !self.tracks.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn audio(codec: Codec) -> AudioInfo {
        AudioInfo {
            codec,
            sample_length: 44100,
            duration_secs: 1.0,
            has_obsolete_blocks: false,
        }
    }

    fn track(number: usize, title: &str, codec: Codec) -> Track {
        Track {
            path: PathBuf::from("x"),
            file_number: number,
            file_title: title.to_string(),
            tag: ObservedTag::default(),
            audio: audio(codec),
            number,
            title: title.to_string(),
            flags: TrackFlags::empty(),
            diagnostics: Vec::new(),
        }
    }

    #[test]
    fn test_good_file_name_padding() {
        let t = track(3, "Time", Codec::Flac);
        assert_eq!(t.good_file_name(2), "03. Time.flac");
        assert_eq!(t.good_file_name(1), "3. Time.flac");
    }

    #[test]
    fn test_good_file_name_unnumbered() {
        let mut t = track(0, "Hidden Track", Codec::Mp3);
        t.number = 0;
        assert_eq!(t.good_file_name(2), "Hidden Track.mp3");
    }

    #[test]
    fn test_good_file_name_mp4_targets_flac() {
        let t = track(1, "Intro", Codec::Mp4);
        assert_eq!(t.good_file_name(1), "1. Intro.flac");
    }

    #[test]
    fn test_good_file_name_sanitizes_title() {
        let t = track(1, "AC/DC Cover", Codec::Flac);
        assert_eq!(t.good_file_name(1), "1. AC∕DC Cover.flac");
    }

    #[test]
    fn test_directory_name_forms() {
        let meta = CanonicalAlbumMetadata {
            title: "Moving Pictures".into(),
            name: "Moving Pictures".into(),
            artist: "Rush".into(),
            year: 1981,
            track_total: 7,
            numbering_width: 1,
            ..Default::default()
        };
        assert_eq!(meta.directory_name(false, false), "1981 - Moving Pictures");
        assert_eq!(meta.directory_name(true, false), "Rush - 1981 - Moving Pictures");
    }

    #[test]
    fn test_directory_name_prefers_composer() {
        let meta = CanonicalAlbumMetadata {
            title: "Symphonies".into(),
            name: "Symphonies".into(),
            artist: "Berliner Philharmoniker".into(),
            composer: "Brahms".into(),
            year: 0,
            ..Default::default()
        };
        assert_eq!(meta.directory_name(true, true), "Brahms - Symphonies");
        assert_eq!(meta.directory_name(true, false), "Berliner Philharmoniker - Symphonies");
    }

    #[test]
    fn test_misc_directory_never_prefixed() {
        let meta = CanonicalAlbumMetadata {
            title: "Misc".into(),
            name: "Misc".into(),
            artist: "Somebody".into(),
            year: 0,
            ..Default::default()
        };
        assert_eq!(meta.directory_name(true, false), "Misc");
    }

    #[test]
    fn test_flag_descriptions() {
        let flags = TrackFlags::RENAME | TrackFlags::REMARK;
        let descs = flags.descriptions();
        assert!(descs.contains(&"needs renaming"));
        assert!(descs.contains(&"needs re-tagging"));
        assert_eq!(descs.len(), 2);
    }

    #[test]
    fn test_observed_tag_number() {
        let tag = ObservedTag {
            track_number: Some("03".into()),
            ..Default::default()
        };
        assert_eq!(tag.number(), 3);
        assert_eq!(ObservedTag::default().number(), 0);
    }

    #[test]
    fn test_critical_album_detection() {
        let album = Album {
            path: PathBuf::from("a"),
            metadata: CanonicalAlbumMetadata::default(),
            tracks: vec![],
            cover: None,
            cuesheet: None,
            cuesheet_path: None,
            many_cuesheets: false,
            flags: AlbumFlags::empty(),
            diagnostics: vec![],
        };
        assert!(album.is_critical());
        assert!(!album.has_something_to_do());
    }
}
