//! Reporting: rendering analysis results as text or JSON.
//!
//! Reports are plain data built once from the analyzed albums, so the text
//! and JSON renderings can never drift apart.

use serde::Serialize;

use crate::diagnostics::Diagnostic;
use crate::model::Album;

/// Output format selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportFormat {
    Text,
    Json,
}

/// Overall verdict of one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    /// Every album is already canonical
    AllOk,
    /// At least one album has corrections the apply pass can perform
    Solvable,
    /// At least one album needs manual attention first
    Critical,
}

#[derive(Debug, Serialize)]
pub struct TrackReport {
    pub file: String,
    pub number: usize,
    pub title: String,
    pub actions: Vec<&'static str>,
    pub diagnostics: Vec<Diagnostic>,
}

#[derive(Debug, Serialize)]
pub struct AlbumReport {
    pub path: String,
    pub title: String,
    pub artist: String,
    pub year: i32,
    pub track_total: usize,
    pub ok: bool,
    pub critical: bool,
    pub actions: Vec<&'static str>,
    pub cover_actions: Vec<&'static str>,
    pub tracks: Vec<TrackReport>,
    pub diagnostics: Vec<Diagnostic>,
}

impl AlbumReport {
    pub fn from_album(album: &Album) -> Self {
        Self {
            path: album.path.display().to_string(),
            title: album.metadata.title.clone(),
            artist: album.metadata.artist.clone(),
            year: album.metadata.year,
            track_total: album.metadata.track_total,
            ok: album.is_ok(),
            critical: album.is_critical(),
            actions: album.flags.descriptions(),
            cover_actions: album
                .cover
                .as_ref()
                .map(|c| c.flags.descriptions())
                .unwrap_or_default(),
            tracks: album
                .tracks
                .iter()
                .map(|t| TrackReport {
                    file: t
                        .path
                        .file_name()
                        .map(|n| n.to_string_lossy().into_owned())
                        .unwrap_or_default(),
                    number: t.number,
                    title: t.title.clone(),
                    actions: t.flags.descriptions(),
                    diagnostics: t.diagnostics.clone(),
                })
                .collect(),
            diagnostics: album.diagnostics.clone(),
        }
    }

    fn needs_attention(&self) -> bool {
        !self.ok
    }
}

#[derive(Debug, Serialize)]
pub struct RunReport {
    pub verdict: Verdict,
    pub albums: Vec<AlbumReport>,
    /// Multi-disc directories pending flattening
    pub complex_albums: Vec<String>,
    /// Directories that hold audio but did not classify as albums
    pub unclassified: Vec<String>,
}

impl RunReport {
    pub fn new(
        albums: Vec<AlbumReport>,
        complex_albums: Vec<String>,
        unclassified: Vec<String>,
    ) -> Self {
        let verdict = if albums.iter().any(|a| a.critical) {
            Verdict::Critical
        } else if albums.iter().any(AlbumReport::needs_attention) || !complex_albums.is_empty() {
            Verdict::Solvable
        } else {
            Verdict::AllOk
        };
        Self {
            verdict,
            albums,
            complex_albums,
            unclassified,
        }
    }

    pub fn render(&self, format: ReportFormat) -> String {
        match format {
            ReportFormat::Text => self.render_text(),
            ReportFormat::Json => {
                // Serialization of these plain structs cannot fail
                serde_json::to_string_pretty(self).unwrap_or_default()
            }
        }
    }

    fn render_text(&self) -> String {
        let mut out = String::new();
        for album in &self.albums {
            if album.ok {
                out.push_str(&format!("OK       {}\n", album.path));
                continue;
            }
            let marker = if album.critical { "CRITICAL" } else { "FIX" };
            out.push_str(&format!("{marker:8} {}\n", album.path));
            let header = match (album.year, album.artist.is_empty()) {
                (0, true) => album.title.clone(),
                (0, false) => format!("{} - {}", album.artist, album.title),
                (y, true) => format!("{y} - {}", album.title),
                (y, false) => format!("{} - {y} - {}", album.artist, album.title),
            };
            out.push_str(&format!("         {header} ({} tracks)\n", album.track_total));
            for action in &album.actions {
                out.push_str(&format!("         * {action}\n"));
            }
            for action in &album.cover_actions {
                out.push_str(&format!("         * cover {action}\n"));
            }
            for track in &self.flagged_tracks(album) {
                out.push_str(&format!(
                    "         - {}: {}\n",
                    track.file,
                    track.actions.join(", ")
                ));
            }
            for diag in album
                .diagnostics
                .iter()
                .chain(album.tracks.iter().flat_map(|t| t.diagnostics.iter()))
            {
                out.push_str(&format!("         ! {diag}\n"));
            }
        }
        for dir in &self.complex_albums {
            out.push_str(&format!("MULTI    {dir} (multi-disc, will be flattened)\n"));
        }
        for dir in &self.unclassified {
            out.push_str(&format!("SKIPPED  {dir} (not an album)\n"));
        }
        out.push_str(&format!("\nverdict: {}\n", self.verdict_line()));
        out
    }

    fn flagged_tracks<'a>(&self, album: &'a AlbumReport) -> Vec<&'a TrackReport> {
        album.tracks.iter().filter(|t| !t.actions.is_empty()).collect()
    }

    fn verdict_line(&self) -> &'static str {
        match self.verdict {
            Verdict::AllOk => "all albums canonical",
            Verdict::Solvable => "corrections pending, run `coerce` to apply",
            Verdict::Critical => "manual attention needed",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{
        AlbumFlags, AudioInfo, CanonicalAlbumMetadata, Codec, ObservedTag, Track, TrackFlags,
    };
    use std::path::PathBuf;

    fn track(number: usize, title: &str, flags: TrackFlags) -> Track {
        Track {
            path: PathBuf::from(format!("{number:02}. {title}.flac")),
            file_number: number,
            file_title: title.to_string(),
            tag: ObservedTag::default(),
            audio: AudioInfo {
                codec: Codec::Flac,
                sample_length: 44100,
                duration_secs: 1.0,
                has_obsolete_blocks: false,
            },
            number,
            title: title.to_string(),
            flags,
            diagnostics: Vec::new(),
        }
    }

    fn album(flags: AlbumFlags, track_flags: TrackFlags) -> Album {
        Album {
            path: PathBuf::from("/music/Rush/1981 - Moving Pictures"),
            metadata: CanonicalAlbumMetadata {
                title: "Moving Pictures".into(),
                name: "Moving Pictures".into(),
                artist: "Rush".into(),
                year: 1981,
                track_total: 1,
                numbering_width: 1,
                ..Default::default()
            },
            tracks: vec![track(1, "Tom Sawyer", track_flags)],
            cover: None,
            cuesheet: None,
            cuesheet_path: None,
            many_cuesheets: false,
            flags,
            diagnostics: Vec::new(),
        }
    }

    #[test]
    fn test_verdict_solvable() {
        let a = album(AlbumFlags::RECUE, TrackFlags::RENAME);
        let report = RunReport::new(vec![AlbumReport::from_album(&a)], vec![], vec![]);
        assert_eq!(report.verdict, Verdict::Solvable);
        let text = report.render(ReportFormat::Text);
        assert!(text.contains("FIX"));
        assert!(text.contains("cuesheet needs reconstruction"));
        assert!(text.contains("01. Tom Sawyer.flac: needs renaming"));
        assert!(text.contains("run `coerce` to apply"));
    }

    #[test]
    fn test_verdict_critical_wins() {
        let mut bad = album(AlbumFlags::empty(), TrackFlags::empty());
        bad.tracks.clear();
        bad.metadata = CanonicalAlbumMetadata::default();
        let good = album(AlbumFlags::RENAME, TrackFlags::empty());
        let report = RunReport::new(
            vec![AlbumReport::from_album(&bad), AlbumReport::from_album(&good)],
            vec![],
            vec![],
        );
        assert_eq!(report.verdict, Verdict::Critical);
        assert!(report.render(ReportFormat::Text).contains("CRITICAL"));
    }

    #[test]
    fn test_unclassified_listed() {
        let report = RunReport::new(vec![], vec![], vec!["/music/randomfiles".into()]);
        assert_eq!(report.verdict, Verdict::AllOk);
        let text = report.render(ReportFormat::Text);
        assert!(text.contains("SKIPPED  /music/randomfiles"));
    }

    #[test]
    fn test_json_shape() {
        let a = album(AlbumFlags::RENAME, TrackFlags::REMARK);
        let report = RunReport::new(vec![AlbumReport::from_album(&a)], vec![], vec![]);
        let json = report.render(ReportFormat::Json);
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["verdict"], "solvable");
        assert_eq!(value["albums"][0]["title"], "Moving Pictures");
        assert_eq!(
            value["albums"][0]["tracks"][0]["actions"][0],
            "needs re-tagging"
        );
    }
}
