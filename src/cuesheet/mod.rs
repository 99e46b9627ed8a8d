//! Cuesheet parsing and synthesis.
//!
//! One parser serves both the single-album path and the complex-album merge
//! path. Parsing is keyword-driven rather than line-structured: header fields
//! come from the first textual occurrence of their keyword, the track total
//! from the last `TRACK` keyword, and entries from a sequential walk over
//! `TRACK` blocks. Anomalies become diagnostics, never hard errors; an
//! incomplete document is still usable for inference.
//!
//! Loading (including charset fallback) is the caller's concern; the parser
//! takes `&str`.

pub mod merge;

use crate::diagnostics::Diagnostic;
use crate::model::{CanonicalAlbumMetadata, CueEntry};
use crate::titling::{CapsMode, coerce_title, split_numbered_stem};

/// Highest track total accepted from a cuesheet.
const MAX_TRACK_TOTAL: usize = 9999;

/// A parsed cuesheet.
#[derive(Debug, Clone, Default)]
pub struct CuesheetDocument {
    /// Album title, coerced
    pub title: String,
    /// PERFORMER header, verbatim
    pub performer: String,
    /// REM COMPOSER header, verbatim (empty unless composer checking is on)
    pub composer: String,
    /// REM DATE header, 0 when absent or non-numeric
    pub year: i32,
    /// REM GENRE header, verbatim
    pub genre: String,
    /// Declared track count (from the last TRACK keyword)
    pub track_total: usize,
    pub entries: Vec<CueEntry>,
    /// Fewer entries parsed than declared; advisory only
    pub incomplete: bool,
}

impl CuesheetDocument {
    /// The document carries enough structure to drive track matching.
    pub fn is_usable(&self) -> bool {
        self.track_total > 0 && self.entries.len() == self.track_total
    }
}

/// Value of a keyword line: the remainder of the line, trimmed, CR-stripped,
/// unquoted when it starts with a double quote.
fn line_value(text: &str, start: usize) -> String {
    let line = text[start..].split('\n').next().unwrap_or("");
    let mut value = line.trim().trim_end_matches('\r').trim().to_string();
    if value.starts_with('"') {
        value.remove(0);
        value.pop();
        value = value.trim().to_string();
    }
    value
}

/// First-occurrence header field lookup.
fn header_value(text: &str, keyword: &str) -> Option<String> {
    text.find(keyword)
        .map(|pos| line_value(text, pos + keyword.len()))
}

/// Parse cuesheet text.
///
/// `entity` names the source file for diagnostics. `with_composer` controls
/// whether the `REM COMPOSER` header is read at all.
pub fn parse(
    text: &str,
    entity: &str,
    mode: CapsMode,
    with_composer: bool,
    diagnostics: &mut Vec<Diagnostic>,
) -> CuesheetDocument {
    let mut doc = CuesheetDocument {
        title: coerce_title(&header_value(text, "TITLE ").unwrap_or_default(), mode),
        performer: header_value(text, "PERFORMER ").unwrap_or_default(),
        genre: header_value(text, "REM GENRE ").unwrap_or_default(),
        ..Default::default()
    };
    if with_composer {
        doc.composer = header_value(text, "REM COMPOSER ").unwrap_or_default();
    }
    if let Some(date) = header_value(text, "REM DATE ") {
        match date.parse::<i32>() {
            Ok(year) => doc.year = year,
            Err(_) if !date.is_empty() => {
                diagnostics.push(Diagnostic::parse(
                    entity,
                    format!("non-numeric REM DATE '{date}'"),
                ));
            }
            Err(_) => {}
        }
    }

    doc.track_total = declared_track_total(text, entity, diagnostics);
    doc.entries = walk_entries(text, entity, mode, doc.track_total, diagnostics);
    doc.incomplete = doc.entries.len() != doc.track_total;
    if doc.incomplete {
        diagnostics.push(Diagnostic::note(
            entity,
            format!(
                "parsed {} of {} declared tracks",
                doc.entries.len(),
                doc.track_total
            ),
        ));
    }
    doc
}

/// Track total from the number of the LAST `TRACK` keyword.
fn declared_track_total(text: &str, entity: &str, diagnostics: &mut Vec<Diagnostic>) -> usize {
    let Some(pos) = text.rfind("TRACK ") else {
        return 0;
    };
    let token: String = text[pos + "TRACK ".len()..]
        .chars()
        .take_while(|c| !c.is_whitespace())
        .collect();
    match token.parse::<usize>() {
        Ok(total) if (1..=MAX_TRACK_TOTAL).contains(&total) => total,
        Ok(total) => {
            diagnostics.push(Diagnostic::parse(
                entity,
                format!("track total {total} out of range"),
            ));
            0
        }
        Err(_) => {
            diagnostics.push(Diagnostic::parse(
                entity,
                format!("non-numeric track total '{token}'"),
            ));
            0
        }
    }
}

/// Sequential walk over `TRACK` blocks.
///
/// A block's title comes from its own `TITLE` line when present, otherwise
/// from the nearest preceding `FILE "…" WAVE` reference with the numeric
/// prefix and extension stripped.
fn walk_entries(
    text: &str,
    entity: &str,
    mode: CapsMode,
    track_total: usize,
    diagnostics: &mut Vec<Diagnostic>,
) -> Vec<CueEntry> {
    let mut entries = Vec::new();
    let mut cursor = 0usize;
    for i in 0..track_total {
        let Some(rel) = text[cursor..].find("TRACK ") else {
            break;
        };
        let pos = cursor + rel;
        let after = pos + "TRACK ".len();
        let token: String = text[after..]
            .chars()
            .take_while(|c| !c.is_whitespace())
            .collect();
        let Ok(declared) = token.parse::<usize>() else {
            diagnostics.push(Diagnostic::parse(
                entity,
                format!("non-numeric track number '{token}'"),
            ));
            break;
        };
        if declared != i + 1 {
            diagnostics.push(Diagnostic::parse(
                entity,
                format!("track {declared} out of sequence, expected {}", i + 1),
            ));
        }

        let block_end = text[after..]
            .find("TRACK ")
            .map(|r| after + r)
            .unwrap_or(text.len());
        let block = &text[after..block_end];

        let raw_title = match block.find("TITLE ") {
            Some(tp) => line_value(block, tp + "TITLE ".len()),
            None => file_reference_title(&text[..pos]),
        };

        entries.push(CueEntry {
            number: i + 1,
            title: coerce_title(&raw_title, mode),
            index00: block
                .find("INDEX 00 ")
                .map(|p| line_value(block, p + "INDEX 00 ".len())),
            index01: block
                .find("INDEX 01 ")
                .map(|p| line_value(block, p + "INDEX 01 ".len())),
        });
        cursor = after;
    }
    entries
}

/// Title recovered from the last `FILE "…" WAVE` line before a track block.
fn file_reference_title(preceding: &str) -> String {
    let Some(fp) = preceding.rfind("FILE \"") else {
        return String::new();
    };
    let start = fp + "FILE \"".len();
    let Some(end) = preceding[start..].find("\" WAVE") else {
        return String::new();
    };
    let file_name = &preceding[start..start + end];
    let stem = file_name
        .rfind('.')
        .map(|dot| &file_name[..dot])
        .unwrap_or(file_name);
    split_numbered_stem(stem).1
}

/// One `FILE "…" WAVE` section of a synthesized cuesheet.
#[derive(Debug, Clone)]
pub struct FileSection {
    pub file_name: String,
    pub entries: Vec<CueEntry>,
}

/// Render a canonical cuesheet from album metadata and file sections.
///
/// Entries keep their own numbers; `INDEX 01` defaults to `00:00:00` when the
/// entry carries no captured timestamp.
pub fn render(metadata: &CanonicalAlbumMetadata, sections: &[FileSection]) -> String {
    let mut out = String::new();
    if !metadata.genre.is_empty() {
        out.push_str(&format!("REM GENRE \"{}\"\n", metadata.genre));
    }
    if metadata.year > 0 {
        out.push_str(&format!("REM DATE {}\n", metadata.year));
    }
    if !metadata.composer.is_empty() {
        out.push_str(&format!("REM COMPOSER \"{}\"\n", metadata.composer));
    }
    if !metadata.artist.is_empty() {
        out.push_str(&format!("PERFORMER \"{}\"\n", metadata.artist));
    }
    out.push_str(&format!("TITLE \"{}\"\n", metadata.title));
    for section in sections {
        out.push_str(&format!("FILE \"{}\" WAVE\n", section.file_name));
        for entry in &section.entries {
            out.push_str(&format!("  TRACK {:02} AUDIO\n", entry.number));
            out.push_str(&format!("    TITLE \"{}\"\n", entry.title));
            if let Some(index00) = &entry.index00 {
                out.push_str(&format!("    INDEX 00 {index00}\n"));
            }
            let index01 = entry.index01.as_deref().unwrap_or("00:00:00");
            out.push_str(&format!("    INDEX 01 {index01}\n"));
        }
    }
    out
}

/// Format a second offset as a cuesheet `mm:ss:ff` timestamp (75 frames/s).
pub fn format_index(seconds: f64) -> String {
    let total_frames = (seconds * 75.0).round() as u64;
    let frames = total_frames % 75;
    let total_secs = total_frames / 75;
    format!("{:02}:{:02}:{:02}", total_secs / 60, total_secs % 60, frames)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SIMPLE_CUE: &str = r#"REM GENRE "Progressive Rock"
REM DATE 1973
PERFORMER "Pink Floyd"
TITLE "the dark side of the moon"
FILE "album.flac" WAVE
  TRACK 01 AUDIO
    TITLE "speak to me"
    INDEX 01 00:00:00
  TRACK 02 AUDIO
    TITLE "breathe"
    INDEX 00 01:07:20
    INDEX 01 01:08:00
"#;

    fn parse_ok(text: &str) -> (CuesheetDocument, Vec<Diagnostic>) {
        let mut diags = Vec::new();
        let doc = parse(text, "test.cue", CapsMode::Smart, false, &mut diags);
        (doc, diags)
    }

    #[test]
    fn test_header_fields() {
        let (doc, diags) = parse_ok(SIMPLE_CUE);
        assert_eq!(doc.title, "The Dark Side of the Moon");
        assert_eq!(doc.performer, "Pink Floyd");
        assert_eq!(doc.year, 1973);
        assert_eq!(doc.genre, "Progressive Rock");
        assert!(diags.is_empty());
    }

    #[test]
    fn test_entries_and_indexes() {
        let (doc, _) = parse_ok(SIMPLE_CUE);
        assert_eq!(doc.track_total, 2);
        assert_eq!(doc.entries.len(), 2);
        assert!(doc.is_usable());
        assert!(!doc.incomplete);
        assert_eq!(doc.entries[0].title, "Speak to Me");
        assert_eq!(doc.entries[1].title, "Breathe");
        assert_eq!(doc.entries[1].index00.as_deref(), Some("01:07:20"));
        assert_eq!(doc.entries[1].index01.as_deref(), Some("01:08:00"));
        assert_eq!(doc.entries[0].index00, None);
    }

    #[test]
    fn test_composer_read_only_when_enabled() {
        let text = "REM COMPOSER \"Bach\"\nTITLE \"x\"\nTRACK 01 AUDIO\nTITLE \"y\"\n";
        let mut diags = Vec::new();
        let with = parse(text, "t", CapsMode::Smart, true, &mut diags);
        assert_eq!(with.composer, "Bach");
        let without = parse(text, "t", CapsMode::Smart, false, &mut diags);
        assert_eq!(without.composer, "");
    }

    #[test]
    fn test_file_reference_fallback_title() {
        let text = concat!(
            "TITLE \"Album\"\n",
            "FILE \"07. the great gig in the sky.flac\" WAVE\n",
            "  TRACK 01 AUDIO\n",
            "    INDEX 01 00:00:00\n",
        );
        let (doc, _) = parse_ok(text);
        assert_eq!(doc.entries[0].title, "The Great Gig in the Sky");
    }

    #[test]
    fn test_out_of_sequence_track_is_diagnosed() {
        let text = "TRACK 01 AUDIO\nTITLE \"a\"\nTRACK 03 AUDIO\nTITLE \"b\"\nTRACK 03 AUDIO\nTITLE \"c\"\n";
        let (doc, diags) = parse_ok(text);
        assert_eq!(doc.track_total, 3);
        assert!(diags.iter().any(|d| d.message.contains("out of sequence")));
        // entries still collected positionally
        assert_eq!(doc.entries.len(), 3);
    }

    #[test]
    fn test_track_total_out_of_range() {
        let text = "TRACK 0 AUDIO\n";
        let (doc, diags) = parse_ok(text);
        assert_eq!(doc.track_total, 0);
        assert!(diags.iter().any(|d| d.message.contains("out of range")));
        assert!(!doc.is_usable());
    }

    #[test]
    fn test_incomplete_document_flagged() {
        let text = "TITLE \"x\"\nTRACK 01 AUDIO\nTITLE \"only\"\nTRACK 05 AUDIO\n";
        let (doc, _) = parse_ok(text);
        assert_eq!(doc.track_total, 5);
        assert!(doc.incomplete);
        assert!(!doc.is_usable());
    }

    #[test]
    fn test_crlf_and_quotes_tolerated() {
        let text = "TITLE \"quoted title\"\r\nPERFORMER unquoted artist\r\nTRACK 01 AUDIO\r\nTITLE \"a\"\r\n";
        let (doc, _) = parse_ok(text);
        assert_eq!(doc.title, "Quoted Title");
        assert_eq!(doc.performer, "unquoted artist");
    }

    #[test]
    fn test_render_roundtrips_through_parse() {
        let metadata = CanonicalAlbumMetadata {
            title: "Wish You Were Here".into(),
            name: "Wish You Were Here".into(),
            artist: "Pink Floyd".into(),
            year: 1975,
            genre: "Rock".into(),
            track_total: 2,
            numbering_width: 1,
            ..Default::default()
        };
        let sections = vec![FileSection {
            file_name: "album.flac".into(),
            entries: vec![
                CueEntry {
                    number: 1,
                    title: "Shine on".into(),
                    index00: None,
                    index01: Some("00:00:00".into()),
                },
                CueEntry {
                    number: 2,
                    title: "Welcome to the Machine".into(),
                    index00: None,
                    index01: Some("13:30:00".into()),
                },
            ],
        }];
        let text = render(&metadata, &sections);
        let (doc, diags) = parse_ok(&text);
        assert!(diags.is_empty());
        assert_eq!(doc.title, "Wish You Were Here");
        assert_eq!(doc.year, 1975);
        assert_eq!(doc.entries.len(), 2);
        assert_eq!(doc.entries[1].index01.as_deref(), Some("13:30:00"));
    }

    #[test]
    fn test_format_index() {
        assert_eq!(format_index(0.0), "00:00:00");
        assert_eq!(format_index(68.0), "01:08:00");
        assert_eq!(format_index(1.5), "00:01:38"); // 112.5 frames rounds to 113
    }
}
