//! Assignment of audio files to cuesheet entries.
//!
//! A weighted greedy pass: files are visited in filename order and each
//! claims the highest-scoring cue entry not yet taken. The consumed set
//! guarantees a bijection when the entry count equals the file count.
//!
//! Similarity between titles dominates the score; number proximity only
//! contributes when the file's own title is non-ASCII, where textual
//! similarity against the cue entries is unreliable.

use std::collections::HashSet;

use strsim::normalized_levenshtein;
use tracing::debug;

use crate::diagnostics::Diagnostic;
use crate::model::{CueEntry, Track};
use crate::titling::{CapsMode, coerce_title, safe_name};

/// Score weights, tuned on a real library; do not retune casually.
const FILE_TITLE_WEIGHT: f64 = 5.0;
const TAG_TITLE_WEIGHT: f64 = 3.0;
const FILE_NUMBER_WEIGHT: f64 = 2.0;
const TAG_NUMBER_WEIGHT: f64 = 1.0;

fn number_penalty(weight: f64, number: usize, cue_number: usize) -> f64 {
    let distance = number as f64 - cue_number as f64;
    -weight * distance * distance / 4.0
}

/// Score of one file against one cue entry.
fn score(track: &Track, entry: &CueEntry) -> f64 {
    let mut total = 0.0;
    if !track.file_title.is_empty() {
        total += FILE_TITLE_WEIGHT
            * normalized_levenshtein(
                &track.file_title.to_lowercase(),
                &entry.title.to_lowercase(),
            );
    }
    if let Some(tag_title) = &track.tag.title
        && !tag_title.is_empty()
    {
        total += TAG_TITLE_WEIGHT * normalized_levenshtein(tag_title, &entry.title);
    }
    if !track.file_title.is_ascii() {
        if track.file_number > 0 {
            total += number_penalty(FILE_NUMBER_WEIGHT, track.file_number, entry.number);
        } else if track.tag.number() > 0 {
            total += number_penalty(TAG_NUMBER_WEIGHT, track.tag.number(), entry.number);
        }
    }
    total
}

/// Match tracks against cue entries, fixing each track's canonical number
/// and title. Only valid when the entry count equals the declared total;
/// the caller checks `CuesheetDocument::is_usable`.
pub fn match_tracks(tracks: &mut [Track], entries: &[CueEntry]) {
    let mut consumed: HashSet<usize> = HashSet::new();
    for track in tracks.iter_mut() {
        // Strictly-greater scan: on tied scores the earliest entry wins
        let mut best: Option<(&CueEntry, f64)> = None;
        for entry in entries.iter().filter(|e| !consumed.contains(&e.number)) {
            let candidate = score(track, entry);
            if best.as_ref().is_none_or(|(_, top)| candidate > *top) {
                best = Some((entry, candidate));
            }
        }
        let Some((entry, best_score)) = best else {
            break;
        };
        consumed.insert(entry.number);
        debug!(
            file = %track.path.display(),
            cue_number = entry.number,
            score = best_score,
            "matched cue entry"
        );
        if track.title != entry.title || track.number != entry.number {
            track.number = entry.number;
            track.title = entry.title.clone();
        }
    }
}

/// Fallback identities when no usable cuesheet exists: positional numbers
/// and coerced filename titles, with the tag title kept when it is a richer
/// spelling of the same name.
pub fn fallback_identities(tracks: &mut [Track], mode: CapsMode, diagnostics: &mut Vec<Diagnostic>) {
    for (i, track) in tracks.iter_mut().enumerate() {
        let position = i + 1;
        let best_title = coerce_title(&track.file_title, mode);

        track.number = track.file_number;
        if track.number != track.tag.number() || track.number == 0 {
            if track.number != 0 && track.tag.number() != 0 {
                diagnostics.push(Diagnostic::mismatch(
                    track.path.display().to_string(),
                    format!(
                        "filename number {} disagrees with tag number {}",
                        track.number,
                        track.tag.number()
                    ),
                ));
            }
            track.number = position;
        }

        let tag_title = track.tag.title.clone().unwrap_or_default();
        if !tag_title.is_empty() && safe_name(&tag_title) == safe_name(&best_title) {
            track.title = tag_title;
        } else {
            track.title = best_title;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{AudioInfo, Codec, ObservedTag, TrackFlags};
    use std::path::PathBuf;

    fn track(file_number: usize, file_title: &str, tag_title: Option<&str>) -> Track {
        Track {
            path: PathBuf::from(format!("{file_number:02}. {file_title}.flac")),
            file_number,
            file_title: file_title.to_string(),
            tag: ObservedTag {
                title: tag_title.map(str::to_string),
                ..Default::default()
            },
            audio: AudioInfo {
                codec: Codec::Flac,
                sample_length: 1,
                duration_secs: 1.0,
                has_obsolete_blocks: false,
            },
            number: 0,
            title: String::new(),
            flags: TrackFlags::empty(),
            diagnostics: Vec::new(),
        }
    }

    fn entry(number: usize, title: &str) -> CueEntry {
        CueEntry {
            number,
            title: title.to_string(),
            index00: None,
            index01: None,
        }
    }

    #[test]
    fn test_matching_by_title() {
        let mut tracks = vec![
            track(1, "Breathe", None),
            track(2, "Time", None),
        ];
        // entries in reverse order: titles must still win
        let entries = vec![entry(1, "Time"), entry(2, "Breathe")];
        match_tracks(&mut tracks, &entries);
        assert_eq!(tracks[0].number, 2);
        assert_eq!(tracks[0].title, "Breathe");
        assert_eq!(tracks[1].number, 1);
        assert_eq!(tracks[1].title, "Time");
    }

    #[test]
    fn test_tag_title_breaks_ties() {
        let mut tracks = vec![
            track(1, "Track", Some("Money")),
            track(2, "Track", Some("Us and Them")),
        ];
        let entries = vec![entry(1, "Us and Them"), entry(2, "Money")];
        match_tracks(&mut tracks, &entries);
        assert_eq!(tracks[0].title, "Money");
        assert_eq!(tracks[1].title, "Us and Them");
    }

    #[test]
    fn test_bijection_via_consumed_set() {
        let mut tracks = vec![
            track(1, "Same Name", None),
            track(2, "Same Name", None),
        ];
        let entries = vec![entry(1, "Same Name"), entry(2, "Same Name")];
        match_tracks(&mut tracks, &entries);
        let mut numbers: Vec<usize> = tracks.iter().map(|t| t.number).collect();
        numbers.sort_unstable();
        assert_eq!(numbers, vec![1, 2]);
    }

    #[test]
    fn test_number_proximity_for_non_ascii_file_titles() {
        // Identical titles carry no signal; the filename numbers decide
        let mut tracks = vec![
            track(2, "Песня", None),
            track(1, "Песня", None),
        ];
        let entries = vec![entry(1, "Песня"), entry(2, "Песня")];
        match_tracks(&mut tracks, &entries);
        assert_eq!(tracks[0].number, 2);
        assert_eq!(tracks[1].number, 1);
    }

    #[test]
    fn test_ascii_file_title_gets_no_number_penalty() {
        // The filename number is garbage but the title is ASCII, so the
        // tag-title similarity must win unpunished
        let mut tracks = vec![track(9, "Vremya", Some("Время"))];
        let entries = vec![entry(1, "Время"), entry(9, "Деньги")];
        match_tracks(&mut tracks, &entries);
        assert_eq!(tracks[0].number, 1);
        assert_eq!(tracks[0].title, "Время");
    }

    #[test]
    fn test_uniform_scores_keep_entry_order() {
        // No titles anywhere: every score is zero, files bind positionally
        let mut tracks = vec![track(0, "", None), track(0, "", None)];
        let entries = vec![entry(1, "Alpha"), entry(2, "Beta")];
        match_tracks(&mut tracks, &entries);
        assert_eq!(tracks[0].number, 1);
        assert_eq!(tracks[1].number, 2);
    }

    #[test]
    fn test_fallback_positional_numbering() {
        let mut tracks = vec![
            track(0, "First", None),
            track(5, "Second", None),
        ];
        tracks[1].tag.track_number = Some("2".into());
        let mut diags = Vec::new();
        fallback_identities(&mut tracks, CapsMode::Smart, &mut diags);
        assert_eq!(tracks[0].number, 1);
        // filename says 5, tag says 2: positional wins, mismatch recorded
        assert_eq!(tracks[1].number, 2);
        assert!(diags.iter().any(|d| d.message.contains("disagrees")));
    }

    #[test]
    fn test_fallback_consistent_number_kept() {
        let mut tracks = vec![track(7, "Lucky Seven", None)];
        tracks[0].tag.track_number = Some("7".into());
        let mut diags = Vec::new();
        fallback_identities(&mut tracks, CapsMode::Smart, &mut diags);
        assert_eq!(tracks[0].number, 7);
        assert!(diags.is_empty());
    }

    #[test]
    fn test_fallback_keeps_richer_tag_title() {
        let mut tracks = vec![track(1, "What？ Now", None)];
        tracks[0].tag.title = Some("What? Now".into());
        let mut diags = Vec::new();
        fallback_identities(&mut tracks, CapsMode::Smart, &mut diags);
        assert_eq!(tracks[0].title, "What? Now");
    }

    #[test]
    fn test_fallback_coerces_filename_title() {
        let mut tracks = vec![track(1, "the great gig in the sky", None)];
        let mut diags = Vec::new();
        fallback_identities(&mut tracks, CapsMode::Smart, &mut diags);
        assert_eq!(tracks[0].title, "The Great Gig in the Sky");
    }
}
