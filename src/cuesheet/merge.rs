//! Merging the cuesheets of a complex album's sub-albums into one document.
//!
//! Multi-disc releases ripped as `CD1/`, `CD2/` sub-directories each carry
//! their own cuesheet. The merger combines them into a single document whose
//! entries are renumbered with a running offset, and whose header fields are
//! reconciled across the discs.

use crate::diagnostics::Diagnostic;
use crate::model::CueEntry;
use crate::titling::{CapsMode, coerce_title};

use super::CuesheetDocument;

/// One sub-album's contribution to the merge.
#[derive(Debug, Clone)]
pub struct SubCuesheet {
    /// Sub-directory basename, used for affix stripping
    pub sub_name: String,
    pub document: CuesheetDocument,
}

/// Longest common prefix of a set of strings (char-aligned).
pub fn common_prefix(strings: &[&str]) -> String {
    let Some(first) = strings.first() else {
        return String::new();
    };
    let mut prefix: Vec<char> = first.chars().collect();
    for s in &strings[1..] {
        let chars: Vec<char> = s.chars().collect();
        let keep = prefix
            .iter()
            .zip(chars.iter())
            .take_while(|(a, b)| a == b)
            .count();
        prefix.truncate(keep);
    }
    prefix.into_iter().collect()
}

/// Longest common postfix, capped at one char less than the shortest string.
pub fn common_postfix(strings: &[&str]) -> String {
    let Some(first) = strings.first() else {
        return String::new();
    };
    let shortest = strings.iter().map(|s| s.chars().count()).min().unwrap_or(0);
    let first_chars: Vec<char> = first.chars().collect();
    let mut len = 0;
    for i in 1..shortest {
        let candidate: String = first_chars[first_chars.len() - i..].iter().collect();
        if strings.iter().all(|s| s.ends_with(&candidate)) {
            len = i;
        } else {
            break;
        }
    }
    first_chars[first_chars.len() - len..].iter().collect()
}

/// Pick one value from the distinct non-empty values of a header field:
/// unanimous value as-is, otherwise the longest with a diagnostic.
fn reconcile_field(
    values: impl Iterator<Item = String>,
    field: &str,
    entity: &str,
    diagnostics: &mut Vec<Diagnostic>,
) -> String {
    let mut distinct: Vec<String> = Vec::new();
    for v in values.filter(|v| !v.is_empty()) {
        if !distinct.contains(&v) {
            distinct.push(v);
        }
    }
    match distinct.len() {
        0 => String::new(),
        1 => distinct.remove(0),
        _ => {
            let longest = distinct
                .iter()
                .max_by_key(|v| v.chars().count())
                .cloned()
                .unwrap_or_default();
            diagnostics.push(Diagnostic::note(
                entity,
                format!("sub-albums disagree on {field}: {distinct:?}, keeping '{longest}'"),
            ));
            longest
        }
    }
}

/// Merged album title: the common affix of the sub-cuesheet titles, with the
/// sub-directory common affix (the `CD1`/`CD2` part) stripped off the end.
fn merge_title(subs: &[SubCuesheet], entity: &str, diagnostics: &mut Vec<Diagnostic>) -> String {
    let titles: Vec<&str> = subs
        .iter()
        .map(|s| s.document.title.as_str())
        .filter(|t| !t.is_empty())
        .collect();
    if titles.is_empty() {
        return String::new();
    }
    let mut title = common_prefix(&titles);
    if title.trim().is_empty() {
        title = common_postfix(&titles);
    }
    if title.trim().is_empty() {
        title = titles
            .iter()
            .max_by_key(|t| t.chars().count())
            .map(|t| t.to_string())
            .unwrap_or_default();
        diagnostics.push(Diagnostic::note(
            entity,
            format!("sub-album titles share no affix, keeping '{title}'"),
        ));
    }
    title = title.trim().to_string();

    // "The Wall CD" minus the "CD" the sub-directories share
    let sub_names: Vec<&str> = subs.iter().map(|s| s.sub_name.as_str()).collect();
    let dir_prefix = common_prefix(&sub_names);
    let dir_postfix = common_postfix(&sub_names);
    if !dir_prefix.trim().is_empty() && title.len() > dir_prefix.len() {
        if let Some(stripped) = title.strip_suffix(dir_prefix.trim()) {
            title = trim_one_nonalpha_end(stripped).to_string();
        }
    }
    if !dir_postfix.trim().is_empty() && title.len() > dir_postfix.len() {
        if let Some(stripped) = title.strip_prefix(dir_postfix.trim()) {
            title = trim_one_nonalpha_start(stripped).to_string();
        }
    }
    title
}

fn trim_one_nonalpha_end(s: &str) -> &str {
    let s = s.trim_end();
    match s.chars().last() {
        Some(c) if !c.is_alphanumeric() => s[..s.len() - c.len_utf8()].trim_end(),
        _ => s,
    }
}

fn trim_one_nonalpha_start(s: &str) -> &str {
    let s = s.trim_start();
    match s.chars().next() {
        Some(c) if !c.is_alphanumeric() => s[c.len_utf8()..].trim_start(),
        _ => s,
    }
}

/// Merge the sub-album cuesheets into one renumbered document.
pub fn merge(
    subs: &[SubCuesheet],
    entity: &str,
    mode: CapsMode,
    diagnostics: &mut Vec<Diagnostic>,
) -> CuesheetDocument {
    let mut doc = CuesheetDocument {
        title: merge_title(subs, entity, diagnostics),
        performer: reconcile_field(
            subs.iter().map(|s| s.document.performer.clone()),
            "performer",
            entity,
            diagnostics,
        ),
        composer: reconcile_field(
            subs.iter().map(|s| s.document.composer.clone()),
            "composer",
            entity,
            diagnostics,
        ),
        ..Default::default()
    };

    // Mean of the known years
    let years: Vec<i32> = subs
        .iter()
        .map(|s| s.document.year)
        .filter(|y| *y > 0)
        .collect();
    if !years.is_empty() {
        let mean = years.iter().sum::<i32>() as f64 / years.len() as f64;
        doc.year = mean.round() as i32;
    }

    // Union of comma-separated genre tokens, re-capitalized
    let mut genres: Vec<String> = Vec::new();
    for sub in subs {
        for token in sub.document.genre.split(',') {
            let token = coerce_title(token.trim(), mode);
            if !token.is_empty() && !genres.contains(&token) {
                genres.push(token);
            }
        }
    }
    doc.genre = genres.join(", ");

    // Concatenate entries with a running number offset
    for sub in subs {
        let offset = doc.entries.len();
        for entry in &sub.document.entries {
            doc.entries.push(CueEntry {
                number: offset + entry.number,
                ..entry.clone()
            });
        }
    }
    doc.track_total = doc.entries.len();
    doc.incomplete = subs.iter().any(|s| s.document.incomplete);
    doc
}
