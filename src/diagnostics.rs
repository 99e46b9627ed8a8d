//! Typed diagnostics accumulated during analysis.
//!
//! Every recoverable anomaly found while parsing, matching, or planning is
//! recorded as a [`Diagnostic`] on the entity that produced it. Diagnostics
//! never abort processing; they are rendered (text or JSON) only at the
//! reporting boundary.

use serde::Serialize;

/// Category of a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticKind {
    /// Malformed input (cuesheet syntax, unparseable directory name)
    Parse,
    /// Observed value disagrees with the canonical value
    Mismatch,
    /// Unexpected library layout (stray files, ambiguous cuesheets)
    Structural,
    /// External tool reported failure
    Collaborator,
    /// Informational note (assumed values, advisory conditions)
    Note,
}

impl DiagnosticKind {
    /// Convert to string representation for display and storage.
    pub fn as_str(&self) -> &'static str {
        match self {
            DiagnosticKind::Parse => "parse",
            DiagnosticKind::Mismatch => "mismatch",
            DiagnosticKind::Structural => "structural",
            DiagnosticKind::Collaborator => "collaborator",
            DiagnosticKind::Note => "note",
        }
    }
}

impl std::str::FromStr for DiagnosticKind {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "parse" => DiagnosticKind::Parse,
            "mismatch" => DiagnosticKind::Mismatch,
            "structural" => DiagnosticKind::Structural,
            "collaborator" => DiagnosticKind::Collaborator,
            _ => DiagnosticKind::Note,
        })
    }
}

/// A single recorded anomaly.
#[derive(Debug, Clone, Serialize)]
pub struct Diagnostic {
    /// Category of the anomaly
    pub kind: DiagnosticKind,
    /// Entity it belongs to (file name, cuesheet name, directory)
    pub entity: String,
    /// Human-readable description
    pub message: String,
}

impl Diagnostic {
    pub fn new(
        kind: DiagnosticKind,
        entity: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            entity: entity.into(),
            message: message.into(),
        }
    }

    /// Create a parse diagnostic.
    pub fn parse(entity: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(DiagnosticKind::Parse, entity, message)
    }

    /// Create a mismatch diagnostic.
    pub fn mismatch(entity: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(DiagnosticKind::Mismatch, entity, message)
    }

    /// Create a structural diagnostic.
    pub fn structural(entity: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(DiagnosticKind::Structural, entity, message)
    }

    /// Create a collaborator diagnostic.
    pub fn collaborator(entity: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(DiagnosticKind::Collaborator, entity, message)
    }

    /// Create an informational note.
    pub fn note(entity: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(DiagnosticKind::Note, entity, message)
    }
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}: {}", self.kind.as_str(), self.entity, self.message)
    }
}
