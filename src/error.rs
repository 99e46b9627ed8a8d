//! Application-wide error types.
//!
//! This module provides a unified error hierarchy for the application.
//! Library modules use specific error types via `thiserror`, while
//! CLI/main uses `anyhow` for convenient error propagation.
//!
//! # Design
//!
//! - [`Error`]: Top-level application error enum
//! - Recoverable, per-entity conditions are NOT errors here: they become
//!   [`crate::diagnostics::Diagnostic`] records instead. `Error` is for
//!   conditions that abort an operation.

use std::path::PathBuf;

/// Application-wide result type.
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level application error.
///
/// Aggregates errors from all subsystems for unified handling.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// File I/O error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Tag reading/writing error
    #[error("Tag error for {path}: {message}")]
    Tag { path: PathBuf, message: String },

    /// Cuesheet or directory-name parse error
    #[error("Parse error in {entity}: {message}")]
    Parse { entity: String, message: String },

    /// Library structure violation (unexpected layout on disk)
    #[error("Structural error: {0}")]
    Structural(String),

    /// External tool failure
    #[error("{tool} failed: {message}")]
    Collaborator { tool: String, message: String },

    /// Image decode/encode error
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    /// File not found
    #[error("File not found: {0}")]
    NotFound(PathBuf),

    /// Invalid file format
    #[error("Invalid format: {0}")]
    InvalidFormat(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Generic error with context
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<Error>,
    },
}

impl Error {
    /// Create a tag error.
    pub fn tag(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Tag {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a parse error.
    pub fn parse(entity: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Parse {
            entity: entity.into(),
            message: message.into(),
        }
    }

    /// Create a structural error.
    pub fn structural(message: impl Into<String>) -> Self {
        Self::Structural(message.into())
    }

    /// Create a collaborator (external tool) error.
    pub fn collaborator(tool: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Collaborator {
            tool: tool.into(),
            message: message.into(),
        }
    }

    /// Create a not found error.
    pub fn not_found(path: impl Into<PathBuf>) -> Self {
        Self::NotFound(path.into())
    }

    /// Create a config error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Add context to an error.
    pub fn context(self, ctx: impl Into<String>) -> Self {
        Self::WithContext {
            context: ctx.into(),
            source: Box::new(self),
        }
    }
}

impl From<lofty::error::LoftyError> for Error {
    fn from(err: lofty::error::LoftyError) -> Self {
        Self::InvalidFormat(err.to_string())
    }
}

/// Extension trait for adding context to Results.
pub trait ResultExt<T> {
    /// Add context to an error result.
    fn with_context(self, ctx: impl Into<String>) -> Result<T>;
}

impl<T> ResultExt<T> for Result<T> {
    fn with_context(self, ctx: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.context(ctx))
    }
}

impl<T> ResultExt<T> for std::result::Result<T, std::io::Error> {
    fn with_context(self, ctx: impl Into<String>) -> Result<T> {
        self.map_err(|e| Error::Io(e).context(ctx))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::not_found("/music/Artist/Album/01. Track.flac");
        assert!(err.to_string().contains("01. Track.flac"));
    }

    #[test]
    fn test_error_with_context() {
        let err = Error::collaborator("ffmpeg", "exit code 1").context("while re-encoding");
        let msg = err.to_string();
        assert!(msg.contains("while re-encoding"));
        assert!(msg.contains("ffmpeg"));
    }

    #[test]
    fn test_parse_error() {
        let err = Error::parse("album.cue", "track total out of range");
        let msg = err.to_string();
        assert!(msg.contains("album.cue"));
        assert!(msg.contains("out of range"));
    }

    #[test]
    fn test_result_ext() {
        let result: Result<()> = Err(Error::structural("stray file"));
        let with_ctx = result.with_context("scanning collection");
        assert!(with_ctx.unwrap_err().to_string().contains("scanning collection"));
    }
}
