//! External collaborators: everything that touches bytes outside our own
//! bookkeeping lives behind a trait here.
//!
//! The analysis passes are pure; only the apply pass drives these. Tests
//! substitute in-memory fakes for the trait objects.

pub mod audio;
pub mod image;
pub mod replaygain;
pub mod tags;

use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::model::{AudioInfo, ObservedTag};

/// Canonical tag values to put on a track file, replacing prior values.
#[derive(Debug, Clone, Default)]
pub struct CanonicalTagSet {
    pub title: String,
    pub artist: String,
    pub album: String,
    pub composer: Option<String>,
    /// 0 removes the track number
    pub number: usize,
    /// Zero-pad width for the number
    pub numbering_width: usize,
    pub track_total: usize,
    /// 0 removes the date
    pub year: i32,
    pub genre: String,
}

impl CanonicalTagSet {
    /// The raw string written to the track-number field.
    pub fn number_string(&self) -> String {
        format!("{:0w$}", self.number, w = self.numbering_width)
    }
}

/// Probes codec and stream facts of an audio file.
pub trait AudioProber {
    fn probe(&self, path: &Path) -> Result<AudioInfo>;
}

/// Reads and writes embedded tags.
pub trait TagStore {
    fn read(&self, path: &Path) -> Result<ObservedTag>;
    fn write(&self, path: &Path, tags: &CanonicalTagSet) -> Result<()>;
    /// Replace all embedded pictures with one front-cover JPEG.
    fn embed_picture(&self, path: &Path, jpeg: &[u8]) -> Result<()>;
}

/// Re-encodes streams and strips obsolete container blocks.
pub trait Transcoder {
    /// Re-encode `source` into `target`; the container is chosen by the
    /// target extension. Stream metadata is carried over.
    fn reencode(&self, source: &Path, target: &Path) -> Result<()>;
    /// Drop seektable, application, and padding blocks from a FLAC file.
    fn strip_obsolete_blocks(&self, path: &Path) -> Result<()>;
}

/// Computes and embeds replay-gain fields, batched per album.
pub trait ReplayGainComputer {
    fn add_replay_gain_flac(&self, files: &[PathBuf]) -> Result<()>;
    fn add_replay_gain_mp3(&self, files: &[PathBuf]) -> Result<()>;
}

/// Probes and resizes cover images.
pub trait ImageOps {
    /// Returns (width, height, jpeg quality estimate).
    fn probe(&self, path: &Path) -> Result<(u32, u32, u32)>;
    /// Square-crop resize to `edge` pixels, re-encoded as JPEG.
    fn resize_square(&self, source: &Path, target: &Path, edge: u32, quality: u32) -> Result<()>;
    /// Load image bytes re-encoded as JPEG at the given quality.
    fn to_jpeg(&self, path: &Path, quality: u32) -> Result<Vec<u8>>;
}

/// The full collaborator set used by the apply pass.
pub struct Collaborators {
    pub prober: Box<dyn AudioProber>,
    pub tags: Box<dyn TagStore>,
    pub transcoder: Box<dyn Transcoder>,
    pub replay_gain: Box<dyn ReplayGainComputer>,
    pub images: Box<dyn ImageOps>,
}

impl Collaborators {
    /// Production wiring: lofty for probing and tags, subprocesses for
    /// encoding and replay gain, the `image` crate for covers.
    pub fn live() -> Self {
        Self {
            prober: Box::new(audio::LoftyProber),
            tags: Box::new(tags::LoftyTagStore),
            transcoder: Box::new(audio::FfmpegTranscoder),
            replay_gain: Box::new(replaygain::SubprocessReplayGain),
            images: Box::new(image::CrateImageOps),
        }
    }
}

/// External programs the apply pass shells out to.
pub const REQUIRED_TOOLS: &[&str] = &["ffmpeg", "metaflac", "mp3gain"];

/// Check which of the given tools are missing from PATH.
pub fn missing_tools(tools: &[&str]) -> Vec<String> {
    let Some(path_var) = std::env::var_os("PATH") else {
        return tools.iter().map(|t| t.to_string()).collect();
    };
    let dirs: Vec<PathBuf> = std::env::split_paths(&path_var).collect();
    tools
        .iter()
        .filter(|tool| {
            !dirs.iter().any(|dir| {
                let candidate = dir.join(tool);
                candidate.is_file()
                    || candidate.with_extension("exe").is_file()
            })
        })
        .map(|t| t.to_string())
        .collect()
}
