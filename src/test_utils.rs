//! Shared test fixtures: in-memory collaborator fakes and album builders.

use std::cell::RefCell;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::collab::{
    AudioProber, CanonicalTagSet, Collaborators, ImageOps, ReplayGainComputer, TagStore,
    Transcoder,
};
use crate::config::{FileConfig, Overrides, RunConfig};
use crate::error::Result;
use crate::model::{AudioInfo, Codec, ObservedTag};

/// Prober that reports every file as a healthy FLAC.
pub struct FakeProber;

impl AudioProber for FakeProber {
    fn probe(&self, _path: &Path) -> Result<AudioInfo> {
        Ok(AudioInfo {
            codec: Codec::Flac,
            sample_length: 44100,
            duration_secs: 180.0,
            has_obsolete_blocks: false,
        })
    }
}

/// Tag store backed by a map keyed on file name; writes are recorded.
#[derive(Default)]
pub struct FakeTags {
    pub tags: HashMap<String, ObservedTag>,
    pub written: RefCell<Vec<(PathBuf, CanonicalTagSet)>>,
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

impl TagStore for FakeTags {
    fn read(&self, path: &Path) -> Result<ObservedTag> {
        Ok(self.tags.get(&file_name(path)).cloned().unwrap_or_default())
    }

    fn write(&self, path: &Path, tags: &CanonicalTagSet) -> Result<()> {
        self.written.borrow_mut().push((path.to_path_buf(), tags.clone()));
        Ok(())
    }

    fn embed_picture(&self, _path: &Path, _jpeg: &[u8]) -> Result<()> {
        Ok(())
    }
}

pub struct FakeTranscoder;

impl Transcoder for FakeTranscoder {
    fn reencode(&self, source: &Path, target: &Path) -> Result<()> {
        std::fs::copy(source, target)?;
        Ok(())
    }

    fn strip_obsolete_blocks(&self, _path: &Path) -> Result<()> {
        Ok(())
    }
}

pub struct FakeGain;

impl ReplayGainComputer for FakeGain {
    fn add_replay_gain_flac(&self, _files: &[PathBuf]) -> Result<()> {
        Ok(())
    }

    fn add_replay_gain_mp3(&self, _files: &[PathBuf]) -> Result<()> {
        Ok(())
    }
}

/// Image fake reporting fixed dimensions; resizes copy the source bytes.
pub struct FakeImages {
    pub dimensions: (u32, u32),
}

impl Default for FakeImages {
    fn default() -> Self {
        Self {
            dimensions: (1000, 1000),
        }
    }
}

impl ImageOps for FakeImages {
    fn probe(&self, _path: &Path) -> Result<(u32, u32, u32)> {
        Ok((self.dimensions.0, self.dimensions.1, 80))
    }

    fn resize_square(&self, source: &Path, target: &Path, _edge: u32, _quality: u32) -> Result<()> {
        std::fs::copy(source, target)?;
        Ok(())
    }

    fn to_jpeg(&self, _path: &Path, _quality: u32) -> Result<Vec<u8>> {
        Ok(vec![0xFF, 0xD8])
    }
}

/// Collaborator set wired with the default fakes.
pub fn fake_collaborators() -> Collaborators {
    Collaborators {
        prober: Box::new(FakeProber),
        tags: Box::new(FakeTags::default()),
        transcoder: Box::new(FakeTranscoder),
        replay_gain: Box::new(FakeGain),
        images: Box::new(FakeImages::default()),
    }
}

/// Default run config rooted at `base`.
pub fn run_config(base: &Path) -> RunConfig {
    RunConfig::merge(
        &FileConfig::default(),
        base.to_path_buf(),
        false,
        false,
        false,
        false,
        None,
        Overrides::default(),
    )
    .unwrap()
}
