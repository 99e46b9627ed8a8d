//! Replay-gain computation via metaflac and mp3gain subprocesses.
//!
//! Both tools are batched over a whole album so the album-gain fields are
//! computed across the correct track set.

use std::path::{Path, PathBuf};
use std::process::Command;

use tracing::info;

use crate::error::{Error, Result};

use super::ReplayGainComputer;

pub struct SubprocessReplayGain;

fn run_batch(tool: &str, args: &[&str], files: &[PathBuf]) -> Result<()> {
    if files.is_empty() {
        return Ok(());
    }
    info!(tool, count = files.len(), "computing replay gain");
    let output = Command::new(tool)
        .args(args)
        .args(files)
        .output()
        .map_err(|e| Error::collaborator(tool, e.to_string()))?;
    if !output.status.success() {
        return Err(Error::collaborator(
            tool,
            String::from_utf8_lossy(&output.stderr).into_owned(),
        ));
    }
    Ok(())
}

impl ReplayGainComputer for SubprocessReplayGain {
    fn add_replay_gain_flac(&self, files: &[PathBuf]) -> Result<()> {
        run_batch(
            "metaflac",
            &["--dont-use-padding", "--add-replay-gain"],
            files,
        )
    }

    fn add_replay_gain_mp3(&self, files: &[PathBuf]) -> Result<()> {
        // -r: track gain, -c: ignore clipping warnings, -q: quiet
        run_batch("mp3gain", &["-r", "-q", "-c"], files)
    }
}
