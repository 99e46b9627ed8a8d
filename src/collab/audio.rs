//! Audio stream probing (lofty) and re-encoding (ffmpeg subprocess).

use std::io::Read;
use std::path::Path;
use std::process::Command;

use lofty::file::{AudioFile, FileType, TaggedFileExt};
use lofty::probe::Probe;
use tracing::debug;

use crate::error::{Error, Result};
use crate::model::{AudioInfo, Codec};

use super::{AudioProber, Transcoder};

/// FLAC metadata block types that a finished rip should not carry.
const FLAC_PADDING: u8 = 1;
const FLAC_APPLICATION: u8 = 2;
const FLAC_SEEKTABLE: u8 = 3;

/// Scan the FLAC metadata block headers for seektable, application, or
/// padding blocks. The block chain starts right after the `fLaC` magic:
/// one type/last byte plus a 24-bit big-endian length per block.
fn flac_has_obsolete_blocks(path: &Path) -> Result<bool> {
    let mut file = std::fs::File::open(path)?;
    let mut magic = [0u8; 4];
    file.read_exact(&mut magic)?;
    if &magic != b"fLaC" {
        return Ok(false);
    }
    loop {
        let mut header = [0u8; 4];
        if file.read_exact(&mut header).is_err() {
            return Ok(false);
        }
        let block_type = header[0] & 0x7F;
        if matches!(block_type, FLAC_PADDING | FLAC_APPLICATION | FLAC_SEEKTABLE) {
            return Ok(true);
        }
        if header[0] & 0x80 != 0 {
            return Ok(false);
        }
        let length = u64::from(header[1]) << 16 | u64::from(header[2]) << 8 | u64::from(header[3]);
        std::io::Seek::seek(&mut file, std::io::SeekFrom::Current(length as i64))?;
    }
}

pub struct LoftyProber;

impl AudioProber for LoftyProber {
    fn probe(&self, path: &Path) -> Result<AudioInfo> {
        let tagged_file = Probe::open(path)?.read()?;
        let codec = match tagged_file.file_type() {
            FileType::Flac => Codec::Flac,
            FileType::Mpeg => Codec::Mp3,
            FileType::Mp4 => Codec::Mp4,
            _ => Codec::Unknown,
        };
        let properties = tagged_file.properties();
        let duration_secs = properties.duration().as_secs_f64();
        // lofty exposes duration, not the raw sample count; reconstruct it
        // from the sample rate so a broken stream header still reads as zero
        let sample_length = properties
            .sample_rate()
            .map(|rate| (duration_secs * f64::from(rate)).round() as u64)
            .unwrap_or(0);
        let has_obsolete_blocks = match codec {
            Codec::Flac => flac_has_obsolete_blocks(path)?,
            _ => false,
        };
        Ok(AudioInfo {
            codec,
            sample_length,
            duration_secs,
            has_obsolete_blocks,
        })
    }
}

pub struct FfmpegTranscoder;

impl Transcoder for FfmpegTranscoder {
    fn reencode(&self, source: &Path, target: &Path) -> Result<()> {
        debug!(source = %source.display(), target = %target.display(), "re-encoding");
        let output = Command::new("ffmpeg")
            .arg("-y")
            .arg("-i")
            .arg(source)
            .arg("-map_metadata")
            .arg("0")
            .arg(target)
            .output()
            .map_err(|e| Error::collaborator("ffmpeg", e.to_string()))?;
        if !output.status.success() {
            return Err(Error::collaborator(
                "ffmpeg",
                String::from_utf8_lossy(&output.stderr).into_owned(),
            ));
        }
        Ok(())
    }

    fn strip_obsolete_blocks(&self, path: &Path) -> Result<()> {
        let output = Command::new("metaflac")
            .arg("--dont-use-padding")
            .arg("--remove")
            .arg("--block-type=SEEKTABLE,APPLICATION,PADDING")
            .arg(path)
            .output()
            .map_err(|e| Error::collaborator("metaflac", e.to_string()))?;
        if !output.status.success() {
            return Err(Error::collaborator(
                "metaflac",
                String::from_utf8_lossy(&output.stderr).into_owned(),
            ));
        }
        Ok(())
    }
}
