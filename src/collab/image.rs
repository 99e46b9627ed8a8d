//! Cover image probing and resizing via the `image` crate.

use std::path::Path;

use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::GenericImageView;
use tracing::debug;

use crate::error::Result;

use super::ImageOps;

/// Quality reported for images whose encoder settings cannot be read back.
/// Matches the neutral value the suitability criterion is anchored on.
const ASSUMED_QUALITY: u32 = 80;

pub struct CrateImageOps;

impl CrateImageOps {
    fn encode_jpeg(img: &image::DynamicImage, quality: u32) -> Result<Vec<u8>> {
        let mut buffer = Vec::new();
        let encoder = JpegEncoder::new_with_quality(&mut buffer, quality.min(100) as u8);
        img.write_with_encoder(encoder)?;
        Ok(buffer)
    }
}

impl ImageOps for CrateImageOps {
    fn probe(&self, path: &Path) -> Result<(u32, u32, u32)> {
        let (width, height) = image::image_dimensions(path)?;
        Ok((width, height, ASSUMED_QUALITY))
    }

    fn resize_square(&self, source: &Path, target: &Path, edge: u32, quality: u32) -> Result<()> {
        let img = image::open(source)?;
        let (width, height) = img.dimensions();
        // Center-crop to a square, shrink to the target edge, never upscale
        let side = width.min(height);
        let cropped = img.crop_imm((width - side) / 2, (height - side) / 2, side, side);
        let final_edge = edge.min(side);
        let resized = if final_edge < side {
            cropped.resize_exact(final_edge, final_edge, FilterType::Lanczos3)
        } else {
            cropped
        };
        debug!(
            source = %source.display(),
            from = format!("{width}x{height}"),
            to = final_edge,
            "resizing cover"
        );
        std::fs::write(target, Self::encode_jpeg(&resized, quality)?)?;
        Ok(())
    }

    fn to_jpeg(&self, path: &Path, quality: u32) -> Result<Vec<u8>> {
        let img = image::open(path)?;
        Self::encode_jpeg(&img, quality)
    }
}
