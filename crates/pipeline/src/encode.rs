//! Two-tier artifact persistence.
//!
//! The primary encoder is format-specific with tuned parameters. When it
//! fails, or leaves an empty file behind, the generic secondary encoder is
//! tried. The job only fails when both do.

use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::{CompressionType, FilterType, PngEncoder};
use image::{ExtendedColorType, ImageEncoder, ImageFormat, RgbImage};

use crate::error::PipelineError;

/// JPEG quality used by the primary encoder.
pub const JPEG_QUALITY: u8 = 95;

/// Writes an image to a path in some format.
pub trait ArtifactEncoder: Send + Sync {
    fn name(&self) -> &'static str;

    fn encode(&self, image: &RgbImage, path: &Path) -> Result<(), String>;
}

/// Format-specific encoder chosen from the path's extension.
#[derive(Debug, Default, Clone, Copy)]
pub struct TunedEncoder;

impl ArtifactEncoder for TunedEncoder {
    fn name(&self) -> &'static str {
        "tuned"
    }

    fn encode(&self, image: &RgbImage, path: &Path) -> Result<(), String> {
        let format = ImageFormat::from_path(path).map_err(|e| e.to_string())?;
        let (width, height) = image.dimensions();
        let file = File::create(path).map_err(|e| e.to_string())?;
        let mut writer = BufWriter::new(file);

        match format {
            ImageFormat::Jpeg => JpegEncoder::new_with_quality(&mut writer, JPEG_QUALITY)
                .write_image(image.as_raw(), width, height, ExtendedColorType::Rgb8),
            ImageFormat::Png => PngEncoder::new_with_quality(
                &mut writer,
                CompressionType::Default,
                FilterType::Adaptive,
            )
            .write_image(image.as_raw(), width, height, ExtendedColorType::Rgb8),
            other => image.write_to(&mut writer, other),
        }
        .map_err(|e| e.to_string())?;

        writer.into_inner().map_err(|e| e.to_string())?;
        Ok(())
    }
}

/// Generic path-based encoder with default parameters.
#[derive(Debug, Default, Clone, Copy)]
pub struct GenericEncoder;

impl ArtifactEncoder for GenericEncoder {
    fn name(&self) -> &'static str {
        "generic"
    }

    fn encode(&self, image: &RgbImage, path: &Path) -> Result<(), String> {
        image.save(path).map_err(|e| e.to_string())
    }
}

/// Outcome of a successful save.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavedArtifact {
    pub bytes: u64,
    pub encoder: &'static str,
}

pub struct EncoderChain {
    primary: Box<dyn ArtifactEncoder>,
    secondary: Box<dyn ArtifactEncoder>,
}

impl Default for EncoderChain {
    fn default() -> Self {
        Self::new(Box::new(TunedEncoder), Box::new(GenericEncoder))
    }
}

impl EncoderChain {
    pub fn new(primary: Box<dyn ArtifactEncoder>, secondary: Box<dyn ArtifactEncoder>) -> Self {
        Self { primary, secondary }
    }

    /// Save `image` to `path`, falling back to the secondary encoder.
    pub fn save(&self, image: &RgbImage, path: &Path) -> Result<SavedArtifact, PipelineError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let primary = match attempt(self.primary.as_ref(), image, path) {
            Ok(saved) => return Ok(saved),
            Err(e) => e,
        };
        tracing::warn!(
            path = %path.display(),
            encoder = self.primary.name(),
            error = %primary,
            "Primary encoder failed, trying fallback",
        );

        match attempt(self.secondary.as_ref(), image, path) {
            Ok(saved) => Ok(saved),
            Err(secondary) => Err(PipelineError::ArtifactSave {
                path: path.display().to_string(),
                primary,
                secondary,
            }),
        }
    }
}

/// Run one encoder and confirm it produced a non-empty file.
fn attempt(
    encoder: &dyn ArtifactEncoder,
    image: &RgbImage,
    path: &Path,
) -> Result<SavedArtifact, String> {
    encoder.encode(image, path)?;
    let bytes = std::fs::metadata(path).map_err(|e| e.to_string())?.len();
    if bytes == 0 {
        return Err("artifact is empty".to_string());
    }
    Ok(SavedArtifact {
        bytes,
        encoder: encoder.name(),
    })
}
