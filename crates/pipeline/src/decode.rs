//! Input validation and decoding.

use std::path::Path;

use image::RgbImage;

use crate::error::PipelineError;

/// Check the input exists and is non-empty. Returns its size in bytes.
pub fn validate_input(path: &Path) -> Result<u64, PipelineError> {
    let meta = std::fs::metadata(path)
        .map_err(|_| PipelineError::InputMissing(path.display().to_string()))?;
    if !meta.is_file() {
        return Err(PipelineError::InputMissing(path.display().to_string()));
    }
    if meta.len() == 0 {
        return Err(PipelineError::InputEmpty(path.display().to_string()));
    }
    Ok(meta.len())
}

/// Decode an image to RGB.
///
/// The extension-driven decoder runs first. If it fails, the raw bytes are
/// decoded again with the format sniffed from their content, which recovers
/// files whose extension does not match their encoding.
pub fn load_rgb(path: &Path) -> Result<RgbImage, PipelineError> {
    match image::open(path) {
        Ok(img) => Ok(img.to_rgb8()),
        Err(primary) => {
            tracing::warn!(
                path = %path.display(),
                error = %primary,
                "Primary decoder failed, retrying with content sniffing",
            );
            let bytes = std::fs::read(path)?;
            image::load_from_memory(&bytes)
                .map(|img| img.to_rgb8())
                .map_err(|fallback| PipelineError::Decode {
                    path: path.display().to_string(),
                    reason: fallback.to_string(),
                })
        }
    }
}
