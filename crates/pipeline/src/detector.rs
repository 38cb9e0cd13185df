//! The face detection seam.
//!
//! Detection and encoding are opaque to the job system: any backend that
//! returns bounding boxes with fixed-length encodings can be plugged in.

use image::RgbImage;
use serde::{Deserialize, Serialize};

use crate::error::PipelineError;

/// Pixel bounds of one face, inclusive of `left`/`top`, exclusive of `right`/`bottom`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FaceBox {
    pub top: u32,
    pub right: u32,
    pub bottom: u32,
    pub left: u32,
}

impl FaceBox {
    pub fn width(&self) -> u32 {
        self.right.saturating_sub(self.left)
    }

    pub fn height(&self) -> u32 {
        self.bottom.saturating_sub(self.top)
    }

    pub fn area(&self) -> u64 {
        u64::from(self.width()) * u64::from(self.height())
    }
}

/// One detected face and its encoding.
#[derive(Debug, Clone, PartialEq)]
pub struct DetectedFace {
    pub bounds: FaceBox,
    pub encoding: Vec<f64>,
}

pub trait FaceDetector: Send + Sync {
    fn name(&self) -> &'static str;

    fn detect(&self, image: &RgbImage) -> Result<Vec<DetectedFace>, PipelineError>;
}

/// Detector that never finds a face.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullDetector;

impl FaceDetector for NullDetector {
    fn name(&self) -> &'static str {
        "null"
    }

    fn detect(&self, _image: &RgbImage) -> Result<Vec<DetectedFace>, PipelineError> {
        Ok(Vec::new())
    }
}

/// Encoding of the first face in a reference image.
pub fn reference_encoding(
    detector: &dyn FaceDetector,
    image: &RgbImage,
) -> Result<Vec<f64>, PipelineError> {
    detector
        .detect(image)?
        .into_iter()
        .next()
        .map(|face| face.encoding)
        .ok_or(PipelineError::NoFaceFound)
}
