//! Image stages executed by a worker for one job.
//!
//! Each stage is synchronous and CPU-bound; the worker runs them on the
//! blocking pool and reports a progress checkpoint between stages.

pub mod annotate;
pub mod decode;
pub mod detector;
pub mod encode;
pub mod error;

pub use detector::{DetectedFace, FaceBox, FaceDetector, NullDetector};
pub use encode::{ArtifactEncoder, EncoderChain, SavedArtifact};
pub use error::PipelineError;
