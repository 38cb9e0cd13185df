/// Failure of one pipeline stage. Always local to a single job.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("File does not exist: {0}")]
    InputMissing(String),

    #[error("File is empty: {0}")]
    InputEmpty(String),

    #[error("Cannot decode image {path}: {reason}")]
    Decode { path: String, reason: String },

    #[error("Face detection failed: {0}")]
    Detection(String),

    #[error("No face found in the reference image")]
    NoFaceFound,

    #[error("Could not save artifact {path} (primary: {primary}; fallback: {secondary})")]
    ArtifactSave {
        path: String,
        primary: String,
        secondary: String,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
