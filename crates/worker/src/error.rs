use visage_core::error::CoreError;

/// Errors that stop the worker runtime itself.
///
/// Failures of an individual job never surface here: they are written to
/// the job's state and the ledger instead.
#[derive(Debug, thiserror::Error)]
pub enum WorkerError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
