#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    /// The job queue could not be reached; nothing was enqueued.
    #[error("Broker unavailable: {0}")]
    BrokerUnavailable(String),

    #[error("Internal error: {0}")]
    Internal(String),
}
