use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;

use crate::handlers::jobs;
use crate::state::AppState;

/// Largest accepted submission body, all images together.
pub const MAX_SUBMISSION_BYTES: usize = 64 * 1024 * 1024;

/// Routes mounted at `/jobs`.
///
/// ```text
/// POST /                   -> submit_jobs
/// GET  /{job_id}/status    -> job_status
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            post(jobs::submit_jobs).layer(DefaultBodyLimit::max(MAX_SUBMISSION_BYTES)),
        )
        .route("/{job_id}/status", get(jobs::job_status))
}
