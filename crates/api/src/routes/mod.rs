pub mod dashboard;
pub mod faces;
pub mod health;
pub mod jobs;
pub mod results;
pub mod workers;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /jobs                          submit (POST, multipart `images`)
/// /jobs/{job_id}/status          job status
///
/// /workers                       live worker census
/// /workers/count                 live worker count
///
/// /stats                         aggregate stats
/// /dashboard                     dashboard payload
/// /queue                         queue depth
///
/// /results                       ledger listing
/// /results/clear                 bulk clear (POST)
/// /results/{filename}            artifact image (GET), targeted delete (DELETE)
///
/// /faces                         list, register (POST, multipart `image` + `name`)
/// /faces/{filename}              reference image
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/jobs", jobs::router())
        .nest("/workers", workers::router())
        .nest("/results", results::router())
        .nest("/faces", faces::router())
        .merge(dashboard::router())
}
