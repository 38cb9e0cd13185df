use axum::routing::get;
use axum::Router;

use crate::handlers::dashboard;
use crate::state::AppState;

/// Top-level read-only routes.
///
/// ```text
/// GET /stats       -> get_stats
/// GET /dashboard   -> get_dashboard
/// GET /queue       -> get_queue
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/stats", get(dashboard::get_stats))
        .route("/dashboard", get(dashboard::get_dashboard))
        .route("/queue", get(dashboard::get_queue))
}
