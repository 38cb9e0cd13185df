use axum::extract::State;
use axum::{routing::get, Json, Router};
use serde::Serialize;

use crate::coordinator::census;
use crate::state::AppState;

/// Liveness of the coordinator and the shared store.
#[derive(Serialize)]
pub struct HealthResponse {
    /// `ok`, or `degraded` when the store is unreachable.
    pub status: &'static str,
    pub version: &'static str,
    pub db_healthy: bool,
    /// Workers with a recent heartbeat. Absent when the store is down.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub live_workers: Option<i64>,
    /// Jobs waiting to be claimed. Absent when the store is down.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub queued_jobs: Option<i64>,
}

/// GET /health
async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let db_healthy = visage_db::health_check(&state.pool).await.is_ok();
    let (live_workers, queued_jobs) = if db_healthy {
        (
            census::live_worker_count(&state).await.ok(),
            census::queue_depth(&state).await.ok().map(|d| d.total),
        )
    } else {
        (None, None)
    };

    Json(HealthResponse {
        status: if db_healthy { "ok" } else { "degraded" },
        version: env!("CARGO_PKG_VERSION"),
        db_healthy,
        live_workers,
        queued_jobs,
    })
}

/// Root-level health route. Not nested under `/api/v1`.
pub fn router() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}
