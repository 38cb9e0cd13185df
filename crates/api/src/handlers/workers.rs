//! Handlers for the worker census.

use axum::extract::State;
use axum::Json;
use serde::Serialize;
use visage_core::worker_pool::WorkerDescriptor;

use crate::coordinator::census;
use crate::error::AppResult;
use crate::response::DataResponse;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct WorkerCount {
    pub count: i64,
}

/// GET /api/v1/workers
pub async fn list_workers(
    State(state): State<AppState>,
) -> AppResult<Json<DataResponse<Vec<WorkerDescriptor>>>> {
    let workers = census::worker_census(&state).await?;
    Ok(Json(DataResponse { data: workers }))
}

/// GET /api/v1/workers/count
pub async fn worker_count(
    State(state): State<AppState>,
) -> AppResult<Json<DataResponse<WorkerCount>>> {
    let count = census::live_worker_count(&state).await?;
    Ok(Json(DataResponse {
        data: WorkerCount { count },
    }))
}
