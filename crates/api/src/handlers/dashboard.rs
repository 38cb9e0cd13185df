//! Handlers for aggregate statistics, the dashboard and queue depth.

use axum::extract::State;
use axum::Json;

use crate::coordinator::census::{self, QueueDepthView};
use crate::coordinator::stats::{self, DashboardView, StatsView};
use crate::error::AppResult;
use crate::response::DataResponse;
use crate::state::AppState;

/// GET /api/v1/stats
pub async fn get_stats(State(state): State<AppState>) -> AppResult<Json<DataResponse<StatsView>>> {
    let data = stats::stats(&state).await?;
    Ok(Json(DataResponse { data }))
}

/// GET /api/v1/dashboard
pub async fn get_dashboard(
    State(state): State<AppState>,
) -> AppResult<Json<DataResponse<DashboardView>>> {
    let data = stats::dashboard(&state).await?;
    Ok(Json(DataResponse { data }))
}

/// GET /api/v1/queue
pub async fn get_queue(
    State(state): State<AppState>,
) -> AppResult<Json<DataResponse<QueueDepthView>>> {
    let data = census::queue_depth(&state).await?;
    Ok(Json(DataResponse { data }))
}
