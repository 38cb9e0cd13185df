//! Handlers for the results ledger.

use axum::extract::{Path, Query, State};
use axum::Json;
use visage_db::models::ledger::{LedgerFilter, LedgerRecord};

use crate::coordinator::results::{self, ClearReport, DeleteReport};
use crate::error::AppResult;
use crate::response::DataResponse;
use crate::state::AppState;

/// GET /api/v1/results
///
/// Query parameters: `status`, `kind`, `display_name`, `since`, `until`,
/// `limit` (default 50, max 200) and `offset`.
pub async fn list_results(
    State(state): State<AppState>,
    Query(filter): Query<LedgerFilter>,
) -> AppResult<Json<DataResponse<Vec<LedgerRecord>>>> {
    let records = results::list_results(&state, &filter).await?;
    Ok(Json(DataResponse { data: records }))
}

/// POST /api/v1/results/clear
pub async fn clear_results(
    State(state): State<AppState>,
) -> AppResult<Json<DataResponse<ClearReport>>> {
    let report = results::clear_all(&state).await?;
    Ok(Json(DataResponse { data: report }))
}

/// DELETE /api/v1/results/{filename}
pub async fn delete_result(
    State(state): State<AppState>,
    Path(filename): Path<String>,
) -> AppResult<Json<DataResponse<DeleteReport>>> {
    let report = results::delete_result(&state, &filename).await?;
    Ok(Json(DataResponse { data: report }))
}
