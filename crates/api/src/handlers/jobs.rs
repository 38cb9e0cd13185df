//! Handlers for job submission and status.

use axum::extract::{Multipart, Path, State};
use axum::http::StatusCode;
use axum::Json;
use visage_core::job::StatusView;

use crate::coordinator::submit::{self, SubmitReport};
use crate::coordinator::status;
use crate::error::{AppError, AppResult};
use crate::handlers::read_upload;
use crate::response::DataResponse;
use crate::state::AppState;

/// Multipart field carrying submitted images.
const IMAGES_FIELD: &str = "images";

/// POST /api/v1/jobs
///
/// Accepts any number of `images` fields and enqueues one detection job per
/// valid file. Invalid files are listed under `rejected`, valid files the
/// queue refused under `failed`.
pub async fn submit_jobs(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> AppResult<(StatusCode, Json<DataResponse<SubmitReport>>)> {
    let mut uploads = Vec::new();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(e.to_string()))?
    {
        if field.name() == Some(IMAGES_FIELD) {
            uploads.push(read_upload(field).await?);
        }
    }

    let report = submit::submit(&state, uploads).await?;
    Ok((StatusCode::ACCEPTED, Json(DataResponse { data: report })))
}

/// GET /api/v1/jobs/{job_id}/status
pub async fn job_status(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> AppResult<Json<DataResponse<StatusView>>> {
    let view = status::status(&state, &job_id).await?;
    Ok(Json(DataResponse { data: view }))
}
