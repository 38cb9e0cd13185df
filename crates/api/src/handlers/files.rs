//! Handlers that serve stored images.

use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::Response;

use crate::coordinator::files::{self, StoredFile};
use crate::error::{AppError, AppResult};
use crate::state::AppState;

/// GET /api/v1/results/{filename}
pub async fn result_image(
    State(state): State<AppState>,
    Path(filename): Path<String>,
) -> AppResult<Response> {
    image_response(files::result_artifact(&state, &filename).await?)
}

/// GET /api/v1/faces/{filename}
pub async fn reference_image(
    State(state): State<AppState>,
    Path(filename): Path<String>,
) -> AppResult<Response> {
    image_response(files::reference_image(&state, &filename).await?)
}

fn image_response(file: StoredFile) -> AppResult<Response> {
    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, file.content_type)
        .header(header::CONTENT_LENGTH, file.bytes.len().to_string())
        .header(header::CACHE_CONTROL, HeaderValue::from_static("no-cache"))
        .body(Body::from(file.bytes))
        .map_err(|e| AppError::InternalError(e.to_string()))
}
