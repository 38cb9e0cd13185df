//! Handlers for the known-face registry.

use axum::extract::{Multipart, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use visage_db::models::known_face::KnownFaceRow;

use crate::coordinator::faces::{self, RegistrationOutcome};
use crate::coordinator::Upload;
use crate::error::{AppError, AppResult};
use crate::handlers::read_upload;
use crate::response::DataResponse;
use crate::state::AppState;

const IMAGE_FIELD: &str = "image";
const NAME_FIELD: &str = "name";

/// GET /api/v1/faces
pub async fn list_faces(
    State(state): State<AppState>,
) -> AppResult<Json<DataResponse<Vec<KnownFaceRow>>>> {
    let faces = faces::list_known_faces(&state).await?;
    Ok(Json(DataResponse { data: faces }))
}

/// POST /api/v1/faces
///
/// Multipart `image` and `name` fields. Responds 201 once the face is
/// stored, or 202 with the job status if the registration is still running
/// when the wait elapses.
pub async fn register_face(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> AppResult<Response> {
    let mut upload: Option<Upload> = None;
    let mut name: Option<String> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(e.to_string()))?
    {
        let field_name = field.name().map(str::to_owned);
        match field_name.as_deref() {
            Some(IMAGE_FIELD) => upload = Some(read_upload(field).await?),
            Some(NAME_FIELD) => {
                name = Some(
                    field
                        .text()
                        .await
                        .map_err(|e| AppError::BadRequest(e.to_string()))?,
                );
            }
            _ => {}
        }
    }

    let upload = upload.ok_or_else(|| AppError::BadRequest("No image provided".to_string()))?;
    let name = name.ok_or_else(|| AppError::BadRequest("No name provided".to_string()))?;

    let response = match faces::register_face(&state, upload, &name).await? {
        RegistrationOutcome::Registered(face) => {
            (StatusCode::CREATED, Json(DataResponse { data: face })).into_response()
        }
        RegistrationOutcome::Pending(view) => {
            (StatusCode::ACCEPTED, Json(DataResponse { data: view })).into_response()
        }
    };
    Ok(response)
}
