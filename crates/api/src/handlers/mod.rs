pub mod dashboard;
pub mod faces;
pub mod files;
pub mod jobs;
pub mod results;
pub mod workers;

use axum::extract::multipart::Field;

use crate::coordinator::Upload;
use crate::error::{AppError, AppResult};

/// Read a multipart file field into an [`Upload`].
async fn read_upload(field: Field<'_>) -> AppResult<Upload> {
    let filename = field.file_name().unwrap_or_default().to_string();
    let bytes = field
        .bytes()
        .await
        .map_err(|e| AppError::BadRequest(e.to_string()))?;
    Ok(Upload { filename, bytes })
}
