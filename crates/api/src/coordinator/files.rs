//! Read-back of stored artifacts and reference images.

use std::io::ErrorKind;
use std::path::Path;

use visage_core::error::CoreError;
use visage_core::upload::{content_type_for, sanitize_filename};

use crate::error::{AppError, AppResult};
use crate::state::AppState;

/// An image read from one of the storage directories.
#[derive(Debug)]
pub struct StoredFile {
    pub bytes: Vec<u8>,
    pub content_type: &'static str,
}

/// An annotated artifact from the results directory.
pub async fn result_artifact(state: &AppState, filename: &str) -> AppResult<StoredFile> {
    read_stored(&state.config.results_dir, filename, "Artifact").await
}

/// A stored reference image from the known-faces directory.
pub async fn reference_image(state: &AppState, filename: &str) -> AppResult<StoredFile> {
    read_stored(&state.config.known_faces_dir, filename, "Reference image").await
}

/// Read `filename` from `dir`. Names that do not survive sanitising are
/// treated as missing, so nothing outside `dir` is ever read.
async fn read_stored(dir: &Path, filename: &str, entity: &'static str) -> AppResult<StoredFile> {
    let name = sanitize_filename(filename);
    if name != filename {
        return Err(not_found(entity, filename));
    }

    match tokio::fs::read(dir.join(&name)).await {
        Ok(bytes) => Ok(StoredFile {
            bytes,
            content_type: content_type_for(&name),
        }),
        Err(e) if e.kind() == ErrorKind::NotFound => Err(not_found(entity, filename)),
        Err(e) => Err(AppError::InternalError(format!(
            "Failed to read {}: {e}",
            dir.join(&name).display()
        ))),
    }
}

fn not_found(entity: &'static str, filename: &str) -> AppError {
    CoreError::NotFound {
        entity,
        id: filename.to_string(),
    }
    .into()
}
