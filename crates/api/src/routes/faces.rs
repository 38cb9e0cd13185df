use axum::extract::DefaultBodyLimit;
use axum::routing::get;
use axum::Router;

use crate::handlers::{faces, files};
use crate::state::AppState;

/// Largest accepted reference image upload.
pub const MAX_REFERENCE_BYTES: usize = 16 * 1024 * 1024;

/// Routes mounted at `/faces`.
///
/// ```text
/// GET  /             -> list_faces
/// POST /             -> register_face
/// GET  /{filename}   -> reference_image
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(faces::list_faces)
                .post(faces::register_face)
                .layer(DefaultBodyLimit::max(MAX_REFERENCE_BYTES)),
        )
        .route("/{filename}", get(files::reference_image))
}
