use axum::routing::{get, post};
use axum::Router;

use crate::handlers::{files, results};
use crate::state::AppState;

/// Routes mounted at `/results`.
///
/// ```text
/// GET    /             -> list_results
/// POST   /clear        -> clear_results
/// GET    /{filename}   -> result_image
/// DELETE /{filename}   -> delete_result
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(results::list_results))
        .route("/clear", post(results::clear_results))
        .route(
            "/{filename}",
            get(files::result_image).delete(results::delete_result),
        )
}
