//! Known-face registration.

use std::time::Duration;

use serde::Serialize;
use visage_core::error::CoreError;
use visage_core::job::{JobKind, JobPhase, StatusView};
use visage_core::recognition::normalize_label;
use visage_core::upload::validate_upload;
use visage_db::models::known_face::KnownFaceRow;
use visage_db::repositories::KnownFaceRepo;

use crate::coordinator::status::await_terminal;
use crate::coordinator::submit::{stage_and_enqueue, Upload};
use crate::error::AppResult;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct RegisteredFace {
    pub job_id: String,
    pub label: String,
    pub reference: String,
}

/// Result of a registration request.
#[derive(Debug)]
pub enum RegistrationOutcome {
    /// The encoding is stored and visible to every worker.
    Registered(RegisteredFace),
    /// The wait elapsed first; the job is still queued or running.
    Pending(StatusView),
}

/// Enqueue a registration job for `upload` under `name` and wait for it.
///
/// A registration that fails (for example because the image holds no face)
/// is reported as a validation error.
pub async fn register_face(
    state: &AppState,
    upload: Upload,
    name: &str,
) -> AppResult<RegistrationOutcome> {
    let label = normalize_label(name)?;
    let display_name = validate_upload(&upload.filename, upload.bytes.len() as u64)?;

    let job = stage_and_enqueue(
        state,
        JobKind::Register {
            label: label.clone(),
        },
        &display_name,
        &upload.bytes,
    )
    .await?;

    let wait = Duration::from_secs(state.config.register_wait_secs);
    let view = await_terminal(state, &job.job_id, wait).await?;

    match view.state {
        JobPhase::Success => {
            let reference = view
                .result
                .as_ref()
                .and_then(|r| r.get("reference"))
                .and_then(|r| r.as_str())
                .unwrap_or_default()
                .to_string();
            tracing::info!(job_id = %job.job_id, label = %label, "Face registered");
            Ok(RegistrationOutcome::Registered(RegisteredFace {
                job_id: job.job_id,
                label,
                reference,
            }))
        }
        JobPhase::Failure => Err(CoreError::Validation(
            view.error
                .unwrap_or_else(|| "Face registration failed".to_string()),
        )
        .into()),
        _ => {
            tracing::info!(job_id = %job.job_id, label = %label, "Registration still pending");
            Ok(RegistrationOutcome::Pending(view))
        }
    }
}

pub async fn list_known_faces(state: &AppState) -> AppResult<Vec<KnownFaceRow>> {
    Ok(KnownFaceRepo::list_all(&state.pool).await?)
}
