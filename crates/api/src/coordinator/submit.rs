//! Job submission.

use axum::body::Bytes;
use serde::Serialize;
use visage_core::error::CoreError;
use visage_core::job::{new_job_id, JobDescriptor, JobKind};
use visage_core::upload::{staged_name, validate_upload};
use visage_db::repositories::QueueRepo;

use crate::error::{AppError, AppResult};
use crate::state::AppState;

/// Reason reported for a valid upload the queue refused. Details go to the log.
const NOT_QUEUED_REASON: &str = "Could not be queued, try again later";

/// One uploaded file as received from a client.
#[derive(Debug, Clone)]
pub struct Upload {
    pub filename: String,
    pub bytes: Bytes,
}

#[derive(Debug, Clone, Serialize)]
pub struct SubmittedJob {
    pub job_id: String,
    pub filename: String,
}

/// An input skipped at submission, with the reason.
#[derive(Debug, Clone, Serialize)]
pub struct RejectedInput {
    pub filename: String,
    pub reason: String,
}

#[derive(Debug, Default, Serialize)]
pub struct SubmitReport {
    pub jobs: Vec<SubmittedJob>,
    pub rejected: Vec<RejectedInput>,
    /// Valid uploads that could not be staged or enqueued.
    pub failed: Vec<RejectedInput>,
}

/// Create and enqueue one detection job per valid upload.
///
/// Invalid uploads are listed in `rejected` and never reach the queue.
/// Uploads the queue refused are listed in `failed` while the rest of the
/// batch carries on. The submission only fails as a whole when no job was
/// enqueued: with the first enqueue error if any upload got that far,
/// otherwise with a validation error.
pub async fn submit(state: &AppState, uploads: Vec<Upload>) -> AppResult<SubmitReport> {
    if uploads.is_empty() {
        return Err(AppError::BadRequest("No images received".to_string()));
    }

    let mut report = SubmitReport::default();
    let mut first_failure: Option<AppError> = None;
    for upload in uploads {
        let display_name = match validate_upload(&upload.filename, upload.bytes.len() as u64) {
            Ok(name) => name,
            Err(e) => {
                tracing::info!(filename = %upload.filename, reason = %e, "Input rejected");
                report.rejected.push(RejectedInput {
                    filename: upload.filename,
                    reason: e.to_string(),
                });
                continue;
            }
        };

        match stage_and_enqueue(state, JobKind::Detect, &display_name, &upload.bytes).await {
            Ok(job) => report.jobs.push(SubmittedJob {
                job_id: job.job_id,
                filename: job.display_name,
            }),
            Err(e) => {
                tracing::warn!(filename = %display_name, error = %e, "Input not enqueued");
                report.failed.push(RejectedInput {
                    filename: display_name,
                    reason: NOT_QUEUED_REASON.to_string(),
                });
                if first_failure.is_none() {
                    first_failure = Some(e);
                }
            }
        }
    }

    if report.jobs.is_empty() {
        if let Some(e) = first_failure {
            return Err(e);
        }
        let reasons: Vec<String> = report
            .rejected
            .iter()
            .map(|r| format!("{}: {}", r.filename, r.reason))
            .collect();
        return Err(CoreError::Validation(format!(
            "No valid images submitted ({})",
            reasons.join("; ")
        ))
        .into());
    }

    Ok(report)
}

/// Write the input to the upload directory and enqueue a job for it.
///
/// The staged file is removed again if the queue rejects the job.
pub(crate) async fn stage_and_enqueue(
    state: &AppState,
    kind: JobKind,
    display_name: &str,
    bytes: &[u8],
) -> AppResult<JobDescriptor> {
    let job_id = new_job_id();
    let upload_dir = &state.config.upload_dir;
    let path = upload_dir.join(staged_name(&job_id, display_name));

    tokio::fs::create_dir_all(upload_dir)
        .await
        .map_err(|e| AppError::InternalError(format!("Failed to create upload dir: {e}")))?;
    tokio::fs::write(&path, bytes)
        .await
        .map_err(|e| AppError::InternalError(format!("Failed to stage upload: {e}")))?;

    let job = JobDescriptor {
        job_id,
        kind,
        input_ref: path.to_string_lossy().into_owned(),
        display_name: display_name.to_string(),
    };

    if let Err(e) = QueueRepo::enqueue(&state.pool, &job, state.config.state_ttl_ms()).await {
        if let Err(cleanup) = tokio::fs::remove_file(&path).await {
            tracing::warn!(path = %path.display(), error = %cleanup, "Failed to remove staged upload");
        }
        return Err(CoreError::BrokerUnavailable(e.to_string()).into());
    }

    tracing::info!(
        job_id = %job.job_id,
        queue = job.kind.queue(),
        filename = %job.display_name,
        "Job enqueued",
    );
    Ok(job)
}
