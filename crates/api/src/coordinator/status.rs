//! Status queries.

use std::time::Duration;

use serde_json::json;
use tokio::time::Instant;
use visage_core::error::CoreError;
use visage_core::job::{JobDescriptor, JobKind, JobState, StatusView};
use visage_core::types::now_ms;
use visage_db::models::ledger::LedgerRecord;
use visage_db::repositories::{JobStateRepo, LedgerRepo};

use crate::error::AppResult;
use crate::state::AppState;

/// Interval between state reads while waiting for a job.
const AWAIT_POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Current status of `job_id`.
///
/// Reads the state tracker first. Once its entry has expired the most
/// recent ledger record is turned back into a terminal state.
pub async fn status(state: &AppState, job_id: &str) -> AppResult<StatusView> {
    if let Some(current) = JobStateRepo::get(&state.pool, job_id, now_ms()).await? {
        return Ok(JobState::try_from(current)?.into());
    }

    match LedgerRepo::find_latest_by_job_id(&state.pool, job_id).await? {
        Some(record) => Ok(state_from_ledger(&record).into()),
        None => Err(CoreError::NotFound {
            entity: "Job",
            id: job_id.to_string(),
        }
        .into()),
    }
}

/// Poll the status of `job_id` until it is terminal or `timeout` elapses.
///
/// Returns the last status seen, which is not terminal on timeout.
pub async fn await_terminal(
    state: &AppState,
    job_id: &str,
    timeout: Duration,
) -> AppResult<StatusView> {
    let deadline = Instant::now() + timeout;
    loop {
        let view = status(state, job_id).await?;
        if view.state.is_terminal() || Instant::now() >= deadline {
            return Ok(view);
        }
        tokio::time::sleep(AWAIT_POLL_INTERVAL).await;
    }
}

/// Synthesise the terminal state recorded by a ledger entry.
pub fn state_from_ledger(record: &LedgerRecord) -> JobState {
    let labels = &record.recognized_labels.0;
    let kind = if record.job_kind == JobKind::Detect.name() {
        JobKind::Detect
    } else {
        JobKind::Register {
            label: labels.first().cloned().unwrap_or_default(),
        }
    };
    let job = JobDescriptor {
        job_id: record.job_id.clone(),
        kind,
        input_ref: String::new(),
        display_name: record.display_name.clone(),
    };

    if !record.is_success() {
        let error = record
            .error_message
            .clone()
            .unwrap_or_else(|| "Processing failed".to_string());
        return JobState::failed(&job, error, record.duration_seconds);
    }

    let result = match &job.kind {
        JobKind::Detect => json!({
            "job_id": record.job_id,
            "filename": record.display_name,
            "artifact": record.artifact_ref,
            "faces_detected": record.faces_detected,
            "recognized_faces": labels,
            "processing_time": record.duration_seconds,
            "worker": record.worker_id,
        }),
        JobKind::Register { label } => json!({
            "job_id": record.job_id,
            "label": label,
            "reference": record.artifact_ref,
        }),
    };
    JobState::succeeded(&job, result)
}
