//! Execution of a single claimed job.
//!
//! Every job runs through one entry point, [`run_job`], which dispatches on
//! the job kind, writes progress checkpoints, and finally records exactly
//! one terminal outcome: a ledger record first, then the terminal job state.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use visage_core::job::{
    elapsed_secs, Checkpoint, DetectionSummary, JobDescriptor, JobKind, JobState,
    RegistrationSummary,
};
use visage_core::recognition::{label_file_stem, Recognition};
use visage_core::upload::{extension_of, staged_name};
use visage_db::models::ledger::{LedgerStatus, NewLedgerRecord};
use visage_db::repositories::{JobStateRepo, KnownFaceRepo, LedgerRepo};
use visage_pipeline::annotate::annotate;
use visage_pipeline::decode::{load_rgb, validate_input};
use visage_pipeline::detector::reference_encoding;
use visage_pipeline::{FaceBox, PipelineError};

use crate::context::WorkerContext;

/// Extension used for reference images whose upload name has none.
const DEFAULT_REFERENCE_EXTENSION: &str = "jpg";

/// Why a job failed. The display string becomes the job's error message.
#[derive(Debug, thiserror::Error)]
pub enum JobError {
    #[error(transparent)]
    Pipeline(#[from] PipelineError),

    #[error("Processing exceeded the time limit of {0}s")]
    SoftTimeLimit(u64),

    #[error("Job exceeded the hard time limit of {0}s")]
    HardTimeLimit(u64),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Processing task failed: {0}")]
    Task(String),
}

/// What a successful job produced.
#[derive(Debug, Clone, PartialEq)]
pub enum JobOutcome {
    Detection {
        artifact: String,
        faces_detected: i64,
        recognized: Vec<String>,
        file_size: u64,
    },
    Registration {
        label: String,
        reference: String,
    },
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

/// Execute `job` and record its outcome.
///
/// Never returns an error: every failure is reported through the job's
/// state and the ledger. The time limits bound processing only. The outcome
/// is recorded exactly once afterwards, so a limit can never cut a report
/// in half.
pub async fn run_job(ctx: &WorkerContext, job: &JobDescriptor) {
    let started = Instant::now();
    tracing::info!(
        job_id = %job.job_id,
        kind = job.kind.name(),
        filename = %job.display_name,
        worker_id = %ctx.worker_id(),
        "Job started",
    );

    let outcome = process_within_limits(ctx, job).await;
    let elapsed = elapsed_secs(started.elapsed());

    match outcome {
        Ok(outcome) => record_success(ctx, job, outcome, elapsed).await,
        Err(e) => {
            if matches!(e, JobError::HardTimeLimit(_)) {
                tracing::error!(job_id = %job.job_id, elapsed, "Hard time limit reached");
            }
            record_failure(ctx, job, &e.to_string(), elapsed).await;
        }
    }
}

async fn process_within_limits(
    ctx: &WorkerContext,
    job: &JobDescriptor,
) -> Result<JobOutcome, JobError> {
    let soft_limit = ctx.config.soft_time_limit;
    let hard_limit = ctx.config.hard_time_limit;
    let bounded = async {
        match tokio::time::timeout(soft_limit, process(ctx, job)).await {
            Ok(result) => result,
            Err(_) => Err(JobError::SoftTimeLimit(soft_limit.as_secs())),
        }
    };
    match tokio::time::timeout(hard_limit, bounded).await {
        Ok(result) => result,
        Err(_) => Err(JobError::HardTimeLimit(hard_limit.as_secs())),
    }
}

/// Run the processing stages for `job` without reporting the outcome.
pub async fn process(ctx: &WorkerContext, job: &JobDescriptor) -> Result<JobOutcome, JobError> {
    match &job.kind {
        JobKind::Detect => detect(ctx, job).await,
        JobKind::Register { label } => register(ctx, job, label).await,
    }
}

// ---------------------------------------------------------------------------
// Detection
// ---------------------------------------------------------------------------

async fn detect(ctx: &WorkerContext, job: &JobDescriptor) -> Result<JobOutcome, JobError> {
    let input = PathBuf::from(&job.input_ref);

    checkpoint(ctx, job, Checkpoint::Validating).await;
    let path = input.clone();
    let file_size = blocking(move || validate_input(&path)).await?;

    checkpoint(ctx, job, Checkpoint::Loading).await;
    let path = input.clone();
    let image = blocking(move || load_rgb(&path)).await?;

    checkpoint(ctx, job, Checkpoint::Detecting).await;
    let registry = match ctx.registry.refresh_if_stale(&ctx.pool).await {
        Ok(registry) => registry,
        Err(e) => {
            tracing::warn!(job_id = %job.job_id, error = %e, "Registry refresh failed, using cached copy");
            ctx.registry.snapshot().await
        }
    };
    let detector = Arc::clone(&ctx.detector);
    let (image, faces) = blocking(move || {
        let faces = detector.detect(&image)?;
        Ok((image, faces))
    })
    .await?;

    checkpoint(ctx, job, Checkpoint::Recognizing).await;
    let tolerance = ctx.config.match_tolerance;
    let matched: Vec<(FaceBox, Option<Recognition>)> = faces
        .iter()
        .map(|face| (face.bounds, registry.recognize(&face.encoding, tolerance)))
        .collect();
    let recognized: Vec<String> = matched
        .iter()
        .filter_map(|(_, hit)| hit.as_ref().map(ToString::to_string))
        .collect();

    checkpoint(ctx, job, Checkpoint::Saving).await;
    let artifact = staged_name(&job.job_id, &job.display_name);
    let out_path = ctx.config.results_dir.join(&artifact);
    let encoders = Arc::clone(&ctx.encoders);
    let saved = blocking(move || {
        let mut image = image;
        annotate(&mut image, &matched);
        encoders.save(&image, &out_path)
    })
    .await?;
    tracing::debug!(
        job_id = %job.job_id,
        bytes = saved.bytes,
        encoder = saved.encoder,
        "Artifact saved",
    );

    checkpoint(ctx, job, Checkpoint::Complete).await;
    Ok(JobOutcome::Detection {
        artifact,
        faces_detected: faces.len() as i64,
        recognized,
        file_size,
    })
}

// ---------------------------------------------------------------------------
// Registration
// ---------------------------------------------------------------------------

async fn register(
    ctx: &WorkerContext,
    job: &JobDescriptor,
    label: &str,
) -> Result<JobOutcome, JobError> {
    let input = PathBuf::from(&job.input_ref);

    checkpoint(ctx, job, Checkpoint::Validating).await;
    let path = input.clone();
    blocking(move || validate_input(&path)).await?;

    checkpoint(ctx, job, Checkpoint::Loading).await;
    let path = input.clone();
    let image = blocking(move || load_rgb(&path)).await?;

    checkpoint(ctx, job, Checkpoint::Detecting).await;
    let detector = Arc::clone(&ctx.detector);
    let encoding = blocking(move || reference_encoding(detector.as_ref(), &image)).await?;

    checkpoint(ctx, job, Checkpoint::Saving).await;
    let extension = extension_of(&job.display_name)
        .unwrap_or_else(|| DEFAULT_REFERENCE_EXTENSION.to_string());
    let reference = format!("{}.{extension}", label_file_stem(label));
    let target = ctx.config.known_faces_dir.join(&reference);
    blocking(move || store_reference(&input, &target)).await?;

    KnownFaceRepo::upsert(&ctx.pool, label, &encoding, &reference).await?;
    ctx.registry.reload(&ctx.pool).await?;

    checkpoint(ctx, job, Checkpoint::Complete).await;
    Ok(JobOutcome::Registration {
        label: label.to_string(),
        reference,
    })
}

fn store_reference(input: &Path, target: &Path) -> Result<(), PipelineError> {
    if let Some(parent) = target.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::copy(input, target)?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Reporting
// ---------------------------------------------------------------------------

async fn record_success(
    ctx: &WorkerContext,
    job: &JobDescriptor,
    outcome: JobOutcome,
    elapsed: f64,
) {
    let worker_id = ctx.worker_id().to_string();
    let (record, result) = match outcome {
        JobOutcome::Detection {
            artifact,
            faces_detected,
            recognized,
            file_size,
        } => {
            let summary = DetectionSummary {
                job_id: job.job_id.clone(),
                filename: job.display_name.clone(),
                artifact: artifact.clone(),
                faces_detected,
                recognized_faces: recognized.clone(),
                processing_time: elapsed,
                worker: worker_id.clone(),
                file_size,
            };
            let record = NewLedgerRecord {
                job_id: job.job_id.clone(),
                job_kind: job.kind.name().to_string(),
                display_name: job.display_name.clone(),
                faces_detected,
                recognized_labels: recognized,
                duration_seconds: elapsed,
                worker_id,
                artifact_ref: artifact,
                status: LedgerStatus::Success,
                error_message: None,
            };
            (record, serde_json::to_value(summary))
        }
        JobOutcome::Registration { label, reference } => {
            let summary = RegistrationSummary {
                job_id: job.job_id.clone(),
                label: label.clone(),
                reference: reference.clone(),
            };
            let record = NewLedgerRecord {
                job_id: job.job_id.clone(),
                job_kind: job.kind.name().to_string(),
                display_name: job.display_name.clone(),
                faces_detected: 1,
                recognized_labels: vec![label],
                duration_seconds: elapsed,
                worker_id,
                artifact_ref: reference,
                status: LedgerStatus::Success,
                error_message: None,
            };
            (record, serde_json::to_value(summary))
        }
    };

    append_ledger(ctx, &record).await;

    let result = match result {
        Ok(value) => value,
        Err(e) => {
            tracing::error!(job_id = %job.job_id, error = %e, "Failed to serialize job result");
            serde_json::Value::Null
        }
    };
    set_state(ctx, &JobState::succeeded(job, result)).await;

    tracing::info!(
        job_id = %job.job_id,
        processing_time = elapsed,
        faces = record.faces_detected,
        "Job succeeded",
    );
}

async fn record_failure(ctx: &WorkerContext, job: &JobDescriptor, error: &str, elapsed: f64) {
    let record = NewLedgerRecord {
        job_id: job.job_id.clone(),
        job_kind: job.kind.name().to_string(),
        display_name: job.display_name.clone(),
        faces_detected: 0,
        recognized_labels: Vec::new(),
        duration_seconds: elapsed,
        worker_id: ctx.worker_id().to_string(),
        artifact_ref: String::new(),
        status: LedgerStatus::Error,
        error_message: Some(error.to_string()),
    };
    append_ledger(ctx, &record).await;
    set_state(ctx, &JobState::failed(job, error, elapsed)).await;

    tracing::warn!(job_id = %job.job_id, processing_time = elapsed, error, "Job failed");
}

async fn append_ledger(ctx: &WorkerContext, record: &NewLedgerRecord) {
    match LedgerRepo::append(&ctx.pool, record).await {
        Ok(true) => {}
        Ok(false) => {
            tracing::warn!(job_id = %record.job_id, "Ledger already holds an outcome for this job");
        }
        Err(e) => {
            tracing::error!(job_id = %record.job_id, error = %e, "Failed to write ledger record");
        }
    }
}

async fn set_state(ctx: &WorkerContext, state: &JobState) {
    match JobStateRepo::set(&ctx.pool, state, ctx.config.state_ttl_ms()).await {
        Ok(true) => {}
        Ok(false) => {
            tracing::debug!(job_id = %state.job_id, phase = state.phase.as_str(), "State write ignored, job already terminal");
        }
        Err(e) => {
            tracing::error!(job_id = %state.job_id, error = %e, "Failed to write job state");
        }
    }
}

async fn checkpoint(ctx: &WorkerContext, job: &JobDescriptor, checkpoint: Checkpoint) {
    set_state(ctx, &JobState::at_checkpoint(job, checkpoint)).await;
}

/// Run a CPU or filesystem bound stage on the blocking pool.
async fn blocking<T, F>(stage: F) -> Result<T, JobError>
where
    F: FnOnce() -> Result<T, PipelineError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(stage)
        .await
        .map_err(|e| JobError::Task(e.to_string()))?
        .map_err(JobError::from)
}
