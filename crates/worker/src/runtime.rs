//! The worker's main loop.
//!
//! Registers the worker, then claims and executes one job at a time until
//! cancelled. Cancellation is only observed between jobs: a job already in
//! flight always runs to its recorded outcome.

use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use visage_core::worker_pool::{validate_queues, validate_worker_name};
use visage_db::models::queue::QueuedJob;
use visage_db::models::worker::RegisterWorker;
use visage_db::repositories::{QueueRepo, WorkerRepo};

use crate::context::WorkerContext;
use crate::error::WorkerError;
use crate::{execute, heartbeat};

/// Run the worker until `cancel` fires.
pub async fn run(ctx: WorkerContext, cancel: CancellationToken) -> Result<(), WorkerError> {
    startup(&ctx).await?;

    let (current_tx, current_rx) = watch::channel(None::<String>);
    let heartbeat_cancel = cancel.child_token();
    let heartbeat = tokio::spawn(heartbeat::run(
        ctx.clone(),
        current_rx,
        heartbeat_cancel.clone(),
    ));

    while let Some(queued) = next_job(&ctx, &cancel).await {
        current_tx.send_replace(Some(queued.job_id.clone()));
        execute::run_job(&ctx, queued.descriptor()).await;
        finish(&ctx, &queued).await;
        current_tx.send_replace(None);
    }

    heartbeat_cancel.cancel();
    if let Err(e) = heartbeat.await {
        tracing::error!(error = %e, "Heartbeat task panicked");
    }

    WorkerRepo::mark_stopped(&ctx.pool, ctx.worker_id()).await?;
    tracing::info!(worker_id = %ctx.worker_id(), "Worker stopped");
    Ok(())
}

/// Validate identity, create output directories, register the worker row
/// and load the known-face registry.
async fn startup(ctx: &WorkerContext) -> Result<(), WorkerError> {
    let config = &ctx.config;
    validate_worker_name(&config.worker_id)?;
    validate_queues(&config.queues)?;

    tokio::fs::create_dir_all(&config.results_dir).await?;
    tokio::fs::create_dir_all(&config.known_faces_dir).await?;

    WorkerRepo::register(
        &ctx.pool,
        &RegisterWorker {
            worker_id: config.worker_id.clone(),
            hostname: config.hostname.clone(),
            queues: config.queues.clone(),
            concurrency: config.concurrency,
        },
    )
    .await?;
    let registry = ctx.registry.reload(&ctx.pool).await?;

    tracing::info!(
        worker_id = %config.worker_id,
        queues = ?config.queues,
        known_faces = registry.len(),
        "Worker registered",
    );
    Ok(())
}

/// Block until a job is claimed or `cancel` fires.
///
/// Database errors while polling are logged and retried after the poll
/// interval.
pub async fn next_job(ctx: &WorkerContext, cancel: &CancellationToken) -> Option<QueuedJob> {
    loop {
        if cancel.is_cancelled() {
            return None;
        }

        match QueueRepo::claim_next(
            &ctx.pool,
            ctx.worker_id(),
            &ctx.config.queues,
            ctx.config.lease_ms(),
        )
        .await
        {
            Ok(Some(job)) => {
                tracing::debug!(
                    job_id = %job.job_id,
                    queue = %job.queue_name,
                    delivery = job.delivery_count,
                    "Job claimed",
                );
                return Some(job);
            }
            Ok(None) => {}
            Err(e) => {
                tracing::error!(worker_id = %ctx.worker_id(), error = %e, "Failed to poll queue");
            }
        }

        tokio::select! {
            _ = cancel.cancelled() => return None,
            _ = tokio::time::sleep(ctx.config.poll_interval) => {}
        }
    }
}

/// Count the completion and acknowledge the job so it leaves the queue.
async fn finish(ctx: &WorkerContext, queued: &QueuedJob) {
    if let Err(e) = WorkerRepo::record_completion(&ctx.pool, ctx.worker_id()).await {
        tracing::error!(worker_id = %ctx.worker_id(), error = %e, "Failed to count completion");
    }
    match QueueRepo::ack(&ctx.pool, ctx.worker_id(), &queued.job_id).await {
        Ok(true) => {}
        Ok(false) => {
            tracing::warn!(job_id = %queued.job_id, "Job was reclaimed before acknowledgement");
        }
        Err(e) => {
            tracing::error!(job_id = %queued.job_id, error = %e, "Failed to acknowledge job");
        }
    }
}
