//! Heartbeat loop run alongside the job loop.
//!
//! Every tick refreshes the worker's liveness row and, while a job is in
//! flight, extends that job's claim lease so the reaper leaves it alone.

use chrono::Utc;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use visage_db::repositories::{QueueRepo, WorkerRepo};

use crate::context::WorkerContext;

/// Run until `cancel` fires. `current` carries the id of the job being
/// executed, or `None` while idle.
pub async fn run(
    ctx: WorkerContext,
    current: watch::Receiver<Option<String>>,
    cancel: CancellationToken,
) {
    let mut interval = tokio::time::interval(ctx.config.heartbeat_interval);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::debug!(worker_id = %ctx.worker_id(), "Heartbeat stopping");
                break;
            }
            _ = interval.tick() => {
                let job_id = current.borrow().clone();
                beat(&ctx, job_id).await;
            }
        }
    }
}

async fn beat(ctx: &WorkerContext, job_id: Option<String>) {
    match WorkerRepo::heartbeat(&ctx.pool, ctx.worker_id()).await {
        Ok(true) => {}
        Ok(false) => {
            tracing::warn!(worker_id = %ctx.worker_id(), "Heartbeat for unregistered worker");
        }
        Err(e) => {
            tracing::error!(worker_id = %ctx.worker_id(), error = %e, "Heartbeat failed");
        }
    }

    let Some(job_id) = job_id else {
        return;
    };
    let expires = Utc::now().timestamp_millis() + ctx.config.lease_ms();
    match QueueRepo::renew_lease(&ctx.pool, ctx.worker_id(), &job_id, expires).await {
        Ok(true) => {}
        Ok(false) => {
            tracing::warn!(
                worker_id = %ctx.worker_id(),
                job_id = %job_id,
                "Lease lost, job may be redelivered",
            );
        }
        Err(e) => {
            tracing::error!(job_id = %job_id, error = %e, "Lease renewal failed");
        }
    }
}
