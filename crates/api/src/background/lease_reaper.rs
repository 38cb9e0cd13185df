//! Redelivery of jobs held by workers that stopped renewing their lease.
//!
//! Every pass returns expired claims to the queue and purges expired job
//! state entries. A job whose lease expires after its last allowed delivery
//! is removed from the queue and counts as lost: only the worker executing a
//! job reports on it, so the reaper writes neither a state nor a ledger
//! record. Pollers see its last reported state until that entry expires.

use std::time::Duration;

use sqlx::SqlitePool;
use tokio_util::sync::CancellationToken;
use visage_core::types::now_ms;
use visage_db::repositories::{JobStateRepo, QueueRepo};

/// Reaper settings, taken from the server configuration.
#[derive(Debug, Clone, Copy)]
pub struct ReaperConfig {
    pub interval: Duration,
    pub max_deliveries: i64,
}

/// What one pass did.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SweepSummary {
    pub requeued: u64,
    pub abandoned: usize,
    pub states_purged: u64,
}

/// Run the reaper loop until `cancel` is triggered.
pub async fn run(pool: SqlitePool, config: ReaperConfig, cancel: CancellationToken) {
    tracing::info!(
        interval_secs = config.interval.as_secs(),
        max_deliveries = config.max_deliveries,
        "Lease reaper started"
    );

    let mut interval = tokio::time::interval(config.interval);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("Lease reaper stopping");
                break;
            }
            _ = interval.tick() => {
                match sweep(&pool, &config).await {
                    Ok(summary) if summary == SweepSummary::default() => {
                        tracing::debug!("Lease reaper: nothing to do");
                    }
                    Ok(summary) => {
                        tracing::info!(
                            requeued = summary.requeued,
                            abandoned = summary.abandoned,
                            states_purged = summary.states_purged,
                            "Lease reaper: sweep complete"
                        );
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "Lease reaper: sweep failed");
                    }
                }
            }
        }
    }
}

/// One reaper pass.
pub async fn sweep(pool: &SqlitePool, config: &ReaperConfig) -> Result<SweepSummary, sqlx::Error> {
    let now = now_ms();
    let released = QueueRepo::release_expired(pool, now, config.max_deliveries).await?;

    for job in &released.abandoned {
        tracing::warn!(
            job_id = %job.job_id,
            filename = %job.display_name,
            deliveries = job.delivery_count,
            last_worker = job.claimed_by.as_deref().unwrap_or_default(),
            "Job lost after its last delivery",
        );
    }

    let states_purged = JobStateRepo::purge_expired(pool, now).await?;

    Ok(SweepSummary {
        requeued: released.requeued,
        abandoned: released.abandoned.len(),
        states_purged,
    })
}
