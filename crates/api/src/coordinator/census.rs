//! Worker census and queue depth.

use std::collections::HashMap;

use serde::Serialize;
use visage_core::job::ALL_QUEUES;
use visage_core::types::now_ms;
use visage_core::worker_pool::{liveness_cutoff, InFlightJob, WorkerDescriptor};
use visage_db::models::queue::QueueDepth;
use visage_db::repositories::{QueueRepo, WorkerRepo};

use crate::error::AppResult;
use crate::state::AppState;

/// Live workers with the jobs each one currently holds.
///
/// A worker is live while its heartbeat is younger than the configured
/// timeout and it has not announced a stop.
pub async fn worker_census(state: &AppState) -> AppResult<Vec<WorkerDescriptor>> {
    let cutoff = liveness_cutoff(now_ms(), state.config.worker_timeout_secs);
    let workers = WorkerRepo::list_live(&state.pool, cutoff).await?;
    let claimed = QueueRepo::list_claimed(&state.pool).await?;

    let mut in_flight: HashMap<String, Vec<InFlightJob>> = HashMap::new();
    for job in &claimed {
        if let Some(holder) = &job.claimed_by {
            in_flight
                .entry(holder.clone())
                .or_default()
                .push(job.in_flight());
        }
    }

    Ok(workers
        .into_iter()
        .map(|row| {
            let jobs = in_flight.remove(&row.worker_id).unwrap_or_default();
            WorkerDescriptor {
                busy: !jobs.is_empty(),
                in_flight: jobs,
                worker_id: row.worker_id,
                hostname: row.hostname,
                queues: row.queues.0,
                concurrency: row.concurrency,
                total_completed: row.total_completed,
                last_heartbeat_at: row.last_heartbeat_at,
            }
        })
        .collect())
}

pub async fn live_worker_count(state: &AppState) -> AppResult<i64> {
    let cutoff = liveness_cutoff(now_ms(), state.config.worker_timeout_secs);
    Ok(WorkerRepo::count_live(&state.pool, cutoff).await?)
}

/// Waiting jobs per logical queue.
#[derive(Debug, Serialize)]
pub struct QueueDepthView {
    pub queues: Vec<QueueDepth>,
    pub total: i64,
}

/// Unclaimed jobs in every known queue, including empty ones.
pub async fn queue_depth(state: &AppState) -> AppResult<QueueDepthView> {
    let stored = QueueRepo::depths(&state.pool).await?;
    let mut queues: Vec<QueueDepth> = ALL_QUEUES
        .iter()
        .map(|name| QueueDepth {
            queue_name: name.to_string(),
            depth: 0,
        })
        .collect();
    for depth in stored {
        match queues.iter_mut().find(|q| q.queue_name == depth.queue_name) {
            Some(known) => known.depth = depth.depth,
            None => queues.push(depth),
        }
    }
    let total = queues.iter().map(|q| q.depth).sum();
    Ok(QueueDepthView { queues, total })
}
