//! Job queue rows (the broker).

use serde::Serialize;
use sqlx::types::Json;
use sqlx::FromRow;
use visage_core::job::JobDescriptor;
use visage_core::types::{DbId, EpochMs, Timestamp};
use visage_core::worker_pool::InFlightJob;

/// A row from the `job_queue` table.
#[derive(Debug, Clone, FromRow)]
pub struct QueuedJob {
    pub id: DbId,
    pub job_id: String,
    pub queue_name: String,
    pub job_kind: String,
    pub payload: Json<JobDescriptor>,
    pub display_name: String,
    pub enqueued_at: Timestamp,
    pub claimed_by: Option<String>,
    pub claimed_at: Option<Timestamp>,
    pub lease_expires_at_ms: Option<EpochMs>,
    pub delivery_count: i64,
}

impl QueuedJob {
    pub fn descriptor(&self) -> &JobDescriptor {
        &self.payload.0
    }

    /// Census summary of a claimed row.
    pub fn in_flight(&self) -> InFlightJob {
        InFlightJob {
            job_id: self.job_id.clone(),
            kind: self.job_kind.clone(),
            display_name: self.display_name.clone(),
            claimed_at: self.claimed_at.unwrap_or(self.enqueued_at),
        }
    }
}

/// Number of unclaimed jobs waiting in one logical queue.
#[derive(Debug, Clone, FromRow, Serialize, PartialEq, Eq)]
pub struct QueueDepth {
    pub queue_name: String,
    pub depth: i64,
}

/// What one pass of the lease reaper did.
#[derive(Debug, Default)]
pub struct LeaseSweep {
    /// Jobs returned to the unclaimed pool for another delivery.
    pub requeued: u64,
    /// Jobs removed from the queue after reaching the delivery limit.
    pub abandoned: Vec<QueuedJob>,
}
