//! Worker heartbeat rows.

use serde::Serialize;
use sqlx::types::Json;
use sqlx::FromRow;
use visage_core::types::{EpochMs, Timestamp};

/// A row from the `workers` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct WorkerRow {
    pub worker_id: String,
    pub hostname: String,
    pub queues: Json<Vec<String>>,
    pub concurrency: i64,
    pub total_completed: i64,
    pub registered_at: Timestamp,
    pub last_heartbeat_at: Timestamp,
    pub last_heartbeat_ms: EpochMs,
    pub stopped_at: Option<Timestamp>,
}

/// DTO for a worker announcing itself at startup.
#[derive(Debug, Clone)]
pub struct RegisterWorker {
    pub worker_id: String,
    pub hostname: String,
    pub queues: Vec<String>,
    pub concurrency: i64,
}
