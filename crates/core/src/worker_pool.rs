//! Worker pool constants, liveness rules, and census types.
//!
//! Pure functions shared by the coordinator (census) and the worker runtime
//! (registration and heartbeat).

use serde::Serialize;

use crate::error::CoreError;
use crate::types::{EpochMs, Timestamp};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Jobs a worker process executes at once. Scale out by adding processes.
pub const WORKER_CONCURRENCY: i64 = 1;

/// How often a worker refreshes its heartbeat and in-flight lease.
pub const DEFAULT_HEARTBEAT_INTERVAL_SECS: u64 = 5;

/// A worker whose last heartbeat is older than this is left out of the census.
pub const DEFAULT_WORKER_TIMEOUT_SECS: u64 = 30;

/// Maximum length of a worker id.
const MAX_NAME_LEN: usize = 128;

// ---------------------------------------------------------------------------
// Census types
// ---------------------------------------------------------------------------

/// A job currently claimed by a worker.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InFlightJob {
    pub job_id: String,
    pub kind: String,
    pub display_name: String,
    pub claimed_at: Timestamp,
}

/// Live view of one worker, derived from its heartbeat row and its claims.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WorkerDescriptor {
    pub worker_id: String,
    pub hostname: String,
    pub queues: Vec<String>,
    pub concurrency: i64,
    pub busy: bool,
    pub in_flight: Vec<InFlightJob>,
    pub total_completed: i64,
    pub last_heartbeat_at: Timestamp,
}

// ---------------------------------------------------------------------------
// Liveness
// ---------------------------------------------------------------------------

/// Whether a heartbeat at `last_heartbeat_ms` is recent enough at `now_ms`.
pub fn is_alive(last_heartbeat_ms: EpochMs, now_ms: EpochMs, timeout_secs: u64) -> bool {
    now_ms.saturating_sub(last_heartbeat_ms) <= (timeout_secs as i64) * 1000
}

/// Oldest heartbeat still counted as alive at `now_ms`.
pub fn liveness_cutoff(now_ms: EpochMs, timeout_secs: u64) -> EpochMs {
    now_ms - (timeout_secs as i64) * 1000
}

// ---------------------------------------------------------------------------
// Identity
// ---------------------------------------------------------------------------

/// A fresh worker id of the form `worker-1a2b3c4d`.
pub fn generate_worker_id() -> String {
    let id = uuid::Uuid::new_v4().simple().to_string();
    format!("worker-{}", &id[..8])
}

/// Validate a worker id.
///
/// Rules:
/// - Must not be empty.
/// - Must not exceed `MAX_NAME_LEN` characters.
/// - Must contain only alphanumeric, hyphen, underscore, dot, or `@` characters.
pub fn validate_worker_name(name: &str) -> Result<(), CoreError> {
    if name.is_empty() {
        return Err(CoreError::Validation(
            "Worker id must not be empty".to_string(),
        ));
    }
    if name.len() > MAX_NAME_LEN {
        return Err(CoreError::Validation(format!(
            "Worker id must not exceed {MAX_NAME_LEN} characters"
        )));
    }
    if !name
        .chars()
        .all(|c| c.is_alphanumeric() || matches!(c, '-' | '_' | '.' | '@'))
    {
        return Err(CoreError::Validation(
            "Worker id may only contain alphanumeric, hyphen, underscore, dot, or @ characters"
                .to_string(),
        ));
    }
    Ok(())
}

/// Validate the queue names a worker subscribes to.
pub fn validate_queues(queues: &[String]) -> Result<(), CoreError> {
    if queues.is_empty() {
        return Err(CoreError::Validation(
            "A worker must consume at least one queue".to_string(),
        ));
    }
    if let Some(unknown) = queues
        .iter()
        .find(|q| !crate::job::ALL_QUEUES.contains(&q.as_str()))
    {
        return Err(CoreError::Validation(format!("Unknown queue \"{unknown}\"")));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
