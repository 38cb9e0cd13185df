//! Repository for the `workers` table.

use chrono::Utc;
use sqlx::types::Json;
use sqlx::SqlitePool;
use visage_core::types::EpochMs;

use crate::models::worker::{RegisterWorker, WorkerRow};

/// Column list for `workers` queries.
const COLUMNS: &str = "\
    worker_id, hostname, queues, concurrency, total_completed, \
    registered_at, last_heartbeat_at, last_heartbeat_ms, stopped_at";

/// Provides registration, heartbeat and census queries for workers.
pub struct WorkerRepo;

impl WorkerRepo {
    // ── Registration ─────────────────────────────────────────────────────

    /// Register a worker, or revive an existing row with the same id (upsert).
    ///
    /// `total_completed` survives a restart under the same id.
    pub async fn register(
        pool: &SqlitePool,
        input: &RegisterWorker,
    ) -> Result<WorkerRow, sqlx::Error> {
        let now = Utc::now();
        let query = format!(
            "INSERT INTO workers \
                (worker_id, hostname, queues, concurrency, registered_at, \
                 last_heartbeat_at, last_heartbeat_ms) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?5, ?6) \
             ON CONFLICT (worker_id) DO UPDATE SET \
                hostname = excluded.hostname, \
                queues = excluded.queues, \
                concurrency = excluded.concurrency, \
                registered_at = excluded.registered_at, \
                last_heartbeat_at = excluded.last_heartbeat_at, \
                last_heartbeat_ms = excluded.last_heartbeat_ms, \
                stopped_at = NULL \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, WorkerRow>(&query)
            .bind(&input.worker_id)
            .bind(&input.hostname)
            .bind(Json(&input.queues))
            .bind(input.concurrency)
            .bind(now)
            .bind(now.timestamp_millis())
            .fetch_one(pool)
            .await
    }

    // ── Heartbeat ────────────────────────────────────────────────────────

    /// Refresh the heartbeat. Returns `false` if the worker is unknown.
    pub async fn heartbeat(pool: &SqlitePool, worker_id: &str) -> Result<bool, sqlx::Error> {
        let now = Utc::now();
        let result = sqlx::query(
            "UPDATE workers SET last_heartbeat_at = ?1, last_heartbeat_ms = ?2 \
             WHERE worker_id = ?3",
        )
        .bind(now)
        .bind(now.timestamp_millis())
        .bind(worker_id)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Count one more finished job for `worker_id`.
    pub async fn record_completion(pool: &SqlitePool, worker_id: &str) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE workers SET total_completed = total_completed + 1 WHERE worker_id = ?1")
            .bind(worker_id)
            .execute(pool)
            .await?;
        Ok(())
    }

    /// Mark a worker as cleanly stopped so it drops out of the census at once.
    pub async fn mark_stopped(pool: &SqlitePool, worker_id: &str) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE workers SET stopped_at = ?1 WHERE worker_id = ?2")
            .bind(Utc::now())
            .bind(worker_id)
            .execute(pool)
            .await?;
        Ok(())
    }

    // ── Queries ──────────────────────────────────────────────────────────

    pub async fn find_by_id(
        pool: &SqlitePool,
        worker_id: &str,
    ) -> Result<Option<WorkerRow>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM workers WHERE worker_id = ?1");
        sqlx::query_as::<_, WorkerRow>(&query)
            .bind(worker_id)
            .fetch_optional(pool)
            .await
    }

    /// Running workers whose last heartbeat is at or after `cutoff_ms`.
    pub async fn list_live(
        pool: &SqlitePool,
        cutoff_ms: EpochMs,
    ) -> Result<Vec<WorkerRow>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM workers \
             WHERE stopped_at IS NULL AND last_heartbeat_ms >= ?1 \
             ORDER BY worker_id ASC"
        );
        sqlx::query_as::<_, WorkerRow>(&query)
            .bind(cutoff_ms)
            .fetch_all(pool)
            .await
    }

    pub async fn count_live(pool: &SqlitePool, cutoff_ms: EpochMs) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar(
            "SELECT COUNT(*) FROM workers WHERE stopped_at IS NULL AND last_heartbeat_ms >= ?1",
        )
        .bind(cutoff_ms)
        .fetch_one(pool)
        .await
    }
}
