//! Repository for the `job_queue` table.
//!
//! Claims are a single `UPDATE ... WHERE id = (SELECT ... LIMIT 1)` statement.
//! SQLite serialises writers, so each row is handed to exactly one worker.
//! A claim carries a lease; a worker that stops renewing it loses the job
//! back to the unclaimed pool on the next reaper pass.

use chrono::Utc;
use sqlx::types::Json;
use sqlx::SqlitePool;
use visage_core::job::{JobDescriptor, JobState};
use visage_core::types::EpochMs;

use crate::models::queue::{LeaseSweep, QueueDepth, QueuedJob};

/// Column list for `job_queue` queries.
const COLUMNS: &str = "\
    id, job_id, queue_name, job_kind, payload, display_name, enqueued_at, \
    claimed_by, claimed_at, lease_expires_at_ms, delivery_count";

/// Provides broker operations over the job queue.
pub struct QueueRepo;

impl QueueRepo {
    // ── Producer ────────────────────────────────────────────────────────

    /// Enqueue a job and record its `Pending` state in one transaction.
    ///
    /// The state entry expires `state_ttl_ms` after this write.
    pub async fn enqueue(
        pool: &SqlitePool,
        job: &JobDescriptor,
        state_ttl_ms: i64,
    ) -> Result<QueuedJob, sqlx::Error> {
        let now = Utc::now();
        let pending = JobState::pending(job);
        let mut tx = pool.begin().await?;

        let query = format!(
            "INSERT INTO job_queue (job_id, queue_name, job_kind, payload, display_name, enqueued_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6) \
             RETURNING {COLUMNS}"
        );
        let queued = sqlx::query_as::<_, QueuedJob>(&query)
            .bind(&job.job_id)
            .bind(job.kind.queue())
            .bind(job.kind.name())
            .bind(Json(job))
            .bind(&job.display_name)
            .bind(now)
            .fetch_one(&mut *tx)
            .await?;

        sqlx::query(
            "INSERT INTO job_states \
                (job_id, phase, progress_current, progress_total, status_message, \
                 display_name, updated_at, expires_at_ms) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8) \
             ON CONFLICT (job_id) DO NOTHING",
        )
        .bind(&pending.job_id)
        .bind(pending.phase.as_str())
        .bind(pending.progress_current)
        .bind(pending.progress_total)
        .bind(&pending.status_message)
        .bind(&pending.display_name)
        .bind(now)
        .bind(now.timestamp_millis() + state_ttl_ms)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(queued)
    }

    // ── Consumer ────────────────────────────────────────────────────────

    /// Claim the oldest unclaimed job on any of `queues` for `worker_id`.
    ///
    /// Returns `None` when every listed queue is empty.
    pub async fn claim_next(
        pool: &SqlitePool,
        worker_id: &str,
        queues: &[String],
        lease_ms: i64,
    ) -> Result<Option<QueuedJob>, sqlx::Error> {
        let now = Utc::now();
        let query = format!(
            "UPDATE job_queue \
             SET claimed_by = ?1, claimed_at = ?2, lease_expires_at_ms = ?3, \
                 delivery_count = delivery_count + 1 \
             WHERE id = ( \
                 SELECT id FROM job_queue \
                 WHERE claimed_by IS NULL \
                   AND queue_name IN (SELECT value FROM json_each(?4)) \
                 ORDER BY id ASC \
                 LIMIT 1 \
             ) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, QueuedJob>(&query)
            .bind(worker_id)
            .bind(now)
            .bind(now.timestamp_millis() + lease_ms)
            .bind(Json(queues))
            .fetch_optional(pool)
            .await
    }

    /// Extend the lease on a job still held by `worker_id`.
    ///
    /// Returns `false` if the claim was lost to the reaper.
    pub async fn renew_lease(
        pool: &SqlitePool,
        worker_id: &str,
        job_id: &str,
        lease_expires_at_ms: EpochMs,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE job_queue SET lease_expires_at_ms = ?1 \
             WHERE job_id = ?2 AND claimed_by = ?3",
        )
        .bind(lease_expires_at_ms)
        .bind(job_id)
        .bind(worker_id)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Remove a finished job. Only the current holder may acknowledge it.
    pub async fn ack(pool: &SqlitePool, worker_id: &str, job_id: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM job_queue WHERE job_id = ?1 AND claimed_by = ?2")
            .bind(job_id)
            .bind(worker_id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    // ── Lease reaper ────────────────────────────────────────────────────

    /// Release every claim whose lease expired before `now_ms`.
    ///
    /// Jobs already delivered `max_deliveries` times are deleted instead of
    /// being requeued and returned in `abandoned`.
    pub async fn release_expired(
        pool: &SqlitePool,
        now_ms: EpochMs,
        max_deliveries: i64,
    ) -> Result<LeaseSweep, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let query = format!(
            "DELETE FROM job_queue \
             WHERE claimed_by IS NOT NULL \
               AND lease_expires_at_ms < ?1 AND delivery_count >= ?2 \
             RETURNING {COLUMNS}"
        );
        let abandoned = sqlx::query_as::<_, QueuedJob>(&query)
            .bind(now_ms)
            .bind(max_deliveries)
            .fetch_all(&mut *tx)
            .await?;

        let requeued = sqlx::query(
            "UPDATE job_queue \
             SET claimed_by = NULL, claimed_at = NULL, lease_expires_at_ms = NULL \
             WHERE claimed_by IS NOT NULL AND lease_expires_at_ms < ?1",
        )
        .bind(now_ms)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        tx.commit().await?;
        Ok(LeaseSweep {
            requeued,
            abandoned,
        })
    }

    // ── Queries ─────────────────────────────────────────────────────────

    pub async fn find_by_job_id(
        pool: &SqlitePool,
        job_id: &str,
    ) -> Result<Option<QueuedJob>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM job_queue WHERE job_id = ?1");
        sqlx::query_as::<_, QueuedJob>(&query)
            .bind(job_id)
            .fetch_optional(pool)
            .await
    }

    /// Unclaimed job counts per logical queue. Empty queues are omitted.
    pub async fn depths(pool: &SqlitePool) -> Result<Vec<QueueDepth>, sqlx::Error> {
        sqlx::query_as::<_, QueueDepth>(
            "SELECT queue_name, COUNT(*) AS depth FROM job_queue \
             WHERE claimed_by IS NULL \
             GROUP BY queue_name ORDER BY queue_name",
        )
        .fetch_all(pool)
        .await
    }

    /// Every job currently held by some worker, oldest claim first.
    pub async fn list_claimed(pool: &SqlitePool) -> Result<Vec<QueuedJob>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM job_queue \
             WHERE claimed_by IS NOT NULL \
             ORDER BY claimed_at ASC, id ASC"
        );
        sqlx::query_as::<_, QueuedJob>(&query).fetch_all(pool).await
    }

    /// Every row still in the queue, claimed or not, oldest first.
    pub async fn list_all(pool: &SqlitePool) -> Result<Vec<QueuedJob>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM job_queue ORDER BY id ASC");
        sqlx::query_as::<_, QueuedJob>(&query).fetch_all(pool).await
    }
}
