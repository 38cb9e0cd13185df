//! Repository for the `job_states` table (the state tracker).
//!
//! Writes are guarded upserts: a terminal phase is never overwritten and
//! `progress_current` never decreases, so concurrent pollers always observe
//! a monotonic sequence even if a redelivered job restarts its checkpoints.

use chrono::Utc;
use sqlx::types::Json;
use sqlx::SqlitePool;
use visage_core::job::JobState;
use visage_core::types::EpochMs;

use crate::models::job_state::JobStateRow;

/// Column list for `job_states` queries.
const COLUMNS: &str = "\
    job_id, phase, progress_current, progress_total, status_message, \
    display_name, result, error, updated_at, expires_at_ms";

/// Provides get/set over volatile job state.
pub struct JobStateRepo;

impl JobStateRepo {
    /// Write `state`, refreshing its expiry to `ttl_ms` from now.
    ///
    /// Returns `false` when the stored entry is already terminal and the
    /// write was ignored.
    pub async fn set(pool: &SqlitePool, state: &JobState, ttl_ms: i64) -> Result<bool, sqlx::Error> {
        let now = Utc::now();
        let result = sqlx::query(
            "INSERT INTO job_states \
                (job_id, phase, progress_current, progress_total, status_message, \
                 display_name, result, error, updated_at, expires_at_ms) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10) \
             ON CONFLICT (job_id) DO UPDATE SET \
                phase = excluded.phase, \
                progress_current = MAX(job_states.progress_current, excluded.progress_current), \
                progress_total = excluded.progress_total, \
                status_message = excluded.status_message, \
                display_name = excluded.display_name, \
                result = excluded.result, \
                error = excluded.error, \
                updated_at = excluded.updated_at, \
                expires_at_ms = excluded.expires_at_ms \
             WHERE job_states.phase NOT IN ('SUCCESS', 'FAILURE')",
        )
        .bind(&state.job_id)
        .bind(state.phase.as_str())
        .bind(state.progress_current)
        .bind(state.progress_total)
        .bind(&state.status_message)
        .bind(&state.display_name)
        .bind(state.result.as_ref().map(Json))
        .bind(&state.error)
        .bind(now)
        .bind(now.timestamp_millis() + ttl_ms)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// The unexpired entry for `job_id`, if any.
    pub async fn get(
        pool: &SqlitePool,
        job_id: &str,
        now_ms: EpochMs,
    ) -> Result<Option<JobStateRow>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM job_states WHERE job_id = ?1 AND expires_at_ms > ?2"
        );
        sqlx::query_as::<_, JobStateRow>(&query)
            .bind(job_id)
            .bind(now_ms)
            .fetch_optional(pool)
            .await
    }

    /// Delete entries that expired before `now_ms`. Returns the number removed.
    pub async fn purge_expired(pool: &SqlitePool, now_ms: EpochMs) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM job_states WHERE expires_at_ms <= ?1")
            .bind(now_ms)
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }
}
