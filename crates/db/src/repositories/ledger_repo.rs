//! Repository for the `processing_results` table (the results ledger).
//!
//! Append is the only mutation during normal operation. `job_id` is unique,
//! so a redelivered job that finishes twice still leaves a single record.

use chrono::{Timelike, Utc};
use sqlx::types::Json;
use sqlx::SqlitePool;
use visage_core::types::Timestamp;

use crate::models::ledger::{
    DailyCount, HourlyCount, LedgerFilter, LedgerRecord, LedgerStatus, LedgerTotals,
    NewLedgerRecord,
};

/// Column list for `processing_results` queries.
const COLUMNS: &str = "\
    id, job_id, job_kind, display_name, faces_detected, recognized_labels, \
    duration_seconds, worker_id, artifact_ref, status, error_message, \
    created_at, created_day, created_hour";

/// Maximum page size for ledger listing.
const MAX_LIMIT: i64 = 200;

/// Default page size for ledger listing.
const DEFAULT_LIMIT: i64 = 50;

/// Format of the `created_day` bucket column.
pub const DAY_FORMAT: &str = "%Y-%m-%d";

/// Provides append, query and aggregate operations over the ledger.
pub struct LedgerRepo;

impl LedgerRepo {
    // ── Append ──────────────────────────────────────────────────────────

    /// Append a terminal record. Returns `false` if `job_id` already has one.
    pub async fn append(pool: &SqlitePool, input: &NewLedgerRecord) -> Result<bool, sqlx::Error> {
        Self::append_at(pool, input, Utc::now()).await
    }

    /// Append with an explicit creation time.
    pub async fn append_at(
        pool: &SqlitePool,
        input: &NewLedgerRecord,
        created_at: Timestamp,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "INSERT INTO processing_results \
                (job_id, job_kind, display_name, faces_detected, recognized_labels, \
                 duration_seconds, worker_id, artifact_ref, status, error_message, \
                 created_at, created_day, created_hour) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13) \
             ON CONFLICT (job_id) DO NOTHING",
        )
        .bind(&input.job_id)
        .bind(&input.job_kind)
        .bind(&input.display_name)
        .bind(input.faces_detected)
        .bind(Json(&input.recognized_labels))
        .bind(input.duration_seconds)
        .bind(&input.worker_id)
        .bind(&input.artifact_ref)
        .bind(input.status.as_str())
        .bind(&input.error_message)
        .bind(created_at)
        .bind(created_at.format(DAY_FORMAT).to_string())
        .bind(i64::from(created_at.hour()))
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    // ── Queries ─────────────────────────────────────────────────────────

    /// Most recent record for `job_id`.
    pub async fn find_latest_by_job_id(
        pool: &SqlitePool,
        job_id: &str,
    ) -> Result<Option<LedgerRecord>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM processing_results \
             WHERE job_id = ?1 ORDER BY id DESC LIMIT 1"
        );
        sqlx::query_as::<_, LedgerRecord>(&query)
            .bind(job_id)
            .fetch_optional(pool)
            .await
    }

    /// Records matching `filter`, newest first.
    pub async fn list(
        pool: &SqlitePool,
        filter: &LedgerFilter,
    ) -> Result<Vec<LedgerRecord>, sqlx::Error> {
        let limit = filter.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);
        let offset = filter.offset.unwrap_or(0).max(0);
        let query = format!(
            "SELECT {COLUMNS} FROM processing_results \
             WHERE (?1 IS NULL OR status = ?1) \
               AND (?2 IS NULL OR job_kind = ?2) \
               AND (?3 IS NULL OR display_name = ?3) \
               AND (?4 IS NULL OR created_at >= ?4) \
               AND (?5 IS NULL OR created_at < ?5) \
             ORDER BY created_at DESC, id DESC \
             LIMIT ?6 OFFSET ?7"
        );
        sqlx::query_as::<_, LedgerRecord>(&query)
            .bind(&filter.status)
            .bind(&filter.kind)
            .bind(&filter.display_name)
            .bind(filter.since)
            .bind(filter.until)
            .bind(limit)
            .bind(offset)
            .fetch_all(pool)
            .await
    }

    /// Total number of records, all kinds and statuses.
    pub async fn count(pool: &SqlitePool) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar("SELECT COUNT(*) FROM processing_results")
            .fetch_one(pool)
            .await
    }

    // ── Aggregates ──────────────────────────────────────────────────────

    /// Counts, face total and mean duration over every record of `kind`.
    pub async fn totals(pool: &SqlitePool, kind: &str) -> Result<LedgerTotals, sqlx::Error> {
        sqlx::query_as::<_, LedgerTotals>(
            "SELECT \
                COUNT(*) AS total, \
                COALESCE(SUM(CASE WHEN status = 'success' THEN 1 ELSE 0 END), 0) AS successes, \
                COALESCE(SUM(CASE WHEN status = 'error' THEN 1 ELSE 0 END), 0) AS errors, \
                COALESCE(SUM(CASE WHEN status = 'success' THEN faces_detected ELSE 0 END), 0) \
                    AS total_faces, \
                AVG(CASE WHEN status = 'success' THEN duration_seconds END) AS avg_duration \
             FROM processing_results WHERE job_kind = ?1",
        )
        .bind(kind)
        .fetch_one(pool)
        .await
    }

    /// Number of `status` records of `kind` created on `day` (`YYYY-MM-DD`).
    pub async fn count_on_day(
        pool: &SqlitePool,
        kind: &str,
        status: LedgerStatus,
        day: &str,
    ) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar(
            "SELECT COUNT(*) FROM processing_results \
             WHERE created_day = ?1 AND status = ?2 AND job_kind = ?3",
        )
        .bind(day)
        .bind(status.as_str())
        .bind(kind)
        .fetch_one(pool)
        .await
    }

    /// Successful records of `kind` per day from `since_day` onwards.
    pub async fn daily_counts(
        pool: &SqlitePool,
        kind: &str,
        since_day: &str,
    ) -> Result<Vec<DailyCount>, sqlx::Error> {
        sqlx::query_as::<_, DailyCount>(
            "SELECT created_day AS day, COUNT(*) AS count FROM processing_results \
             WHERE created_day >= ?1 AND status = 'success' AND job_kind = ?2 \
             GROUP BY created_day ORDER BY created_day ASC",
        )
        .bind(since_day)
        .bind(kind)
        .fetch_all(pool)
        .await
    }

    /// Successful records of `kind` per hour of day created at or after `since`.
    pub async fn hourly_counts(
        pool: &SqlitePool,
        kind: &str,
        since: Timestamp,
    ) -> Result<Vec<HourlyCount>, sqlx::Error> {
        sqlx::query_as::<_, HourlyCount>(
            "SELECT created_hour AS hour, COUNT(*) AS count FROM processing_results \
             WHERE created_day >= ?1 AND created_at >= ?2 \
               AND status = 'success' AND job_kind = ?3 \
             GROUP BY created_hour ORDER BY created_hour ASC",
        )
        .bind(since.format(DAY_FORMAT).to_string())
        .bind(since)
        .bind(kind)
        .fetch_all(pool)
        .await
    }

    /// Durations of the `limit` most recent successful records of `kind`.
    pub async fn recent_durations(
        pool: &SqlitePool,
        kind: &str,
        limit: i64,
    ) -> Result<Vec<f64>, sqlx::Error> {
        sqlx::query_scalar(
            "SELECT duration_seconds FROM processing_results \
             WHERE status = 'success' AND job_kind = ?1 AND duration_seconds > 0 \
             ORDER BY created_at DESC, id DESC LIMIT ?2",
        )
        .bind(kind)
        .bind(limit)
        .fetch_all(pool)
        .await
    }

    // ── Deletion ────────────────────────────────────────────────────────

    /// Delete every record. Returns the number removed.
    pub async fn delete_all(pool: &SqlitePool) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM processing_results")
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }

    pub async fn delete_by_job_id(pool: &SqlitePool, job_id: &str) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM processing_results WHERE job_id = ?1")
            .bind(job_id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }

    /// Delete records whose display name or artifact is `filename`.
    ///
    /// Returns the removed records so their files can be cleaned up.
    pub async fn delete_by_filename(
        pool: &SqlitePool,
        filename: &str,
    ) -> Result<Vec<LedgerRecord>, sqlx::Error> {
        let query = format!(
            "DELETE FROM processing_results \
             WHERE display_name = ?1 OR artifact_ref = ?1 \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, LedgerRecord>(&query)
            .bind(filename)
            .fetch_all(pool)
            .await
    }
}
