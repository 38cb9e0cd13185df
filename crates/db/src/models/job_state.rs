//! Job state tracker rows.

use sqlx::types::Json;
use sqlx::FromRow;
use visage_core::error::CoreError;
use visage_core::job::JobState;
use visage_core::types::{EpochMs, Timestamp};

/// A row from the `job_states` table.
#[derive(Debug, Clone, FromRow)]
pub struct JobStateRow {
    pub job_id: String,
    pub phase: String,
    pub progress_current: i64,
    pub progress_total: i64,
    pub status_message: String,
    pub display_name: String,
    pub result: Option<Json<serde_json::Value>>,
    pub error: Option<String>,
    pub updated_at: Timestamp,
    pub expires_at_ms: EpochMs,
}

impl TryFrom<JobStateRow> for JobState {
    type Error = CoreError;

    fn try_from(row: JobStateRow) -> Result<Self, Self::Error> {
        Ok(JobState {
            job_id: row.job_id,
            phase: row.phase.parse()?,
            progress_current: row.progress_current,
            progress_total: row.progress_total,
            status_message: row.status_message,
            display_name: row.display_name,
            result: row.result.map(|r| r.0),
            error: row.error,
        })
    }
}
