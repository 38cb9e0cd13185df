//! Results ledger models and DTOs.

use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use visage_core::types::{DbId, Timestamp};

// ---------------------------------------------------------------------------
// Status
// ---------------------------------------------------------------------------

/// Outcome stored on a ledger record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LedgerStatus {
    Success,
    Error,
}

impl LedgerStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            LedgerStatus::Success => "success",
            LedgerStatus::Error => "error",
        }
    }
}

// ---------------------------------------------------------------------------
// Entity
// ---------------------------------------------------------------------------

/// A row from the `processing_results` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct LedgerRecord {
    pub id: DbId,
    pub job_id: String,
    pub job_kind: String,
    pub display_name: String,
    pub faces_detected: i64,
    pub recognized_labels: Json<Vec<String>>,
    pub duration_seconds: f64,
    pub worker_id: String,
    pub artifact_ref: String,
    pub status: String,
    pub error_message: Option<String>,
    pub created_at: Timestamp,
    pub created_day: String,
    pub created_hour: i64,
}

impl LedgerRecord {
    pub fn is_success(&self) -> bool {
        self.status == LedgerStatus::Success.as_str()
    }
}

// ---------------------------------------------------------------------------
// Create DTO
// ---------------------------------------------------------------------------

/// Terminal outcome written once by the worker that executed the job.
#[derive(Debug, Clone)]
pub struct NewLedgerRecord {
    pub job_id: String,
    pub job_kind: String,
    pub display_name: String,
    pub faces_detected: i64,
    pub recognized_labels: Vec<String>,
    pub duration_seconds: f64,
    pub worker_id: String,
    pub artifact_ref: String,
    pub status: LedgerStatus,
    pub error_message: Option<String>,
}

// ---------------------------------------------------------------------------
// Query DTOs
// ---------------------------------------------------------------------------

/// Filter for ledger listings. Every field is optional.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LedgerFilter {
    pub status: Option<String>,
    pub kind: Option<String>,
    pub display_name: Option<String>,
    pub since: Option<Timestamp>,
    pub until: Option<Timestamp>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// Whole-ledger aggregates for one job kind.
#[derive(Debug, Clone, Default, FromRow, Serialize, PartialEq)]
pub struct LedgerTotals {
    pub total: i64,
    pub successes: i64,
    pub errors: i64,
    pub total_faces: i64,
    pub avg_duration: Option<f64>,
}

#[derive(Debug, Clone, FromRow, Serialize, PartialEq, Eq)]
pub struct DailyCount {
    pub day: String,
    pub count: i64,
}

#[derive(Debug, Clone, FromRow, Serialize, PartialEq, Eq)]
pub struct HourlyCount {
    pub hour: i64,
    pub count: i64,
}
