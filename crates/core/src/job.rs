//! Job lifecycle types: kinds, descriptors, phases and progress checkpoints.
//!
//! A job moves `Pending -> Progress -> {Success, Failure}`. Terminal phases
//! are final; a failed job is resubmitted under a new id.

use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Logical queue carrying detection jobs.
pub const QUEUE_DETECTION: &str = "detection";

/// Logical queue carrying face-registration jobs.
pub const QUEUE_REGISTRATION: &str = "registration";

/// Every logical queue a worker may consume from.
pub const ALL_QUEUES: &[&str] = &[QUEUE_DETECTION, QUEUE_REGISTRATION];

/// Denominator of every progress report.
pub const PROGRESS_TOTAL: i64 = 100;

/// Generate a new job id.
///
/// UUID v7 ids are unique across processes and sort by creation time.
pub fn new_job_id() -> String {
    uuid::Uuid::now_v7().to_string()
}

/// Round an elapsed duration to seconds with millisecond precision.
pub fn elapsed_secs(elapsed: Duration) -> f64 {
    (elapsed.as_secs_f64() * 1000.0).round() / 1000.0
}

// ---------------------------------------------------------------------------
// Job kind and descriptor
// ---------------------------------------------------------------------------

/// What a job does. Dispatched through a single entry point in the worker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum JobKind {
    /// Detect and recognise faces, then write an annotated artifact.
    Detect,
    /// Store the reference encoding of one face under `label`.
    Register { label: String },
}

impl JobKind {
    /// The logical queue this kind is routed to.
    pub fn queue(&self) -> &'static str {
        match self {
            JobKind::Detect => QUEUE_DETECTION,
            JobKind::Register { .. } => QUEUE_REGISTRATION,
        }
    }

    /// Short name stored in `job_kind` columns.
    pub fn name(&self) -> &'static str {
        match self {
            JobKind::Detect => "detect",
            JobKind::Register { .. } => "register",
        }
    }
}

/// Immutable description of one unit of work, as carried by the queue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobDescriptor {
    pub job_id: String,
    pub kind: JobKind,
    /// Path of the staged input file.
    pub input_ref: String,
    /// Sanitised name shown to users and stored in the ledger.
    pub display_name: String,
}

impl JobDescriptor {
    /// Build a descriptor with a freshly generated job id.
    pub fn new(kind: JobKind, input_ref: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            job_id: new_job_id(),
            kind,
            input_ref: input_ref.into(),
            display_name: display_name.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Phase
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum JobPhase {
    Pending,
    Progress,
    Success,
    Failure,
}

impl JobPhase {
    pub fn as_str(self) -> &'static str {
        match self {
            JobPhase::Pending => "PENDING",
            JobPhase::Progress => "PROGRESS",
            JobPhase::Success => "SUCCESS",
            JobPhase::Failure => "FAILURE",
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, JobPhase::Success | JobPhase::Failure)
    }
}

impl FromStr for JobPhase {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(JobPhase::Pending),
            "PROGRESS" => Ok(JobPhase::Progress),
            "SUCCESS" => Ok(JobPhase::Success),
            "FAILURE" => Ok(JobPhase::Failure),
            other => Err(CoreError::Internal(format!("Unknown job phase '{other}'"))),
        }
    }
}

// ---------------------------------------------------------------------------
// Checkpoints
// ---------------------------------------------------------------------------

/// Progress checkpoints reported by a worker, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Checkpoint {
    Validating,
    Loading,
    Detecting,
    Recognizing,
    Saving,
    Complete,
}

impl Checkpoint {
    pub const ALL: [Checkpoint; 6] = [
        Checkpoint::Validating,
        Checkpoint::Loading,
        Checkpoint::Detecting,
        Checkpoint::Recognizing,
        Checkpoint::Saving,
        Checkpoint::Complete,
    ];

    /// Value of `progress_current` at this checkpoint.
    pub const fn progress(self) -> i64 {
        match self {
            Checkpoint::Validating => 10,
            Checkpoint::Loading => 20,
            Checkpoint::Detecting => 40,
            Checkpoint::Recognizing => 60,
            Checkpoint::Saving => 80,
            Checkpoint::Complete => 100,
        }
    }

    pub fn message(self) -> &'static str {
        match self {
            Checkpoint::Validating => "Checking input file...",
            Checkpoint::Loading => "Loading image...",
            Checkpoint::Detecting => "Finding faces...",
            Checkpoint::Recognizing => "Recognizing faces...",
            Checkpoint::Saving => "Saving result...",
            Checkpoint::Complete => "Complete",
        }
    }
}

// ---------------------------------------------------------------------------
// State
// ---------------------------------------------------------------------------

/// Current state of one job as held by the state tracker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobState {
    pub job_id: String,
    pub phase: JobPhase,
    pub progress_current: i64,
    pub progress_total: i64,
    pub status_message: String,
    pub display_name: String,
    pub result: Option<serde_json::Value>,
    pub error: Option<String>,
}

impl JobState {
    /// State written at enqueue time.
    pub fn pending(job: &JobDescriptor) -> Self {
        Self {
            job_id: job.job_id.clone(),
            phase: JobPhase::Pending,
            progress_current: 0,
            progress_total: PROGRESS_TOTAL,
            status_message: "Waiting for a worker...".to_string(),
            display_name: job.display_name.clone(),
            result: None,
            error: None,
        }
    }

    pub fn at_checkpoint(job: &JobDescriptor, checkpoint: Checkpoint) -> Self {
        Self {
            phase: JobPhase::Progress,
            progress_current: checkpoint.progress(),
            status_message: checkpoint.message().to_string(),
            ..Self::pending(job)
        }
    }

    pub fn succeeded(job: &JobDescriptor, result: serde_json::Value) -> Self {
        Self {
            phase: JobPhase::Success,
            progress_current: PROGRESS_TOTAL,
            status_message: Checkpoint::Complete.message().to_string(),
            result: Some(result),
            ..Self::pending(job)
        }
    }

    /// Terminal failure. The tracker keeps the highest progress already
    /// reported, so `progress_current` here only matters for fresh entries.
    pub fn failed(job: &JobDescriptor, error: impl Into<String>, processing_time: f64) -> Self {
        Self {
            phase: JobPhase::Failure,
            status_message: "Failed".to_string(),
            result: Some(serde_json::json!({ "processing_time": processing_time })),
            error: Some(error.into()),
            ..Self::pending(job)
        }
    }
}

/// Status payload returned to polling clients.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusView {
    pub job_id: String,
    pub state: JobPhase,
    pub current: i64,
    pub total: i64,
    pub status: String,
    pub filename: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl From<JobState> for StatusView {
    fn from(state: JobState) -> Self {
        Self {
            job_id: state.job_id,
            state: state.phase,
            current: state.progress_current,
            total: state.progress_total,
            status: state.status_message,
            filename: state.display_name,
            result: state.result,
            error: state.error,
        }
    }
}

// ---------------------------------------------------------------------------
// Result payloads
// ---------------------------------------------------------------------------

/// Result payload of a successful detection job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionSummary {
    pub job_id: String,
    pub filename: String,
    /// File name of the annotated artifact inside the results directory.
    pub artifact: String,
    pub faces_detected: i64,
    pub recognized_faces: Vec<String>,
    pub processing_time: f64,
    pub worker: String,
    pub file_size: u64,
}

/// Result payload of a successful registration job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegistrationSummary {
    pub job_id: String,
    pub label: String,
    /// File name of the stored reference image inside the known-faces directory.
    pub reference: String,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn checkpoints_strictly_increase() {
        let values: Vec<i64> = Checkpoint::ALL.iter().map(|c| c.progress()).collect();
        assert_eq!(values, vec![10, 20, 40, 60, 80, 100]);
        assert!(values.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn only_success_and_failure_are_terminal() {
        assert!(!JobPhase::Pending.is_terminal());
        assert!(!JobPhase::Progress.is_terminal());
        assert!(JobPhase::Success.is_terminal());
        assert!(JobPhase::Failure.is_terminal());
    }

    #[test]
    fn phase_parses_stored_text() {
        assert_eq!("PROGRESS".parse::<JobPhase>().unwrap(), JobPhase::Progress);
        assert_matches!("RUNNING".parse::<JobPhase>(), Err(CoreError::Internal(_)));
    }

    #[test]
    fn kinds_route_to_their_queue() {
        assert_eq!(JobKind::Detect.queue(), QUEUE_DETECTION);
        let register = JobKind::Register {
            label: "Ada".to_string(),
        };
        assert_eq!(register.queue(), QUEUE_REGISTRATION);
        assert_eq!(register.name(), "register");
    }

    #[test]
    fn descriptor_payload_is_tagged() {
        let job = JobDescriptor::new(
            JobKind::Register {
                label: "Ada".to_string(),
            },
            "/tmp/in.jpg",
            "in.jpg",
        );
        let json = serde_json::to_value(&job).unwrap();
        assert_eq!(json["kind"]["type"], "register");
        assert_eq!(json["kind"]["label"], "Ada");
    }

    #[test]
    fn job_ids_are_unique() {
        let a = new_job_id();
        let b = new_job_id();
        assert_ne!(a, b);
        assert_eq!(a.len(), 36);
    }

    #[test]
    fn status_view_omits_absent_result() {
        let job = JobDescriptor::new(JobKind::Detect, "/tmp/a.png", "a.png");
        let view = StatusView::from(JobState::pending(&job));
        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json["state"], "PENDING");
        assert_eq!(json["total"], 100);
        assert!(json.get("result").is_none());
        assert!(json.get("error").is_none());
    }

    #[test]
    fn failed_state_carries_error_and_time() {
        let job = JobDescriptor::new(JobKind::Detect, "/tmp/a.png", "a.png");
        let state = JobState::failed(&job, "decode failed", 1.25);
        assert_eq!(state.phase, JobPhase::Failure);
        assert_eq!(state.error.as_deref(), Some("decode failed"));
        assert_eq!(state.result.unwrap()["processing_time"], 1.25);
    }

    #[test]
    fn elapsed_rounds_to_millis() {
        assert_eq!(elapsed_secs(Duration::from_micros(1_234_567)), 1.235);
    }
}
