use std::path::PathBuf;
use std::time::Duration;

use visage_core::job::ALL_QUEUES;
use visage_core::recognition::DEFAULT_TOLERANCE;
use visage_core::worker_pool::{
    generate_worker_id, DEFAULT_HEARTBEAT_INTERVAL_SECS, WORKER_CONCURRENCY,
};

/// Worker configuration loaded from environment variables.
///
/// Defaults suit a single-host development setup sharing the coordinator's
/// database file and static directories.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// SQLite database shared with the coordinator.
    pub database_url: String,
    /// Unique name of this worker (default: `worker-<8 hex chars>`).
    pub worker_id: String,
    /// Host name reported in the worker census.
    pub hostname: String,
    /// Logical queues this worker consumes, in priority order.
    pub queues: Vec<String>,
    pub concurrency: i64,
    /// Where annotated artifacts are written.
    pub results_dir: PathBuf,
    /// Where registration reference images are kept.
    pub known_faces_dir: PathBuf,
    /// How long to sleep when every queue is empty.
    pub poll_interval: Duration,
    pub heartbeat_interval: Duration,
    /// Processing budget for one job. Exceeding it fails the job cleanly.
    pub soft_time_limit: Duration,
    /// Outer processing budget. Exceeding it fails the job. Reporting the
    /// outcome is not counted against it.
    pub hard_time_limit: Duration,
    /// Claim lease, renewed on every heartbeat while a job runs.
    pub lease: Duration,
    /// How long job state entries live after their last write.
    pub state_ttl: Duration,
    /// Maximum encoding distance accepted as a match.
    pub match_tolerance: f64,
}

impl WorkerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                   | Default                   |
    /// |---------------------------|---------------------------|
    /// | `DATABASE_URL`            | `sqlite://data/visage.db` |
    /// | `WORKER_ID`               | `worker-<uuid8>`          |
    /// | `HOSTNAME`                | `localhost`               |
    /// | `WORKER_QUEUES`           | `detection,registration`  |
    /// | `RESULTS_DIR`             | `static/results`          |
    /// | `KNOWN_FACES_DIR`         | `static/known_faces`      |
    /// | `POLL_INTERVAL_MS`        | `500`                     |
    /// | `HEARTBEAT_INTERVAL_SECS` | `5`                       |
    /// | `SOFT_TIME_LIMIT_SECS`    | `240`                     |
    /// | `HARD_TIME_LIMIT_SECS`    | `300`                     |
    /// | `LEASE_SECS`              | `330`                     |
    /// | `STATE_TTL_SECS`          | `3600`                    |
    /// | `MATCH_TOLERANCE`         | `0.6`                     |
    pub fn from_env() -> Self {
        let database_url =
            std::env::var("DATABASE_URL").unwrap_or_else(|_| "sqlite://data/visage.db".into());

        let worker_id = std::env::var("WORKER_ID").unwrap_or_else(|_| generate_worker_id());
        let hostname = std::env::var("HOSTNAME").unwrap_or_else(|_| "localhost".into());

        let queues: Vec<String> = std::env::var("WORKER_QUEUES")
            .unwrap_or_else(|_| ALL_QUEUES.join(","))
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let results_dir = std::env::var("RESULTS_DIR").unwrap_or_else(|_| "static/results".into());
        let known_faces_dir =
            std::env::var("KNOWN_FACES_DIR").unwrap_or_else(|_| "static/known_faces".into());

        let poll_interval_ms: u64 = std::env::var("POLL_INTERVAL_MS")
            .unwrap_or_else(|_| "500".into())
            .parse()
            .expect("POLL_INTERVAL_MS must be a valid u64");

        let heartbeat_interval_secs: u64 = std::env::var("HEARTBEAT_INTERVAL_SECS")
            .unwrap_or_else(|_| DEFAULT_HEARTBEAT_INTERVAL_SECS.to_string())
            .parse()
            .expect("HEARTBEAT_INTERVAL_SECS must be a valid u64");

        let soft_time_limit_secs: u64 = std::env::var("SOFT_TIME_LIMIT_SECS")
            .unwrap_or_else(|_| "240".into())
            .parse()
            .expect("SOFT_TIME_LIMIT_SECS must be a valid u64");

        let hard_time_limit_secs: u64 = std::env::var("HARD_TIME_LIMIT_SECS")
            .unwrap_or_else(|_| "300".into())
            .parse()
            .expect("HARD_TIME_LIMIT_SECS must be a valid u64");

        let lease_secs: u64 = std::env::var("LEASE_SECS")
            .unwrap_or_else(|_| "330".into())
            .parse()
            .expect("LEASE_SECS must be a valid u64");

        let state_ttl_secs: u64 = std::env::var("STATE_TTL_SECS")
            .unwrap_or_else(|_| "3600".into())
            .parse()
            .expect("STATE_TTL_SECS must be a valid u64");

        let match_tolerance: f64 = std::env::var("MATCH_TOLERANCE")
            .unwrap_or_else(|_| DEFAULT_TOLERANCE.to_string())
            .parse()
            .expect("MATCH_TOLERANCE must be a valid f64");

        Self {
            database_url,
            worker_id,
            hostname,
            queues,
            concurrency: WORKER_CONCURRENCY,
            results_dir: PathBuf::from(results_dir),
            known_faces_dir: PathBuf::from(known_faces_dir),
            poll_interval: Duration::from_millis(poll_interval_ms),
            heartbeat_interval: Duration::from_secs(heartbeat_interval_secs),
            soft_time_limit: Duration::from_secs(soft_time_limit_secs),
            hard_time_limit: Duration::from_secs(hard_time_limit_secs),
            lease: Duration::from_secs(lease_secs),
            state_ttl: Duration::from_secs(state_ttl_secs),
            match_tolerance,
        }
    }

    /// Lease length in milliseconds, as stored on queue rows.
    pub fn lease_ms(&self) -> i64 {
        self.lease.as_millis() as i64
    }

    pub fn state_ttl_ms(&self) -> i64 {
        self.state_ttl.as_millis() as i64
    }
}
