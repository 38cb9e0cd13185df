use std::path::PathBuf;

/// Coordinator configuration loaded from environment variables.
///
/// All fields have defaults suitable for local development.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `5000`).
    pub port: u16,
    /// SQLite database shared with every worker.
    pub database_url: String,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS` env var.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `60`).
    pub request_timeout_secs: u64,
    /// Where submitted images are staged for workers.
    pub upload_dir: PathBuf,
    /// Where workers write annotated artifacts.
    pub results_dir: PathBuf,
    /// Where workers keep registration reference images.
    pub known_faces_dir: PathBuf,
    /// Retention of job state entries after their last write.
    pub state_ttl_secs: u64,
    /// Heartbeat age after which a worker no longer counts as live.
    pub worker_timeout_secs: u64,
    /// How often the lease reaper runs.
    pub reaper_interval_secs: u64,
    /// Deliveries after which an expired job is abandoned instead of requeued.
    pub max_deliveries: i64,
    /// How long a face registration request waits for its job.
    pub register_wait_secs: u64,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                | Default                   |
    /// |------------------------|---------------------------|
    /// | `HOST`                 | `0.0.0.0`                 |
    /// | `PORT`                 | `5000`                    |
    /// | `DATABASE_URL`         | `sqlite://data/visage.db` |
    /// | `CORS_ORIGINS`         | `http://localhost:5173`   |
    /// | `REQUEST_TIMEOUT_SECS` | `60`                      |
    /// | `UPLOAD_DIR`           | `static/uploads`          |
    /// | `RESULTS_DIR`          | `static/results`          |
    /// | `KNOWN_FACES_DIR`      | `static/known_faces`      |
    /// | `STATE_TTL_SECS`       | `3600`                    |
    /// | `WORKER_TIMEOUT_SECS`  | `30`                      |
    /// | `REAPER_INTERVAL_SECS` | `15`                      |
    /// | `MAX_DELIVERIES`       | `3`                       |
    /// | `REGISTER_WAIT_SECS`   | `30`                      |
    pub fn from_env() -> Self {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());

        let port: u16 = std::env::var("PORT")
            .unwrap_or_else(|_| "5000".into())
            .parse()
            .expect("PORT must be a valid u16");

        let database_url =
            std::env::var("DATABASE_URL").unwrap_or_else(|_| "sqlite://data/visage.db".into());

        let cors_origins: Vec<String> = std::env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:5173".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let request_timeout_secs: u64 = std::env::var("REQUEST_TIMEOUT_SECS")
            .unwrap_or_else(|_| "60".into())
            .parse()
            .expect("REQUEST_TIMEOUT_SECS must be a valid u64");

        let upload_dir = std::env::var("UPLOAD_DIR").unwrap_or_else(|_| "static/uploads".into());
        let results_dir = std::env::var("RESULTS_DIR").unwrap_or_else(|_| "static/results".into());
        let known_faces_dir =
            std::env::var("KNOWN_FACES_DIR").unwrap_or_else(|_| "static/known_faces".into());

        let state_ttl_secs: u64 = std::env::var("STATE_TTL_SECS")
            .unwrap_or_else(|_| "3600".into())
            .parse()
            .expect("STATE_TTL_SECS must be a valid u64");

        let worker_timeout_secs: u64 = std::env::var("WORKER_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".into())
            .parse()
            .expect("WORKER_TIMEOUT_SECS must be a valid u64");

        let reaper_interval_secs: u64 = std::env::var("REAPER_INTERVAL_SECS")
            .unwrap_or_else(|_| "15".into())
            .parse()
            .expect("REAPER_INTERVAL_SECS must be a valid u64");

        let max_deliveries: i64 = std::env::var("MAX_DELIVERIES")
            .unwrap_or_else(|_| "3".into())
            .parse()
            .expect("MAX_DELIVERIES must be a valid i64");

        let register_wait_secs: u64 = std::env::var("REGISTER_WAIT_SECS")
            .unwrap_or_else(|_| "30".into())
            .parse()
            .expect("REGISTER_WAIT_SECS must be a valid u64");

        Self {
            host,
            port,
            database_url,
            cors_origins,
            request_timeout_secs,
            upload_dir: PathBuf::from(upload_dir),
            results_dir: PathBuf::from(results_dir),
            known_faces_dir: PathBuf::from(known_faces_dir),
            state_ttl_secs,
            worker_timeout_secs,
            reaper_interval_secs,
            max_deliveries,
            register_wait_secs,
        }
    }

    pub fn state_ttl_ms(&self) -> i64 {
        (self.state_ttl_secs as i64) * 1000
    }
}
