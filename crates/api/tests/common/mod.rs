//! Shared helpers for coordinator integration tests.

#![allow(dead_code)]

use std::io::Cursor;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Method, Request, Response, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use image::{Rgb, RgbImage};
use sqlx::SqlitePool;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tower::ServiceExt;
use visage_api::config::ServerConfig;
use visage_api::router::build_app_router;
use visage_api::state::AppState;
use visage_pipeline::{DetectedFace, FaceBox, FaceDetector, PipelineError};
use visage_worker::{runtime, WorkerConfig, WorkerContext};

const BOUNDARY: &str = "visage-test-boundary";

// ---------------------------------------------------------------------------
// App construction
// ---------------------------------------------------------------------------

/// Build a test `ServerConfig` whose directories live under `root`.
pub fn test_config(root: &Path) -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        database_url: String::new(),
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        upload_dir: root.join("uploads"),
        results_dir: root.join("results"),
        known_faces_dir: root.join("known_faces"),
        state_ttl_secs: 3600,
        worker_timeout_secs: 30,
        reaper_interval_secs: 15,
        max_deliveries: 3,
        register_wait_secs: 10,
    }
}

/// A router wired to a test database and a temporary directory tree.
pub struct TestApp {
    pub state: AppState,
    pub dir: tempfile::TempDir,
}

impl TestApp {
    pub fn new(pool: SqlitePool) -> Self {
        Self::with_config(pool, |_| {})
    }

    pub fn with_config(pool: SqlitePool, tweak: impl FnOnce(&mut ServerConfig)) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let mut config = test_config(dir.path());
        tweak(&mut config);
        let state = AppState {
            pool,
            config: Arc::new(config),
        };
        Self { state, dir }
    }

    /// A fresh router over the same state. Routers are consumed by `oneshot`.
    pub fn router(&self) -> Router {
        build_app_router(self.state.clone(), &self.state.config)
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.state.pool
    }

    pub fn config(&self) -> &ServerConfig {
        &self.state.config
    }

    /// Start an in-process worker sharing this app's database and directories.
    pub fn spawn_worker(&self, worker_id: &str) -> TestWorker {
        self.spawn_worker_with(worker_id, Arc::new(MeanColorDetector))
    }

    pub fn spawn_worker_with(
        &self,
        worker_id: &str,
        detector: Arc<dyn FaceDetector>,
    ) -> TestWorker {
        let config = WorkerConfig {
            database_url: String::new(),
            worker_id: worker_id.to_string(),
            hostname: "test-host".to_string(),
            queues: vec!["detection".to_string(), "registration".to_string()],
            concurrency: 1,
            results_dir: self.config().results_dir.clone(),
            known_faces_dir: self.config().known_faces_dir.clone(),
            poll_interval: Duration::from_millis(20),
            heartbeat_interval: Duration::from_millis(100),
            soft_time_limit: Duration::from_secs(10),
            hard_time_limit: Duration::from_secs(20),
            lease: Duration::from_secs(30),
            state_ttl: Duration::from_secs(3600),
            match_tolerance: 0.6,
        };
        let ctx = WorkerContext::new(self.pool().clone(), config, detector);
        let cancel = CancellationToken::new();
        let handle = tokio::spawn(runtime::run(ctx, cancel.clone()));
        TestWorker { cancel, handle }
    }
}

pub struct TestWorker {
    cancel: CancellationToken,
    handle: JoinHandle<Result<(), visage_worker::WorkerError>>,
}

impl TestWorker {
    pub async fn stop(self) {
        self.cancel.cancel();
        self.handle.await.unwrap().unwrap();
    }
}

// ---------------------------------------------------------------------------
// Detectors
// ---------------------------------------------------------------------------

/// Treats the whole image as one face whose encoding is its mean colour
/// scaled to `0..=1`. An all-black image has no face.
pub struct MeanColorDetector;

impl FaceDetector for MeanColorDetector {
    fn name(&self) -> &'static str {
        "mean-color"
    }

    fn detect(&self, image: &RgbImage) -> Result<Vec<DetectedFace>, PipelineError> {
        let pixels = f64::from(image.width() * image.height());
        let mut sums = [0.0_f64; 3];
        for pixel in image.pixels() {
            for (sum, channel) in sums.iter_mut().zip(pixel.0) {
                *sum += f64::from(channel);
            }
        }
        if pixels == 0.0 || sums.iter().all(|s| *s == 0.0) {
            return Ok(Vec::new());
        }
        Ok(vec![DetectedFace {
            bounds: FaceBox {
                top: 0,
                right: image.width(),
                bottom: image.height(),
                left: 0,
            },
            encoding: sums.iter().map(|s| s / pixels / 255.0).collect(),
        }])
    }
}

/// Sleeps before delegating, so progress can be observed mid-job.
pub struct SlowDetector(pub Duration);

impl FaceDetector for SlowDetector {
    fn name(&self) -> &'static str {
        "slow"
    }

    fn detect(&self, image: &RgbImage) -> Result<Vec<DetectedFace>, PipelineError> {
        std::thread::sleep(self.0);
        MeanColorDetector.detect(image)
    }
}

// ---------------------------------------------------------------------------
// Images
// ---------------------------------------------------------------------------

/// A solid-colour PNG.
pub fn png_bytes(color: [u8; 3]) -> Vec<u8> {
    let mut out = Cursor::new(Vec::new());
    RgbImage::from_pixel(32, 24, Rgb(color))
        .write_to(&mut out, image::ImageFormat::Png)
        .unwrap();
    out.into_inner()
}

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

/// One part of a multipart form.
pub enum Part<'a> {
    File {
        field: &'a str,
        filename: &'a str,
        bytes: Vec<u8>,
    },
    Text {
        field: &'a str,
        value: &'a str,
    },
}

pub fn image_part<'a>(filename: &'a str, bytes: Vec<u8>) -> Part<'a> {
    Part::File {
        field: "images",
        filename,
        bytes,
    }
}

fn multipart_body(parts: Vec<Part<'_>>) -> Vec<u8> {
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
        match part {
            Part::File {
                field,
                filename,
                bytes,
            } => {
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{field}\"; filename=\"{filename}\"\r\n\
                         Content-Type: application/octet-stream\r\n\r\n"
                    )
                    .as_bytes(),
                );
                body.extend_from_slice(&bytes);
            }
            Part::Text { field, value } => {
                body.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{field}\"\r\n\r\n{value}")
                        .as_bytes(),
                );
            }
        }
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}

pub async fn get(app: Router, uri: &str) -> Response<Body> {
    let request = Request::builder()
        .method(Method::GET)
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    app.oneshot(request).await.unwrap()
}

pub async fn post_empty(app: Router, uri: &str) -> Response<Body> {
    let request = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    app.oneshot(request).await.unwrap()
}

pub async fn delete(app: Router, uri: &str) -> Response<Body> {
    let request = Request::builder()
        .method(Method::DELETE)
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    app.oneshot(request).await.unwrap()
}

pub async fn post_multipart(app: Router, uri: &str, parts: Vec<Part<'_>>) -> Response<Body> {
    let request = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(
            "content-type",
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(multipart_body(parts)))
        .unwrap();
    app.oneshot(request).await.unwrap()
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

// ---------------------------------------------------------------------------
// Job helpers
// ---------------------------------------------------------------------------

/// Submit images and return the accepted job ids.
pub async fn submit(app: &TestApp, parts: Vec<Part<'_>>) -> Vec<String> {
    let response = post_multipart(app.router(), "/api/v1/jobs", parts).await;
    assert_eq!(response.status(), StatusCode::ACCEPTED);
    let json = body_json(response).await;
    json["data"]["jobs"]
        .as_array()
        .unwrap()
        .iter()
        .map(|j| j["job_id"].as_str().unwrap().to_string())
        .collect()
}

/// Poll the status endpoint until the job is terminal.
pub async fn wait_terminal(app: &TestApp, job_id: &str) -> serde_json::Value {
    let uri = format!("/api/v1/jobs/{job_id}/status");
    for _ in 0..400 {
        let json = body_json(get(app.router(), &uri).await).await;
        let state = json["data"]["state"].as_str().unwrap_or_default();
        if state == "SUCCESS" || state == "FAILURE" {
            return json["data"].clone();
        }
        tokio::time::sleep(Duration::from_millis(25)).await;
    }
    panic!("job {job_id} did not reach a terminal state");
}

// ---------------------------------------------------------------------------
// Seeding
// ---------------------------------------------------------------------------

/// A detection ledger record with the given outcome.
pub fn detect_record(
    job_id: &str,
    display_name: &str,
    success: bool,
    duration_seconds: f64,
    faces_detected: i64,
) -> visage_db::models::ledger::NewLedgerRecord {
    use visage_db::models::ledger::{LedgerStatus, NewLedgerRecord};

    NewLedgerRecord {
        job_id: job_id.to_string(),
        job_kind: "detect".to_string(),
        display_name: display_name.to_string(),
        faces_detected,
        recognized_labels: Vec::new(),
        duration_seconds,
        worker_id: "worker-seed".to_string(),
        artifact_ref: if success {
            format!("{job_id}_{display_name}")
        } else {
            String::new()
        },
        status: if success {
            LedgerStatus::Success
        } else {
            LedgerStatus::Error
        },
        error_message: (!success).then(|| "Cannot decode image".to_string()),
    }
}
