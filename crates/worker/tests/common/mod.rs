//! Shared helpers for worker integration tests.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use image::{Rgb, RgbImage};
use sqlx::SqlitePool;
use visage_core::job::{JobDescriptor, JobKind};
use visage_pipeline::{DetectedFace, FaceBox, FaceDetector, PipelineError};
use visage_worker::{WorkerConfig, WorkerContext};

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

/// Sleeps before delegating, to exercise time limits.
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

pub fn test_config(root: &Path, worker_id: &str) -> WorkerConfig {
    WorkerConfig {
        database_url: String::new(),
        worker_id: worker_id.to_string(),
        hostname: "test-host".to_string(),
        queues: vec!["detection".to_string(), "registration".to_string()],
        concurrency: 1,
        results_dir: root.join("results"),
        known_faces_dir: root.join("known_faces"),
        poll_interval: Duration::from_millis(20),
        heartbeat_interval: Duration::from_millis(50),
        soft_time_limit: Duration::from_secs(10),
        hard_time_limit: Duration::from_secs(20),
        lease: Duration::from_secs(30),
        state_ttl: Duration::from_secs(3600),
        match_tolerance: 0.6,
    }
}

pub fn test_context(pool: SqlitePool, root: &Path, worker_id: &str) -> WorkerContext {
    WorkerContext::new(pool, test_config(root, worker_id), Arc::new(MeanColorDetector))
}

/// Write a solid-colour PNG and return its path.
pub fn write_image(dir: &Path, name: &str, color: [u8; 3]) -> PathBuf {
    std::fs::create_dir_all(dir).unwrap();
    let path = dir.join(name);
    RgbImage::from_pixel(32, 24, Rgb(color))
        .save_with_format(&path, image::ImageFormat::Png)
        .unwrap();
    path
}

pub fn detect_job(input: &Path) -> JobDescriptor {
    let name = input.file_name().unwrap().to_string_lossy().to_string();
    JobDescriptor::new(JobKind::Detect, input.display().to_string(), name)
}

pub fn register_job(input: &Path, label: &str) -> JobDescriptor {
    let name = input.file_name().unwrap().to_string_lossy().to_string();
    JobDescriptor::new(
        JobKind::Register {
            label: label.to_string(),
        },
        input.display().to_string(),
        name,
    )
}
