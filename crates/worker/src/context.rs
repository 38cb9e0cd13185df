use std::sync::Arc;

use sqlx::SqlitePool;
use visage_pipeline::{EncoderChain, FaceDetector};

use crate::config::WorkerConfig;
use crate::registry::RegistryHandle;

/// Everything a worker needs to execute jobs. Cheap to clone.
#[derive(Clone)]
pub struct WorkerContext {
    pub pool: SqlitePool,
    pub config: Arc<WorkerConfig>,
    pub detector: Arc<dyn FaceDetector>,
    pub encoders: Arc<EncoderChain>,
    pub registry: RegistryHandle,
}

impl WorkerContext {
    /// Build a context with the default encoder chain and an empty registry
    /// cache. The runtime loads the registry on startup.
    pub fn new(pool: SqlitePool, config: WorkerConfig, detector: Arc<dyn FaceDetector>) -> Self {
        Self {
            pool,
            config: Arc::new(config),
            detector,
            encoders: Arc::new(EncoderChain::default()),
            registry: RegistryHandle::new(),
        }
    }

    pub fn worker_id(&self) -> &str {
        &self.config.worker_id
    }
}
