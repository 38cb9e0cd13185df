//! Per-worker cache of the known-face registry.
//!
//! Each worker holds a snapshot of every stored encoding. Before a detection
//! job the cached version is compared with the database and the snapshot is
//! rebuilt when another worker has registered a face since the last load.

use std::sync::Arc;

use sqlx::SqlitePool;
use tokio::sync::RwLock;
use visage_core::recognition::{KnownFace, RegistryState};
use visage_db::repositories::KnownFaceRepo;

#[derive(Clone, Default)]
pub struct RegistryHandle {
    current: Arc<RwLock<Arc<RegistryState>>>,
}

impl RegistryHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// The snapshot in use right now. Cheap to clone and safe to hold
    /// across a whole job.
    pub async fn snapshot(&self) -> Arc<RegistryState> {
        Arc::clone(&*self.current.read().await)
    }

    pub async fn replace(&self, state: RegistryState) {
        *self.current.write().await = Arc::new(state);
    }

    /// Load every known face from the database and swap the snapshot.
    pub async fn reload(&self, pool: &SqlitePool) -> Result<Arc<RegistryState>, sqlx::Error> {
        let version = KnownFaceRepo::version(pool).await?;
        let faces: Vec<KnownFace> = KnownFaceRepo::list_all(pool)
            .await?
            .into_iter()
            .map(KnownFace::from)
            .collect();

        let state = Arc::new(RegistryState::new(faces, version));
        *self.current.write().await = Arc::clone(&state);
        tracing::debug!(
            faces = state.len(),
            "Known-face registry loaded",
        );
        Ok(state)
    }

    /// Reload only when the stored registry changed since the last load.
    pub async fn refresh_if_stale(
        &self,
        pool: &SqlitePool,
    ) -> Result<Arc<RegistryState>, sqlx::Error> {
        let cached = self.snapshot().await;
        let stored = KnownFaceRepo::version(pool).await?;
        if stored == cached.version() {
            return Ok(cached);
        }
        self.reload(pool).await
    }
}
