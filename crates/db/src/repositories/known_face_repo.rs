//! Repository for the `known_faces` table.

use chrono::Utc;
use sqlx::types::Json;
use sqlx::SqlitePool;
use visage_core::recognition::RegistryVersion;

use crate::models::known_face::KnownFaceRow;

/// Column list for `known_faces` queries.
const COLUMNS: &str = "label, encoding, reference_ref, created_at, updated_at, updated_at_ms";

/// Provides storage for labelled reference encodings.
pub struct KnownFaceRepo;

impl KnownFaceRepo {
    /// Store `encoding` under `label`, replacing any earlier one.
    pub async fn upsert(
        pool: &SqlitePool,
        label: &str,
        encoding: &[f64],
        reference_ref: &str,
    ) -> Result<KnownFaceRow, sqlx::Error> {
        let now = Utc::now();
        let query = format!(
            "INSERT INTO known_faces \
                (label, encoding, reference_ref, created_at, updated_at, updated_at_ms) \
             VALUES (?1, ?2, ?3, ?4, ?4, ?5) \
             ON CONFLICT (label) DO UPDATE SET \
                encoding = excluded.encoding, \
                reference_ref = excluded.reference_ref, \
                updated_at = excluded.updated_at, \
                updated_at_ms = excluded.updated_at_ms \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, KnownFaceRow>(&query)
            .bind(label)
            .bind(Json(encoding))
            .bind(reference_ref)
            .bind(now)
            .bind(now.timestamp_millis())
            .fetch_one(pool)
            .await
    }

    /// Every known face ordered by label.
    pub async fn list_all(pool: &SqlitePool) -> Result<Vec<KnownFaceRow>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM known_faces ORDER BY label ASC");
        sqlx::query_as::<_, KnownFaceRow>(&query).fetch_all(pool).await
    }

    /// Current revision of the stored set, compared by workers before each job.
    pub async fn version(pool: &SqlitePool) -> Result<RegistryVersion, sqlx::Error> {
        let (count, last_updated_ms): (i64, i64) = sqlx::query_as(
            "SELECT COUNT(*), COALESCE(MAX(updated_at_ms), 0) FROM known_faces",
        )
        .fetch_one(pool)
        .await?;
        Ok(RegistryVersion {
            count,
            last_updated_ms,
        })
    }
}
