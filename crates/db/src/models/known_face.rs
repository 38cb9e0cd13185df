//! Known-face registry rows.

use serde::Serialize;
use sqlx::types::Json;
use sqlx::FromRow;
use visage_core::recognition::KnownFace;
use visage_core::types::{EpochMs, Timestamp};

/// A row from the `known_faces` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct KnownFaceRow {
    pub label: String,
    #[serde(skip)]
    pub encoding: Json<Vec<f64>>,
    pub reference_ref: String,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
    pub updated_at_ms: EpochMs,
}

impl From<KnownFaceRow> for KnownFace {
    fn from(row: KnownFaceRow) -> Self {
        KnownFace {
            label: row.label,
            encoding: row.encoding.0,
        }
    }
}
