//! Face matching against the registry of labelled reference encodings.
//!
//! The registry is an immutable [`RegistryState`] snapshot. Workers hold it
//! behind an `Arc` and replace the whole snapshot when the stored set changes,
//! so a running detection never sees a half-updated registry.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::EpochMs;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Maximum distance at which two encodings are considered the same face.
pub const DEFAULT_TOLERANCE: f64 = 0.6;

/// Maximum length of a registered label.
const MAX_LABEL_LEN: usize = 64;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// One labelled reference encoding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnownFace {
    pub label: String,
    pub encoding: Vec<f64>,
}

/// Identifies one revision of the stored registry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryVersion {
    pub count: i64,
    pub last_updated_ms: EpochMs,
}

/// A face matched against the registry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recognition {
    pub label: String,
    /// Percentage in `0.0..=100.0`, one decimal place.
    pub confidence: f64,
}

impl fmt::Display for Recognition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({:.1}%)", self.label, self.confidence)
    }
}

/// Immutable snapshot of all known faces.
#[derive(Debug, Clone, Default)]
pub struct RegistryState {
    faces: Vec<KnownFace>,
    version: RegistryVersion,
}

impl RegistryState {
    pub fn new(faces: Vec<KnownFace>, version: RegistryVersion) -> Self {
        Self { faces, version }
    }

    pub fn version(&self) -> RegistryVersion {
        self.version
    }

    pub fn len(&self) -> usize {
        self.faces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.faces.is_empty()
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.faces.iter().map(|f| f.label.as_str())
    }

    /// Best match for `encoding` within `tolerance`, if any.
    pub fn recognize(&self, encoding: &[f64], tolerance: f64) -> Option<Recognition> {
        self.faces
            .iter()
            .map(|known| (known, face_distance(&known.encoding, encoding)))
            .filter(|(_, distance)| *distance <= tolerance)
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(known, distance)| Recognition {
                label: known.label.clone(),
                confidence: confidence_from_distance(distance),
            })
    }
}

// ---------------------------------------------------------------------------
// Distance and confidence
// ---------------------------------------------------------------------------

/// Euclidean distance between two encodings.
///
/// Encodings of different length never match.
pub fn face_distance(a: &[f64], b: &[f64]) -> f64 {
    if a.len() != b.len() || a.is_empty() {
        return f64::INFINITY;
    }
    a.iter()
        .zip(b)
        .map(|(x, y)| (x - y).powi(2))
        .sum::<f64>()
        .sqrt()
}

/// `(1 - distance) * 100`, rounded to one decimal and clamped to `0..=100`.
pub fn confidence_from_distance(distance: f64) -> f64 {
    let pct = ((1.0 - distance) * 100.0 * 10.0).round() / 10.0;
    pct.clamp(0.0, 100.0)
}

// ---------------------------------------------------------------------------
// Labels
// ---------------------------------------------------------------------------

/// Trim and collapse whitespace in a label, rejecting empty or oversized ones.
pub fn normalize_label(raw: &str) -> Result<String, CoreError> {
    let label = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    if label.is_empty() {
        return Err(CoreError::Validation("Name must not be empty".to_string()));
    }
    if label.chars().count() > MAX_LABEL_LEN {
        return Err(CoreError::Validation(format!(
            "Name must not exceed {MAX_LABEL_LEN} characters"
        )));
    }
    Ok(label)
}

/// File stem under which a label's reference image is stored.
pub fn label_file_stem(label: &str) -> String {
    let stem: String = label
        .to_lowercase()
        .replace(' ', "_")
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-'))
        .collect();
    if stem.is_empty() {
        "face".to_string()
    } else {
        stem
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
