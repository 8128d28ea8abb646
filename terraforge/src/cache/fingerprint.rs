//! Deterministic request fingerprinting.
//!
//! The fingerprint is a SHA-256 over a canonical JSON document derived from
//! the request. Coordinates are rounded to 1e-6 degrees (about 11 cm) so
//! floating-point noise from different front ends cannot split the cache,
//! and list-valued config fields are sorted so field order never matters.

use crate::config::GenerationConfig;
use crate::coord::BoundingBox;
use serde::{Deserialize, Serialize};
use serde_json::json;
use sha2::{Digest, Sha256};

/// Identifies a unique (bbox, config) request.
///
/// Two requests with the same fingerprint are the same artifact.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Computes the fingerprint for a request.
    ///
    /// Pure and deterministic across processes and restarts.
    pub fn compute(bbox: &BoundingBox, config: &GenerationConfig) -> Self {
        let mut formats = config.export_formats.clone();
        formats.sort();
        let mut sources = config.elevation_source_priority.clone();
        sources.sort();

        // serde_json maps are BTree-backed, so key order is canonical.
        let document = json!({
            "bbox": {
                "north": round6(bbox.north),
                "south": round6(bbox.south),
                "east": round6(bbox.east),
                "west": round6(bbox.west),
            },
            "config": {
                "resolution": config.resolution,
                "elevation_source_priority": sources,
                "export_formats": formats,
                "roads": config.feature_flags.roads,
                "buildings": config.feature_flags.buildings,
                "vegetation": config.feature_flags.vegetation,
                "weightmaps": config.feature_flags.weightmaps,
                "water_bodies": config.feature_flags.water_bodies,
            },
        });

        let canonical = document.to_string();
        let digest = Sha256::digest(canonical.as_bytes());
        Self(format!("{:x}", digest))
    }

    /// Returns the hex digest string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Wraps an existing digest string (used when loading the index).
    pub fn from_hex(hex: impl Into<String>) -> Self {
        Self(hex.into())
    }
}

impl std::fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Rounds a coordinate to 1e-6 degrees, emitted as a fixed-width string so
/// the JSON rendering of -0.0 and 0.0 cannot diverge.
fn round6(value: f64) -> String {
    let rounded = (value * 1e6).round() / 1e6;
    // Normalize negative zero
    let rounded = if rounded == 0.0 { 0.0 } else { rounded };
    format!("{:.6}", rounded)
}
