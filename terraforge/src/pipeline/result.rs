//! Completed generation result.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::export::ExportManifest;

/// Summary of one completed generation.
///
/// Stored on the job, broadcast to coalesced waiters, and serialized as
/// `result.json` inside the output directory (which is what a cache hit
/// reads back).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TerrainResult {
    /// Terrain name
    pub name: String,
    /// Heightmap resolution actually generated
    pub resolution: u32,
    /// Requested area in square kilometres
    pub area_km2: f64,
    /// Minimum elevation in meters
    pub elevation_min: f32,
    /// Maximum elevation in meters
    pub elevation_max: f32,
    /// Which source satisfied the elevation request
    pub elevation_source: String,
    /// Which source satisfied the vector request, if any did
    pub vector_source: Option<String>,
    /// Per-format export outcomes
    pub exports: ExportManifest,
    /// Directory holding the exported artifacts
    pub output_dir: PathBuf,
    /// Whether this result was served from the cache
    pub cache_hit: bool,
}

impl TerrainResult {
    /// Filename of the serialized result inside the output directory.
    pub const FILE_NAME: &'static str = "result.json";

    /// Marks the result as cache-served.
    pub fn as_cache_hit(mut self) -> Self {
        self.cache_hit = true;
        self
    }
}
