//! Generation configuration types.

use crate::coord::BoundingBox;
use serde::{Deserialize, Serialize};

/// Default heightmap resolution (pixels per side).
pub const DEFAULT_RESOLUTION: u32 = 2048;

/// Feature toggles for optional artifact layers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeatureFlags {
    /// Extract the road network
    pub roads: bool,
    /// Extract building footprints
    pub buildings: bool,
    /// Extract vegetation areas
    pub vegetation: bool,
    /// Generate material weightmaps
    pub weightmaps: bool,
    /// Detect water bodies
    pub water_bodies: bool,
}

impl Default for FeatureFlags {
    fn default() -> Self {
        Self {
            roads: true,
            buildings: true,
            vegetation: true,
            weightmaps: true,
            water_bodies: true,
        }
    }
}

/// Everything that shapes the generated artifact.
///
/// Two requests with equal bounding boxes and equal configs (up to list
/// ordering) produce the same cache fingerprint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    /// Heightmap resolution in pixels per side
    pub resolution: u32,

    /// Elevation source names to try in order.
    ///
    /// Empty means "auto": sources are tried in ascending
    /// [`priority_rank`](crate::source::DataSource::priority_rank) order.
    pub elevation_source_priority: Vec<String>,

    /// Export format names, or `["all"]` for every registered format
    pub export_formats: Vec<String>,

    /// Optional layer toggles
    pub feature_flags: FeatureFlags,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            resolution: DEFAULT_RESOLUTION,
            elevation_source_priority: Vec::new(),
            export_formats: vec!["unreal5".to_string()],
            feature_flags: FeatureFlags::default(),
        }
    }
}

/// A named request for one terrain artifact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationRequest {
    /// Terrain name, used for the output directory
    pub name: String,
    /// Area to generate
    pub bbox: BoundingBox,
    /// Generation parameters
    pub config: GenerationConfig,
}

impl GenerationRequest {
    /// Creates a request with the default configuration.
    pub fn new(name: impl Into<String>, bbox: BoundingBox) -> Self {
        Self {
            name: name.into(),
            bbox,
            config: GenerationConfig::default(),
        }
    }

    /// Replaces the configuration.
    pub fn with_config(mut self, config: GenerationConfig) -> Self {
        self.config = config;
        self
    }
}
