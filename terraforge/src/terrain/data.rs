//! Terrain data container passed into export.

use ndarray::Array2;
use serde_json::Value;

use crate::coord::BoundingBox;

use super::weightmap::Weightmaps;

/// Everything an exporter needs to produce one format's artifact set.
///
/// Built by the pipeline after acquisition and processing; exporters treat
/// it as read-only (auto-resize happens on a per-exporter copy of the
/// heightmap, never in place).
#[derive(Debug, Clone)]
pub struct TerrainData {
    /// Terrain name (output directory stem)
    pub name: String,
    /// Elevation grid in meters
    pub heightmap: Array2<f32>,
    /// Pixels per side of the heightmap
    pub resolution: u32,
    /// Area the heightmap covers
    pub bbox: BoundingBox,
    /// Material blend layers, when weightmap generation was enabled
    pub weightmaps: Option<Weightmaps>,
    /// Road network features (GeoJSON-shaped), when extracted
    pub roads: Option<Vec<Value>>,
    /// Building footprint features, when extracted
    pub buildings: Option<Vec<Value>>,
    /// Minimum elevation in meters
    pub min_elevation: f32,
    /// Maximum elevation in meters
    pub max_elevation: f32,
}

impl TerrainData {
    /// Builds terrain data, deriving the elevation range from the heightmap.
    pub fn new(
        name: impl Into<String>,
        heightmap: Array2<f32>,
        resolution: u32,
        bbox: BoundingBox,
    ) -> Self {
        let min_elevation = heightmap.iter().copied().fold(f32::INFINITY, f32::min);
        let max_elevation = heightmap.iter().copied().fold(f32::NEG_INFINITY, f32::max);
        Self {
            name: name.into(),
            heightmap,
            resolution,
            bbox,
            weightmaps: None,
            roads: None,
            buildings: None,
            min_elevation,
            max_elevation,
        }
    }

    /// Attaches weightmaps.
    pub fn with_weightmaps(mut self, weightmaps: Weightmaps) -> Self {
        self.weightmaps = Some(weightmaps);
        self
    }

    /// Elevation span in meters.
    #[inline]
    pub fn elevation_range(&self) -> f32 {
        self.max_elevation - self.min_elevation
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_derives_elevation_range() {
        let height = ndarray::array![[5.0, 80.0], [-12.0, 40.0]];
        let bbox = BoundingBox::new(1.0, 0.0, 1.0, 0.0);
        let data = TerrainData::new("test", height, 2, bbox);

        assert_eq!(data.min_elevation, -12.0);
        assert_eq!(data.max_elevation, 80.0);
        assert_eq!(data.elevation_range(), 92.0);
        assert!(data.weightmaps.is_none());
    }
}
