//! Unity terrain exporter.
//!
//! Unity's terrain importer reads 16-bit little-endian RAW heightmaps with
//! resolutions of 2^n + 1. Arbitrary inputs are resampled to the closest
//! legal size; terrain settings land in a JSON sidecar.

use std::path::{Path, PathBuf};

use serde_json::json;
use tracing::debug;

use crate::terrain::{normalize_to_range, resize_bilinear, TerrainData};

use super::types::{ExportError, Exporter};

/// Heightmap resolutions Unity's terrain system accepts.
pub const VALID_SIZES: [u32; 8] = [33, 65, 129, 257, 513, 1025, 2049, 4097];

/// Exports RAW16 heightmaps for Unity's terrain importer.
#[derive(Debug, Default)]
pub struct UnityExporter;

impl UnityExporter {
    pub fn new() -> Self {
        Self
    }

    fn closest_valid_size(resolution: u32) -> u32 {
        VALID_SIZES
            .into_iter()
            .min_by_key(|s| s.abs_diff(resolution))
            .unwrap_or(VALID_SIZES[0])
    }
}

impl Exporter for UnityExporter {
    fn format_name(&self) -> &'static str {
        "unity"
    }

    fn file_extensions(&self) -> &'static [&'static str] {
        &[".raw", ".json"]
    }

    fn validate(&self, data: &TerrainData) -> Result<(), String> {
        if data.heightmap.is_empty() {
            return Err("heightmap is empty".to_string());
        }
        if !VALID_SIZES.contains(&data.resolution) {
            return Err(format!(
                "resolution {} is not a Unity terrain size (closest: {})",
                data.resolution,
                Self::closest_valid_size(data.resolution)
            ));
        }
        Ok(())
    }

    fn export(&self, data: &TerrainData, out_dir: &Path) -> Result<Vec<PathBuf>, ExportError> {
        if data.heightmap.is_empty() {
            return Err(ExportError::InvalidData("heightmap is empty".into()));
        }

        let target = if VALID_SIZES.contains(&data.resolution) {
            data.resolution
        } else {
            let target = Self::closest_valid_size(data.resolution);
            debug!(from = data.resolution, to = target, "resampling heightmap for Unity");
            target
        };

        let heightmap = resize_bilinear(&data.heightmap, target as usize);
        let normalized = normalize_to_range(&heightmap, 0.0, 65535.0);

        // Unity RAW import expects little-endian 16-bit samples
        let mut raw = Vec::with_capacity(normalized.len() * 2);
        for &v in normalized.iter() {
            raw.extend_from_slice(&(v as u16).to_le_bytes());
        }

        let raw_path = out_dir.join(format!("{}_terrain.raw", data.name));
        std::fs::write(&raw_path, raw)?;

        let settings = json!({
            "name": data.name,
            "format": "unity",
            "heightmap_resolution": target,
            "source_resolution": data.resolution,
            "depth": 16,
            "byte_order": "little_endian",
            "bbox": data.bbox,
            "terrain_size": {
                "width": data.bbox.width_deg() * 111_320.0,
                "length": data.bbox.height_deg() * 111_320.0,
                "height": data.elevation_range(),
            },
            "elevation": {
                "min": data.min_elevation,
                "max": data.max_elevation,
            },
        });
        let settings_path = out_dir.join(format!("{}_terrain.json", data.name));
        std::fs::write(
            &settings_path,
            serde_json::to_vec_pretty(&settings).map_err(|e| ExportError::Encode(e.to_string()))?,
        )?;

        Ok(vec![raw_path, settings_path])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coord::BoundingBox;
    use ndarray::Array2;
    use tempfile::TempDir;

    fn terrain(resolution: u32) -> TerrainData {
        let n = resolution as usize;
        TerrainData::new(
            "coast",
            Array2::from_shape_fn((n, n), |(r, _)| r as f32),
            resolution,
            BoundingBox::new(1.0, 0.0, 1.0, 0.0),
        )
    }

    #[test]
    fn validate_accepts_power_of_two_plus_one() {
        let exporter = UnityExporter::new();
        assert!(exporter.validate(&terrain(513)).is_ok());
        assert!(exporter.validate(&terrain(512)).is_err());
    }

    #[test]
    fn raw_file_has_two_bytes_per_sample() {
        let tmp = TempDir::new().unwrap();
        let exporter = UnityExporter::new();

        let files = exporter.export(&terrain(33), tmp.path()).unwrap();
        let raw = std::fs::read(&files[0]).unwrap();
        assert_eq!(raw.len(), 33 * 33 * 2);
    }

    #[test]
    fn non_legal_size_is_resampled() {
        let tmp = TempDir::new().unwrap();
        let exporter = UnityExporter::new();

        let files = exporter.export(&terrain(100), tmp.path()).unwrap();
        let raw = std::fs::read(&files[0]).unwrap();
        // 100 resamples to 129
        assert_eq!(raw.len(), 129 * 129 * 2);

        let settings: serde_json::Value =
            serde_json::from_slice(&std::fs::read(&files[1]).unwrap()).unwrap();
        assert_eq!(settings["heightmap_resolution"], 129);
    }

    #[test]
    fn full_range_maps_to_u16_extremes() {
        let tmp = TempDir::new().unwrap();
        let exporter = UnityExporter::new();

        let files = exporter.export(&terrain(33), tmp.path()).unwrap();
        let raw = std::fs::read(&files[0]).unwrap();

        let samples: Vec<u16> = raw
            .chunks_exact(2)
            .map(|b| u16::from_le_bytes([b[0], b[1]]))
            .collect();
        assert_eq!(*samples.iter().min().unwrap(), 0);
        assert_eq!(*samples.iter().max().unwrap(), 65535);
    }
}
