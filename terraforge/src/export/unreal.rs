//! Unreal Engine 5 Landscape exporter.
//!
//! UE5 Landscape accepts fixed grid sizes (1009, 2017, 4033, 8129); other
//! resolutions are resampled to the closest legal size before encoding.
//! Output is a 16-bit grayscale PNG heightmap, one 8-bit PNG per weightmap
//! layer, and a JSON metadata sidecar carrying the import scale.

use std::path::{Path, PathBuf};

use image::{ImageBuffer, Luma};
use ndarray::Array2;
use serde_json::json;
use tracing::debug;

use crate::terrain::{normalize_to_range, resize_bilinear, TerrainData};

use super::types::{ExportError, Exporter};

/// Grid sizes UE5 Landscape will import.
pub const VALID_SIZES: [u32; 4] = [1009, 2017, 4033, 8129];

/// Exports heightmaps and weightmaps for UE5 Landscape import.
#[derive(Debug, Default)]
pub struct Unreal5Exporter;

impl Unreal5Exporter {
    pub fn new() -> Self {
        Self
    }

    fn closest_valid_size(resolution: u32) -> u32 {
        VALID_SIZES
            .into_iter()
            .min_by_key(|s| s.abs_diff(resolution))
            .unwrap_or(VALID_SIZES[0])
    }

    fn write_heightmap_png(
        grid: &Array2<f32>,
        path: &Path,
    ) -> Result<(), ExportError> {
        let (rows, cols) = grid.dim();
        let normalized = normalize_to_range(grid, 0.0, 65535.0);
        let pixels: Vec<u16> = normalized.iter().map(|&v| v as u16).collect();

        let buffer: ImageBuffer<Luma<u16>, Vec<u16>> =
            ImageBuffer::from_raw(cols as u32, rows as u32, pixels)
                .ok_or_else(|| ExportError::Encode("heightmap buffer size mismatch".into()))?;
        buffer
            .save(path)
            .map_err(|e| ExportError::Encode(e.to_string()))
    }

    fn write_weightmap_png(layer: &Array2<f32>, path: &Path) -> Result<(), ExportError> {
        let (rows, cols) = layer.dim();
        let pixels: Vec<u8> = layer
            .iter()
            .map(|&v| (v.clamp(0.0, 1.0) * 255.0) as u8)
            .collect();

        let buffer: ImageBuffer<Luma<u8>, Vec<u8>> =
            ImageBuffer::from_raw(cols as u32, rows as u32, pixels)
                .ok_or_else(|| ExportError::Encode("weightmap buffer size mismatch".into()))?;
        buffer
            .save(path)
            .map_err(|e| ExportError::Encode(e.to_string()))
    }
}

impl Exporter for Unreal5Exporter {
    fn format_name(&self) -> &'static str {
        "unreal5"
    }

    fn file_extensions(&self) -> &'static [&'static str] {
        &[".png", ".json"]
    }

    fn validate(&self, data: &TerrainData) -> Result<(), String> {
        if data.heightmap.is_empty() {
            return Err("heightmap is empty".to_string());
        }
        if !VALID_SIZES.contains(&data.resolution) {
            let closest = Self::closest_valid_size(data.resolution);
            return Err(format!(
                "resolution {} is not valid for UE5 Landscape (valid: {:?}, closest: {})",
                data.resolution, VALID_SIZES, closest
            ));
        }
        Ok(())
    }

    fn export(&self, data: &TerrainData, out_dir: &Path) -> Result<Vec<PathBuf>, ExportError> {
        if data.heightmap.is_empty() {
            return Err(ExportError::InvalidData("heightmap is empty".into()));
        }

        // Auto-resize to the nearest legal Landscape size
        let target = if VALID_SIZES.contains(&data.resolution) {
            data.resolution
        } else {
            let target = Self::closest_valid_size(data.resolution);
            debug!(
                from = data.resolution,
                to = target,
                "resampling heightmap for UE5 Landscape"
            );
            target
        };
        let heightmap = resize_bilinear(&data.heightmap, target as usize);

        let mut files = Vec::new();

        let heightmap_path = out_dir.join(format!("{}_heightmap.png", data.name));
        Self::write_heightmap_png(&heightmap, &heightmap_path)?;
        files.push(heightmap_path);

        if let Some(weightmaps) = &data.weightmaps {
            for (layer_name, layer) in weightmaps.layers() {
                let resized = resize_bilinear(layer, target as usize);
                let path = out_dir.join(format!("{}_weightmap_{}.png", data.name, layer_name));
                Self::write_weightmap_png(&resized, &path)?;
                files.push(path);
            }
        }

        // UE5 maps the 16-bit range onto 512 units at scale Z=100
        let elevation_range = data.elevation_range();
        let metadata = json!({
            "name": data.name,
            "format": "unreal5",
            "landscape_size": target,
            "source_resolution": data.resolution,
            "bbox": data.bbox,
            "elevation": {
                "min": data.min_elevation,
                "max": data.max_elevation,
            },
            "scale": {
                "x": 100.0,
                "y": 100.0,
                "z": f64::from(elevation_range) / 512.0 * 100.0,
            },
            "section_size": "127x127",
            "sections_per_component": 1,
        });
        let metadata_path = out_dir.join(format!("{}_metadata.json", data.name));
        std::fs::write(&metadata_path, serde_json::to_vec_pretty(&metadata).map_err(
            |e| ExportError::Encode(e.to_string()),
        )?)?;
        files.push(metadata_path);

        Ok(files)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coord::BoundingBox;
    use crate::terrain::generate_weightmaps;
    use tempfile::TempDir;

    fn terrain(resolution: u32) -> TerrainData {
        let n = resolution as usize;
        let heightmap = Array2::from_shape_fn((n, n), |(r, c)| (r + c) as f32);
        TerrainData::new(
            "alps",
            heightmap,
            resolution,
            BoundingBox::new(47.0, 46.0, 8.0, 7.0),
        )
    }

    #[test]
    fn validate_accepts_legal_sizes() {
        let exporter = Unreal5Exporter::new();
        assert!(exporter.validate(&terrain(1009)).is_ok());
    }

    #[test]
    fn validate_names_closest_legal_size() {
        let exporter = Unreal5Exporter::new();
        let reason = exporter.validate(&terrain(1000)).unwrap_err();
        assert!(reason.contains("1009"), "reason: {reason}");
    }

    #[test]
    fn closest_size_picks_nearest() {
        assert_eq!(Unreal5Exporter::closest_valid_size(100), 1009);
        assert_eq!(Unreal5Exporter::closest_valid_size(1600), 2017);
        assert_eq!(Unreal5Exporter::closest_valid_size(9000), 8129);
    }

    #[test]
    fn export_writes_heightmap_and_metadata() {
        let tmp = TempDir::new().unwrap();
        let exporter = Unreal5Exporter::new();

        let files = exporter.export(&terrain(64), tmp.path()).unwrap();

        assert_eq!(files.len(), 2);
        assert!(tmp.path().join("alps_heightmap.png").exists());
        assert!(tmp.path().join("alps_metadata.json").exists());

        // Auto-resize landed on 1009
        let meta: serde_json::Value =
            serde_json::from_slice(&std::fs::read(tmp.path().join("alps_metadata.json")).unwrap())
                .unwrap();
        assert_eq!(meta["landscape_size"], 1009);
        assert_eq!(meta["source_resolution"], 64);
    }

    #[test]
    fn export_includes_weightmap_layers() {
        let tmp = TempDir::new().unwrap();
        let exporter = Unreal5Exporter::new();

        let mut data = terrain(32);
        let weightmaps = generate_weightmaps(&data.heightmap);
        data = data.with_weightmaps(weightmaps);

        let files = exporter.export(&data, tmp.path()).unwrap();

        // heightmap + 4 weightmaps + metadata
        assert_eq!(files.len(), 6);
        for layer in ["rock", "grass", "dirt", "sand"] {
            assert!(tmp.path().join(format!("alps_weightmap_{layer}.png")).exists());
        }
    }

    #[test]
    fn empty_heightmap_is_invalid_data() {
        let tmp = TempDir::new().unwrap();
        let exporter = Unreal5Exporter::new();
        let data = TerrainData::new(
            "void",
            Array2::zeros((0, 0)),
            0,
            BoundingBox::new(1.0, 0.0, 1.0, 0.0),
        );
        assert!(matches!(
            exporter.export(&data, tmp.path()),
            Err(ExportError::InvalidData(_))
        ));
    }
}
