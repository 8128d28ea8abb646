//! glTF 2.0 terrain mesh exporter.
//!
//! Triangulates the heightmap into a regular grid mesh and writes a
//! `.gltf` JSON document with an external `.bin` buffer (positions +
//! indices). Grids larger than [`MAX_MESH_SIZE`] are downsampled first -
//! a full-resolution 2048 grid would be four million vertices, far past
//! what preview consumers want.

use std::path::{Path, PathBuf};

use ndarray::Array2;
use serde_json::json;

use crate::terrain::{resize_bilinear, TerrainData};

use super::types::{ExportError, Exporter};

/// Maximum vertices per mesh side.
pub const MAX_MESH_SIZE: u32 = 257;

/// Meters per degree of latitude.
const M_PER_DEGREE: f64 = 111_320.0;

const GLTF_FLOAT: u32 = 5126;
const GLTF_UNSIGNED_INT: u32 = 5125;
const TARGET_ARRAY_BUFFER: u32 = 34962;
const TARGET_ELEMENT_ARRAY_BUFFER: u32 = 34963;

/// Exports the terrain as a glTF 2.0 mesh.
#[derive(Debug, Default)]
pub struct GltfExporter;

impl GltfExporter {
    pub fn new() -> Self {
        Self
    }
}

impl Exporter for GltfExporter {
    fn format_name(&self) -> &'static str {
        "gltf"
    }

    fn file_extensions(&self) -> &'static [&'static str] {
        &[".gltf", ".bin"]
    }

    fn validate(&self, data: &TerrainData) -> Result<(), String> {
        if data.heightmap.is_empty() {
            return Err("heightmap is empty".to_string());
        }
        if data.resolution > MAX_MESH_SIZE {
            return Err(format!(
                "resolution {} exceeds mesh budget; will downsample to {}",
                data.resolution, MAX_MESH_SIZE
            ));
        }
        Ok(())
    }

    fn export(&self, data: &TerrainData, out_dir: &Path) -> Result<Vec<PathBuf>, ExportError> {
        if data.heightmap.is_empty() {
            return Err(ExportError::InvalidData("heightmap is empty".into()));
        }

        let n = (data.resolution.min(MAX_MESH_SIZE)) as usize;
        let grid = resize_bilinear(&data.heightmap, n);

        let (positions, min_pos, max_pos) = mesh_positions(&grid, data);
        let indices = mesh_indices(n);

        // Binary buffer: positions first, then indices
        let positions_bytes = positions.len() * 4;
        let indices_bytes = indices.len() * 4;
        let mut bin = Vec::with_capacity(positions_bytes + indices_bytes);
        for v in &positions {
            bin.extend_from_slice(&v.to_le_bytes());
        }
        for i in &indices {
            bin.extend_from_slice(&i.to_le_bytes());
        }

        let bin_name = format!("{}.bin", data.name);
        let bin_path = out_dir.join(&bin_name);
        std::fs::write(&bin_path, &bin)?;

        let document = json!({
            "asset": { "version": "2.0", "generator": "terraforge" },
            "scene": 0,
            "scenes": [{ "nodes": [0] }],
            "nodes": [{ "mesh": 0, "name": data.name }],
            "meshes": [{
                "name": format!("{}_terrain", data.name),
                "primitives": [{
                    "attributes": { "POSITION": 0 },
                    "indices": 1,
                    "mode": 4,
                }],
            }],
            "accessors": [
                {
                    "bufferView": 0,
                    "componentType": GLTF_FLOAT,
                    "count": positions.len() / 3,
                    "type": "VEC3",
                    "min": min_pos,
                    "max": max_pos,
                },
                {
                    "bufferView": 1,
                    "componentType": GLTF_UNSIGNED_INT,
                    "count": indices.len(),
                    "type": "SCALAR",
                },
            ],
            "bufferViews": [
                {
                    "buffer": 0,
                    "byteOffset": 0,
                    "byteLength": positions_bytes,
                    "target": TARGET_ARRAY_BUFFER,
                },
                {
                    "buffer": 0,
                    "byteOffset": positions_bytes,
                    "byteLength": indices_bytes,
                    "target": TARGET_ELEMENT_ARRAY_BUFFER,
                },
            ],
            "buffers": [{ "uri": bin_name, "byteLength": bin.len() }],
        });

        let gltf_path = out_dir.join(format!("{}.gltf", data.name));
        std::fs::write(
            &gltf_path,
            serde_json::to_vec_pretty(&document).map_err(|e| ExportError::Encode(e.to_string()))?,
        )?;

        Ok(vec![gltf_path, bin_path])
    }
}

/// Flattens the grid into XYZ positions in meters, tracking bounds for the
/// accessor min/max.
fn mesh_positions(grid: &Array2<f32>, data: &TerrainData) -> (Vec<f32>, Vec<f32>, Vec<f32>) {
    let n = grid.nrows();
    let center_lat = data.bbox.center().0;
    let width_m = (data.bbox.width_deg() * M_PER_DEGREE * center_lat.to_radians().cos()) as f32;
    let depth_m = (data.bbox.height_deg() * M_PER_DEGREE) as f32;

    let step_x = if n > 1 { width_m / (n - 1) as f32 } else { 0.0 };
    let step_z = if n > 1 { depth_m / (n - 1) as f32 } else { 0.0 };

    let mut positions = Vec::with_capacity(n * n * 3);
    let mut min_pos = [f32::INFINITY; 3];
    let mut max_pos = [f32::NEG_INFINITY; 3];

    for r in 0..n {
        for c in 0..n {
            let xyz = [c as f32 * step_x, grid[[r, c]], r as f32 * step_z];
            for (axis, &v) in xyz.iter().enumerate() {
                min_pos[axis] = min_pos[axis].min(v);
                max_pos[axis] = max_pos[axis].max(v);
            }
            positions.extend_from_slice(&xyz);
        }
    }

    (positions, min_pos.to_vec(), max_pos.to_vec())
}

/// Two counter-clockwise triangles per grid quad.
fn mesh_indices(n: usize) -> Vec<u32> {
    let mut indices = Vec::with_capacity((n - 1) * (n - 1) * 6);
    for r in 0..n - 1 {
        for c in 0..n - 1 {
            let v0 = (r * n + c) as u32;
            let v1 = (r * n + c + 1) as u32;
            let v2 = ((r + 1) * n + c) as u32;
            let v3 = ((r + 1) * n + c + 1) as u32;
            indices.extend_from_slice(&[v0, v1, v2, v1, v3, v2]);
        }
    }
    indices
}
