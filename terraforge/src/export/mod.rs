//! Export fan-out and the engine exporters.
//!
//! [`ExportFanout`] runs every requested format against one
//! [`TerrainData`](crate::terrain::TerrainData), isolating per-format
//! failures: a broken exporter contributes an error entry to the
//! [`ExportManifest`], never a failed job. Additional exporters can be
//! registered at runtime; the built-ins cover Unreal Engine 5, Unity, and
//! glTF.

mod fanout;
mod gltf;
mod types;
mod unity;
mod unreal;

pub use fanout::ExportFanout;
pub use gltf::GltfExporter;
pub use types::{ExportError, ExportManifest, Exporter, FormatResult};
pub use unity::UnityExporter;
pub use unreal::Unreal5Exporter;
