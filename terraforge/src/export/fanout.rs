//! Per-format export fan-out with failure isolation.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use tracing::{debug, error, info};

use crate::terrain::TerrainData;

use super::types::{ExportManifest, Exporter, FormatResult};
use super::{GltfExporter, UnityExporter, Unreal5Exporter};

/// Wildcard format name expanding to every registered exporter.
pub const FORMAT_ALL: &str = "all";

/// Runs requested exporters against processed terrain data.
///
/// Exporters run on the blocking pool (encoding is CPU-bound) one format at
/// a time; a failing or panicking exporter is confined to its manifest
/// entry.
pub struct ExportFanout {
    exporters: BTreeMap<&'static str, Arc<dyn Exporter>>,
}

impl ExportFanout {
    /// Creates an empty fan-out with no registered exporters.
    pub fn new() -> Self {
        Self {
            exporters: BTreeMap::new(),
        }
    }

    /// Creates a fan-out with the built-in exporters registered.
    pub fn with_defaults() -> Self {
        let mut fanout = Self::new();
        fanout.register(Arc::new(Unreal5Exporter::new()));
        fanout.register(Arc::new(UnityExporter::new()));
        fanout.register(Arc::new(GltfExporter::new()));
        fanout
    }

    /// Registers an exporter under its format name, replacing any previous
    /// exporter with the same name.
    pub fn register(&mut self, exporter: Arc<dyn Exporter>) {
        self.exporters.insert(exporter.format_name(), exporter);
    }

    /// Registered format names.
    pub fn formats(&self) -> Vec<&'static str> {
        self.exporters.keys().copied().collect()
    }

    /// Whether a format name is known (the wildcard counts).
    pub fn knows(&self, format: &str) -> bool {
        format == FORMAT_ALL || self.exporters.contains_key(format)
    }

    /// Exports `data` to every requested format under `out_dir`.
    ///
    /// Each format writes into `out_dir/<format>/`. The returned manifest
    /// has an entry per requested format; failures are recorded, never
    /// propagated.
    pub async fn run(
        &self,
        data: Arc<TerrainData>,
        formats: &[String],
        out_dir: &Path,
    ) -> ExportManifest {
        let mut manifest = ExportManifest::default();

        for format in self.expand(formats) {
            let Some(exporter) = self.exporters.get(format.as_str()).cloned() else {
                error!(format = %format, "unknown export format requested");
                manifest.insert(format.clone(), FormatResult::failure("unknown format"));
                continue;
            };

            if let Err(reason) = exporter.validate(&data) {
                debug!(format = %format, reason = %reason, "validation requires adjustment");
            }

            let format_dir = out_dir.join(&format);
            let result = self.run_one(exporter, Arc::clone(&data), format_dir).await;
            match &result {
                Ok(files) => {
                    info!(format = %format, files = files.len(), "export complete");
                }
                Err(reason) => {
                    error!(format = %format, error = %reason, "export failed");
                }
            }
            manifest.insert(
                format,
                match result {
                    Ok(files) => FormatResult::success(files),
                    Err(reason) => FormatResult::failure(reason),
                },
            );
        }

        manifest
    }

    /// Runs one exporter on the blocking pool, flattening panics into an
    /// error string.
    async fn run_one(
        &self,
        exporter: Arc<dyn Exporter>,
        data: Arc<TerrainData>,
        format_dir: std::path::PathBuf,
    ) -> Result<Vec<std::path::PathBuf>, String> {
        let joined = tokio::task::spawn_blocking(move || {
            std::fs::create_dir_all(&format_dir).map_err(|e| e.to_string())?;
            exporter.export(&data, &format_dir).map_err(|e| e.to_string())
        })
        .await;

        match joined {
            Ok(result) => result,
            Err(join_err) => Err(format!("exporter panicked: {join_err}")),
        }
    }

    /// Expands the wildcard and removes duplicate requests, preserving
    /// first-seen order.
    fn expand(&self, formats: &[String]) -> Vec<String> {
        let mut out: Vec<String> = Vec::new();
        for format in formats {
            if format == FORMAT_ALL {
                for name in self.exporters.keys() {
                    if !out.iter().any(|f| f == name) {
                        out.push((*name).to_string());
                    }
                }
            } else if !out.iter().any(|f| f == format) {
                out.push(format.clone());
            }
        }
        out
    }
}

impl Default for ExportFanout {
    fn default() -> Self {
        Self::with_defaults()
    }
}
