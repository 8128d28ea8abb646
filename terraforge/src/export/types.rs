//! Exporter contract and manifest types.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::terrain::TerrainData;

/// Errors produced while writing one format's artifacts.
#[derive(Debug, Error)]
pub enum ExportError {
    /// File I/O failed
    #[error("export I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Encoding the artifact failed
    #[error("encoding failed: {0}")]
    Encode(String),

    /// Terrain data unusable for this format
    #[error("invalid terrain data: {0}")]
    InvalidData(String),
}

/// A terrain exporter for one target format.
///
/// `validate` reports whether the data can be exported as-is; a failed
/// validation is advisory - `export` is still called and is expected to
/// adjust (e.g. resample to the nearest legal grid size) or fail cleanly.
pub trait Exporter: Send + Sync {
    /// Registry key, e.g. `"unreal5"`.
    fn format_name(&self) -> &'static str;

    /// Extensions of the files this exporter produces.
    fn file_extensions(&self) -> &'static [&'static str];

    /// Checks the data against format constraints. `Err` carries the reason.
    fn validate(&self, data: &TerrainData) -> Result<(), String>;

    /// Writes the artifacts into `out_dir`, returning the files created.
    fn export(&self, data: &TerrainData, out_dir: &Path) -> Result<Vec<PathBuf>, ExportError>;
}

/// Outcome for a single requested format.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FormatResult {
    /// Files written (empty on failure)
    pub files: Vec<PathBuf>,
    /// Failure reason, if the format failed
    pub error: Option<String>,
}

impl FormatResult {
    pub fn success(files: Vec<PathBuf>) -> Self {
        Self { files, error: None }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            files: Vec::new(),
            error: Some(error.into()),
        }
    }

    /// True when the format exported cleanly.
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

/// Per-format outcomes for one export run.
///
/// Always covers every requested format, successful or not.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExportManifest {
    pub formats: BTreeMap<String, FormatResult>,
}

impl ExportManifest {
    /// Records one format's outcome.
    pub fn insert(&mut self, format: impl Into<String>, result: FormatResult) {
        self.formats.insert(format.into(), result);
    }

    /// Outcome for a format, if it was requested.
    pub fn get(&self, format: &str) -> Option<&FormatResult> {
        self.formats.get(format)
    }

    /// Names of formats that exported cleanly.
    pub fn succeeded(&self) -> Vec<&str> {
        self.formats
            .iter()
            .filter(|(_, r)| r.is_success())
            .map(|(name, _)| name.as_str())
            .collect()
    }

    /// Names of formats that failed.
    pub fn failed(&self) -> Vec<&str> {
        self.formats
            .iter()
            .filter(|(_, r)| !r.is_success())
            .map(|(name, _)| name.as_str())
            .collect()
    }

    /// True when at least one format produced files.
    pub fn any_succeeded(&self) -> bool {
        self.formats.values().any(|r| r.is_success())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manifest_partitions_outcomes() {
        let mut manifest = ExportManifest::default();
        manifest.insert("unreal5", FormatResult::success(vec!["a.png".into()]));
        manifest.insert("unity", FormatResult::failure("boom"));

        assert_eq!(manifest.succeeded(), vec!["unreal5"]);
        assert_eq!(manifest.failed(), vec!["unity"]);
        assert!(manifest.any_succeeded());
        assert!(manifest.get("unity").unwrap().error.is_some());
    }

    #[test]
    fn empty_manifest_has_no_successes() {
        let manifest = ExportManifest::default();
        assert!(!manifest.any_succeeded());
        assert!(manifest.succeeded().is_empty());
    }
}
