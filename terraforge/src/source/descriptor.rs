//! The data source contract.

use std::future::Future;
use std::pin::Pin;

use ndarray::Array2;
use serde_json::Value;
use thiserror::Error;

use crate::coord::BoundingBox;

/// Errors a data source can surface.
///
/// The resolver absorbs all of these - a failing source means "try the next
/// one", never a failed job.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SourceError {
    /// HTTP request failed
    #[error("HTTP error: {0}")]
    Http(String),

    /// Source cannot serve the requested area or resolution
    #[error("unsupported request: {0}")]
    Unsupported(String),

    /// Response data could not be decoded
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// The per-source call timeout elapsed
    #[error("source call timed out")]
    Timeout,

    /// Credentials missing or rejected
    #[error("source not configured: {0}")]
    NotConfigured(String),
}

/// What a source can provide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    /// Digital elevation model rasters
    ElevationDem,
    /// Road network vectors
    VectorRoads,
    /// Building footprint vectors
    VectorBuildings,
    /// Water body vectors
    VectorWater,
}

/// Vector feature categories a request can ask for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VectorKind {
    Roads,
    Buildings,
    Water,
}

impl VectorKind {
    /// The capability a source needs to serve this kind.
    pub fn required_capability(&self) -> Capability {
        match self {
            VectorKind::Roads => Capability::VectorRoads,
            VectorKind::Buildings => Capability::VectorBuildings,
            VectorKind::Water => Capability::VectorWater,
        }
    }
}

/// An elevation raster returned by a source.
#[derive(Debug, Clone, PartialEq)]
pub struct ElevationGrid {
    /// Elevation samples in meters, row-major north to south
    pub data: Array2<f32>,
}

impl ElevationGrid {
    pub fn new(data: Array2<f32>) -> Self {
        Self { data }
    }

    /// Pixels per side.
    pub fn resolution(&self) -> u32 {
        self.data.nrows() as u32
    }
}

/// Vector features grouped by kind. Feature payloads are GeoJSON-shaped.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VectorSet {
    pub roads: Vec<Value>,
    pub buildings: Vec<Value>,
    pub water: Vec<Value>,
}

impl VectorSet {
    /// True when no kind holds any feature.
    pub fn is_empty(&self) -> bool {
        self.roads.is_empty() && self.buildings.is_empty() && self.water.is_empty()
    }

    /// Total feature count across kinds.
    pub fn feature_count(&self) -> usize {
        self.roads.len() + self.buildings.len() + self.water.len()
    }
}

/// Boxed future type for object-safe async source methods.
pub type SourceFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, SourceError>> + Send + 'a>>;

/// A single geospatial data provider.
///
/// Implementations are stateless beyond credentials; one instance exists per
/// provider. Methods return `Ok(None)` when the provider is reachable but
/// has no data for the request - the resolver treats that the same as an
/// error and moves on.
pub trait DataSource: Send + Sync {
    /// Provider name, used in priority lists and logs.
    fn name(&self) -> &str;

    /// What this source can serve.
    fn capabilities(&self) -> &[Capability];

    /// Position in the default fallback order; lower ranks are tried first.
    fn priority_rank(&self) -> u32;

    /// Whether the source is configured and enabled (credentials present,
    /// not disabled). Checked before every call; unavailable sources are
    /// skipped without logging an error.
    fn is_available(&self) -> bool;

    /// Fetches an elevation raster for the bounding box.
    fn get_elevation(
        &self,
        bbox: BoundingBox,
        resolution: u32,
    ) -> SourceFuture<'_, Option<ElevationGrid>>;

    /// Fetches vector features of the requested kinds.
    fn get_vectors(
        &self,
        bbox: BoundingBox,
        kinds: Vec<VectorKind>,
    ) -> SourceFuture<'_, Option<VectorSet>>;

    /// Convenience: whether this source claims a capability.
    fn has_capability(&self, capability: Capability) -> bool {
        self.capabilities().contains(&capability)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vector_kind_maps_to_capability() {
        assert_eq!(
            VectorKind::Roads.required_capability(),
            Capability::VectorRoads
        );
        assert_eq!(
            VectorKind::Water.required_capability(),
            Capability::VectorWater
        );
    }

    #[test]
    fn empty_vector_set() {
        let set = VectorSet::default();
        assert!(set.is_empty());
        assert_eq!(set.feature_count(), 0);
    }

    #[test]
    fn elevation_grid_resolution() {
        let grid = ElevationGrid::new(Array2::zeros((64, 64)));
        assert_eq!(grid.resolution(), 64);
    }
}
