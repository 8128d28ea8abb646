//! Ordered fallback resolution across data sources.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::coord::BoundingBox;

use super::descriptor::{
    Capability, DataSource, ElevationGrid, SourceError, VectorKind, VectorSet,
};

/// Default timeout for a single source call.
pub const DEFAULT_SOURCE_TIMEOUT: Duration = Duration::from_secs(120);

/// Elevation data plus the name of the source that produced it.
#[derive(Debug, Clone)]
pub struct ResolvedElevation {
    pub grid: ElevationGrid,
    pub source: String,
}

/// Vector data plus the name of the source that produced it.
#[derive(Debug, Clone)]
pub struct ResolvedVectors {
    pub vectors: VectorSet,
    pub source: String,
}

/// Walks a fallback chain of sources until one produces data.
///
/// A single source's failure - unavailable, erroring, timing out, or
/// returning no data - never aborts resolution; it is logged and the next
/// source is tried. With a [`SyntheticSource`](super::SyntheticSource) at
/// the tail of the chain, elevation resolution cannot be exhausted.
pub struct SourceResolver {
    /// Sources in ascending priority-rank order (the "auto" order)
    sources: Vec<Arc<dyn DataSource>>,
    /// Per-call timeout, independent of the job timeout
    call_timeout: Duration,
}

impl SourceResolver {
    /// Creates a resolver over the given sources.
    ///
    /// Sources are sorted by [`priority_rank`](DataSource::priority_rank)
    /// once, at construction.
    pub fn new(mut sources: Vec<Arc<dyn DataSource>>) -> Self {
        sources.sort_by_key(|s| s.priority_rank());
        Self {
            sources,
            call_timeout: DEFAULT_SOURCE_TIMEOUT,
        }
    }

    /// Overrides the per-call timeout.
    pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = timeout;
        self
    }

    /// Registered source names in default order.
    pub fn source_names(&self) -> Vec<&str> {
        self.sources.iter().map(|s| s.name()).collect()
    }

    /// Resolves elevation data for a bounding box.
    ///
    /// Tries sources in `priority` order when the list is non-empty,
    /// otherwise in ascending rank order. Errors only if the chain is
    /// exhausted, which cannot happen when a synthetic source is registered.
    pub async fn resolve_elevation(
        &self,
        bbox: BoundingBox,
        resolution: u32,
        priority: &[String],
    ) -> Result<ResolvedElevation, SourceError> {
        for source in self.ordered(priority, &[Capability::ElevationDem]) {
            if !source.is_available() {
                debug!(source = source.name(), "source unavailable, skipping");
                continue;
            }

            debug!(source = source.name(), %bbox, resolution, "trying elevation source");
            let call = source.get_elevation(bbox, resolution);
            match tokio::time::timeout(self.call_timeout, call).await {
                Ok(Ok(Some(grid))) => {
                    info!(
                        source = source.name(),
                        resolution = grid.resolution(),
                        "elevation acquired"
                    );
                    return Ok(ResolvedElevation {
                        grid,
                        source: source.name().to_string(),
                    });
                }
                Ok(Ok(None)) => {
                    debug!(source = source.name(), "source has no data for area");
                }
                Ok(Err(err)) => {
                    warn!(source = source.name(), error = %err, "elevation source failed");
                }
                Err(_) => {
                    warn!(
                        source = source.name(),
                        timeout_secs = self.call_timeout.as_secs(),
                        "elevation source timed out"
                    );
                }
            }
        }

        Err(SourceError::Unsupported(
            "every elevation source exhausted".to_string(),
        ))
    }

    /// Resolves vector features for a bounding box.
    ///
    /// Same fallback discipline as elevation, but exhaustion is a valid
    /// degraded state: returns `None` instead of synthesizing features.
    pub async fn resolve_vectors(
        &self,
        bbox: BoundingBox,
        kinds: &[VectorKind],
        priority: &[String],
    ) -> Option<ResolvedVectors> {
        if kinds.is_empty() {
            return None;
        }

        let wanted: Vec<Capability> = kinds.iter().map(|k| k.required_capability()).collect();

        for source in self.ordered(priority, &wanted) {
            if !source.is_available() {
                debug!(source = source.name(), "source unavailable, skipping");
                continue;
            }

            let call = source.get_vectors(bbox, kinds.to_vec());
            match tokio::time::timeout(self.call_timeout, call).await {
                Ok(Ok(Some(vectors))) if !vectors.is_empty() => {
                    info!(
                        source = source.name(),
                        features = vectors.feature_count(),
                        "vector data acquired"
                    );
                    return Some(ResolvedVectors {
                        vectors,
                        source: source.name().to_string(),
                    });
                }
                Ok(Ok(_)) => {
                    debug!(source = source.name(), "no vector features for area");
                }
                Ok(Err(err)) => {
                    warn!(source = source.name(), error = %err, "vector source failed");
                }
                Err(_) => {
                    warn!(source = source.name(), "vector source timed out");
                }
            }
        }

        info!("no vector source produced data; continuing without vectors");
        None
    }

    /// The chain in request order: an explicit priority list of names, or
    /// every capable source by ascending rank when the list is empty.
    /// A source is capable if it claims any of the wanted capabilities.
    /// Unknown names are skipped with a warning; sources not in an explicit
    /// list are still appended as fallback, keeping the chain uniform.
    fn ordered(&self, priority: &[String], wanted: &[Capability]) -> Vec<Arc<dyn DataSource>> {
        let capable: Vec<Arc<dyn DataSource>> = self
            .sources
            .iter()
            .filter(|s| wanted.iter().any(|c| s.has_capability(*c)))
            .cloned()
            .collect();

        if priority.is_empty() {
            return capable;
        }

        let mut ordered = Vec::with_capacity(capable.len());
        for name in priority {
            match capable.iter().find(|s| s.name() == name) {
                Some(source) => ordered.push(Arc::clone(source)),
                None => warn!(source = %name, "unknown source in priority list, skipping"),
            }
        }
        for source in &capable {
            if !ordered.iter().any(|s| s.name() == source.name()) {
                ordered.push(Arc::clone(source));
            }
        }
        ordered
    }
}
