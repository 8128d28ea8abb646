//! End-to-end generation of one terrain artifact.

use std::path::PathBuf;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::cache::{Fingerprint, ResultCache};
use crate::config::GenerationRequest;
use crate::export::ExportFanout;
use crate::source::{SourceResolver, VectorKind};
use crate::terrain::{generate_weightmaps, resize_bilinear, TerrainData};

use super::error::GenerateError;
use super::inflight::{InflightMap, Registration};
use super::result::TerrainResult;

/// Progress sink: `(percent, step label)`.
///
/// The queue wires this to the job record; the CLI wires it to the
/// terminal.
pub type ProgressFn = dyn Fn(f32, &str) + Send + Sync;

/// Generator settings.
#[derive(Debug, Clone)]
pub struct GeneratorConfig {
    /// Root directory for generated artifacts; each terrain gets a
    /// subdirectory named after it
    pub output_dir: PathBuf,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("output"),
        }
    }
}

/// Runs the full pipeline for one request.
///
/// Fixed progress checkpoints (10% acquisition, 30% vectors, 50%
/// weightmaps, 60% assembly, 70% export, 95% finalize) match what status
/// displays expect. The cancellation token is observed between stages -
/// cancellation never aborts an in-flight source call, it takes effect at
/// the next suspension point.
pub struct TerrainGenerator {
    resolver: Arc<SourceResolver>,
    cache: Arc<ResultCache>,
    fanout: Arc<ExportFanout>,
    inflight: InflightMap,
    config: GeneratorConfig,
}

impl TerrainGenerator {
    pub fn new(
        resolver: Arc<SourceResolver>,
        cache: Arc<ResultCache>,
        fanout: Arc<ExportFanout>,
        config: GeneratorConfig,
    ) -> Self {
        Self {
            resolver,
            cache,
            fanout,
            inflight: InflightMap::new(),
            config,
        }
    }

    /// Generates one terrain artifact.
    ///
    /// Consults the cache first; coalesces onto an identical in-flight
    /// request if one exists; otherwise acquires, processes, exports, and
    /// caches. Export failures are recorded in the manifest, not raised.
    pub async fn generate(
        &self,
        request: &GenerationRequest,
        progress: &ProgressFn,
        cancel: &CancellationToken,
    ) -> Result<TerrainResult, GenerateError> {
        let fingerprint = Fingerprint::compute(&request.bbox, &request.config);

        // Cache first: a hit never touches a source
        if let Some(result) = self.try_cached(&fingerprint).await {
            progress(100.0, "Complete");
            info!(fingerprint = %fingerprint, name = %request.name, "served from cache");
            return Ok(result);
        }

        match self.inflight.register(&fingerprint).await {
            Registration::Primary => {
                let outcome = self.run_pipeline(request, &fingerprint, progress, cancel).await;
                let broadcast = match &outcome {
                    Ok(result) => Ok(result.clone()),
                    Err(err) => Err(err.to_string()),
                };
                self.inflight.complete(&fingerprint, broadcast).await;
                outcome
            }
            Registration::Coalesced(mut rx) => {
                debug!(fingerprint = %fingerprint, "awaiting identical in-flight request");
                progress(10.0, "Waiting for identical request");
                tokio::select! {
                    _ = cancel.cancelled() => Err(GenerateError::Cancelled),
                    received = rx.recv() => match received {
                        Ok(Ok(result)) => {
                            progress(100.0, "Complete");
                            Ok(result)
                        }
                        Ok(Err(message)) => Err(GenerateError::CoalescedFailed(message)),
                        Err(_) => Err(GenerateError::CoalescedFailed(
                            "primary request dropped".to_string(),
                        )),
                    },
                }
            }
        }
    }

    /// Cache lookup, reconstructing the result summary from the cached
    /// directory. An unreadable summary is treated as a miss.
    async fn try_cached(&self, fingerprint: &Fingerprint) -> Option<TerrainResult> {
        let path = self.cache.get(fingerprint).await?;
        let raw = tokio::fs::read(path.join(TerrainResult::FILE_NAME)).await.ok()?;
        match serde_json::from_slice::<TerrainResult>(&raw) {
            Ok(result) => Some(TerrainResult {
                output_dir: path,
                ..result.as_cache_hit()
            }),
            Err(err) => {
                warn!(fingerprint = %fingerprint, error = %err, "cached result unreadable, regenerating");
                None
            }
        }
    }

    /// The actual pipeline, run only by the primary request.
    async fn run_pipeline(
        &self,
        request: &GenerationRequest,
        fingerprint: &Fingerprint,
        progress: &ProgressFn,
        cancel: &CancellationToken,
    ) -> Result<TerrainResult, GenerateError> {
        let config = &request.config;
        info!(name = %request.name, bbox = %request.bbox, resolution = config.resolution, "starting generation");

        ensure_live(cancel)?;
        progress(10.0, "Acquiring elevation data");
        let elevation = self
            .resolver
            .resolve_elevation(
                request.bbox,
                config.resolution,
                &config.elevation_source_priority,
            )
            .await?;

        ensure_live(cancel)?;
        let kinds = requested_vector_kinds(config);
        let vectors = if kinds.is_empty() {
            None
        } else {
            progress(30.0, "Extracting vector features");
            self.resolver
                .resolve_vectors(request.bbox, &kinds, &config.elevation_source_priority)
                .await
        };

        ensure_live(cancel)?;
        // Sources may return a different grid size than requested
        let mut heightmap = elevation.grid.data;
        if heightmap.nrows() != config.resolution as usize {
            debug!(
                from = heightmap.nrows(),
                to = config.resolution,
                "resampling source grid to requested resolution"
            );
            heightmap = resize_bilinear(&heightmap, config.resolution as usize);
        }

        let weightmaps = if config.feature_flags.weightmaps {
            progress(50.0, "Generating material weightmaps");
            let grid = heightmap.clone();
            Some(run_blocking(move || generate_weightmaps(&grid)).await?)
        } else {
            None
        };

        ensure_live(cancel)?;
        progress(60.0, "Preparing terrain data");
        let mut data = TerrainData::new(
            request.name.clone(),
            heightmap,
            config.resolution,
            request.bbox,
        );
        if let Some(weightmaps) = weightmaps {
            data = data.with_weightmaps(weightmaps);
        }
        if let Some(resolved) = &vectors {
            if !resolved.vectors.roads.is_empty() {
                data.roads = Some(resolved.vectors.roads.clone());
            }
            if !resolved.vectors.buildings.is_empty() {
                data.buildings = Some(resolved.vectors.buildings.clone());
            }
        }

        ensure_live(cancel)?;
        progress(70.0, "Exporting terrain");
        let output_dir = self.config.output_dir.join(&request.name);
        tokio::fs::create_dir_all(&output_dir).await?;

        let data = Arc::new(data);
        let manifest = self
            .fanout
            .run(Arc::clone(&data), &config.export_formats, &output_dir)
            .await;
        if !manifest.failed().is_empty() {
            warn!(
                failed = ?manifest.failed(),
                "some export formats failed; continuing with partial manifest"
            );
        }

        progress(95.0, "Finalizing");
        let result = TerrainResult {
            name: request.name.clone(),
            resolution: config.resolution,
            area_km2: request.bbox.area_km2(),
            elevation_min: data.min_elevation,
            elevation_max: data.max_elevation,
            elevation_source: elevation.source,
            vector_source: vectors.map(|v| v.source),
            exports: manifest,
            output_dir: output_dir.clone(),
            cache_hit: false,
        };

        let summary = serde_json::to_vec_pretty(&result).map_err(std::io::Error::other)?;
        tokio::fs::write(output_dir.join(TerrainResult::FILE_NAME), summary).await?;

        // Cache write-back failures degrade to a warning: the result is
        // already on disk, only reuse is lost
        if let Err(err) = self.cache.put(fingerprint, &output_dir).await {
            warn!(fingerprint = %fingerprint, error = %err, "cache write-back failed");
        }

        progress(100.0, "Complete");
        info!(name = %request.name, output = %output_dir.display(), "generation complete");
        Ok(result)
    }
}

/// Maps feature flags to vector kinds worth requesting.
fn requested_vector_kinds(config: &crate::config::GenerationConfig) -> Vec<VectorKind> {
    let mut kinds = Vec::new();
    if config.feature_flags.roads {
        kinds.push(VectorKind::Roads);
    }
    if config.feature_flags.buildings {
        kinds.push(VectorKind::Buildings);
    }
    if config.feature_flags.water_bodies {
        kinds.push(VectorKind::Water);
    }
    kinds
}

/// Fails fast once cancellation has been requested.
fn ensure_live(cancel: &CancellationToken) -> Result<(), GenerateError> {
    if cancel.is_cancelled() {
        Err(GenerateError::Cancelled)
    } else {
        Ok(())
    }
}

/// Runs CPU-bound work off the async runtime.
async fn run_blocking<T, F>(f: F) -> Result<T, GenerateError>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| GenerateError::StagePanicked(e.to_string()))
}
