//! The service facade.

use std::sync::Arc;

use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::admission::{validate_request, ValidationError};
use crate::cache::{CacheError, CacheStats, ResultCache};
use crate::config::GenerationRequest;
use crate::export::ExportFanout;
use crate::pipeline::{GeneratorConfig, TerrainGenerator};
use crate::progress::ProgressTracker;
use crate::queue::{BatchQueue, JobId, QueueDriver, QueueError, QueueStats, TaskSnapshot};
use crate::source::{DataSource, SourceResolver, SyntheticSource};

use super::config::ServiceConfig;

/// Errors from [`TerrainService::submit`].
#[derive(Debug, Error)]
pub enum SubmitError {
    /// Rejected at admission; never touched the queue
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Queue at capacity
    #[error(transparent)]
    Queue(#[from] QueueError),
}

/// One-stop front end over the whole pipeline.
///
/// Construction wires the components and spawns the queue driver; must be
/// called from within a Tokio runtime. Dropping the service (or calling
/// [`shutdown`](Self::shutdown)) stops the driver and cooperatively cancels
/// running jobs.
pub struct TerrainService {
    queue: Arc<BatchQueue>,
    cache: Arc<ResultCache>,
    fanout: Arc<ExportFanout>,
    tracker: ProgressTracker,
    max_area_km2: f64,
    shutdown: CancellationToken,
    driver_handle: Option<JoinHandle<()>>,
}

impl TerrainService {
    /// Builds the service around the injected provider sources.
    ///
    /// A [`SyntheticSource`] is always appended as the tail of the
    /// elevation chain, so generation cannot fail for lack of data.
    pub fn new(
        config: ServiceConfig,
        sources: Vec<Arc<dyn DataSource>>,
    ) -> Result<Self, CacheError> {
        let mut sources = sources;
        sources.push(Arc::new(SyntheticSource::new(config.synthetic_seed)));

        let resolver = Arc::new(
            SourceResolver::new(sources).with_call_timeout(config.source_timeout),
        );
        info!(sources = ?resolver.source_names(), "source chain assembled");

        let cache = Arc::new(ResultCache::open(config.cache)?);
        let fanout = Arc::new(ExportFanout::with_defaults());

        let generator = Arc::new(TerrainGenerator::new(
            Arc::clone(&resolver),
            Arc::clone(&cache),
            Arc::clone(&fanout),
            GeneratorConfig {
                output_dir: config.output_dir,
            },
        ));

        let queue = Arc::new(BatchQueue::new(config.queue));
        let driver = QueueDriver::new(Arc::clone(&queue), generator);
        let shutdown = driver.shutdown_token();
        let driver_handle = driver.spawn();

        Ok(Self {
            tracker: ProgressTracker::new(Arc::clone(&queue)),
            queue,
            cache,
            fanout,
            max_area_km2: config.max_area_km2,
            shutdown,
            driver_handle: Some(driver_handle),
        })
    }

    /// Validates and enqueues a request. Validation happens synchronously,
    /// before any I/O; a rejected request never occupies a queue slot.
    pub fn submit(&self, request: GenerationRequest, priority: i32) -> Result<JobId, SubmitError> {
        validate_request(
            &request.name,
            &request.bbox,
            &request.config,
            self.max_area_km2,
            &self.fanout,
        )?;

        let job = self.queue.add_job(request, priority)?;
        Ok(job.id)
    }

    /// Current state of a job, or `None` if unknown.
    pub fn get_status(&self, id: &JobId) -> Option<TaskSnapshot> {
        self.tracker.snapshot(id)
    }

    /// Requests cancellation; see [`BatchQueue::cancel_job`] for semantics.
    pub fn cancel(&self, id: &JobId) -> Result<(), QueueError> {
        self.queue.cancel_job(id)
    }

    /// Re-queues a failed job with its original request parameters.
    pub fn retry(&self, id: &JobId) -> Result<(), QueueError> {
        self.queue.retry_job(id)
    }

    /// All jobs, newest first.
    pub fn list_jobs(&self) -> Vec<TaskSnapshot> {
        self.tracker.snapshot_all()
    }

    /// Streams deduplicated status updates for one job until it terminates.
    pub fn watch(&self, id: JobId) -> mpsc::Receiver<TaskSnapshot> {
        self.tracker.watch(id)
    }

    /// Streams periodic whole-queue snapshots for dashboards.
    pub fn watch_queue(&self) -> mpsc::Receiver<Vec<TaskSnapshot>> {
        self.tracker.watch_queue()
    }

    /// Cache statistics.
    pub async fn cache_stats(&self) -> CacheStats {
        self.cache.stats().await
    }

    /// Drops every cached result.
    pub async fn clear_cache(&self) -> Result<(), CacheError> {
        self.cache.clear().await
    }

    /// Queue statistics.
    pub fn queue_stats(&self) -> QueueStats {
        self.queue.stats()
    }

    /// Stops the driver and cooperatively cancels running jobs, waiting for
    /// the driver loop to exit.
    pub async fn shutdown(mut self) {
        self.shutdown.cancel();
        if let Some(handle) = self.driver_handle.take() {
            let _ = handle.await;
        }
    }
}

impl Drop for TerrainService {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::CacheConfig;
    use crate::config::{FeatureFlags, GenerationConfig};
    use crate::coord::BoundingBox;
    use crate::queue::JobStatus;
    use std::time::Duration;
    use tempfile::TempDir;

    fn service(tmp: &TempDir) -> TerrainService {
        let config = ServiceConfig::default()
            .with_cache(CacheConfig::new(tmp.path().join("cache")))
            .with_output_dir(tmp.path().join("output"));
        TerrainService::new(config, vec![]).unwrap()
    }

    fn request(name: &str) -> GenerationRequest {
        GenerationRequest::new(name, BoundingBox::new(47.05, 47.0, 8.05, 8.0)).with_config(
            GenerationConfig {
                resolution: 65,
                export_formats: vec!["unity".to_string()],
                feature_flags: FeatureFlags {
                    roads: false,
                    buildings: false,
                    vegetation: false,
                    weightmaps: false,
                    water_bodies: false,
                },
                ..Default::default()
            },
        )
    }

    #[tokio::test]
    async fn submit_runs_to_completion() {
        let tmp = TempDir::new().unwrap();
        let service = service(&tmp);

        let id = service.submit(request("demo"), 0).unwrap();

        let mut rx = service.watch(id);
        let mut last = None;
        while let Some(snapshot) = rx.recv().await {
            last = Some(snapshot);
        }
        let last = last.unwrap();
        assert_eq!(last.status, JobStatus::Completed);
        assert!(last.result.unwrap().exports.get("unity").unwrap().is_success());

        service.shutdown().await;
    }

    #[tokio::test]
    async fn invalid_request_rejected_synchronously() {
        let tmp = TempDir::new().unwrap();
        let service = service(&tmp);

        // Inverted bbox never enters the queue
        let bad = GenerationRequest::new("bad", BoundingBox::new(0.0, 1.0, 1.0, 0.0));
        assert!(matches!(
            service.submit(bad, 0),
            Err(SubmitError::Validation(_))
        ));
        assert_eq!(service.queue_stats().pending, 0);

        service.shutdown().await;
    }

    #[tokio::test]
    async fn status_and_stats_surface() {
        let tmp = TempDir::new().unwrap();
        let service = service(&tmp);

        let id = service.submit(request("demo"), 0).unwrap();
        assert!(service.get_status(&id).is_some());
        assert!(service.get_status(&JobId::new()).is_none());

        // Wait for completion so cache stats are populated
        let mut rx = service.watch(id);
        while rx.recv().await.is_some() {}

        let cache_stats = service.cache_stats().await;
        assert_eq!(cache_stats.entry_count, 1);
        assert!(cache_stats.total_bytes > 0);

        let queue_stats = service.queue_stats();
        assert_eq!(queue_stats.completed, 1);

        service.shutdown().await;
    }

    #[tokio::test]
    async fn unknown_job_operations_error() {
        let tmp = TempDir::new().unwrap();
        let service = service(&tmp);

        let ghost = JobId::new();
        assert!(matches!(
            service.cancel(&ghost),
            Err(QueueError::NotFound(_))
        ));
        assert!(matches!(service.retry(&ghost), Err(QueueError::NotFound(_))));

        service.shutdown().await;
    }

    #[tokio::test]
    async fn second_submission_reuses_cache() {
        let tmp = TempDir::new().unwrap();
        let service = service(&tmp);

        let first = service.submit(request("demo"), 0).unwrap();
        let mut rx = service.watch(first);
        while rx.recv().await.is_some() {}

        let second = service.submit(request("demo"), 0).unwrap();
        let mut rx = service.watch(second);
        let mut last = None;
        while let Some(s) = rx.recv().await {
            last = Some(s);
        }
        let result = last.unwrap().result.unwrap();
        assert!(result.cache_hit);

        service.shutdown().await;
    }

    #[tokio::test]
    async fn watch_queue_streams() {
        let tmp = TempDir::new().unwrap();
        let service = service(&tmp);
        let _id = service.submit(request("demo"), 0).unwrap();

        let mut rx = service.watch_queue();
        let snapshot = tokio::time::timeout(Duration::from_secs(2), rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(snapshot.len(), 1);

        service.shutdown().await;
    }
}
