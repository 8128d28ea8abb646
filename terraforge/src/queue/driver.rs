//! Daemon loop that drains the batch queue.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::pipeline::{GenerateError, TerrainGenerator};

use super::batch::BatchQueue;

/// Claims jobs while under the concurrency cap and runs each through the
/// pipeline.
///
/// Each job runs as its own spawned task with its own cancellation token
/// (a child of the driver's shutdown token, so shutdown cancels every
/// in-flight job cooperatively).
pub struct QueueDriver {
    queue: Arc<BatchQueue>,
    generator: Arc<TerrainGenerator>,
    shutdown: CancellationToken,
}

impl QueueDriver {
    pub fn new(queue: Arc<BatchQueue>, generator: Arc<TerrainGenerator>) -> Self {
        Self {
            queue,
            generator,
            shutdown: CancellationToken::new(),
        }
    }

    /// Token that stops the driver loop and cancels running jobs.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Spawns the driver loop onto the runtime.
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }

    /// The driver loop. Returns once the shutdown token fires.
    pub async fn run(self) {
        info!("queue driver started");
        loop {
            self.dispatch_claimable();

            tokio::select! {
                _ = self.shutdown.cancelled() => break,
                _ = self.queue.work_available() => {}
            }
        }
        info!("queue driver stopped");
    }

    /// Claims and spawns every job that fits under the concurrency cap.
    fn dispatch_claimable(&self) {
        while self.queue.can_process_more() {
            let Some((job, job_token)) = self.queue.claim_next_job() else {
                break;
            };

            debug!(job = %job.id, "dispatching job");
            let queue = Arc::clone(&self.queue);
            let generator = Arc::clone(&self.generator);
            let shutdown = self.shutdown.clone();

            tokio::spawn(async move {
                // Either the per-job token (cancel API) or shutdown stops it
                let effective = job_token;
                let watcher = shutdown.clone();
                let cancel_guard = tokio::spawn({
                    let effective = effective.clone();
                    async move {
                        watcher.cancelled().await;
                        effective.cancel();
                    }
                });

                let id = job.id;
                let progress_queue = Arc::clone(&queue);
                let progress = move |pct: f32, step: &str| {
                    progress_queue.update_progress(&id, pct, step);
                };

                let outcome = generator
                    .generate(&job.request, &progress, &effective)
                    .await;
                cancel_guard.abort();

                let transition = match outcome {
                    Ok(result) => queue.complete_job(&id, result),
                    Err(GenerateError::Cancelled) => queue.mark_cancelled(&id),
                    Err(err) => queue.fail_job(&id, err.to_string()),
                };
                if let Err(err) = transition {
                    // Job already terminal (e.g. cancelled while finishing)
                    debug!(job = %id, error = %err, "terminal transition skipped");
                }
            });
        }
    }
}

impl Drop for QueueDriver {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{CacheConfig, ResultCache};
    use crate::config::{FeatureFlags, GenerationConfig, GenerationRequest};
    use crate::coord::BoundingBox;
    use crate::export::ExportFanout;
    use crate::pipeline::GeneratorConfig;
    use crate::queue::{JobStatus, QueueConfig};
    use crate::source::{DataSource, SourceResolver, SyntheticSource};
    use std::time::Duration;
    use tempfile::TempDir;

    fn setup(tmp: &TempDir, max_concurrent: usize) -> (Arc<BatchQueue>, QueueDriver) {
        let resolver = Arc::new(SourceResolver::new(vec![
            Arc::new(SyntheticSource::new(0)) as Arc<dyn DataSource>,
        ]));
        let cache = Arc::new(
            ResultCache::open(CacheConfig::new(tmp.path().join("cache"))).unwrap(),
        );
        let generator = Arc::new(TerrainGenerator::new(
            resolver,
            cache,
            Arc::new(ExportFanout::with_defaults()),
            GeneratorConfig {
                output_dir: tmp.path().join("output"),
            },
        ));
        let queue = Arc::new(BatchQueue::new(
            QueueConfig::default().with_max_concurrent(max_concurrent),
        ));
        let driver = QueueDriver::new(Arc::clone(&queue), generator);
        (queue, driver)
    }

    fn request(name: &str, bbox_offset: f64) -> GenerationRequest {
        GenerationRequest::new(
            name,
            BoundingBox::new(
                47.1 + bbox_offset,
                47.0 + bbox_offset,
                8.1,
                8.0,
            ),
        )
        .with_config(GenerationConfig {
            resolution: 33,
            export_formats: vec!["unity".to_string()],
            feature_flags: FeatureFlags {
                roads: false,
                buildings: false,
                vegetation: false,
                weightmaps: false,
                water_bodies: false,
            },
            ..Default::default()
        })
    }

    async fn wait_terminal(queue: &BatchQueue, id: &crate::queue::JobId) -> JobStatus {
        for _ in 0..200 {
            let status = queue.get_job(id).unwrap().status;
            if status.is_terminal() {
                return status;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("job {id} never reached a terminal state");
    }

    #[tokio::test]
    async fn driver_processes_queued_jobs() {
        let tmp = TempDir::new().unwrap();
        let (queue, driver) = setup(&tmp, 2);
        let shutdown = driver.shutdown_token();
        let handle = driver.spawn();

        let job = queue.add_job(request("one", 0.0), 0).unwrap();
        let status = wait_terminal(&queue, &job.id).await;

        assert_eq!(status, JobStatus::Completed);
        let done = queue.get_job(&job.id).unwrap();
        assert_eq!(done.progress, 100.0);
        assert!(done.result.is_some());

        shutdown.cancel();
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn driver_drains_multiple_jobs() {
        let tmp = TempDir::new().unwrap();
        let (queue, driver) = setup(&tmp, 2);
        let shutdown = driver.shutdown_token();
        let handle = driver.spawn();

        let ids: Vec<_> = (0..5)
            .map(|i| {
                queue
                    .add_job(request(&format!("job-{i}"), i as f64 * 0.2), 0)
                    .unwrap()
                    .id
            })
            .collect();

        for id in &ids {
            assert_eq!(wait_terminal(&queue, id).await, JobStatus::Completed);
        }

        shutdown.cancel();
        handle.await.unwrap();
    }
}
