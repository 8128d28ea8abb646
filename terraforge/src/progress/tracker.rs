//! Queue pollers that stream task snapshots.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tracing::debug;

use crate::queue::{BatchQueue, JobId, TaskSnapshot};

/// Default polling cadence for per-job watchers.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Cadence for whole-queue snapshots (dashboards tolerate more lag).
pub const GLOBAL_POLL_INTERVAL: Duration = Duration::from_secs(3);

/// Channel capacity for snapshot streams.
const CHANNEL_CAPACITY: usize = 32;

/// Handle bundling the observer entry points for one queue.
#[derive(Clone)]
pub struct ProgressTracker {
    queue: Arc<BatchQueue>,
    interval: Duration,
}

impl ProgressTracker {
    pub fn new(queue: Arc<BatchQueue>) -> Self {
        Self {
            queue,
            interval: DEFAULT_POLL_INTERVAL,
        }
    }

    /// Overrides the per-job polling interval (tests use a tight loop).
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Point-in-time snapshot of one job.
    pub fn snapshot(&self, id: &JobId) -> Option<TaskSnapshot> {
        self.queue.get_job(id).map(|job| job.snapshot())
    }

    /// Point-in-time snapshot of every job, newest first.
    pub fn snapshot_all(&self) -> Vec<TaskSnapshot> {
        self.queue.list_jobs().iter().map(|j| j.snapshot()).collect()
    }

    /// Streams deduplicated snapshots for one job; see [`watch_job`].
    pub fn watch(&self, id: JobId) -> mpsc::Receiver<TaskSnapshot> {
        watch_job(Arc::clone(&self.queue), id, self.interval)
    }

    /// Streams whole-queue snapshots; see [`watch_all`].
    pub fn watch_queue(&self) -> mpsc::Receiver<Vec<TaskSnapshot>> {
        watch_all(Arc::clone(&self.queue), GLOBAL_POLL_INTERVAL)
    }
}

/// Spawns a poller for one job.
///
/// Pushes a snapshot only when the serialized state differs from the last
/// pushed value. After the job reaches a terminal state the final snapshot
/// is pushed and the channel closes. A job that does not exist closes the
/// channel immediately.
pub fn watch_job(
    queue: Arc<BatchQueue>,
    id: JobId,
    interval: Duration,
) -> mpsc::Receiver<TaskSnapshot> {
    let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);

    tokio::spawn(async move {
        let mut last_pushed: Option<String> = None;

        loop {
            let Some(job) = queue.get_job(&id) else {
                debug!(job = %id, "watched job disappeared, closing stream");
                break;
            };

            let snapshot = job.snapshot();
            // Serialized comparison: any observable change triggers a push
            let serialized = match serde_json::to_string(&snapshot) {
                Ok(s) => s,
                Err(_) => break,
            };

            if last_pushed.as_deref() != Some(serialized.as_str()) {
                if tx.send(snapshot.clone()).await.is_err() {
                    // Receiver dropped; stop polling
                    break;
                }
                last_pushed = Some(serialized);
            }

            if snapshot.is_terminal() {
                debug!(job = %id, status = %snapshot.status, "job terminal, closing stream");
                break;
            }

            tokio::time::sleep(interval).await;
        }
    });

    rx
}

/// Spawns the global observer: a whole-queue snapshot every `interval`,
/// regardless of change, until the receiver is dropped.
pub fn watch_all(
    queue: Arc<BatchQueue>,
    interval: Duration,
) -> mpsc::Receiver<Vec<TaskSnapshot>> {
    let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);

    tokio::spawn(async move {
        loop {
            let snapshots: Vec<TaskSnapshot> =
                queue.list_jobs().iter().map(|j| j.snapshot()).collect();
            if tx.send(snapshots).await.is_err() {
                break;
            }
            tokio::time::sleep(interval).await;
        }
    });

    rx
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GenerationRequest;
    use crate::coord::BoundingBox;
    use crate::pipeline::TerrainResult;
    use crate::queue::{JobStatus, QueueConfig};

    fn queue() -> Arc<BatchQueue> {
        Arc::new(BatchQueue::new(QueueConfig::default()))
    }

    fn request() -> GenerationRequest {
        GenerationRequest::new("watched", BoundingBox::new(1.0, 0.0, 1.0, 0.0))
    }

    fn result() -> TerrainResult {
        TerrainResult {
            name: "watched".into(),
            resolution: 64,
            area_km2: 1.0,
            elevation_min: 0.0,
            elevation_max: 10.0,
            elevation_source: "synthetic".into(),
            vector_source: None,
            exports: Default::default(),
            output_dir: "/out".into(),
            cache_hit: false,
        }
    }

    #[tokio::test]
    async fn watcher_pushes_initial_state() {
        let q = queue();
        let job = q.add_job(request(), 0).unwrap();

        let mut rx = watch_job(Arc::clone(&q), job.id, Duration::from_millis(10));
        let first = rx.recv().await.unwrap();
        assert_eq!(first.status, JobStatus::Pending);
        assert_eq!(first.progress, 0.0);
    }

    #[tokio::test]
    async fn watcher_skips_unchanged_states() {
        let q = queue();
        let job = q.add_job(request(), 0).unwrap();

        let mut rx = watch_job(Arc::clone(&q), job.id, Duration::from_millis(5));
        let _initial = rx.recv().await.unwrap();

        // No state change: nothing should arrive within several polls
        let quiet =
            tokio::time::timeout(Duration::from_millis(50), rx.recv()).await;
        assert!(quiet.is_err(), "unchanged state was pushed again");
    }

    #[tokio::test]
    async fn watcher_pushes_each_change_then_closes_on_terminal() {
        let q = queue();
        let job = q.add_job(request(), 0).unwrap();
        let mut rx = watch_job(Arc::clone(&q), job.id, Duration::from_millis(5));

        let initial = rx.recv().await.unwrap();
        assert_eq!(initial.status, JobStatus::Pending);

        q.claim_next_job().unwrap();
        q.update_progress(&job.id, 30.0, "Extracting vector features");

        let processing = rx.recv().await.unwrap();
        assert_eq!(processing.status, JobStatus::Processing);

        q.complete_job(&job.id, result()).unwrap();

        // Drain until the channel closes after the terminal push
        let mut last = None;
        while let Some(snapshot) = rx.recv().await {
            last = Some(snapshot);
        }

        let last = last.unwrap();
        assert_eq!(last.status, JobStatus::Completed);
        assert_eq!(last.progress, 100.0);
    }

    #[tokio::test]
    async fn watcher_closes_for_unknown_job() {
        let q = queue();
        let mut rx = watch_job(q, JobId::new(), Duration::from_millis(5));
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn global_watcher_streams_snapshots() {
        let q = queue();
        q.add_job(request(), 0).unwrap();
        q.add_job(request(), 1).unwrap();

        let mut rx = watch_all(Arc::clone(&q), Duration::from_millis(5));
        let snapshot = rx.recv().await.unwrap();
        assert_eq!(snapshot.len(), 2);

        // Pushes repeat even without changes
        let again = rx.recv().await.unwrap();
        assert_eq!(again.len(), 2);
    }

    #[tokio::test]
    async fn tracker_snapshots() {
        let q = queue();
        let job = q.add_job(request(), 0).unwrap();
        let tracker = ProgressTracker::new(Arc::clone(&q));

        assert_eq!(tracker.snapshot(&job.id).unwrap().status, JobStatus::Pending);
        assert_eq!(tracker.snapshot_all().len(), 1);
        assert!(tracker.snapshot(&JobId::new()).is_none());
    }
}
