//! The priority batch queue.

use std::cmp::Ordering as CmpOrdering;
use std::collections::{BinaryHeap, HashMap, HashSet};
use std::sync::Mutex;

use chrono::Utc;
use thiserror::Error;
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::GenerationRequest;
use crate::pipeline::TerrainResult;

use super::job::{BatchJob, JobId, JobStatus};

/// Queue errors, all surfaced synchronously to the caller.
#[derive(Debug, Error)]
pub enum QueueError {
    /// Queue at capacity; the job was not admitted
    #[error("queue is full (max: {max})")]
    QueueFull { max: usize },

    /// No job with that ID
    #[error("job {0} not found")]
    NotFound(JobId),

    /// Job already terminal, cannot cancel
    #[error("job {id} is {status}, not cancellable")]
    NotCancellable { id: JobId, status: JobStatus },

    /// Only failed jobs can be retried
    #[error("job {id} is {status}, not retryable")]
    NotRetryable { id: JobId, status: JobStatus },

    /// Transition attempted from the wrong state
    #[error("job {id} is {status}, expected {expected}")]
    InvalidTransition {
        id: JobId,
        status: JobStatus,
        expected: JobStatus,
    },
}

/// Queue tuning knobs.
#[derive(Debug, Clone)]
pub struct QueueConfig {
    /// Jobs processed concurrently (default: 3)
    pub max_concurrent: usize,
    /// Pending + processing jobs admitted at once (default: 50)
    pub max_queue_size: usize,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            max_concurrent: 3,
            max_queue_size: 50,
        }
    }
}

impl QueueConfig {
    pub fn with_max_concurrent(mut self, max_concurrent: usize) -> Self {
        self.max_concurrent = max_concurrent;
        self
    }

    pub fn with_max_queue_size(mut self, max_queue_size: usize) -> Self {
        self.max_queue_size = max_queue_size;
        self
    }
}

/// Job counts by status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct QueueStats {
    pub pending: usize,
    pub processing: usize,
    pub completed: usize,
    pub failed: usize,
    pub cancelled: usize,
}

/// Heap entry for the pending queue.
///
/// Max-heap ordering: higher priority first, then lower sequence number
/// (FIFO among equal priorities). Entries are not removed when a job leaves
/// `Pending`; they are skipped lazily at claim time by comparing `seq`
/// against the job's current sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
struct PendingEntry {
    priority: i32,
    seq: u64,
    id: JobId,
}

impl Ord for PendingEntry {
    fn cmp(&self, other: &Self) -> CmpOrdering {
        self.priority
            .cmp(&other.priority)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl PartialOrd for PendingEntry {
    fn partial_cmp(&self, other: &Self) -> Option<CmpOrdering> {
        Some(self.cmp(other))
    }
}

/// Everything the queue owns, guarded by one lock.
#[derive(Default)]
struct QueueState {
    jobs: HashMap<JobId, BatchJob>,
    pending: BinaryHeap<PendingEntry>,
    active: HashSet<JobId>,
    cancel_tokens: HashMap<JobId, CancellationToken>,
    next_seq: u64,
}

impl QueueState {
    fn queued_count(&self) -> usize {
        self.jobs
            .values()
            .filter(|j| matches!(j.status, JobStatus::Pending | JobStatus::Processing))
            .count()
    }

    /// Whether a heap entry still refers to a live pending job.
    fn entry_is_live(&self, entry: &PendingEntry) -> bool {
        self.jobs
            .get(&entry.id)
            .map(|job| job.status == JobStatus::Pending && job.seq == entry.seq)
            .unwrap_or(false)
    }
}

/// Priority-ordered job scheduler with a concurrency cap.
///
/// All read-modify-write sequences (claiming work, terminal transitions)
/// run inside one critical section over the queue state, so two interleaved
/// workers can never claim the same job.
pub struct BatchQueue {
    config: QueueConfig,
    state: Mutex<QueueState>,
    /// Woken whenever work may have become claimable
    work_available: Notify,
}

impl BatchQueue {
    pub fn new(config: QueueConfig) -> Self {
        Self {
            config,
            state: Mutex::new(QueueState::default()),
            work_available: Notify::new(),
        }
    }

    /// Adds a job, inserted by (priority desc, arrival asc).
    ///
    /// Rejected with [`QueueError::QueueFull`] when pending + processing
    /// jobs already fill the queue.
    pub fn add_job(
        &self,
        request: GenerationRequest,
        priority: i32,
    ) -> Result<BatchJob, QueueError> {
        let mut state = self.lock();

        if state.queued_count() >= self.config.max_queue_size {
            return Err(QueueError::QueueFull {
                max: self.config.max_queue_size,
            });
        }

        let seq = state.next_seq;
        state.next_seq += 1;

        let job = BatchJob::new(request, priority, seq);
        state.pending.push(PendingEntry {
            priority,
            seq,
            id: job.id,
        });
        state.jobs.insert(job.id, job.clone());

        info!(job = %job.id, priority, name = %job.request.name, "job queued");
        drop(state);
        self.work_available.notify_one();
        Ok(job)
    }

    /// A clone of the job, if it exists. Jobs remain queryable indefinitely
    /// after reaching a terminal state.
    pub fn get_job(&self, id: &JobId) -> Option<BatchJob> {
        self.lock().jobs.get(id).cloned()
    }

    /// Peeks at the next claimable job without mutating any state.
    pub fn get_next_job(&self) -> Option<BatchJob> {
        let state = self.lock();
        let mut heap = state.pending.clone();
        while let Some(entry) = heap.pop() {
            if state.entry_is_live(&entry) {
                return state.jobs.get(&entry.id).cloned();
            }
        }
        None
    }

    /// Claims the highest-priority pending job and marks it `Processing`,
    /// all inside one critical section. Returns the claimed job and its
    /// cancellation token, or `None` when nothing is claimable.
    pub fn claim_next_job(&self) -> Option<(BatchJob, CancellationToken)> {
        let mut guard = self.lock();
        let state = &mut *guard;

        while let Some(entry) = state.pending.pop() {
            // Skip stale entries: the job was cancelled, claimed, or
            // re-queued with a newer sequence number since this was pushed
            let Some(job) = state.jobs.get_mut(&entry.id) else {
                continue;
            };
            if job.status != JobStatus::Pending || job.seq != entry.seq {
                continue;
            }

            job.status = JobStatus::Processing;
            job.started_at = Some(Utc::now());
            job.current_step = "Starting".to_string();

            let token = CancellationToken::new();
            state.active.insert(entry.id);
            state.cancel_tokens.insert(entry.id, token.clone());

            debug!(job = %entry.id, priority = entry.priority, "job claimed");
            return Some((job.clone(), token));
        }
        None
    }

    /// Marks a specific pending job `Processing`.
    ///
    /// Prefer [`claim_next_job`](Self::claim_next_job), which picks the job
    /// and claims it in one critical section; this exists for drivers that
    /// select jobs externally. The job's stale heap entry is skipped at the
    /// next claim.
    pub fn start_job(&self, id: &JobId) -> Result<CancellationToken, QueueError> {
        let mut guard = self.lock();
        let state = &mut *guard;

        let job = state.jobs.get_mut(id).ok_or(QueueError::NotFound(*id))?;
        if job.status != JobStatus::Pending {
            return Err(QueueError::InvalidTransition {
                id: *id,
                status: job.status,
                expected: JobStatus::Pending,
            });
        }

        job.status = JobStatus::Processing;
        job.started_at = Some(Utc::now());
        job.current_step = "Starting".to_string();

        let token = CancellationToken::new();
        state.active.insert(*id);
        state.cancel_tokens.insert(*id, token.clone());
        Ok(token)
    }

    /// True while fewer than `max_concurrent` jobs are processing.
    pub fn can_process_more(&self) -> bool {
        self.lock().active.len() < self.config.max_concurrent
    }

    /// Updates progress on a processing job. No-op once terminal - a late
    /// worker update cannot resurrect a cancelled job.
    pub fn update_progress(&self, id: &JobId, progress: f32, step: &str) {
        let mut state = self.lock();
        if let Some(job) = state.jobs.get_mut(id) {
            if job.status == JobStatus::Processing {
                job.progress = progress.clamp(0.0, 100.0);
                job.current_step = step.to_string();
            }
        }
    }

    /// Terminal transition: `Processing -> Completed`.
    pub fn complete_job(&self, id: &JobId, result: TerrainResult) -> Result<(), QueueError> {
        self.finish(id, JobStatus::Completed, |job| {
            job.progress = 100.0;
            job.current_step = "Complete".to_string();
            job.result = Some(result);
        })
    }

    /// Terminal transition: `Processing -> Failed`. The job stays queryable
    /// with its error message until explicitly cleared or retried.
    pub fn fail_job(&self, id: &JobId, error: impl Into<String>) -> Result<(), QueueError> {
        let message = error.into();
        warn!(job = %id, error = %message, "job failed");
        self.finish(id, JobStatus::Failed, |job| {
            job.error = Some(message);
        })
    }

    /// Requests cancellation.
    ///
    /// A pending job is cancelled immediately. A processing job has its
    /// token triggered; it transitions to `Cancelled` when the worker
    /// observes the token at its next suspension point and calls
    /// [`mark_cancelled`](Self::mark_cancelled). Terminal jobs are not
    /// cancellable.
    pub fn cancel_job(&self, id: &JobId) -> Result<(), QueueError> {
        let mut guard = self.lock();
        let state = &mut *guard;
        let job = state.jobs.get_mut(id).ok_or(QueueError::NotFound(*id))?;

        match job.status {
            JobStatus::Pending => {
                job.status = JobStatus::Cancelled;
                job.completed_at = Some(Utc::now());
                job.current_step = "Cancelled".to_string();
                info!(job = %id, "pending job cancelled");
                Ok(())
            }
            JobStatus::Processing => {
                if let Some(token) = state.cancel_tokens.get(id) {
                    token.cancel();
                }
                info!(job = %id, "cancellation requested for processing job");
                Ok(())
            }
            status => Err(QueueError::NotCancellable { id: *id, status }),
        }
    }

    /// Worker acknowledgement that a cancellation request took effect:
    /// `Processing -> Cancelled`.
    pub fn mark_cancelled(&self, id: &JobId) -> Result<(), QueueError> {
        self.finish(id, JobStatus::Cancelled, |job| {
            job.current_step = "Cancelled".to_string();
        })
    }

    /// Re-queues a failed job: `Failed -> Pending` with progress reset,
    /// error cleared, and a fresh sequence number so it lands after
    /// already-queued jobs of the same priority.
    pub fn retry_job(&self, id: &JobId) -> Result<(), QueueError> {
        let mut guard = self.lock();
        let state = &mut *guard;

        let seq = state.next_seq;
        let job = state.jobs.get_mut(id).ok_or(QueueError::NotFound(*id))?;
        if job.status != JobStatus::Failed {
            return Err(QueueError::NotRetryable {
                id: *id,
                status: job.status,
            });
        }

        job.status = JobStatus::Pending;
        job.progress = 0.0;
        job.current_step = "Queued".to_string();
        job.error = None;
        job.result = None;
        job.started_at = None;
        job.completed_at = None;
        job.seq = seq;
        let entry = PendingEntry {
            priority: job.priority,
            seq,
            id: *id,
        };

        state.next_seq += 1;
        state.pending.push(entry);

        info!(job = %id, "job re-queued for retry");
        drop(guard);
        self.work_available.notify_one();
        Ok(())
    }

    /// Job counts by status.
    pub fn stats(&self) -> QueueStats {
        let state = self.lock();
        let mut stats = QueueStats::default();
        for job in state.jobs.values() {
            match job.status {
                JobStatus::Pending => stats.pending += 1,
                JobStatus::Processing => stats.processing += 1,
                JobStatus::Completed => stats.completed += 1,
                JobStatus::Failed => stats.failed += 1,
                JobStatus::Cancelled => stats.cancelled += 1,
            }
        }
        stats
    }

    /// All jobs, newest first.
    pub fn list_jobs(&self) -> Vec<BatchJob> {
        let state = self.lock();
        let mut jobs: Vec<_> = state.jobs.values().cloned().collect();
        jobs.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        jobs
    }

    /// Drops terminal jobs from the registry, returning how many were
    /// removed.
    pub fn clear_finished(&self) -> usize {
        let mut state = self.lock();
        let before = state.jobs.len();
        state.jobs.retain(|_, job| !job.status.is_terminal());
        before - state.jobs.len()
    }

    /// Resolves once new work may be claimable. Used by the driver loop;
    /// spurious wakeups are fine.
    pub async fn work_available(&self) {
        self.work_available.notified().await;
    }

    /// Wakes the driver; called by workers when a slot frees up.
    pub(super) fn wake(&self) {
        self.work_available.notify_one();
    }

    /// Terminal transition plumbing shared by complete/fail/mark_cancelled.
    fn finish(
        &self,
        id: &JobId,
        status: JobStatus,
        apply: impl FnOnce(&mut BatchJob),
    ) -> Result<(), QueueError> {
        let mut state = self.lock();

        let job = state.jobs.get_mut(id).ok_or(QueueError::NotFound(*id))?;
        if job.status != JobStatus::Processing {
            return Err(QueueError::InvalidTransition {
                id: *id,
                status: job.status,
                expected: JobStatus::Processing,
            });
        }

        job.status = status;
        job.completed_at = Some(Utc::now());
        apply(job);

        state.active.remove(id);
        state.cancel_tokens.remove(id);
        drop(state);
        self.work_available.notify_one();
        Ok(())
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, QueueState> {
        // Queue state is plain data; a poisoned lock means a panic mid-
        // mutation, and continuing with the data is still the best option.
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}
