//! Batch job model.

use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::GenerationRequest;
use crate::pipeline::TerrainResult;

/// Global counter for generating unique job IDs.
static JOB_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Unique identifier for a queued job.
///
/// IDs are monotonically increasing and unique within a process lifetime;
/// they appear in logs and in every status API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(u64);

impl JobId {
    /// Creates a new unique job ID.
    pub fn new() -> Self {
        Self(JOB_ID_COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Raw numeric value, for logging.
    #[inline]
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "job-{}", self.0)
    }
}

/// Job lifecycle states.
///
/// `pending -> processing -> {completed, failed, cancelled}`, plus
/// `failed -> pending` through an explicit retry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Processing,
    Completed,
    Failed,
    Cancelled,
}

impl JobStatus {
    /// True for states with no further transitions.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobStatus::Completed | JobStatus::Failed | JobStatus::Cancelled
        )
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            JobStatus::Pending => "pending",
            JobStatus::Processing => "processing",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
            JobStatus::Cancelled => "cancelled",
        };
        write!(f, "{s}")
    }
}

/// A queued terrain generation job.
///
/// Owned exclusively by the [`BatchQueue`](super::BatchQueue); everything
/// handed out is a clone. `seq` identifies the job's current heap entry -
/// a retried job gets a fresh sequence number, invalidating stale entries.
#[derive(Debug, Clone)]
pub struct BatchJob {
    pub id: JobId,
    pub request: GenerationRequest,
    /// Higher values dequeue first
    pub priority: i32,
    pub status: JobStatus,
    /// Percent complete, 0-100
    pub progress: f32,
    /// Human-readable step label for status displays
    pub current_step: String,
    /// Failure message once `status == Failed`
    pub error: Option<String>,
    /// Generation result once `status == Completed`
    pub result: Option<TerrainResult>,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub(super) seq: u64,
}

impl BatchJob {
    pub(super) fn new(request: GenerationRequest, priority: i32, seq: u64) -> Self {
        Self {
            id: JobId::new(),
            request,
            priority,
            status: JobStatus::Pending,
            progress: 0.0,
            current_step: "Queued".to_string(),
            error: None,
            result: None,
            created_at: Utc::now(),
            started_at: None,
            completed_at: None,
            seq,
        }
    }

    /// Serializable point-in-time view of this job.
    pub fn snapshot(&self) -> TaskSnapshot {
        TaskSnapshot {
            id: self.id,
            name: self.request.name.clone(),
            status: self.status,
            progress: self.progress,
            current_step: self.current_step.clone(),
            priority: self.priority,
            error: self.error.clone(),
            result: self.result.clone(),
            created_at: self.created_at,
            started_at: self.started_at,
            completed_at: self.completed_at,
        }
    }
}

/// Serializable view of a job, pushed to progress observers and returned
/// from the status APIs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskSnapshot {
    pub id: JobId,
    pub name: String,
    pub status: JobStatus,
    pub progress: f32,
    pub current_step: String,
    pub priority: i32,
    pub error: Option<String>,
    pub result: Option<TerrainResult>,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl TaskSnapshot {
    /// True once the job can no longer change.
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coord::BoundingBox;

    fn request() -> GenerationRequest {
        GenerationRequest::new("test", BoundingBox::new(1.0, 0.0, 1.0, 0.0))
    }

    #[test]
    fn job_ids_are_unique_and_monotonic() {
        let a = JobId::new();
        let b = JobId::new();
        assert_ne!(a, b);
        assert!(b.as_u64() > a.as_u64());
    }

    #[test]
    fn job_id_display() {
        let id = JobId::new();
        assert!(format!("{id}").starts_with("job-"));
    }

    #[test]
    fn terminal_states() {
        assert!(!JobStatus::Pending.is_terminal());
        assert!(!JobStatus::Processing.is_terminal());
        assert!(JobStatus::Completed.is_terminal());
        assert!(JobStatus::Failed.is_terminal());
        assert!(JobStatus::Cancelled.is_terminal());
    }

    #[test]
    fn new_job_is_pending_at_zero_progress() {
        let job = BatchJob::new(request(), 5, 0);
        assert_eq!(job.status, JobStatus::Pending);
        assert_eq!(job.progress, 0.0);
        assert!(job.error.is_none());
        assert!(job.result.is_none());
        assert!(job.started_at.is_none());
    }

    #[test]
    fn snapshot_serializes() {
        let job = BatchJob::new(request(), 0, 0);
        let snapshot = job.snapshot();
        let json = serde_json::to_string(&snapshot).unwrap();
        assert!(json.contains("\"pending\""));

        let back: TaskSnapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(back, snapshot);
    }

    #[test]
    fn status_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&JobStatus::Processing).unwrap(),
            "\"processing\""
        );
    }
}
