//! Priority batch queue and its driver.
//!
//! [`BatchQueue`] owns every job: the id map, the pending heap, and the
//! active set live behind one mutex so "find the next pending job and mark
//! it processing" is a single critical section. [`QueueDriver`] is the
//! daemon loop that claims work while under the concurrency cap and runs
//! each job through the generation pipeline.

mod batch;
mod driver;
mod job;

pub use batch::{BatchQueue, QueueConfig, QueueError, QueueStats};
pub use driver::QueueDriver;
pub use job::{BatchJob, JobId, JobStatus, TaskSnapshot};
