//! Progress observation for jobs and the whole queue.
//!
//! Observers poll the queue at a fixed interval and push snapshots over
//! channels, so status surfaces (websockets, TUIs) never hold locks on the
//! queue itself. A per-job watcher pushes only when the serialized snapshot
//! changes and closes its channel after the terminal update; the global
//! watcher streams whole-queue snapshots for dashboards.

mod tracker;

pub use tracker::{watch_all, watch_job, ProgressTracker, DEFAULT_POLL_INTERVAL};
