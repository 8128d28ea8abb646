//! High-level service facade.
//!
//! [`TerrainService`] wires every component together - cache, source
//! resolver, export fan-out, generator, queue, and driver - behind the
//! small API the embedding surface (HTTP, CLI, desktop) actually calls:
//! submit, status, cancel, retry, stats, watch.
//!
//! # Example
//!
//! ```ignore
//! use terraforge::service::{ServiceConfig, TerrainService};
//! use terraforge::config::GenerationRequest;
//! use terraforge::coord::BoundingBox;
//!
//! let service = TerrainService::new(ServiceConfig::default(), vec![])?;
//! let bbox = BoundingBox::new(47.1, 47.0, 8.1, 8.0);
//! let job_id = service.submit(GenerationRequest::new("alps", bbox), 0)?;
//! let status = service.get_status(&job_id);
//! ```

mod config;
mod facade;

pub use config::ServiceConfig;
pub use facade::{SubmitError, TerrainService};
