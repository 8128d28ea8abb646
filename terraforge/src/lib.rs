//! TerraForge - terrain artifact generation pipeline
//!
//! This library turns a geographic bounding box into game-engine terrain
//! artifacts: heightmaps, material weightmaps, and per-engine export
//! bundles. Elevation and vector data come from an ordered fallback chain
//! of pluggable providers; results are cached content-addressably; work is
//! scheduled through a priority batch queue with progress observers.
//!
//! # High-Level API
//!
//! For most use cases, the [`service`] module provides a simplified facade:
//!
//! ```ignore
//! use terraforge::service::{ServiceConfig, TerrainService};
//! use terraforge::config::GenerationRequest;
//! use terraforge::coord::BoundingBox;
//!
//! let service = TerrainService::new(ServiceConfig::default(), providers)?;
//! let bbox = BoundingBox::new(47.1, 47.0, 8.1, 8.0);
//! let job_id = service.submit(GenerationRequest::new("alps", bbox), 0)?;
//! ```

pub mod admission;
pub mod cache;
pub mod config;
pub mod coord;
pub mod export;
pub mod logging;
pub mod pipeline;
pub mod progress;
pub mod queue;
pub mod service;
pub mod source;
pub mod terrain;

/// Version of the TerraForge library and CLI.
///
/// This is synchronized across all components in the workspace.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
