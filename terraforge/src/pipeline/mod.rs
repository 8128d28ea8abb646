//! The generation pipeline.
//!
//! [`TerrainGenerator`] runs one job end to end: cache lookup, in-flight
//! deduplication, source resolution, numeric processing, export fan-out,
//! and cache write-back, reporting progress at fixed checkpoints along the
//! way.

mod error;
mod generator;
mod inflight;
mod result;

pub use error::GenerateError;
pub use generator::{GeneratorConfig, TerrainGenerator};
pub use inflight::{InflightMap, Registration};
pub use result::TerrainResult;
