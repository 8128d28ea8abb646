//! Generation request configuration.
//!
//! [`GenerationConfig`] captures everything that influences the produced
//! artifact and therefore everything that participates in the cache
//! fingerprint. Service-level tunables (cache budget, queue sizes) live with
//! their components instead.

mod generation;

pub use generation::{FeatureFlags, GenerationConfig, GenerationRequest};
