//! Geospatial data sources and the fallback resolver.
//!
//! The pipeline never talks to a provider directly: it asks the
//! [`SourceResolver`], which walks an ordered chain of [`DataSource`]
//! implementations until one produces data. Concrete HTTP providers
//! (OpenTopography, Azure Maps, OSM/Overpass, ...) implement [`DataSource`]
//! and are injected by the embedding application; this crate ships only the
//! deterministic [`SyntheticSource`] used as the always-available tail of
//! the elevation chain.

mod descriptor;
mod resolver;
mod synthetic;

pub use descriptor::{
    Capability, DataSource, ElevationGrid, SourceError, SourceFuture, VectorKind, VectorSet,
};
pub use resolver::{
    ResolvedElevation, ResolvedVectors, SourceResolver, DEFAULT_SOURCE_TIMEOUT,
};
pub use synthetic::SyntheticSource;
