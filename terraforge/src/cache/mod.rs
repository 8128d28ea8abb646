//! Content-addressable result cache.
//!
//! Completed generation results are stored on disk under a fingerprint of
//! (bounding box, generation config). The cache keeps a single JSON index
//! file beside the result directories; the index is the only durable state
//! in the system and survives restarts without a startup scan - missing
//! paths are healed lazily on first access.
//!
//! # Layout
//!
//! ```text
//! <root>/
//! ├── index.json                  fingerprint -> CacheEntry
//! ├── 3fa80c.../                  one directory per cached result
//! │   ├── unreal5/...
//! │   └── result.json
//! └── b2c411.../
//! ```

mod fingerprint;
mod index;
mod store;

pub use fingerprint::Fingerprint;
pub use index::{CacheEntry, CacheIndex};
pub use store::{CacheConfig, CacheError, CacheStats, ResultCache};
