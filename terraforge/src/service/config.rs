//! Service-level configuration.

use std::path::PathBuf;
use std::time::Duration;

use crate::admission::DEFAULT_MAX_AREA_KM2;
use crate::cache::CacheConfig;
use crate::queue::QueueConfig;
use crate::source::DEFAULT_SOURCE_TIMEOUT;

/// Everything the service needs to wire itself up.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Result cache settings
    pub cache: CacheConfig,
    /// Queue sizing
    pub queue: QueueConfig,
    /// Root for generated artifacts
    pub output_dir: PathBuf,
    /// Admission area limit
    pub max_area_km2: f64,
    /// Per-source call timeout
    pub source_timeout: Duration,
    /// Seed for the synthetic fallback source
    pub synthetic_seed: u64,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            cache: CacheConfig::default(),
            queue: QueueConfig::default(),
            output_dir: PathBuf::from("output"),
            max_area_km2: DEFAULT_MAX_AREA_KM2,
            source_timeout: DEFAULT_SOURCE_TIMEOUT,
            synthetic_seed: 0,
        }
    }
}

impl ServiceConfig {
    pub fn with_cache(mut self, cache: CacheConfig) -> Self {
        self.cache = cache;
        self
    }

    pub fn with_queue(mut self, queue: QueueConfig) -> Self {
        self.queue = queue;
        self
    }

    pub fn with_output_dir(mut self, output_dir: impl Into<PathBuf>) -> Self {
        self.output_dir = output_dir.into();
        self
    }

    pub fn with_max_area_km2(mut self, max_area_km2: f64) -> Self {
        self.max_area_km2 = max_area_km2;
        self
    }

    pub fn with_source_timeout(mut self, timeout: Duration) -> Self {
        self.source_timeout = timeout;
        self
    }

    pub fn with_synthetic_seed(mut self, seed: u64) -> Self {
        self.synthetic_seed = seed;
        self
    }
}
