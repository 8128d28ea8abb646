//! Pipeline error types.

use thiserror::Error;

use crate::cache::CacheError;
use crate::source::SourceError;

/// Failures that leave a job with no usable result.
///
/// Recoverable conditions never reach this type: source fallback is
/// absorbed by the resolver, per-format export failures stay inside the
/// manifest, and cache write-back problems are logged and dropped.
#[derive(Debug, Error)]
pub enum GenerateError {
    /// Every elevation source, including the synthetic tail, was exhausted.
    /// Only possible when the chain was built without a synthetic source.
    #[error("elevation acquisition failed: {0}")]
    Elevation(#[from] SourceError),

    /// The job observed its cancellation token at a suspension point
    #[error("job cancelled")]
    Cancelled,

    /// Output directory could not be created or written
    #[error("output I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A coalesced wait ended because the primary request failed
    #[error("deduplicated request failed: {0}")]
    CoalescedFailed(String),

    /// Cache interaction failed in a way that prevents a result
    #[error(transparent)]
    Cache(#[from] CacheError),

    /// CPU-bound stage panicked
    #[error("processing stage panicked: {0}")]
    StagePanicked(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_messages() {
        assert_eq!(format!("{}", GenerateError::Cancelled), "job cancelled");
        let err = GenerateError::CoalescedFailed("upstream timeout".into());
        assert!(format!("{err}").contains("upstream timeout"));
    }
}
