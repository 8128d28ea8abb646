//! In-flight request deduplication.
//!
//! Two concurrent submissions with the same fingerprint would otherwise
//! recompute the same artifact side by side. The first request registers as
//! the primary and does the work; every identical request that arrives
//! before it finishes subscribes to a broadcast of the outcome instead.

use std::collections::HashMap;

use tokio::sync::{broadcast, Mutex};
use tracing::debug;

use crate::cache::Fingerprint;

use super::result::TerrainResult;

/// Broadcast payload: the primary's outcome, success or failure.
type Outcome = Result<TerrainResult, String>;

/// Result of registering a request.
pub enum Registration {
    /// First request for this fingerprint - caller runs the pipeline and
    /// must call [`InflightMap::complete`] with the outcome.
    Primary,
    /// Identical request already running - await the receiver instead.
    Coalesced(broadcast::Receiver<Outcome>),
}

impl Registration {
    /// True when the caller is responsible for doing the work.
    pub fn is_primary(&self) -> bool {
        matches!(self, Registration::Primary)
    }
}

/// Fingerprint-keyed map of in-flight generations.
pub struct InflightMap {
    in_flight: Mutex<HashMap<Fingerprint, broadcast::Sender<Outcome>>>,
}

impl InflightMap {
    pub fn new() -> Self {
        Self {
            in_flight: Mutex::new(HashMap::new()),
        }
    }

    /// Registers interest in a fingerprint.
    pub async fn register(&self, key: &Fingerprint) -> Registration {
        let mut in_flight = self.in_flight.lock().await;

        if let Some(tx) = in_flight.get(key) {
            debug!(fingerprint = %key, "coalescing duplicate request");
            Registration::Coalesced(tx.subscribe())
        } else {
            // Capacity 8: waiters receive exactly one message
            let (tx, _rx) = broadcast::channel(8);
            in_flight.insert(key.clone(), tx);
            Registration::Primary
        }
    }

    /// Publishes the primary's outcome to all waiters and clears the entry.
    pub async fn complete(&self, key: &Fingerprint, outcome: Outcome) {
        let mut in_flight = self.in_flight.lock().await;
        if let Some(tx) = in_flight.remove(key) {
            let waiters = tx.receiver_count();
            if waiters > 0 {
                debug!(fingerprint = %key, waiters, "broadcasting result to coalesced waiters");
            }
            // Send errors just mean every waiter already went away
            let _ = tx.send(outcome);
        }
    }

    /// Number of distinct requests currently in flight.
    pub async fn len(&self) -> usize {
        self.in_flight.lock().await.len()
    }

    /// Whether nothing is currently in flight.
    pub async fn is_empty(&self) -> bool {
        self.in_flight.lock().await.is_empty()
    }
}

impl Default for InflightMap {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn key(name: &str) -> Fingerprint {
        Fingerprint::from_hex(name)
    }

    fn outcome(name: &str) -> Outcome {
        Ok(TerrainResult {
            name: name.into(),
            resolution: 64,
            area_km2: 1.0,
            elevation_min: 0.0,
            elevation_max: 1.0,
            elevation_source: "synthetic".into(),
            vector_source: None,
            exports: Default::default(),
            output_dir: "/out".into(),
            cache_hit: false,
        })
    }

    #[tokio::test]
    async fn first_registration_is_primary() {
        let map = InflightMap::new();
        assert!(map.register(&key("a")).await.is_primary());
        assert_eq!(map.len().await, 1);
    }

    #[tokio::test]
    async fn second_registration_is_coalesced() {
        let map = InflightMap::new();
        let _primary = map.register(&key("a")).await;
        assert!(!map.register(&key("a")).await.is_primary());
    }

    #[tokio::test]
    async fn different_fingerprints_are_independent() {
        let map = InflightMap::new();
        assert!(map.register(&key("a")).await.is_primary());
        assert!(map.register(&key("b")).await.is_primary());
    }

    #[tokio::test]
    async fn waiters_receive_the_outcome() {
        let map = Arc::new(InflightMap::new());
        let _primary = map.register(&key("a")).await;

        let Registration::Coalesced(mut rx) = map.register(&key("a")).await else {
            panic!("expected coalesced registration");
        };

        map.complete(&key("a"), outcome("shared")).await;

        let received = rx.recv().await.unwrap().unwrap();
        assert_eq!(received.name, "shared");
    }

    #[tokio::test]
    async fn failure_outcome_reaches_waiters() {
        let map = InflightMap::new();
        let _primary = map.register(&key("a")).await;
        let Registration::Coalesced(mut rx) = map.register(&key("a")).await else {
            panic!("expected coalesced registration");
        };

        map.complete(&key("a"), Err("primary failed".into())).await;

        let received = rx.recv().await.unwrap();
        assert_eq!(received.unwrap_err(), "primary failed");
    }

    #[tokio::test]
    async fn completion_clears_the_entry() {
        let map = InflightMap::new();
        let _primary = map.register(&key("a")).await;
        map.complete(&key("a"), outcome("done")).await;

        assert!(map.is_empty().await);
        // A new request becomes the primary again
        assert!(map.register(&key("a")).await.is_primary());
    }

    #[tokio::test]
    async fn concurrent_registration_yields_one_primary() {
        let map = Arc::new(InflightMap::new());

        let mut handles = Vec::new();
        for _ in 0..10 {
            let map = Arc::clone(&map);
            handles.push(tokio::spawn(
                async move { map.register(&key("a")).await },
            ));
        }

        let registrations = futures::future::join_all(handles).await;
        let primaries = registrations
            .into_iter()
            .map(|r| r.unwrap())
            .filter(|r| r.is_primary())
            .count();
        assert_eq!(primaries, 1);
    }
}
