//! Persistent cache index.
//!
//! The index maps fingerprints to [`CacheEntry`] metadata and tracks the
//! total byte count so eviction decisions never need a filesystem scan.
//! It serializes to a single JSON file; writes go through a temp file and
//! rename so a crash cannot leave a torn index.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Fingerprint;

/// Metadata for one cached result directory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry {
    /// Request fingerprint this entry belongs to
    pub fingerprint: Fingerprint,
    /// Absolute path of the cached result directory
    pub storage_path: PathBuf,
    /// Total size of the directory in bytes
    pub size_bytes: u64,
    /// When the result was cached
    pub created_at: DateTime<Utc>,
    /// Last cache hit (equals `created_at` until the first hit)
    pub last_accessed_at: DateTime<Utc>,
    /// Number of cache hits served
    pub access_count: u64,
}

/// Serialized index document.
#[derive(Debug, Default, Serialize, Deserialize)]
struct IndexFile {
    entries: HashMap<String, CacheEntry>,
}

/// In-memory view of the index plus its running totals.
///
/// All mutation happens under the owning cache's lock; this type itself is
/// plain data.
#[derive(Debug, Default)]
pub struct CacheIndex {
    entries: HashMap<String, CacheEntry>,
    total_bytes: u64,
}

impl CacheIndex {
    /// Loads the index from `path`, or returns an empty index if the file
    /// does not exist or cannot be parsed (a corrupt index is discarded -
    /// result directories are re-cached on demand).
    pub fn load(path: &Path) -> Self {
        let raw = match std::fs::read(path) {
            Ok(raw) => raw,
            Err(_) => return Self::default(),
        };
        match serde_json::from_slice::<IndexFile>(&raw) {
            Ok(file) => {
                let total_bytes = file.entries.values().map(|e| e.size_bytes).sum();
                tracing::debug!(
                    entries = file.entries.len(),
                    total_bytes,
                    "cache index loaded"
                );
                Self {
                    entries: file.entries,
                    total_bytes,
                }
            }
            Err(err) => {
                tracing::warn!(error = %err, path = %path.display(), "discarding unreadable cache index");
                Self::default()
            }
        }
    }

    /// Writes the index to `path` atomically (temp file + rename).
    pub fn save(&self, path: &Path) -> std::io::Result<()> {
        let file = IndexFile {
            entries: self.entries.clone(),
        };
        let json = serde_json::to_vec_pretty(&file).map_err(std::io::Error::other)?;
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, json)?;
        std::fs::rename(&tmp, path)
    }

    /// Looks up an entry without touching access metadata.
    pub fn get(&self, key: &Fingerprint) -> Option<&CacheEntry> {
        self.entries.get(key.as_str())
    }

    /// Records a hit: bumps `last_accessed_at` and `access_count`.
    pub fn touch(&mut self, key: &Fingerprint, now: DateTime<Utc>) {
        if let Some(entry) = self.entries.get_mut(key.as_str()) {
            entry.last_accessed_at = now;
            entry.access_count += 1;
        }
    }

    /// Inserts or replaces an entry, returning the previous one if any.
    pub fn insert(&mut self, entry: CacheEntry) -> Option<CacheEntry> {
        let size = entry.size_bytes;
        let old = self
            .entries
            .insert(entry.fingerprint.as_str().to_string(), entry);
        if let Some(old) = &old {
            self.total_bytes = self.total_bytes.saturating_sub(old.size_bytes);
        }
        self.total_bytes += size;
        old
    }

    /// Removes an entry, returning it if present.
    pub fn remove(&mut self, key: &Fingerprint) -> Option<CacheEntry> {
        let removed = self.entries.remove(key.as_str());
        if let Some(entry) = &removed {
            self.total_bytes = self.total_bytes.saturating_sub(entry.size_bytes);
        }
        removed
    }

    /// Entries sorted by ascending `last_accessed_at` - LRU victims first.
    pub fn lru_order(&self) -> Vec<CacheEntry> {
        let mut entries: Vec<_> = self.entries.values().cloned().collect();
        entries.sort_by_key(|e| e.last_accessed_at);
        entries
    }

    /// Total bytes across live entries.
    pub fn total_bytes(&self) -> u64 {
        self.total_bytes
    }

    /// Number of live entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the index has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// All fingerprints currently indexed.
    pub fn keys(&self) -> Vec<Fingerprint> {
        self.entries
            .values()
            .map(|e| e.fingerprint.clone())
            .collect()
    }
}
