//! Disk-backed result cache with LRU budget eviction.

use std::path::{Path, PathBuf};

use chrono::{Duration, Utc};
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::{CacheEntry, CacheIndex, Fingerprint};

/// Cache-related errors.
#[derive(Debug, Error)]
pub enum CacheError {
    /// I/O error during cache operations
    #[error("cache I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A single result larger than the entire cache budget
    #[error("result of {size_bytes} bytes exceeds cache budget of {max_bytes} bytes")]
    EntryTooLarge { size_bytes: u64, max_bytes: u64 },
}

/// Result cache configuration.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Cache directory root
    pub root_dir: PathBuf,
    /// Maximum total size in bytes (default: 10 GB)
    pub max_bytes: u64,
    /// Optional: entries older than this many days are treated as misses
    pub max_age_days: Option<u32>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        let root_dir = dirs::cache_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("terraforge");

        Self {
            root_dir,
            max_bytes: 10 * 1024 * 1024 * 1024, // 10 GB
            max_age_days: Some(30),
        }
    }
}

impl CacheConfig {
    /// Creates a configuration rooted at the given directory.
    pub fn new(root_dir: impl Into<PathBuf>) -> Self {
        Self {
            root_dir: root_dir.into(),
            ..Default::default()
        }
    }

    /// Sets the size budget in bytes.
    pub fn with_max_bytes(mut self, max_bytes: u64) -> Self {
        self.max_bytes = max_bytes;
        self
    }

    /// Sets the maximum entry age in days, or `None` to keep entries
    /// until evicted.
    pub fn with_max_age_days(mut self, days: Option<u32>) -> Self {
        self.max_age_days = days;
        self
    }
}

/// Point-in-time cache statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct CacheStats {
    /// Live entries in the index
    pub entry_count: usize,
    /// Sum of entry sizes in bytes
    pub total_bytes: u64,
    /// Configured budget in bytes
    pub max_bytes: u64,
}

/// Content-addressable store for completed generation results.
///
/// The index and the filesystem are kept consistent in one direction only:
/// an index entry is created after its files finished copying, and removed
/// before its files are deleted, so a reader can never observe an indexed
/// path with partial contents.
pub struct ResultCache {
    config: CacheConfig,
    index_path: PathBuf,
    index: Mutex<CacheIndex>,
}

impl ResultCache {
    /// Opens (or creates) the cache at the configured root.
    ///
    /// Loads the JSON index without validating entry paths; stale entries
    /// are healed on first access instead.
    pub fn open(config: CacheConfig) -> Result<Self, CacheError> {
        std::fs::create_dir_all(&config.root_dir)?;
        let index_path = config.root_dir.join("index.json");
        let index = CacheIndex::load(&index_path);

        info!(
            root = %config.root_dir.display(),
            entries = index.len(),
            total_bytes = index.total_bytes(),
            "result cache opened"
        );

        Ok(Self {
            config,
            index_path,
            index: Mutex::new(index),
        })
    }

    /// Looks up a cached result directory.
    ///
    /// Returns `None` on a miss. An indexed entry whose directory is gone is
    /// removed from the index (self-heal); an entry past `max_age_days` is
    /// invalidated, files and all.
    pub async fn get(&self, key: &Fingerprint) -> Option<PathBuf> {
        let mut index = self.index.lock().await;

        let entry = index.get(key)?.clone();

        if !entry.storage_path.exists() {
            warn!(fingerprint = %key, "indexed cache entry missing on disk, healing index");
            index.remove(key);
            self.persist(&index);
            return None;
        }

        if let Some(days) = self.config.max_age_days {
            let age = Utc::now() - entry.created_at;
            if age > Duration::days(i64::from(days)) {
                debug!(fingerprint = %key, age_days = age.num_days(), "cache entry expired");
                index.remove(key);
                self.persist(&index);
                drop(index);
                remove_dir_logged(&entry.storage_path).await;
                return None;
            }
        }

        index.touch(key, Utc::now());
        self.persist(&index);
        debug!(fingerprint = %key, "cache hit");
        Some(entry.storage_path)
    }

    /// Stores a result directory under the cache root.
    ///
    /// Copies `result_dir` to `<root>/<fingerprint>`, indexes it, then
    /// evicts least-recently-accessed entries until the total is back under
    /// budget. Returns the path of the cached copy.
    pub async fn put(&self, key: &Fingerprint, result_dir: &Path) -> Result<PathBuf, CacheError> {
        let size_bytes = dir_size(result_dir.to_path_buf()).await?;
        if size_bytes > self.config.max_bytes {
            return Err(CacheError::EntryTooLarge {
                size_bytes,
                max_bytes: self.config.max_bytes,
            });
        }

        let dest = self.config.root_dir.join(key.as_str());

        // Copy before taking the lock; the entry becomes visible only once
        // the files are complete.
        if dest.exists() {
            tokio::fs::remove_dir_all(&dest).await?;
        }
        copy_dir(result_dir.to_path_buf(), dest.clone()).await?;

        let mut index = self.index.lock().await;

        let now = Utc::now();
        let replaced = index.insert(CacheEntry {
            fingerprint: key.clone(),
            storage_path: dest.clone(),
            size_bytes,
            created_at: now,
            last_accessed_at: now,
            access_count: 0,
        });
        if replaced.is_some() {
            debug!(fingerprint = %key, "replaced existing cache entry");
        }

        let victims = self.evict_locked(&mut index, self.config.max_bytes);
        self.persist(&index);
        drop(index);

        for victim in &victims {
            remove_dir_logged(&victim.storage_path).await;
        }

        info!(
            fingerprint = %key,
            size_bytes,
            evicted = victims.len(),
            "cached generation result"
        );
        Ok(dest)
    }

    /// Evicts least-recently-accessed entries until at least `target_bytes`
    /// have been freed. Returns the number of entries removed.
    pub async fn evict(&self, target_bytes: u64) -> usize {
        let mut index = self.index.lock().await;
        let target_total = index.total_bytes().saturating_sub(target_bytes);
        let victims = self.evict_locked(&mut index, target_total);
        self.persist(&index);
        drop(index);

        for victim in &victims {
            remove_dir_logged(&victim.storage_path).await;
        }
        victims.len()
    }

    /// Removes every entry and its files.
    pub async fn clear(&self) -> Result<(), CacheError> {
        let mut index = self.index.lock().await;
        let keys = index.keys();
        let mut paths = Vec::with_capacity(keys.len());
        for key in &keys {
            if let Some(entry) = index.remove(key) {
                paths.push(entry.storage_path);
            }
        }
        self.persist(&index);
        drop(index);

        for path in &paths {
            remove_dir_logged(path).await;
        }
        info!(removed = paths.len(), "cache cleared");
        Ok(())
    }

    /// Current statistics.
    pub async fn stats(&self) -> CacheStats {
        let index = self.index.lock().await;
        CacheStats {
            entry_count: index.len(),
            total_bytes: index.total_bytes(),
            max_bytes: self.config.max_bytes,
        }
    }

    /// Removes LRU entries from the index until `total_bytes <= target_total`.
    /// Entries leave the index here; their files are deleted by the caller
    /// after the lock is released.
    fn evict_locked(&self, index: &mut CacheIndex, target_total: u64) -> Vec<CacheEntry> {
        let mut victims = Vec::new();
        if index.total_bytes() <= target_total {
            return victims;
        }

        for candidate in index.lru_order() {
            if index.total_bytes() <= target_total {
                break;
            }
            if let Some(entry) = index.remove(&candidate.fingerprint) {
                debug!(
                    fingerprint = %entry.fingerprint,
                    size_bytes = entry.size_bytes,
                    "evicting cache entry"
                );
                victims.push(entry);
            }
        }
        victims
    }

    /// Persists the index; persistence failures are logged, not fatal -
    /// the worst case is re-caching after a restart.
    fn persist(&self, index: &CacheIndex) {
        if let Err(err) = index.save(&self.index_path) {
            warn!(error = %err, "failed to persist cache index");
        }
    }
}

/// Recursively computes the size of a directory in bytes.
async fn dir_size(dir: PathBuf) -> std::io::Result<u64> {
    let mut total = 0u64;
    let mut stack = vec![dir];
    while let Some(dir) = stack.pop() {
        let mut entries = tokio::fs::read_dir(&dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let meta = entry.metadata().await?;
            if meta.is_dir() {
                stack.push(entry.path());
            } else {
                total += meta.len();
            }
        }
    }
    Ok(total)
}

/// Recursively copies a directory.
async fn copy_dir(src: PathBuf, dest: PathBuf) -> std::io::Result<()> {
    let mut stack = vec![(src, dest)];
    while let Some((src, dest)) = stack.pop() {
        tokio::fs::create_dir_all(&dest).await?;
        let mut entries = tokio::fs::read_dir(&src).await?;
        while let Some(entry) = entries.next_entry().await? {
            let meta = entry.metadata().await?;
            let target = dest.join(entry.file_name());
            if meta.is_dir() {
                stack.push((entry.path(), target));
            } else {
                tokio::fs::copy(entry.path(), target).await?;
            }
        }
    }
    Ok(())
}

async fn remove_dir_logged(path: &Path) {
    if let Err(err) = tokio::fs::remove_dir_all(path).await {
        warn!(path = %path.display(), error = %err, "failed to remove cache directory");
    }
}
