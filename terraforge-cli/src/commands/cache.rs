//! `terraforge cache` - cache inspection and maintenance.

use std::path::PathBuf;

use clap::Subcommand;

use terraforge::cache::{CacheConfig, ResultCache};

use crate::error::CliError;

/// Cache maintenance actions.
#[derive(Debug, Subcommand)]
pub enum CacheAction {
    /// Print entry count and byte totals
    Stats,
    /// Remove every cached result
    Clear,
}

/// Runs a cache subcommand against the configured cache directory.
pub async fn cache(action: CacheAction, cache_dir: Option<PathBuf>) -> Result<(), CliError> {
    let config = match cache_dir {
        Some(dir) => CacheConfig::new(dir),
        None => CacheConfig::default(),
    };
    let root = config.root_dir.clone();
    let cache = ResultCache::open(config)?;

    match action {
        CacheAction::Stats => {
            let stats = cache.stats().await;
            println!("Cache: {}", root.display());
            println!("  entries:     {}", stats.entry_count);
            println!("  total bytes: {}", stats.total_bytes);
            println!("  max bytes:   {}", stats.max_bytes);
            let percent = if stats.max_bytes > 0 {
                stats.total_bytes as f64 / stats.max_bytes as f64 * 100.0
            } else {
                0.0
            };
            println!("  utilization: {percent:.1}%");
        }
        CacheAction::Clear => {
            let before = cache.stats().await;
            cache.clear().await?;
            println!(
                "Cleared {} entries ({} bytes)",
                before.entry_count, before.total_bytes
            );
        }
    }

    Ok(())
}
