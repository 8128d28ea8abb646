//! CLI subcommand implementations.

mod cache;
mod generate;

pub use cache::{cache, CacheAction};
pub use generate::{generate, GenerateArgs};
