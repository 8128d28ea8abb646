//! TerraForge CLI - Command-line interface
//!
//! This binary provides a command-line interface to the TerraForge library:
//! one-shot terrain generation with live progress, and cache inspection.

mod commands;
mod error;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process;

use error::CliError;

#[derive(Parser)]
#[command(name = "terraforge")]
#[command(version = terraforge::VERSION)]
#[command(about = "Generate game-engine terrain from real-world elevation data", long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Cache directory (defaults to the platform cache dir)
    #[arg(long, global = true)]
    cache_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Command {
    /// Generate terrain for a bounding box
    Generate(commands::GenerateArgs),

    /// Inspect or clear the result cache
    Cache {
        #[command(subcommand)]
        action: commands::CacheAction,
    },
}

fn main() {
    let args = Args::parse();

    let _guard = match terraforge::logging::init_logging(
        terraforge::logging::default_log_dir(),
        terraforge::logging::default_log_file(),
    ) {
        Ok(guard) => guard,
        Err(err) => CliError::LoggingInit(err.to_string()).exit(),
    };

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(err) => CliError::Runtime(err.to_string()).exit(),
    };

    let outcome = runtime.block_on(async {
        match args.command {
            Command::Generate(generate) => commands::generate(generate, args.cache_dir).await,
            Command::Cache { action } => commands::cache(action, args.cache_dir).await,
        }
    });

    if let Err(err) = outcome {
        err.exit();
    }
    process::exit(0);
}
