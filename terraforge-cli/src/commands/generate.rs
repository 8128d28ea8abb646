//! `terraforge generate` - one-shot terrain generation.

use std::path::PathBuf;

use clap::Args;

use terraforge::cache::CacheConfig;
use terraforge::config::{GenerationConfig, GenerationRequest};
use terraforge::coord::BoundingBox;
use terraforge::queue::JobStatus;
use terraforge::service::{ServiceConfig, TerrainService};

use crate::error::CliError;

/// Arguments for the generate subcommand.
#[derive(Debug, Args)]
pub struct GenerateArgs {
    /// Terrain name (used for the output directory)
    #[arg(long)]
    pub name: String,

    /// North latitude in decimal degrees
    #[arg(long)]
    pub north: f64,

    /// South latitude in decimal degrees
    #[arg(long)]
    pub south: f64,

    /// East longitude in decimal degrees
    #[arg(long)]
    pub east: f64,

    /// West longitude in decimal degrees
    #[arg(long)]
    pub west: f64,

    /// Heightmap resolution in pixels per side
    #[arg(long, default_value = "2048")]
    pub resolution: u32,

    /// Export formats (repeatable), or "all"
    #[arg(long = "format", default_values = ["unreal5"])]
    pub formats: Vec<String>,

    /// Skip material weightmap generation
    #[arg(long)]
    pub no_weightmaps: bool,

    /// Output directory root
    #[arg(long, default_value = "output")]
    pub output: PathBuf,

    /// Maximum area in square kilometres
    #[arg(long, default_value = "100.0")]
    pub max_area_km2: f64,

    /// Seed for the synthetic fallback terrain
    #[arg(long, default_value = "0")]
    pub seed: u64,
}

/// Runs one generation to completion, streaming progress to the terminal.
pub async fn generate(args: GenerateArgs, cache_dir: Option<PathBuf>) -> Result<(), CliError> {
    let mut config = ServiceConfig::default()
        .with_output_dir(args.output.clone())
        .with_max_area_km2(args.max_area_km2)
        .with_synthetic_seed(args.seed);
    if let Some(dir) = cache_dir {
        config = config.with_cache(CacheConfig::new(dir));
    }

    // Providers are injected by integrations; the CLI runs with the
    // synthetic fallback only.
    let service = TerrainService::new(config, Vec::new())?;

    let bbox = BoundingBox::new(args.north, args.south, args.east, args.west);
    let request = GenerationRequest::new(&args.name, bbox).with_config(GenerationConfig {
        resolution: args.resolution,
        export_formats: args.formats.clone(),
        feature_flags: terraforge::config::FeatureFlags {
            weightmaps: !args.no_weightmaps,
            ..Default::default()
        },
        ..Default::default()
    });

    let job_id = service.submit(request, 0)?;
    println!("Submitted {job_id} for '{}'", args.name);

    let mut updates = service.watch(job_id);
    let mut last = None;
    while let Some(snapshot) = updates.recv().await {
        println!("[{:>3.0}%] {}", snapshot.progress, snapshot.current_step);
        last = Some(snapshot);
    }

    let Some(final_state) = last else {
        return Err(CliError::Generation("job vanished".to_string()));
    };

    match final_state.status {
        JobStatus::Completed => {
            let result = final_state
                .result
                .ok_or_else(|| CliError::Generation("completed without result".to_string()))?;
            println!();
            println!(
                "Done: {} ({} km², {}m to {}m, source: {})",
                result.output_dir.display(),
                (result.area_km2 * 100.0).round() / 100.0,
                result.elevation_min.round(),
                result.elevation_max.round(),
                result.elevation_source,
            );
            for (format, outcome) in &result.exports.formats {
                match &outcome.error {
                    None => println!("  {format}: {} file(s)", outcome.files.len()),
                    Some(err) => println!("  {format}: FAILED ({err})"),
                }
            }
            if result.cache_hit {
                println!("  (served from cache)");
            }
            service.shutdown().await;
            Ok(())
        }
        status => {
            service.shutdown().await;
            Err(CliError::Generation(format!(
                "job ended {status}: {}",
                final_state.error.unwrap_or_else(|| "no detail".to_string())
            )))
        }
    }
}
