use anyhow::{bail, Context, Result};
use clap::Parser;
use mapforge::builder::flattened_path;
use mapforge::codec::{PngCodec, RasterCodec};
use mapforge::config::BuildConfig;
use mapforge::source::FsDataSource;
use mapforge::{BuildOptions, MapBuilder};
use rayon::prelude::*;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;

/// Composite Anodyne world maps
#[derive(Parser)]
#[command(name = "mapforge")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Worlds to build (default: all)
    worlds: Vec<String>,

    /// Write each populated layer as its own image
    #[arg(short, long)]
    separate: bool,

    /// Rebuild worlds whose image already exists
    #[arg(short, long)]
    force: bool,

    /// Render collision categories instead of tiles
    #[arg(short, long)]
    physics: bool,

    /// Overlay the 160px debug grid
    #[arg(short, long)]
    grid: bool,

    /// Extracted game directory
    #[arg(long, default_value = "Anodyne_1.509")]
    source: PathBuf,

    /// Output directory
    #[arg(short, long, default_value = "maps")]
    output: PathBuf,

    /// Configuration file replacing the built-in tables
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder().with_max_level(log_level).finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let config = match &cli.config {
        Some(path) => BuildConfig::load(path)
            .with_context(|| format!("loading configuration {}", path.display()))?,
        None => BuildConfig::builtin()?,
    };

    for name in &cli.worlds {
        if config.world(name).is_none() {
            let valid: Vec<&str> = config.world_names().collect();
            bail!("unknown world: {name}\nvalid choices: {}", valid.join(" "));
        }
    }

    std::fs::create_dir_all(&cli.output)
        .with_context(|| format!("creating {}", cli.output.display()))?;

    let codec: Arc<dyn RasterCodec> = Arc::new(PngCodec);
    let source = Arc::new(FsDataSource::new(&cli.source));
    let builder = MapBuilder::new(config, source, Arc::clone(&codec))
        .with_context(|| format!("reading game files under {}", cli.source.display()))?;

    let options = BuildOptions {
        physics: cli.physics,
        separate: cli.separate,
        grid: cli.grid,
    };
    // Plain runs only fill in missing maps
    let skip_existing = cli.worlds.is_empty() && !cli.separate && !cli.force && !cli.physics;

    let worlds: Vec<String> = builder
        .config()
        .world_names()
        .filter(|w| cli.worlds.is_empty() || cli.worlds.iter().any(|n| n == w))
        .filter(|w| {
            let exists = skip_existing && flattened_path(&cli.output, w).exists();
            if exists {
                info!(world = %w, "skipping, output exists");
            }
            !exists
        })
        .map(str::to_string)
        .collect();

    let loaded = builder.atlases().preload().context("loading sprite atlases")?;
    info!(sprites = loaded, worlds = worlds.len(), "building");

    let failures: Vec<String> = worlds
        .par_iter()
        .filter_map(|world| {
            let written = builder
                .build_world(world, options)
                .and_then(|output| output.write(&cli.output, codec.as_ref()));
            match written {
                Ok(paths) => {
                    info!(world = %world, images = paths.len(), "done");
                    None
                },
                Err(e) => {
                    error!("{e}");
                    Some(world.clone())
                },
            }
        })
        .collect();

    let warnings = builder.diagnostics().count();
    if warnings > 0 {
        info!(warnings, "finished with diagnostics");
    }
    if !failures.is_empty() {
        bail!("{} world(s) failed: {}", failures.len(), failures.join(", "));
    }
    Ok(())
}
