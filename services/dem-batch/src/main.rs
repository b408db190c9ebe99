//! DEM differencing batch runner.
//!
//! Snaps every DEM in a directory to a reference grid, clips it by glacier
//! (or other) polygons, subtracts a baseline DEM and writes zonal
//! statistics and comparison figures.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use dem_batch::{BatchConfig, BatchPipeline};
use grid_processor::{ClipMode, ResamplingMethod};
use tracing::{error, info, warn, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Debug)]
#[command(name = "dem-batch")]
#[command(about = "Clip, difference and summarize DEMs against a baseline")]
struct Args {
    /// Configuration file path
    #[arg(short, long, env = "DEM_DIFF_CONFIG")]
    config: Option<PathBuf>,

    /// Directory of input DEMs
    #[arg(long)]
    input_dir: Option<PathBuf>,

    /// GeoJSON polygon layer
    #[arg(long)]
    polygons: Option<PathBuf>,

    /// Zone identifier field of the polygon layer
    #[arg(long)]
    zone_field: Option<String>,

    /// Raster defining the snap grid
    #[arg(long)]
    reference: Option<PathBuf>,

    /// Baseline DEM subtracted from every input
    #[arg(long)]
    baseline: Option<PathBuf>,

    /// Output directory
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Keep pixels inside or outside the polygons
    #[arg(long)]
    clip_mode: Option<ClipMode>,

    /// Resampling method used when snapping to the reference grid
    #[arg(long)]
    resampling: Option<ResamplingMethod>,

    /// Skip figure rendering
    #[arg(long)]
    no_plots: bool,

    /// Also render one figure per difference raster
    #[arg(long)]
    individual_plots: bool,

    /// Log level
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Emit logs as JSON
    #[arg(long)]
    json_logs: bool,
}

impl Args {
    /// CLI flags take precedence over file and environment settings.
    fn apply(&self, config: &mut BatchConfig) {
        if let Some(dir) = &self.input_dir {
            config.input_dir = dir.clone();
        }
        if let Some(path) = &self.polygons {
            config.polygon_path = path.clone();
        }
        if let Some(field) = &self.zone_field {
            config.zone_field = field.clone();
        }
        if let Some(path) = &self.reference {
            config.reference_path = path.clone();
        }
        if let Some(path) = &self.baseline {
            config.baseline_path = path.clone();
        }
        if let Some(dir) = &self.output_dir {
            config.output_dir = dir.clone();
        }
        if let Some(mode) = self.clip_mode {
            config.clip_mode = mode;
        }
        if let Some(method) = self.resampling {
            config.resampling = method;
        }
        if self.no_plots {
            config.visualize = false;
        }
        if self.individual_plots {
            config.individual_plots = true;
        }
    }
}

fn main() -> Result<()> {
    // Load environment from .env file if present
    dotenvy::dotenv().ok();

    let args = Args::parse();

    // Initialize tracing
    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let builder = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true)
        .with_thread_ids(true);

    if args.json_logs {
        tracing::subscriber::set_global_default(builder.json().finish())?;
    } else {
        tracing::subscriber::set_global_default(builder.finish())?;
    }

    info!("Starting DEM difference batch");

    let mut config = match &args.config {
        Some(path) => BatchConfig::load(path)
            .with_context(|| format!("Failed to load configuration from {}", path.display()))?,
        None => BatchConfig::default(),
    };
    config.apply_env();
    args.apply(&mut config);

    let pipeline = BatchPipeline::new(config).context("Batch configuration rejected")?;

    let summary = match pipeline.run() {
        Ok(summary) => summary,
        Err(e) => {
            error!(error = %e, "Batch run aborted");
            return Err(e).context("Batch run aborted");
        }
    };

    let counts = summary.counts();
    if summary.is_suspicious() {
        warn!(
            discovered = counts.discovered,
            skipped = counts.skipped,
            failed = counts.failed,
            "No input was processed"
        );
    } else {
        info!(
            processed = counts.processed,
            skipped = counts.skipped,
            failed = counts.failed,
            output_dir = %pipeline.config().output_dir.display(),
            "Batch run complete"
        );
    }

    Ok(())
}
