//! The `run` command.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Args;
use scenetiler::composite::OutputMode;
use scenetiler::config::{PipelineConfig, RegionSelection};
use scenetiler::pipeline::Pipeline;
use scenetiler::region::GeoJsonSource;
use scenetiler::scene::LocalArchive;
use tracing::info;

use crate::error::CliError;
use crate::runner::CliRunner;

/// Arguments of `scenetiler run`.
#[derive(Debug, Args)]
pub struct RunArgs {
    /// GeoJSON file with the regions of interest
    #[arg(long)]
    pub regions: PathBuf,

    /// Scene archive directory (containing scenes.json)
    #[arg(long)]
    pub archive: PathBuf,

    /// Output root directory (overrides config)
    #[arg(long)]
    pub output: Option<PathBuf>,

    /// Composite form: rgb or greyscale (overrides config)
    #[arg(long)]
    pub mode: Option<OutputMode>,

    /// Regions to process: all, an index (3) or a range (2..5)
    #[arg(long)]
    pub select: Option<RegionSelection>,

    /// Buffer radius around each region in CRS units (overrides config)
    #[arg(long, conflicts_with = "no_buffer")]
    pub buffer_radius: Option<f64>,

    /// Tile the whole composite without masking
    #[arg(long)]
    pub no_buffer: bool,

    /// Number of scenes processed in parallel (overrides config)
    #[arg(long)]
    pub workers: Option<usize>,

    /// Config file to use instead of ~/.scenetiler/config.ini
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long)]
    pub debug: bool,
}

impl RunArgs {
    /// Overlay command-line overrides onto a config-derived pipeline config.
    pub fn apply(&self, mut config: PipelineConfig) -> Result<PipelineConfig, CliError> {
        if let Some(output) = &self.output {
            config.output_root = output.clone();
        }
        if let Some(mode) = self.mode {
            config = config.with_output_mode(mode);
        }
        if let Some(selection) = self.select {
            config = config.with_region_selection(selection);
        }
        if let Some(radius) = self.buffer_radius {
            if !radius.is_finite() || radius < 0.0 {
                return Err(CliError::Config(format!(
                    "--buffer-radius must be a non-negative number, got {}",
                    radius
                )));
            }
            config = config.with_buffer_radius(Some(radius));
        }
        if self.no_buffer {
            config = config.with_buffer_radius(None);
        }
        if let Some(workers) = self.workers {
            config = config.with_workers(workers);
        }
        Ok(config)
    }
}

/// Run the pipeline over the archive and print the summary.
pub fn run(args: RunArgs) -> Result<(), CliError> {
    let runner = CliRunner::new(args.config.as_deref(), args.debug)?;
    runner.log_startup("run");

    let config = args.apply(runner.config().pipeline_config())?;
    info!(
        output = %config.output_root.display(),
        archive = %args.archive.display(),
        "Resolved run configuration"
    );

    let archive = LocalArchive::open(&args.archive).map_err(CliError::Archive)?;
    let pipeline = Pipeline::new(Arc::new(archive), Arc::new(GeoJsonSource::new()), config);
    let regions = pipeline.load_regions(&args.regions)?;
    println!("Loaded {} region(s) from {}", regions.len(), args.regions.display());

    let summary = pipeline.run(&regions);
    println!();
    print!("{}", summary);

    Ok(())
}
