//! The scene pipeline.
//!
//! One [`Pipeline`] runs every stage for a batch of regions:
//!
//! ```text
//! region ─► query ─► select top-K ─┬─► prepare dir ─► download ─► resolve bands
//!                                  │        │
//!                                  │        └─ exists: skipped
//!                                  └─ none: region without imagery
//!
//! resolve bands ─► composite ─► [reproject region ─► mask] ─► tile
//! ```
//!
//! Queries run sequentially. Scene jobs run sequentially or, with
//! `workers > 1`, on a dedicated rayon pool. A failing scene never stops
//! the batch; everything that happened is reported in a [`RunSummary`].

mod error;
mod summary;

pub use error::{PipelineError, PipelineResult};
pub use summary::{
    FailedRegion, FailedScene, ProcessedScene, RunSummary, RunWarning, SkippedScene,
};

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use rayon::prelude::*;
use tracing::{debug, error, info, warn};

use crate::composite::{BandCompositor, BandSet};
use crate::config::PipelineConfig;
use crate::mask::{MaskError, RegionMasker};
use crate::output::{region_dir_name, OutputOrganizer, Preparation, SceneDir};
use crate::raster::{read_geotiff, write_geotiff, Raster};
use crate::region::{GeometrySource, RegionGeometry, RegionResult};
use crate::scene::{
    resolve_bands, BandFilter, CandidateSelector, SceneRecord, SceneService, Selection,
};
use crate::tile::{TileReport, TileWindows, TileWriter};

/// One selected scene to process for one region.
#[derive(Debug, Clone)]
struct SceneJob {
    region: Arc<RegionGeometry>,
    scene: SceneRecord,
}

/// Result of one scene job.
#[derive(Debug)]
enum SceneOutcome {
    Processed {
        tiles: TileReport,
        warning: Option<String>,
    },
    Skipped,
    Failed(PipelineError),
}

/// Composite, mask and tile pipeline.
pub struct Pipeline {
    service: Arc<dyn SceneService>,
    geometry: Arc<dyn GeometrySource>,
    config: PipelineConfig,
    organizer: OutputOrganizer,
}

impl Pipeline {
    /// Create a pipeline around injected collaborators.
    ///
    /// The caller owns the service: construction, credentials and shutdown
    /// all happen outside the pipeline.
    pub fn new(
        service: Arc<dyn SceneService>,
        geometry: Arc<dyn GeometrySource>,
        config: PipelineConfig,
    ) -> Self {
        let organizer = OutputOrganizer::new(&config.output_root, config.key_style);
        Self {
            service,
            geometry,
            config,
            organizer,
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Load regions through the geometry source.
    pub fn load_regions(&self, path: &Path) -> RegionResult<Vec<RegionGeometry>> {
        self.geometry.load(path)
    }

    /// Process the configured selection of `regions`.
    pub fn run(&self, regions: &[RegionGeometry]) -> RunSummary {
        let mut summary = RunSummary::new();
        let selected = self.config.region_selection.select(regions);

        let band_filter = match BandFilter::new(&self.config.band_filter) {
            Ok(filter) => filter,
            Err(e) => {
                error!(error = %e, "Invalid band filter, nothing to do");
                for region in selected {
                    summary.add_failed_region(&region.name, e.to_string());
                }
                return summary;
            }
        };

        info!(
            regions = selected.len(),
            selection = %self.config.region_selection,
            mode = %self.config.output_mode,
            workers = self.config.workers,
            "Starting pipeline run"
        );

        let jobs = self.collect_jobs(selected, &mut summary);
        let outcomes = self.process_jobs(&jobs, &band_filter);

        for (job, outcome) in jobs.iter().zip(outcomes) {
            record_outcome(&mut summary, job, outcome);
        }

        info!(
            processed = summary.processed.len(),
            skipped = summary.skipped.len(),
            failed = summary.failed.len(),
            tiles = summary.total_tiles(),
            "Pipeline run complete"
        );
        summary
    }

    /// Query every region and select its scenes.
    fn collect_jobs(&self, regions: &[RegionGeometry], summary: &mut RunSummary) -> Vec<SceneJob> {
        let selector = CandidateSelector::new(self.config.top_k);
        let mut jobs = Vec::new();

        for region in regions {
            let records = match self.service.query(region, &self.config.query) {
                Ok(records) => records,
                Err(e) => {
                    warn!(region = %region.name, error = %e, "Scene query failed");
                    summary.add_failed_region(&region.name, e.to_string());
                    continue;
                }
            };

            match selector.select(records) {
                Selection::NoImagery => {
                    info!(region = %region.name, "No imagery matches the query");
                    summary.regions_without_imagery.push(region.name.clone());
                }
                Selection::Selected(scenes) => {
                    debug!(region = %region.name, scenes = scenes.len(), "Selected scenes");
                    let region = Arc::new(region.clone());
                    jobs.extend(scenes.into_iter().map(|scene| SceneJob {
                        region: Arc::clone(&region),
                        scene,
                    }));
                }
            }
        }

        jobs
    }

    /// Run the jobs, returning outcomes in job order.
    fn process_jobs(&self, jobs: &[SceneJob], band_filter: &BandFilter) -> Vec<SceneOutcome> {
        if self.config.workers > 1 && jobs.len() > 1 {
            match rayon::ThreadPoolBuilder::new()
                .num_threads(self.config.workers)
                .thread_name(|i| format!("scenetiler-worker-{}", i))
                .build()
            {
                Ok(pool) => {
                    return pool.install(|| {
                        jobs.par_iter()
                            .map(|job| self.process_scene(job, band_filter))
                            .collect()
                    });
                }
                Err(e) => {
                    warn!(error = %e, "Failed to build worker pool, running sequentially");
                }
            }
        }

        jobs.iter()
            .map(|job| self.process_scene(job, band_filter))
            .collect()
    }

    fn process_scene(&self, job: &SceneJob, band_filter: &BandFilter) -> SceneOutcome {
        let scene_id = job.scene.id.as_str();

        let dir = match self.organizer.prepare(&job.region.name, &job.scene) {
            Ok(Preparation::Created(dir)) => dir,
            Ok(Preparation::AlreadyProcessed) => {
                info!(scene_id, region = %job.region.name, "Scene already processed, skipping");
                return SceneOutcome::Skipped;
            }
            Err(e) => return SceneOutcome::Failed(e.into()),
        };

        info!(scene_id, region = %job.region.name, dir = %dir.path.display(), "Processing scene");
        match self.build_scene(job, &dir, band_filter) {
            Ok((tiles, warning)) => SceneOutcome::Processed { tiles, warning },
            Err(e) => {
                warn!(scene_id, error = %e, "Scene failed");
                if let Err(discard_err) = self.organizer.discard(&dir) {
                    warn!(scene_id, error = %discard_err, "Failed to discard scene directory");
                }
                SceneOutcome::Failed(e)
            }
        }
    }

    /// Download, render, and clean up the staging directory.
    fn build_scene(
        &self,
        job: &SceneJob,
        dir: &SceneDir,
        band_filter: &BandFilter,
    ) -> PipelineResult<(TileReport, Option<String>)> {
        let staging = self
            .config
            .staging_dir
            .join(region_dir_name(&job.region.name))
            .join(dir.key.as_str());
        let result = self
            .service
            .download(&job.scene, band_filter, &staging)
            .map_err(PipelineError::from)
            .and_then(|files| self.render(job, dir, &files));

        if !self.config.keep_downloads {
            if let Err(e) = fs::remove_dir_all(&staging) {
                debug!(path = %staging.display(), error = %e, "Staging directory not removed");
            }
        }
        result
    }

    fn render(
        &self,
        job: &SceneJob,
        dir: &SceneDir,
        files: &[PathBuf],
    ) -> PipelineResult<(TileReport, Option<String>)> {
        let paths = resolve_bands(files, &self.config.bands)?;
        let bands = BandSet::new(
            read_geotiff(&paths.b2)?,
            read_geotiff(&paths.b3)?,
            read_geotiff(&paths.b4)?,
        );

        let composite = BandCompositor::new(self.config.output_mode)
            .with_fallback_epsg(self.config.fallback_epsg)
            .composite(&bands)?;
        drop(bands);
        write_raster(&dir.file(&self.config.composite_filename()), &composite)?;

        let radius = job.region.buffer_radius.or(self.config.buffer_radius);
        let tiled = match radius {
            None => composite,
            Some(radius) => {
                let epsg = composite.meta().epsg.unwrap_or(self.config.fallback_epsg);
                let region = self.geometry.reproject(&job.region, epsg)?;
                match RegionMasker::new().mask(&composite, &region, radius) {
                    Ok(masked) => {
                        write_raster(&dir.file(&self.config.masked_filename()), &masked)?;
                        masked
                    }
                    Err(MaskError::EmptyIntersection { .. }) => {
                        let message = format!(
                            "region '{}' does not intersect scene {}",
                            job.region.name, job.scene.id
                        );
                        warn!(scene_id = %job.scene.id, region = %job.region.name, "Region does not intersect scene, no tiles");
                        return Ok((TileReport::default(), Some(message)));
                    }
                    Err(e) => return Err(e.into()),
                }
            }
        };

        let size = self.config.tile_size;
        let report = TileWriter::new(&dir.tiles, size)
            .write_all(&tiled, TileWindows::for_raster(&tiled, size))?;
        Ok((report, None))
    }
}

fn write_raster(path: &Path, raster: &Raster) -> PipelineResult<()> {
    write_geotiff(path, raster.meta(), raster.data().view())?;
    debug!(path = %path.display(), "Wrote raster");
    Ok(())
}

fn record_outcome(summary: &mut RunSummary, job: &SceneJob, outcome: SceneOutcome) {
    let scene_id = job.scene.id.clone();
    match outcome {
        SceneOutcome::Processed { tiles, warning } => {
            if let Some(message) = warning {
                summary.add_warning(&scene_id, message);
            }
            summary.processed.push(ProcessedScene {
                scene_id,
                region: job.region.name.clone(),
                tiles: tiles.written_count(),
            });
        }
        SceneOutcome::Skipped => summary.skipped.push(SkippedScene {
            scene_id,
            region: job.region.name.clone(),
        }),
        SceneOutcome::Failed(e) => summary.failed.push(FailedScene {
            scene_id,
            region: job.region.name.clone(),
            reason: e.to_string(),
        }),
    }
}
