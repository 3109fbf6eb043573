//! Integration tests for the scene pipeline.
//!
//! These tests drive `Pipeline::run` end to end over a local archive of
//! synthetic Sentinel-2 style bands:
//! - Compositing, masking and tiling into the scene directory
//! - Tile validity filtering
//! - Skip-if-exists re-runs
//! - Empty region intersections, download and query failures
//!
//! Run with: `cargo test --test pipeline_integration`

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{TimeZone, Utc};
use filetime::FileTime;
use geo::polygon;
use ndarray::{s, Array2};
use tempfile::TempDir;

use scenetiler::composite::OutputMode;
use scenetiler::config::{PipelineConfig, RegionSelection};
use scenetiler::pipeline::Pipeline;
use scenetiler::raster::{read_geotiff, write_geotiff, DataType, GeoTransform, Raster, RasterMeta};
use scenetiler::region::{GeoJsonSource, RegionGeometry};
use scenetiler::scene::{
    ArchiveEntry, BandFilter, LocalArchive, QueryFilter, SceneRecord, SceneService, ServiceError,
};

// ============================================================================
// Helper Functions
// ============================================================================

/// UTM zone 42N.
const EPSG: u32 = 32642;

/// Scene size in pixels.
const SIZE: usize = 512;

const ORIGIN_X: f64 = 500_000.0;
const ORIGIN_Y: f64 = 7_700_000.0;
const PIXEL: f64 = 10.0;

fn scene_meta() -> RasterMeta {
    RasterMeta::new(
        SIZE,
        SIZE,
        DataType::UInt16,
        GeoTransform::north_up(ORIGIN_X, ORIGIN_Y, PIXEL, PIXEL),
    )
    .with_epsg(EPSG)
}

fn record(id: &str, day: u32, cloud: f64) -> SceneRecord {
    SceneRecord::new(id, Utc.with_ymd_and_hms(2023, 7, day, 6, 0, 0).unwrap(), cloud)
}

/// Write B02/B03/B04 for a scene, letting `edit` modify each band grid.
fn write_scene_bands(archive: &Path, scene_id: &str, edit: impl Fn(&str, &mut Array2<f32>)) {
    let dir = archive
        .join(scene_id)
        .join("GRANULE")
        .join("IMG_DATA")
        .join("R10m");
    fs::create_dir_all(&dir).unwrap();

    for (label, value) in [("B02", 300.0), ("B03", 600.0), ("B04", 900.0)] {
        let mut grid = Array2::from_elem((SIZE, SIZE), value);
        edit(label, &mut grid);
        let raster = Raster::from_band(scene_meta(), grid).unwrap();
        let path = dir.join(format!("T42WXS_20230701T065629_{}_10m.tif", label));
        write_geotiff(&path, raster.meta(), raster.data().view()).unwrap();
    }
}

fn unchanged(_: &str, _: &mut Array2<f32>) {}

/// Create an archive index holding `records`.
fn build_archive(root: &Path, records: Vec<SceneRecord>) -> LocalArchive {
    fs::create_dir_all(root).unwrap();
    let entries = records.into_iter().map(ArchiveEntry::new).collect();
    LocalArchive::with_entries(root, entries).save_index().unwrap();
    LocalArchive::open(root).unwrap()
}

/// A rectangular region in the scene CRS.
fn region(name: &str, min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> RegionGeometry {
    RegionGeometry::from_polygon(
        name,
        polygon![
            (x: min_x, y: min_y),
            (x: max_x, y: min_y),
            (x: max_x, y: max_y),
            (x: min_x, y: max_y),
        ],
        EPSG,
    )
}

/// Region matching the scene footprint exactly.
fn full_scene_region(name: &str) -> RegionGeometry {
    let extent = SIZE as f64 * PIXEL;
    region(name, ORIGIN_X, ORIGIN_Y - extent, ORIGIN_X + extent, ORIGIN_Y)
}

struct Fixture {
    _temp: TempDir,
    archive: PathBuf,
    output: PathBuf,
    staging: PathBuf,
}

impl Fixture {
    fn new() -> Self {
        let temp = TempDir::new().unwrap();
        let archive = temp.path().join("archive");
        let output = temp.path().join("output");
        let staging = temp.path().join("staging");
        Self {
            _temp: temp,
            archive,
            output,
            staging,
        }
    }

    fn config(&self) -> PipelineConfig {
        PipelineConfig::new(&self.output)
            .with_staging_dir(&self.staging)
            .with_buffer_radius(Some(0.0))
    }

    fn scene_dir(&self, region: &str, scene_id: &str) -> PathBuf {
        self.output.join(region).join(scene_id)
    }

    fn pipeline(&self, service: Arc<dyn SceneService>, config: PipelineConfig) -> Pipeline {
        Pipeline::new(service, Arc::new(GeoJsonSource::new()), config)
    }
}

fn tile_names(tiles_dir: &Path) -> BTreeSet<String> {
    fs::read_dir(tiles_dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect()
}

fn names(items: &[&str]) -> BTreeSet<String> {
    items.iter().map(|s| s.to_string()).collect()
}

/// Scene service whose queries always fail.
struct UnreachableService;

impl SceneService for UnreachableService {
    fn query(
        &self,
        _region: &RegionGeometry,
        _filter: &QueryFilter,
    ) -> Result<Vec<SceneRecord>, ServiceError> {
        Err(ServiceError::Query("connection refused".to_string()))
    }

    fn download(
        &self,
        scene: &SceneRecord,
        _bands: &BandFilter,
        _dest_dir: &Path,
    ) -> Result<Vec<PathBuf>, ServiceError> {
        Err(ServiceError::Download {
            scene_id: scene.id.clone(),
            reason: "unreachable".to_string(),
        })
    }
}

// ============================================================================
// Integration Tests
// ============================================================================

/// A fully valid 512x512 scene produces four tiles plus both composites.
#[test]
fn test_valid_scene_yields_four_tiles() {
    let fx = Fixture::new();
    write_scene_bands(&fx.archive, "S2A_A", unchanged);
    let archive = build_archive(&fx.archive, vec![record("S2A_A", 1, 2.0)]);

    let summary = fx
        .pipeline(Arc::new(archive), fx.config())
        .run(&[full_scene_region("lake")]);

    assert_eq!(summary.processed_ids(), vec!["S2A_A"]);
    assert_eq!(summary.total_tiles(), 4);
    assert!(summary.is_success());
    assert!(!summary.has_warnings());

    let scene_dir = fx.scene_dir("lake", "S2A_A");
    assert_eq!(
        tile_names(&scene_dir.join("tiles")),
        names(&[
            "tile_0-0.tif",
            "tile_256-0.tif",
            "tile_0-256.tif",
            "tile_256-256.tif"
        ])
    );

    let composite = read_geotiff(&scene_dir.join("rgb.tif")).unwrap();
    assert_eq!(composite.shape(), (3, SIZE, SIZE));
    assert_eq!(composite.meta().epsg, Some(EPSG));
    assert_eq!(composite.data()[[0, 10, 10]], 300.0);
    assert_eq!(composite.data()[[2, 10, 10]], 900.0);

    let masked = read_geotiff(&scene_dir.join("rgb_masked.tif")).unwrap();
    assert_eq!(masked.shape(), (3, SIZE, SIZE));

    let tile = read_geotiff(&scene_dir.join("tiles").join("tile_256-256.tif")).unwrap();
    assert_eq!(tile.shape(), (3, 256, 256));
    assert_eq!(tile.meta().transform.c, ORIGIN_X + 256.0 * PIXEL);
    assert_eq!(tile.meta().transform.f, ORIGIN_Y - 256.0 * PIXEL);

    // Staging is cleaned up by default
    assert!(!fx.staging.join("S2A_A").exists());
}

/// A zeroed bottom-right quadrant drops exactly that tile.
#[test]
fn test_invalid_quadrant_yields_three_tiles() {
    let fx = Fixture::new();
    write_scene_bands(&fx.archive, "S2A_A", |label, grid| {
        if label == "B02" {
            grid.slice_mut(s![256.., 256..]).fill(0.0);
        }
    });
    let archive = build_archive(&fx.archive, vec![record("S2A_A", 1, 2.0)]);

    let summary = fx
        .pipeline(Arc::new(archive), fx.config())
        .run(&[full_scene_region("lake")]);

    assert_eq!(summary.total_tiles(), 3);
    assert_eq!(
        tile_names(&fx.scene_dir("lake", "S2A_A").join("tiles")),
        names(&["tile_0-0.tif", "tile_256-0.tif", "tile_0-256.tif"])
    );
}

/// A second run skips the scene and leaves its files untouched.
#[test]
fn test_rerun_skips_processed_scene() {
    let fx = Fixture::new();
    write_scene_bands(&fx.archive, "S2A_A", unchanged);
    let archive: Arc<dyn SceneService> =
        Arc::new(build_archive(&fx.archive, vec![record("S2A_A", 1, 2.0)]));
    let regions = [full_scene_region("lake")];

    let first = fx.pipeline(Arc::clone(&archive), fx.config()).run(&regions);
    assert_eq!(first.processed_ids(), vec!["S2A_A"]);

    let tile = fx.scene_dir("lake", "S2A_A").join("tiles").join("tile_0-0.tif");
    let old = FileTime::from_unix_time(1_000_000, 0);
    filetime::set_file_mtime(&tile, old).unwrap();
    let bytes = fs::read(&tile).unwrap();

    let second = fx.pipeline(archive, fx.config()).run(&regions);
    assert!(second.processed.is_empty());
    assert_eq!(second.skipped_ids(), vec!["S2A_A"]);

    let meta = fs::metadata(&tile).unwrap();
    assert_eq!(FileTime::from_last_modification_time(&meta), old);
    assert_eq!(fs::read(&tile).unwrap(), bytes);
    assert_eq!(tile_names(tile.parent().unwrap()).len(), 4);
}

/// A region outside the scene is processed with zero tiles and a warning.
#[test]
fn test_region_outside_scene_warns_without_failing() {
    let fx = Fixture::new();
    write_scene_bands(&fx.archive, "S2A_A", unchanged);
    let archive = build_archive(&fx.archive, vec![record("S2A_A", 1, 2.0)]);

    let far_away = region("far", 600_000.0, 7_600_000.0, 601_000.0, 7_601_000.0);
    let summary = fx
        .pipeline(
            Arc::new(archive),
            fx.config().with_buffer_radius(Some(1_000.0)),
        )
        .run(&[far_away]);

    assert_eq!(summary.processed_ids(), vec!["S2A_A"]);
    assert_eq!(summary.total_tiles(), 0);
    assert!(summary.failed.is_empty());
    assert_eq!(summary.warnings.len(), 1);
    assert_eq!(summary.warnings[0].subject, "S2A_A");

    let scene_dir = fx.scene_dir("far", "S2A_A");
    assert!(scene_dir.join("rgb.tif").is_file());
    assert!(!scene_dir.join("rgb_masked.tif").exists());
    assert!(tile_names(&scene_dir.join("tiles")).is_empty());
}

/// A failed download is recorded and the batch carries on.
#[test]
fn test_download_failure_does_not_stop_batch() {
    let fx = Fixture::new();
    write_scene_bands(&fx.archive, "S2A_GOOD", unchanged);
    // S2A_GONE is indexed but has no files and is the newest candidate
    let archive = build_archive(
        &fx.archive,
        vec![record("S2A_GOOD", 1, 2.0), record("S2A_GONE", 5, 1.0)],
    );

    let summary = fx
        .pipeline(Arc::new(archive), fx.config().with_top_k(2))
        .run(&[full_scene_region("lake")]);

    assert_eq!(summary.failed_ids(), vec!["S2A_GONE"]);
    assert!(summary.failed[0].reason.contains("S2A_GONE"));
    assert_eq!(summary.processed_ids(), vec!["S2A_GOOD"]);
    assert_eq!(summary.total_tiles(), 4);

    // The failed scene's directory is released for a later retry
    assert!(!fx.scene_dir("lake", "S2A_GONE").exists());
}

/// Missing bands fail the scene by name, not by position.
#[test]
fn test_missing_band_fails_scene() {
    let fx = Fixture::new();
    write_scene_bands(&fx.archive, "S2A_A", unchanged);
    fs::remove_file(
        fx.archive
            .join("S2A_A/GRANULE/IMG_DATA/R10m/T42WXS_20230701T065629_B03_10m.tif"),
    )
    .unwrap();
    let archive = build_archive(&fx.archive, vec![record("S2A_A", 1, 2.0)]);

    let summary = fx
        .pipeline(Arc::new(archive), fx.config())
        .run(&[full_scene_region("lake")]);

    assert_eq!(summary.failed_ids(), vec!["S2A_A"]);
    assert!(summary.failed[0].reason.contains("B03"));
}

/// Greyscale without a buffer tiles the unmasked single-band composite.
#[test]
fn test_greyscale_without_buffer() {
    let fx = Fixture::new();
    write_scene_bands(&fx.archive, "S2A_A", unchanged);
    let archive = build_archive(&fx.archive, vec![record("S2A_A", 1, 2.0)]);

    let config = fx
        .config()
        .with_output_mode(OutputMode::Greyscale)
        .with_buffer_radius(None);
    let summary = fx
        .pipeline(Arc::new(archive), config)
        .run(&[full_scene_region("lake")]);

    assert_eq!(summary.total_tiles(), 4);
    let scene_dir = fx.scene_dir("lake", "S2A_A");
    assert!(!scene_dir.join("greyscale_masked.tif").exists());

    let composite = read_geotiff(&scene_dir.join("greyscale.tif")).unwrap();
    assert_eq!(composite.shape(), (1, SIZE, SIZE));
    // (300 + 600 + 900) / 3
    assert!(composite.data().iter().all(|&v| v == 600.0));
}

/// Regions with no matching scenes and failing queries are both reported.
#[test]
fn test_region_level_outcomes() {
    let fx = Fixture::new();
    let archive = build_archive(&fx.archive, vec![record("S2A_CLOUDY", 1, 80.0)]);

    let summary = fx
        .pipeline(Arc::new(archive), fx.config())
        .run(&[full_scene_region("lake")]);
    assert_eq!(summary.regions_without_imagery, vec!["lake".to_string()]);
    assert!(summary.processed.is_empty());

    let summary = fx
        .pipeline(Arc::new(UnreachableService), fx.config())
        .run(&[full_scene_region("lake"), full_scene_region("delta")]);
    assert_eq!(summary.failed_regions.len(), 2);
    assert!(summary.failed_regions[0].reason.contains("connection refused"));
}

/// Region selection restricts which regions are queried.
#[test]
fn test_region_selection() {
    let fx = Fixture::new();
    let archive = build_archive(&fx.archive, vec![record("S2A_CLOUDY", 1, 80.0)]);
    let regions = [
        full_scene_region("a"),
        full_scene_region("b"),
        full_scene_region("c"),
    ];

    let summary = fx
        .pipeline(
            Arc::new(archive),
            fx.config().with_region_selection(RegionSelection::Single(1)),
        )
        .run(&regions);
    assert_eq!(summary.regions_without_imagery, vec!["b".to_string()]);
}

/// Parallel workers process every scene exactly once.
#[test]
fn test_parallel_workers() {
    let fx = Fixture::new();
    for id in ["S2A_1", "S2A_2", "S2A_3"] {
        write_scene_bands(&fx.archive, id, unchanged);
    }
    let archive = build_archive(
        &fx.archive,
        vec![
            record("S2A_1", 1, 2.0),
            record("S2A_2", 2, 2.0),
            record("S2A_3", 3, 2.0),
        ],
    );

    let summary = fx
        .pipeline(
            Arc::new(archive),
            fx.config().with_top_k(3).with_workers(3),
        )
        .run(&[full_scene_region("lake")]);

    // Newest first, whatever order the workers finished in
    assert_eq!(summary.processed_ids(), vec!["S2A_3", "S2A_2", "S2A_1"]);
    assert_eq!(summary.total_tiles(), 12);
}

/// Regions loaded from GeoJSON run through the same pipeline.
#[test]
fn test_regions_from_geojson() {
    let fx = Fixture::new();
    write_scene_bands(&fx.archive, "S2A_A", unchanged);
    let archive = build_archive(&fx.archive, vec![record("S2A_A", 1, 2.0)]);

    let geojson = fx.archive.join("regions.geojson");
    fs::write(
        &geojson,
        r#"{
            "type": "FeatureCollection",
            "crs": {"type": "name", "properties": {"name": "EPSG:32642"}},
            "features": [{
                "type": "Feature",
                "properties": {"name": "inner", "buffer_radius": 0},
                "geometry": {"type": "Polygon", "coordinates": [[
                    [500000, 7697440], [502560, 7697440], [502560, 7700000],
                    [500000, 7700000], [500000, 7697440]
                ]]}
            }]
        }"#,
    )
    .unwrap();

    let pipeline = fx.pipeline(
        Arc::new(archive),
        fx.config().with_buffer_radius(Some(50_000.0)),
    );
    let regions = pipeline.load_regions(&geojson).unwrap();
    let summary = pipeline.run(&regions);

    // The region's own radius of 0 wins over the configured 50 km
    assert_eq!(summary.total_tiles(), 1);
    let masked = read_geotiff(&fx.scene_dir("inner", "S2A_A").join("rgb_masked.tif")).unwrap();
    assert!((256..=257).contains(&masked.width()));
    assert!((256..=257).contains(&masked.height()));
    assert_eq!(
        tile_names(&fx.scene_dir("inner", "S2A_A").join("tiles")),
        names(&["tile_0-0.tif"])
    );
}

/// Two regions selecting the same scene each get their own output.
#[test]
fn test_regions_sharing_a_scene_are_processed_separately() {
    let fx = Fixture::new();
    write_scene_bands(&fx.archive, "S2A_A", unchanged);
    let archive: Arc<dyn SceneService> =
        Arc::new(build_archive(&fx.archive, vec![record("S2A_A", 1, 2.0)]));

    // Top-left and top-right 256x256 quarters of the scene
    let extent = 256.0 * PIXEL;
    let regions = [
        region("west", ORIGIN_X, ORIGIN_Y - extent, ORIGIN_X + extent, ORIGIN_Y),
        region(
            "east",
            ORIGIN_X + extent,
            ORIGIN_Y - extent,
            ORIGIN_X + 2.0 * extent,
            ORIGIN_Y,
        ),
    ];

    let summary = fx.pipeline(Arc::clone(&archive), fx.config()).run(&regions);

    assert!(summary.skipped.is_empty());
    let outcomes: Vec<_> = summary
        .processed
        .iter()
        .map(|s| (s.region.as_str(), s.scene_id.as_str(), s.tiles))
        .collect();
    assert_eq!(outcomes, vec![("west", "S2A_A", 1), ("east", "S2A_A", 1)]);
    assert_eq!(
        tile_names(&fx.scene_dir("west", "S2A_A").join("tiles")),
        names(&["tile_0-0.tif"])
    );
    assert_eq!(
        tile_names(&fx.scene_dir("east", "S2A_A").join("tiles")),
        names(&["tile_0-0.tif"])
    );

    // A re-run skips both, each reported under its own region
    let second = fx.pipeline(archive, fx.config()).run(&regions);
    let skipped: Vec<_> = second.skipped.iter().map(|s| s.region.as_str()).collect();
    assert_eq!(skipped, vec!["west", "east"]);
}
