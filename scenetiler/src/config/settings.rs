//! Pipeline configuration.
//!
//! [`PipelineConfig`] groups every parameter of a run. Defaults describe a
//! Sentinel-2 RGB run with a 40 km buffer and 256x256 tiles; the `with_*`
//! methods override single values.

use std::env;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use crate::composite::{OutputMode, DEFAULT_FALLBACK_EPSG};
use crate::output::KeyStyle;
use crate::scene::{BandTriplet, QueryFilter, DEFAULT_BAND_PATTERN};
use crate::tile::TileSize;

/// Default buffer radius around each region, in CRS linear units (metres for
/// UTM scenes).
pub const DEFAULT_BUFFER_RADIUS: f64 = 40_000.0;

/// Default output root, relative to the working directory.
pub const DEFAULT_OUTPUT_DIR: &str = "output";

/// Name of the download staging directory under the system temp dir.
pub const DEFAULT_STAGING_DIR_NAME: &str = "scenetiler-staging";

/// Which of the loaded regions a run processes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RegionSelection {
    /// One region, by zero-based index.
    Single(usize),
    /// Every region.
    #[default]
    All,
    /// Regions `start..end`, end exclusive.
    Range(usize, usize),
}

impl RegionSelection {
    /// The selected slice of `regions`. Out-of-range bounds are clamped, so
    /// the result may be empty.
    pub fn select<'a, T>(&self, regions: &'a [T]) -> &'a [T] {
        let len = regions.len();
        let (start, end) = match *self {
            RegionSelection::Single(index) => (index, index.saturating_add(1)),
            RegionSelection::All => (0, len),
            RegionSelection::Range(start, end) => (start, end),
        };
        let end = end.min(len);
        let start = start.min(end);
        &regions[start..end]
    }
}

impl fmt::Display for RegionSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegionSelection::Single(index) => write!(f, "{}", index),
            RegionSelection::All => f.write_str("all"),
            RegionSelection::Range(start, end) => write!(f, "{}..{}", start, end),
        }
    }
}

impl FromStr for RegionSelection {
    type Err = String;

    /// Accepts `all`, an index (`3`) or a half-open range (`2..5`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("all") {
            return Ok(RegionSelection::All);
        }

        let parse = |part: &str| {
            part.trim()
                .parse::<usize>()
                .map_err(|_| format!("invalid region index '{}'", part.trim()))
        };

        match s.split_once("..") {
            Some((start, end)) => {
                let (start, end) = (parse(start)?, parse(end)?);
                if start > end {
                    return Err(format!("region range {}..{} is reversed", start, end));
                }
                Ok(RegionSelection::Range(start, end))
            }
            None => parse(s).map(RegionSelection::Single),
        }
    }
}

/// Parameters of one pipeline run.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    /// Root under which scene directories are created.
    pub output_root: PathBuf,

    /// Where band files are downloaded before compositing.
    pub staging_dir: PathBuf,

    /// Keep downloaded band files after a scene is done.
    pub keep_downloads: bool,

    pub output_mode: OutputMode,

    pub region_selection: RegionSelection,

    /// Default buffer radius; `None` disables masking and tiles the whole
    /// composite. A region's own radius takes precedence.
    pub buffer_radius: Option<f64>,

    pub tile_size: TileSize,

    /// Number of scenes kept per region.
    pub top_k: usize,

    pub query: QueryFilter,

    pub key_style: KeyStyle,

    /// Scene jobs processed concurrently; 1 means sequential.
    pub workers: usize,

    /// CRS assumed for bands without one.
    pub fallback_epsg: u32,

    /// Composite file name; `None` uses the output mode's default.
    pub composite_filename: Option<String>,

    /// Masked composite file name; `None` uses the output mode's default.
    pub masked_filename: Option<String>,

    /// Band labels resolved from downloaded file names.
    pub bands: BandTriplet,

    /// Glob selecting which product files are downloaded.
    pub band_filter: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            output_root: PathBuf::from(DEFAULT_OUTPUT_DIR),
            staging_dir: default_staging_dir(),
            keep_downloads: false,
            output_mode: OutputMode::default(),
            region_selection: RegionSelection::default(),
            buffer_radius: Some(DEFAULT_BUFFER_RADIUS),
            tile_size: TileSize::default(),
            top_k: 1,
            query: QueryFilter::default(),
            key_style: KeyStyle::default(),
            workers: 1,
            fallback_epsg: DEFAULT_FALLBACK_EPSG,
            composite_filename: None,
            masked_filename: None,
            bands: BandTriplet::default(),
            band_filter: DEFAULT_BAND_PATTERN.to_string(),
        }
    }
}

impl PipelineConfig {
    pub fn new(output_root: impl Into<PathBuf>) -> Self {
        Self {
            output_root: output_root.into(),
            ..Self::default()
        }
    }

    pub fn with_staging_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.staging_dir = dir.into();
        self
    }

    pub fn with_keep_downloads(mut self, keep: bool) -> Self {
        self.keep_downloads = keep;
        self
    }

    pub fn with_output_mode(mut self, mode: OutputMode) -> Self {
        self.output_mode = mode;
        self
    }

    pub fn with_region_selection(mut self, selection: RegionSelection) -> Self {
        self.region_selection = selection;
        self
    }

    pub fn with_buffer_radius(mut self, radius: Option<f64>) -> Self {
        self.buffer_radius = radius;
        self
    }

    pub fn with_tile_size(mut self, size: TileSize) -> Self {
        self.tile_size = size;
        self
    }

    /// Clamped to at least 1.
    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k.max(1);
        self
    }

    pub fn with_query(mut self, query: QueryFilter) -> Self {
        self.query = query;
        self
    }

    pub fn with_key_style(mut self, style: KeyStyle) -> Self {
        self.key_style = style;
        self
    }

    /// Clamped to at least 1.
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    pub fn with_fallback_epsg(mut self, epsg: u32) -> Self {
        self.fallback_epsg = epsg;
        self
    }

    pub fn with_composite_filename(mut self, name: impl Into<String>) -> Self {
        self.composite_filename = Some(name.into());
        self
    }

    pub fn with_masked_filename(mut self, name: impl Into<String>) -> Self {
        self.masked_filename = Some(name.into());
        self
    }

    pub fn with_bands(mut self, bands: BandTriplet) -> Self {
        self.bands = bands;
        self
    }

    pub fn with_band_filter(mut self, pattern: impl Into<String>) -> Self {
        self.band_filter = pattern.into();
        self
    }

    /// Composite file name in effect.
    pub fn composite_filename(&self) -> String {
        self.composite_filename
            .clone()
            .unwrap_or_else(|| self.output_mode.composite_filename())
    }

    /// Masked composite file name in effect.
    pub fn masked_filename(&self) -> String {
        self.masked_filename
            .clone()
            .unwrap_or_else(|| self.output_mode.masked_filename())
    }
}

/// Default download staging directory in the system temp dir.
pub fn default_staging_dir() -> PathBuf {
    env::temp_dir().join(DEFAULT_STAGING_DIR_NAME)
}
