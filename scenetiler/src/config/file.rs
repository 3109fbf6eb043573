//! Configuration file handling for `~/.scenetiler/config.ini`.
//!
//! Parsing lives in [`super::parser`] and serialization in
//! [`super::writer`].

use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use ini::Ini;
use thiserror::Error;

use super::settings::{
    default_staging_dir, PipelineConfig, RegionSelection, DEFAULT_BUFFER_RADIUS,
    DEFAULT_OUTPUT_DIR,
};
use crate::composite::{OutputMode, DEFAULT_FALLBACK_EPSG};
use crate::output::KeyStyle;
use crate::scene::{BandTriplet, QueryFilter, DEFAULT_BAND_PATTERN};
use crate::tile::TileSize;

/// Default log file name inside the config directory.
pub const DEFAULT_LOG_FILE: &str = "scenetiler.log";

/// Configuration file errors.
#[derive(Debug, Error)]
pub enum ConfigFileError {
    /// Failed to read config file
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] ini::Error),

    /// Failed to write config file
    #[error("Failed to write config file: {0}")]
    WriteError(String),

    /// Invalid configuration value
    #[error("Invalid configuration: {section}.{key} = '{value}' - {reason}")]
    InvalidValue {
        section: String,
        key: String,
        value: String,
        reason: String,
    },

    /// Failed to create config directory
    #[error("Failed to create config directory: {0}")]
    DirectoryError(std::io::Error),
}

/// `[output]` section.
#[derive(Debug, Clone, PartialEq)]
pub struct OutputSettings {
    pub root: PathBuf,
    /// Download staging directory; empty means the system temp dir.
    pub staging: Option<PathBuf>,
    pub key_style: KeyStyle,
}

/// `[imagery]` section.
#[derive(Debug, Clone, PartialEq)]
pub struct ImagerySettings {
    pub mode: OutputMode,
    pub bands: BandTriplet,
    pub band_filter: String,
    pub fallback_epsg: u32,
}

/// `[tiling]` section.
#[derive(Debug, Clone, PartialEq)]
pub struct TilingSettings {
    pub size: TileSize,
    /// `None` disables masking.
    pub buffer_radius: Option<f64>,
}

/// `[query]` section.
#[derive(Debug, Clone, PartialEq)]
pub struct QuerySettings {
    pub platform: String,
    pub processing_level: String,
    pub max_cloud_cover: f64,
    pub limit: usize,
    pub top_k: usize,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

/// `[pipeline]` section.
#[derive(Debug, Clone, PartialEq)]
pub struct RunSettings {
    pub regions: RegionSelection,
    pub workers: usize,
    pub keep_downloads: bool,
}

/// `[logging]` section.
#[derive(Debug, Clone, PartialEq)]
pub struct LoggingSettings {
    pub file: PathBuf,
}

/// Complete configuration loaded from config.ini.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigFile {
    pub output: OutputSettings,
    pub imagery: ImagerySettings,
    pub tiling: TilingSettings,
    pub query: QuerySettings,
    pub pipeline: RunSettings,
    pub logging: LoggingSettings,
}

impl Default for ConfigFile {
    fn default() -> Self {
        let query = QueryFilter::default();
        Self {
            output: OutputSettings {
                root: PathBuf::from(DEFAULT_OUTPUT_DIR),
                staging: None,
                key_style: KeyStyle::default(),
            },
            imagery: ImagerySettings {
                mode: OutputMode::default(),
                bands: BandTriplet::default(),
                band_filter: DEFAULT_BAND_PATTERN.to_string(),
                fallback_epsg: DEFAULT_FALLBACK_EPSG,
            },
            tiling: TilingSettings {
                size: TileSize::default(),
                buffer_radius: Some(DEFAULT_BUFFER_RADIUS),
            },
            query: QuerySettings {
                platform: query.platform,
                processing_level: query.processing_level,
                max_cloud_cover: query.cloud_cover.1,
                limit: query.limit,
                top_k: 1,
                start_date: None,
                end_date: None,
            },
            pipeline: RunSettings {
                regions: RegionSelection::default(),
                workers: 1,
                keep_downloads: false,
            },
            logging: LoggingSettings {
                file: config_directory().join(DEFAULT_LOG_FILE),
            },
        }
    }
}

impl ConfigFile {
    /// Load configuration from the default path (~/.scenetiler/config.ini).
    pub fn load() -> Result<Self, ConfigFileError> {
        let path = config_file_path();
        Self::load_from(&path)
    }

    /// Load configuration from a specific path.
    ///
    /// If the file doesn't exist, returns defaults.
    pub fn load_from(path: &Path) -> Result<Self, ConfigFileError> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let ini = Ini::load_from_file(path)?;
        super::parser::parse_ini(&ini)
    }

    /// Save configuration to the default path (~/.scenetiler/config.ini).
    pub fn save(&self) -> Result<(), ConfigFileError> {
        let path = config_file_path();
        self.save_to(&path)
    }

    /// Save configuration to a specific path.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigFileError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(ConfigFileError::DirectoryError)?;
        }

        let content = super::writer::to_config_string(self);
        std::fs::write(path, content).map_err(|e| ConfigFileError::WriteError(e.to_string()))
    }

    /// Render the configuration as it would be saved.
    pub fn to_ini_string(&self) -> String {
        super::writer::to_config_string(self)
    }

    /// Build the pipeline configuration described by this file.
    pub fn pipeline_config(&self) -> PipelineConfig {
        let mut query = QueryFilter {
            platform: self.query.platform.clone(),
            processing_level: self.query.processing_level.clone(),
            limit: self.query.limit,
            ..QueryFilter::default()
        }
        .with_max_cloud_cover(self.query.max_cloud_cover);
        if let Some(range) = self.date_range() {
            query.date_range = Some(range);
        }

        PipelineConfig::new(self.output.root.clone())
            .with_staging_dir(
                self.output
                    .staging
                    .clone()
                    .unwrap_or_else(default_staging_dir),
            )
            .with_keep_downloads(self.pipeline.keep_downloads)
            .with_key_style(self.output.key_style)
            .with_output_mode(self.imagery.mode)
            .with_bands(self.imagery.bands.clone())
            .with_band_filter(self.imagery.band_filter.clone())
            .with_fallback_epsg(self.imagery.fallback_epsg)
            .with_tile_size(self.tiling.size)
            .with_buffer_radius(self.tiling.buffer_radius)
            .with_query(query)
            .with_top_k(self.query.top_k)
            .with_region_selection(self.pipeline.regions)
            .with_workers(self.pipeline.workers)
    }

    /// Inclusive ingestion-date range; open ends extend to the limits of
    /// `DateTime<Utc>`.
    fn date_range(&self) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
        if self.query.start_date.is_none() && self.query.end_date.is_none() {
            return None;
        }
        let start = self
            .query
            .start_date
            .map(|d| d.and_time(NaiveTime::MIN).and_utc())
            .unwrap_or(DateTime::<Utc>::MIN_UTC);
        let end = self
            .query
            .end_date
            .and_then(|d| d.and_hms_opt(23, 59, 59))
            .map(|dt| dt.and_utc())
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        Some((start, end))
    }
}

/// Get the path to the config directory (~/.scenetiler).
pub fn config_directory() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".scenetiler")
}

/// Get the path to the config file (~/.scenetiler/config.ini).
pub fn config_file_path() -> PathBuf {
    config_directory().join("config.ini")
}
