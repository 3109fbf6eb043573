//! The scene query/download seam.
//!
//! The pipeline never talks to a catalogue directly. Callers construct a
//! [`SceneService`] (with whatever credentials or HTTP client it needs),
//! wrap it in an `Arc`, and hand it to the pipeline.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use thiserror::Error;

use super::SceneRecord;
use crate::region::RegionGeometry;

/// Default band filter: Sentinel-2 B02/B03/B04 at 10 m.
pub const DEFAULT_BAND_PATTERN: &str = "*_B0[234]_10m.*";

/// Errors reported by a scene service.
///
/// All of these are recoverable from the pipeline's point of view: a query
/// error aborts one region, a download error skips one scene.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// The catalogue could not be queried or returned garbage.
    #[error("scene query failed: {0}")]
    Query(String),

    /// Band files could not be fetched.
    #[error("download of scene {scene_id} failed: {reason}")]
    Download { scene_id: String, reason: String },

    /// The band filter pattern is not a valid glob.
    #[error("invalid band filter '{pattern}': {reason}")]
    InvalidFilter { pattern: String, reason: String },
}

/// Query constraints passed to [`SceneService::query`].
#[derive(Debug, Clone, PartialEq)]
pub struct QueryFilter {
    /// Platform name, e.g. "Sentinel-2".
    pub platform: String,

    /// Processing level, e.g. "Level-2A".
    pub processing_level: String,

    /// Inclusive cloud-cover range in percent.
    pub cloud_cover: (f64, f64),

    /// Maximum number of records to return.
    pub limit: usize,

    /// Optional inclusive ingestion-date range.
    pub date_range: Option<(DateTime<Utc>, DateTime<Utc>)>,
}

impl Default for QueryFilter {
    fn default() -> Self {
        Self {
            platform: "Sentinel-2".to_string(),
            processing_level: "Level-2A".to_string(),
            cloud_cover: (0.0, 10.0),
            limit: 10,
            date_range: None,
        }
    }
}

impl QueryFilter {
    pub fn with_max_cloud_cover(mut self, max: f64) -> Self {
        self.cloud_cover.1 = max;
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    pub fn with_date_range(mut self, start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        self.date_range = Some((start, end));
        self
    }

    /// Returns true if the record satisfies the cloud-cover and date bounds.
    pub fn accepts(&self, record: &SceneRecord) -> bool {
        let (min_cloud, max_cloud) = self.cloud_cover;
        if record.cloud_cover < min_cloud || record.cloud_cover > max_cloud {
            return false;
        }
        match self.date_range {
            Some((start, end)) => record.ingestion_date >= start && record.ingestion_date <= end,
            None => true,
        }
    }
}

/// Glob filter selecting which files of a product to download.
#[derive(Debug, Clone, PartialEq)]
pub struct BandFilter {
    pattern: glob::Pattern,
}

impl BandFilter {
    /// Compile a glob pattern such as `*_B0[234]_10m.jp2`.
    pub fn new(pattern: &str) -> Result<Self, ServiceError> {
        glob::Pattern::new(pattern)
            .map(|pattern| Self { pattern })
            .map_err(|e| ServiceError::InvalidFilter {
                pattern: pattern.to_string(),
                reason: e.to_string(),
            })
    }

    /// Returns true if a file name matches the filter.
    pub fn matches(&self, file_name: &str) -> bool {
        self.pattern.matches(file_name)
    }

    pub fn as_str(&self) -> &str {
        self.pattern.as_str()
    }
}

/// Scene catalogue used by the pipeline.
///
/// Implementations must be thread-safe: when the pipeline runs with several
/// workers, downloads for different scenes happen concurrently.
pub trait SceneService: Send + Sync {
    /// Find scenes covering the region that satisfy the filter.
    fn query(
        &self,
        region: &RegionGeometry,
        filter: &QueryFilter,
    ) -> Result<Vec<SceneRecord>, ServiceError>;

    /// Fetch the band files of a scene into `dest_dir`.
    ///
    /// Returns the paths of every file written. The order carries no
    /// meaning; callers resolve bands by file name.
    fn download(
        &self,
        scene: &SceneRecord,
        bands: &BandFilter,
        dest_dir: &Path,
    ) -> Result<Vec<PathBuf>, ServiceError>;
}
