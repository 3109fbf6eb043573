//! Directory-backed scene catalogue.
//!
//! A local archive mirrors what a remote catalogue would serve:
//!
//! ```text
//! archive/
//! ├── scenes.json            # array of ArchiveEntry
//! ├── 6f1c.../               # one directory per scene id
//! │   └── GRANULE/.../IMG_DATA/R10m/T42WXS_..._B02_10m.tif
//! └── ...
//! ```
//!
//! Queries filter the index by platform, processing level, cloud cover,
//! date range and (for WGS 84 regions) bounding-box overlap. Downloads copy
//! the files matching the band filter into the destination directory.

use std::fs;
use std::path::{Path, PathBuf};

use geo::BoundingRect;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::{BandFilter, QueryFilter, SceneRecord, SceneService, ServiceError};
use crate::region::RegionGeometry;

/// Name of the index file at the archive root.
pub const ARCHIVE_INDEX_FILE: &str = "scenes.json";

const WGS84: u32 = 4326;

/// One scene in the archive index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArchiveEntry {
    #[serde(flatten)]
    pub record: SceneRecord,

    #[serde(default)]
    pub platform: Option<String>,

    #[serde(default)]
    pub processing_level: Option<String>,

    /// Footprint envelope as `[min_lon, min_lat, max_lon, max_lat]`.
    #[serde(default)]
    pub bbox: Option<[f64; 4]>,
}

impl ArchiveEntry {
    pub fn new(record: SceneRecord) -> Self {
        Self {
            record,
            platform: None,
            processing_level: None,
            bbox: None,
        }
    }

    pub fn with_bbox(mut self, bbox: [f64; 4]) -> Self {
        self.bbox = Some(bbox);
        self
    }

    fn matches(&self, region: &RegionGeometry, filter: &QueryFilter) -> bool {
        if let Some(platform) = &self.platform {
            if !platform.eq_ignore_ascii_case(&filter.platform) {
                return false;
            }
        }
        if let Some(level) = &self.processing_level {
            if !level.eq_ignore_ascii_case(&filter.processing_level) {
                return false;
            }
        }
        if !filter.accepts(&self.record) {
            return false;
        }
        match (self.bbox, region.epsg) {
            (Some([min_x, min_y, max_x, max_y]), WGS84) => {
                match region.geometry.bounding_rect() {
                    Some(rect) => {
                        rect.min().x <= max_x
                            && rect.max().x >= min_x
                            && rect.min().y <= max_y
                            && rect.max().y >= min_y
                    }
                    None => false,
                }
            }
            _ => true,
        }
    }
}

/// A [`SceneService`] reading from a local directory.
#[derive(Debug, Clone)]
pub struct LocalArchive {
    root: PathBuf,
    entries: Vec<ArchiveEntry>,
}

impl LocalArchive {
    /// Open an archive, reading its `scenes.json` index.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, ServiceError> {
        let root = root.into();
        let index = root.join(ARCHIVE_INDEX_FILE);
        let text = fs::read_to_string(&index)
            .map_err(|e| ServiceError::Query(format!("cannot read {}: {}", index.display(), e)))?;
        let entries: Vec<ArchiveEntry> = serde_json::from_str(&text)
            .map_err(|e| ServiceError::Query(format!("malformed {}: {}", index.display(), e)))?;

        debug!(root = %root.display(), scenes = entries.len(), "Opened local archive");
        Ok(Self { root, entries })
    }

    /// Create an archive from in-memory entries.
    pub fn with_entries(root: impl Into<PathBuf>, entries: Vec<ArchiveEntry>) -> Self {
        Self {
            root: root.into(),
            entries,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn entries(&self) -> &[ArchiveEntry] {
        &self.entries
    }

    /// Write the index back to `scenes.json`.
    pub fn save_index(&self) -> Result<(), ServiceError> {
        let index = self.root.join(ARCHIVE_INDEX_FILE);
        let text = serde_json::to_string_pretty(&self.entries)
            .map_err(|e| ServiceError::Query(e.to_string()))?;
        fs::write(&index, text)
            .map_err(|e| ServiceError::Query(format!("cannot write {}: {}", index.display(), e)))
    }

    /// Directory holding the files of one scene.
    pub fn scene_dir(&self, scene_id: &str) -> PathBuf {
        self.root.join(scene_id)
    }
}

impl SceneService for LocalArchive {
    fn query(
        &self,
        region: &RegionGeometry,
        filter: &QueryFilter,
    ) -> Result<Vec<SceneRecord>, ServiceError> {
        let records: Vec<SceneRecord> = self
            .entries
            .iter()
            .filter(|entry| entry.matches(region, filter))
            .take(filter.limit)
            .map(|entry| entry.record.clone())
            .collect();

        debug!(
            region = %region.name,
            matches = records.len(),
            "Queried local archive"
        );
        Ok(records)
    }

    fn download(
        &self,
        scene: &SceneRecord,
        bands: &BandFilter,
        dest_dir: &Path,
    ) -> Result<Vec<PathBuf>, ServiceError> {
        let download_error = |reason: String| ServiceError::Download {
            scene_id: scene.id.clone(),
            reason,
        };

        let source_dir = self.scene_dir(&scene.id);
        if !source_dir.is_dir() {
            return Err(download_error(format!(
                "scene directory {} not found",
                source_dir.display()
            )));
        }

        let pattern = format!(
            "{}/**/*",
            glob::Pattern::escape(&source_dir.to_string_lossy())
        );
        let walker = glob::glob(&pattern).map_err(|e| download_error(e.to_string()))?;

        fs::create_dir_all(dest_dir).map_err(|e| {
            download_error(format!("cannot create {}: {}", dest_dir.display(), e))
        })?;

        let mut written = Vec::new();
        for entry in walker {
            let path = match entry {
                Ok(path) => path,
                Err(e) => {
                    warn!(scene_id = %scene.id, error = %e, "Unreadable archive entry");
                    continue;
                }
            };
            if !path.is_file() {
                continue;
            }
            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            if !bands.matches(name) {
                continue;
            }

            let target = dest_dir.join(name);
            fs::copy(&path, &target).map_err(|e| {
                download_error(format!("cannot copy {}: {}", path.display(), e))
            })?;
            written.push(target);
        }

        if written.is_empty() {
            return Err(download_error(format!(
                "no files match band filter '{}'",
                bands.as_str()
            )));
        }

        written.sort();
        debug!(scene_id = %scene.id, files = written.len(), "Fetched band files");
        Ok(written)
    }
}
