//! Pluggable region loading.

use std::fs;
use std::path::Path;

use tracing::debug;

use super::{parse_geojson, reproject_region, RegionError, RegionGeometry, RegionResult};

/// Loads regions of interest and reprojects them into raster CRSs.
pub trait GeometrySource: Send + Sync {
    /// Load every region from a vector file, in file order.
    fn load(&self, path: &Path) -> RegionResult<Vec<RegionGeometry>>;

    /// Reproject a region into `target_epsg`.
    fn reproject(&self, region: &RegionGeometry, target_epsg: u32) -> RegionResult<RegionGeometry>;
}

/// GeoJSON-backed geometry source.
#[derive(Debug, Clone, Copy, Default)]
pub struct GeoJsonSource;

impl GeoJsonSource {
    pub fn new() -> Self {
        Self
    }
}

impl GeometrySource for GeoJsonSource {
    fn load(&self, path: &Path) -> RegionResult<Vec<RegionGeometry>> {
        let text = fs::read_to_string(path).map_err(|source| RegionError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let source_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        let regions = parse_geojson(&text, &source_name)?;
        debug!(path = %path.display(), count = regions.len(), "Loaded regions");
        Ok(regions)
    }

    fn reproject(&self, region: &RegionGeometry, target_epsg: u32) -> RegionResult<RegionGeometry> {
        reproject_region(region, target_epsg)
    }
}
