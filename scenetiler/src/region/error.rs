//! Error types for region loading and reprojection.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Result type for region operations.
pub type RegionResult<T> = Result<T, RegionError>;

/// Errors that can occur while loading or reprojecting regions.
#[derive(Debug, Error)]
pub enum RegionError {
    /// Failed to read a vector file.
    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The vector file is not valid GeoJSON.
    #[error("failed to parse {source_name}: {reason}")]
    Parse { source_name: String, reason: String },

    /// Geometry type other than Polygon / MultiPolygon.
    #[error("unsupported geometry type: {0}")]
    UnsupportedGeometry(String),

    /// EPSG code not present in the projection database.
    #[error("unknown CRS EPSG:{0}")]
    UnknownCrs(u32),

    /// Coordinate transformation failed.
    #[error("reprojection from EPSG:{from} to EPSG:{to} failed: {reason}")]
    Projection { from: u32, to: u32, reason: String },
}
