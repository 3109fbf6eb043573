//! Error types for raster operations.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Result type for raster operations.
pub type RasterResult<T> = Result<T, RasterError>;

/// Errors that can occur while building, reading or writing rasters.
#[derive(Debug, Error)]
pub enum RasterError {
    /// Failed to open or create a raster file.
    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The TIFF encoder or decoder rejected the file.
    #[error("TIFF error on {}: {message}", .path.display())]
    Tiff { path: PathBuf, message: String },

    /// The file carries no usable georeferencing tags.
    #[error("{} has no georeferencing (ModelPixelScale/ModelTiepoint or ModelTransformation)", .0.display())]
    MissingGeoreference(PathBuf),

    /// Pixel type not supported by the engine.
    #[error("unsupported data type: {0}")]
    UnsupportedDataType(String),

    /// Input rasters disagree in dimensions or band count.
    #[error("shape mismatch for {label}: expected {expected:?}, got {actual:?}")]
    ShapeMismatch {
        label: String,
        expected: (usize, usize, usize),
        actual: (usize, usize, usize),
    },

    /// Raster data is structurally invalid.
    #[error("invalid raster data: {0}")]
    InvalidData(String),
}
