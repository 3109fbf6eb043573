//! Error type for scene processing.

use std::path::PathBuf;

use thiserror::Error;

use crate::mask::MaskError;
use crate::output::OutputError;
use crate::raster::RasterError;
use crate::region::RegionError;
use crate::scene::{BandError, ServiceError};

/// Result type for pipeline operations.
pub type PipelineResult<T> = Result<T, PipelineError>;

/// Anything that makes a scene (or a region's query) fail.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Service(#[from] ServiceError),

    /// No downloaded file carries the band label.
    #[error("no downloaded file for band {label}")]
    MissingBand { label: String },

    /// Several downloaded files carry the band label.
    #[error("band {label} is ambiguous: {} candidate files", .candidates.len())]
    AmbiguousBand {
        label: String,
        candidates: Vec<PathBuf>,
    },

    #[error("invalid band label '{label}': {reason}")]
    InvalidBandLabel { label: String, reason: String },

    #[error(transparent)]
    Raster(#[from] RasterError),

    #[error(transparent)]
    Region(#[from] RegionError),

    #[error(transparent)]
    Mask(#[from] MaskError),

    #[error(transparent)]
    Output(#[from] OutputError),
}

impl From<BandError> for PipelineError {
    fn from(err: BandError) -> Self {
        match err {
            BandError::Missing { label } => PipelineError::MissingBand { label },
            BandError::Ambiguous { label, candidates } => {
                PipelineError::AmbiguousBand { label, candidates }
            }
            BandError::InvalidLabel { label, reason } => {
                PipelineError::InvalidBandLabel { label, reason }
            }
        }
    }
}
