//! Tile validation and writing.

use std::fs;
use std::path::{Path, PathBuf};

use ndarray::ArrayView3;
use tracing::{debug, info};

use super::{TileSize, TileWindow, TileWindows};
use crate::raster::{write_geotiff, GeoTransform, Raster, RasterError, RasterResult, GEOTIFF_EXTENSION};

/// Why a tile was not written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    /// Edge window smaller than the tile size.
    PartialShape,
    /// At least one sample is zero, negative, NaN or the nodata value.
    InvalidPixels,
}

/// Result of processing one tile window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TileOutcome {
    Written(PathBuf),
    Rejected(RejectReason),
}

/// Totals for a whole raster.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TileReport {
    /// Paths of written tiles, in window order.
    pub written: Vec<PathBuf>,
    /// Windows rejected for a partial shape.
    pub partial: usize,
    /// Windows rejected for invalid pixels.
    pub invalid: usize,
}

impl TileReport {
    pub fn written_count(&self) -> usize {
        self.written.len()
    }

    pub fn rejected_count(&self) -> usize {
        self.partial + self.invalid
    }

    /// Number of windows processed.
    pub fn total(&self) -> usize {
        self.written_count() + self.rejected_count()
    }

    fn record(&mut self, outcome: TileOutcome) {
        match outcome {
            TileOutcome::Written(path) => self.written.push(path),
            TileOutcome::Rejected(RejectReason::PartialShape) => self.partial += 1,
            TileOutcome::Rejected(RejectReason::InvalidPixels) => self.invalid += 1,
        }
    }
}

/// A block is valid when every sample is strictly positive and differs
/// from `nodata`.
///
/// NaN compares false and therefore makes a block invalid. Masked pixels
/// carry the nodata value, so a positive nodata still rejects them.
pub fn is_valid_block(block: ArrayView3<'_, f32>, nodata: Option<f64>) -> bool {
    block
        .iter()
        .all(|&v| v > 0.0 && nodata.map_or(true, |nd| f64::from(v) != nd))
}

/// File name of the tile at `window`: `tile_{col_off}-{row_off}.tif`.
pub fn tile_file_name(window: &TileWindow) -> String {
    format!(
        "tile_{}-{}.{}",
        window.col_off, window.row_off, GEOTIFF_EXTENSION
    )
}

/// Writes valid tiles of a raster into one directory.
#[derive(Debug, Clone)]
pub struct TileWriter {
    tiles_dir: PathBuf,
    tile_size: TileSize,
}

impl TileWriter {
    pub fn new(tiles_dir: impl Into<PathBuf>, tile_size: TileSize) -> Self {
        Self {
            tiles_dir: tiles_dir.into(),
            tile_size,
        }
    }

    pub fn tiles_dir(&self) -> &Path {
        &self.tiles_dir
    }

    pub fn tile_size(&self) -> TileSize {
        self.tile_size
    }

    /// Validate one window and write it if it passes.
    ///
    /// The block is sliced out of `raster` once and the same view is used
    /// for both the check and the write. Rejection is not an error; only
    /// I/O failures are.
    pub fn process(
        &self,
        raster: &Raster,
        window: &TileWindow,
        transform: &GeoTransform,
    ) -> RasterResult<TileOutcome> {
        let block = raster.window(window.col_off, window.row_off, window.width, window.height);

        let expected = (
            raster.band_count(),
            self.tile_size.height(),
            self.tile_size.width(),
        );
        if block.dim() != expected {
            return Ok(TileOutcome::Rejected(RejectReason::PartialShape));
        }
        if !is_valid_block(block.view(), raster.meta().nodata) {
            return Ok(TileOutcome::Rejected(RejectReason::InvalidPixels));
        }

        let mut meta = raster.meta().clone();
        meta.width = self.tile_size.width();
        meta.height = self.tile_size.height();
        meta.transform = *transform;

        let path = self.tiles_dir.join(tile_file_name(window));
        write_geotiff(&path, &meta, block)?;
        Ok(TileOutcome::Written(path))
    }

    /// Process every window of `windows`.
    ///
    /// Creates the tiles directory if needed. Running twice over the same
    /// raster writes the same set of files.
    pub fn write_all(&self, raster: &Raster, windows: TileWindows) -> RasterResult<TileReport> {
        fs::create_dir_all(&self.tiles_dir).map_err(|source| RasterError::Io {
            path: self.tiles_dir.clone(),
            source,
        })?;

        let total = windows.len();
        let mut report = TileReport::default();
        for (window, transform) in windows {
            let outcome = self.process(raster, &window, &transform)?;
            if let TileOutcome::Rejected(reason) = &outcome {
                debug!(
                    col_off = window.col_off,
                    row_off = window.row_off,
                    reason = ?reason,
                    "Tile rejected"
                );
            }
            report.record(outcome);
        }

        info!(
            dir = %self.tiles_dir.display(),
            windows = total,
            tiles = report.written_count(),
            partial = report.partial,
            invalid = report.invalid,
            "Tiling complete"
        );
        Ok(report)
    }
}
