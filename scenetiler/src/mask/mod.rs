//! Region masking.
//!
//! Crops a raster to the bounding window of a buffered region and blanks
//! every pixel whose centre lies outside the buffered shape.

use ndarray::s;
use rayon::prelude::*;
use thiserror::Error;
use tracing::debug;

use crate::raster::{GeoTransform, Raster, RasterError};
use crate::region::RegionGeometry;

/// Errors from [`RegionMasker::mask`].
#[derive(Debug, Error)]
pub enum MaskError {
    /// No raster pixel lies inside the buffered region.
    #[error("region '{region}' does not intersect the raster")]
    EmptyIntersection { region: String },

    #[error("invalid buffer radius {0}")]
    InvalidRadius(f64),

    #[error("region '{region}' has no geometry")]
    EmptyGeometry { region: String },

    /// Raster transform cannot be inverted.
    #[error("raster transform is not invertible")]
    DegenerateTransform,

    /// The region was not reprojected into the raster's CRS.
    #[error("region is in EPSG:{region} but the raster is in EPSG:{raster}")]
    CrsMismatch { region: u32, raster: u32 },

    #[error(transparent)]
    Raster(#[from] RasterError),
}

/// Pixel window `[col_start, col_end) x [row_start, row_end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct PixelWindow {
    col_start: usize,
    col_end: usize,
    row_start: usize,
    row_end: usize,
}

impl PixelWindow {
    fn width(&self) -> usize {
        self.col_end - self.col_start
    }

    fn height(&self) -> usize {
        self.row_end - self.row_start
    }
}

/// Crops rasters to buffered regions.
#[derive(Debug, Clone, Copy, Default)]
pub struct RegionMasker;

impl RegionMasker {
    pub fn new() -> Self {
        Self
    }

    /// Buffer `region` by `radius` and crop `raster` to it.
    ///
    /// The region must already be in the raster's CRS and `radius` is in
    /// that CRS's linear units. The result keeps the band count, dtype, CRS
    /// and nodata of the input. Pixels outside the buffered shape are set to
    /// nodata, or 0 when the raster has no nodata value.
    pub fn mask(
        &self,
        raster: &Raster,
        region: &RegionGeometry,
        radius: f64,
    ) -> Result<Raster, MaskError> {
        if !radius.is_finite() || radius < 0.0 {
            return Err(MaskError::InvalidRadius(radius));
        }
        if let Some(raster_epsg) = raster.meta().epsg {
            if raster_epsg != region.epsg {
                return Err(MaskError::CrsMismatch {
                    region: region.epsg,
                    raster: raster_epsg,
                });
            }
        }

        let envelope = region
            .buffered_bounds(radius)
            .ok_or_else(|| MaskError::EmptyGeometry {
                region: region.name.clone(),
            })?;
        let inverse = raster
            .meta()
            .transform
            .inverse()
            .ok_or(MaskError::DegenerateTransform)?;

        let window = pixel_window(&inverse, envelope, raster.width(), raster.height())
            .ok_or_else(|| MaskError::EmptyIntersection {
                region: region.name.clone(),
            })?;

        let transform = raster
            .meta()
            .transform
            .translated(window.col_start, window.row_start);
        let mut data = raster
            .window(
                window.col_start,
                window.row_start,
                window.width(),
                window.height(),
            )
            .to_owned();

        let keep = inside_mask(region, &transform, radius, window.width(), window.height());
        // The envelope can overlap the raster while the shape itself does not
        if !keep.iter().flatten().any(|&inside| inside) {
            return Err(MaskError::EmptyIntersection {
                region: region.name.clone(),
            });
        }
        let fill = raster.meta().nodata.unwrap_or(0.0) as f32;
        let mut blanked = 0usize;
        for (row, row_keep) in keep.iter().enumerate() {
            for (col, &inside) in row_keep.iter().enumerate() {
                if !inside {
                    data.slice_mut(s![.., row, col]).fill(fill);
                    blanked += 1;
                }
            }
        }

        let mut meta = raster.meta().clone();
        meta.width = window.width();
        meta.height = window.height();
        meta.transform = transform;

        debug!(
            region = %region.name,
            col_off = window.col_start,
            row_off = window.row_start,
            width = meta.width,
            height = meta.height,
            blanked,
            "Masked raster"
        );

        Ok(Raster::new(meta, data)?)
    }
}

/// Pixel window covering `envelope`, clamped to a `width x height` raster.
///
/// Returns `None` when nothing of the envelope falls on the raster.
fn pixel_window(
    inverse: &GeoTransform,
    envelope: geo::Rect<f64>,
    width: usize,
    height: usize,
) -> Option<PixelWindow> {
    let (min, max) = (envelope.min(), envelope.max());
    let corners = [
        inverse.apply(min.x, min.y),
        inverse.apply(max.x, min.y),
        inverse.apply(min.x, max.y),
        inverse.apply(max.x, max.y),
    ];

    let mut col_min = f64::INFINITY;
    let mut col_max = f64::NEG_INFINITY;
    let mut row_min = f64::INFINITY;
    let mut row_max = f64::NEG_INFINITY;
    for (col, row) in corners {
        col_min = col_min.min(col);
        col_max = col_max.max(col);
        row_min = row_min.min(row);
        row_max = row_max.max(row);
    }
    if !(col_min.is_finite() && col_max.is_finite() && row_min.is_finite() && row_max.is_finite())
    {
        return None;
    }

    let clamp = |value: f64, limit: usize| value.max(0.0).min(limit as f64) as usize;
    let window = PixelWindow {
        col_start: clamp(col_min.floor(), width),
        col_end: clamp(col_max.ceil(), width),
        row_start: clamp(row_min.floor(), height),
        row_end: clamp(row_max.ceil(), height),
    };

    (window.col_start < window.col_end && window.row_start < window.row_end).then_some(window)
}

/// Per-pixel "centre inside the buffered region" flags, computed row by row
/// in parallel.
fn inside_mask(
    region: &RegionGeometry,
    transform: &GeoTransform,
    radius: f64,
    width: usize,
    height: usize,
) -> Vec<Vec<bool>> {
    (0..height)
        .into_par_iter()
        .map(|row| {
            (0..width)
                .map(|col| {
                    let (x, y) = transform.pixel_center(col, row);
                    region.buffered_contains(x, y, radius)
                })
                .collect()
        })
        .collect()
}
