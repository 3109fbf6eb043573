//! In-memory raster model.

use ndarray::{s, Array2, Array3, ArrayView2, ArrayView3, Axis};

use super::{DataType, GeoTransform, RasterError, RasterResult};

/// Georeferencing and layout metadata shared by every band of a raster.
#[derive(Debug, Clone, PartialEq)]
pub struct RasterMeta {
    /// Number of columns.
    pub width: usize,

    /// Number of rows.
    pub height: usize,

    /// On-disk sample type.
    pub dtype: DataType,

    /// Pixel-to-world transform.
    pub transform: GeoTransform,

    /// EPSG code of the coordinate reference system, if known.
    pub epsg: Option<u32>,

    /// Value marking missing pixels, if any.
    pub nodata: Option<f64>,
}

impl RasterMeta {
    /// Create metadata with no CRS and no nodata value.
    pub fn new(width: usize, height: usize, dtype: DataType, transform: GeoTransform) -> Self {
        Self {
            width,
            height,
            dtype,
            transform,
            epsg: None,
            nodata: None,
        }
    }

    /// Set the EPSG code.
    pub fn with_epsg(mut self, epsg: u32) -> Self {
        self.epsg = Some(epsg);
        self
    }

    /// Set the nodata value.
    pub fn with_nodata(mut self, nodata: f64) -> Self {
        self.nodata = Some(nodata);
        self
    }
}

/// A multi-band raster held in memory as `(bands, rows, cols)`.
#[derive(Debug, Clone)]
pub struct Raster {
    meta: RasterMeta,
    data: Array3<f32>,
}

impl Raster {
    /// Build a raster, checking that the data matches the metadata shape.
    pub fn new(meta: RasterMeta, data: Array3<f32>) -> RasterResult<Self> {
        let (bands, rows, cols) = data.dim();
        if bands == 0 {
            return Err(RasterError::InvalidData(
                "raster must have at least one band".to_string(),
            ));
        }
        if rows != meta.height || cols != meta.width {
            return Err(RasterError::ShapeMismatch {
                label: "raster data".to_string(),
                expected: (bands, meta.height, meta.width),
                actual: (bands, rows, cols),
            });
        }
        Ok(Self { meta, data })
    }

    /// Build a single-band raster from a `(rows, cols)` grid.
    pub fn from_band(meta: RasterMeta, band: Array2<f32>) -> RasterResult<Self> {
        Self::new(meta, band.insert_axis(Axis(0)))
    }

    /// Build a raster with every sample set to `value`.
    pub fn filled(meta: RasterMeta, band_count: usize, value: f32) -> RasterResult<Self> {
        let data = Array3::from_elem((band_count, meta.height, meta.width), value);
        Self::new(meta, data)
    }

    pub fn meta(&self) -> &RasterMeta {
        &self.meta
    }

    pub fn data(&self) -> &Array3<f32> {
        &self.data
    }

    pub fn into_parts(self) -> (RasterMeta, Array3<f32>) {
        (self.meta, self.data)
    }

    pub fn width(&self) -> usize {
        self.meta.width
    }

    pub fn height(&self) -> usize {
        self.meta.height
    }

    pub fn band_count(&self) -> usize {
        self.data.len_of(Axis(0))
    }

    /// Shape as `(bands, rows, cols)`.
    pub fn shape(&self) -> (usize, usize, usize) {
        self.data.dim()
    }

    /// View of a single band, zero-based.
    pub fn band(&self, index: usize) -> Option<ArrayView2<'_, f32>> {
        (index < self.band_count()).then(|| self.data.index_axis(Axis(0), index))
    }

    /// View of the block starting at `(col_off, row_off)` across all bands.
    ///
    /// The block is clipped to the raster, so a window hanging over the
    /// right or bottom edge yields a smaller view.
    pub fn window(
        &self,
        col_off: usize,
        row_off: usize,
        width: usize,
        height: usize,
    ) -> ArrayView3<'_, f32> {
        let row_start = row_off.min(self.meta.height);
        let col_start = col_off.min(self.meta.width);
        let row_end = row_off.saturating_add(height).min(self.meta.height);
        let col_end = col_off.saturating_add(width).min(self.meta.width);
        self.data
            .slice(s![.., row_start..row_end, col_start..col_end])
    }
}
