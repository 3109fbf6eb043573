//! Band compositing.
//!
//! Merges the three aligned single-band rasters of a scene into one
//! composite: an RGB stack or a greyscale mean. The B4 band is the reference
//! for size, transform, CRS, nodata and data type.

use std::fmt;
use std::str::FromStr;

use ndarray::{Array3, Axis, Zip};
use tracing::{debug, warn};

use crate::raster::{Raster, RasterError, RasterMeta, RasterResult};

/// CRS assigned to a composite whose reference band carries none.
pub const DEFAULT_FALLBACK_EPSG: u32 = 4326;

/// Composite output form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputMode {
    /// Three bands: B2, B3, B4 in that order.
    #[default]
    Rgb,
    /// One band: the mean of B2, B3 and B4.
    Greyscale,
}

impl OutputMode {
    pub fn name(&self) -> &'static str {
        match self {
            OutputMode::Rgb => "rgb",
            OutputMode::Greyscale => "greyscale",
        }
    }

    /// Number of bands in a composite of this mode.
    pub fn band_count(&self) -> usize {
        match self {
            OutputMode::Rgb => 3,
            OutputMode::Greyscale => 1,
        }
    }

    /// Default composite filename.
    pub fn composite_filename(&self) -> String {
        format!("{}.tif", self.name())
    }

    /// Default masked-composite filename.
    pub fn masked_filename(&self) -> String {
        format!("{}_masked.tif", self.name())
    }
}

impl fmt::Display for OutputMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for OutputMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "rgb" => Ok(OutputMode::Rgb),
            "greyscale" | "grayscale" | "grey" | "gray" => Ok(OutputMode::Greyscale),
            other => Err(format!(
                "unknown output mode '{}' (expected rgb or greyscale)",
                other
            )),
        }
    }
}

/// The three bands of a scene, already read from disk.
#[derive(Debug, Clone)]
pub struct BandSet {
    pub b2: Raster,
    pub b3: Raster,
    pub b4: Raster,
}

impl BandSet {
    pub fn new(b2: Raster, b3: Raster, b4: Raster) -> Self {
        Self { b2, b3, b4 }
    }

    /// The band whose metadata the composite inherits.
    pub fn reference(&self) -> &Raster {
        &self.b4
    }

    fn labelled(&self) -> [(&'static str, &Raster); 3] {
        [("B2", &self.b2), ("B3", &self.b3), ("B4", &self.b4)]
    }
}

/// Builds composites from a [`BandSet`].
#[derive(Debug, Clone)]
pub struct BandCompositor {
    mode: OutputMode,
    fallback_epsg: u32,
}

impl BandCompositor {
    pub fn new(mode: OutputMode) -> Self {
        Self {
            mode,
            fallback_epsg: DEFAULT_FALLBACK_EPSG,
        }
    }

    /// Set the EPSG code used when the reference band has no CRS.
    pub fn with_fallback_epsg(mut self, epsg: u32) -> Self {
        self.fallback_epsg = epsg;
        self
    }

    pub fn mode(&self) -> OutputMode {
        self.mode
    }

    /// Composite the bands.
    ///
    /// # Errors
    ///
    /// `RasterError::ShapeMismatch` when a band is not single-band or its
    /// size differs from the reference band.
    pub fn composite(&self, bands: &BandSet) -> RasterResult<Raster> {
        let reference = bands.reference();
        let (rows, cols) = (reference.height(), reference.width());

        for (label, band) in bands.labelled() {
            if band.shape() != (1, rows, cols) {
                return Err(RasterError::ShapeMismatch {
                    label: label.to_string(),
                    expected: (1, rows, cols),
                    actual: band.shape(),
                });
            }
        }

        let meta = self.output_meta(reference.meta());
        let data = match self.mode {
            OutputMode::Rgb => stack(bands),
            OutputMode::Greyscale => mean(bands, &meta),
        };

        debug!(
            mode = %self.mode,
            width = cols,
            height = rows,
            epsg = ?meta.epsg,
            "Built composite"
        );
        Raster::new(meta, data)
    }

    fn output_meta(&self, reference: &RasterMeta) -> RasterMeta {
        let mut meta = reference.clone();
        if meta.epsg.is_none() {
            warn!(
                fallback_epsg = self.fallback_epsg,
                "Reference band has no CRS, using fallback"
            );
            meta.epsg = Some(self.fallback_epsg);
        }
        meta
    }
}

fn single(band: &Raster) -> ndarray::ArrayView2<'_, f32> {
    band.data().index_axis(Axis(0), 0)
}

fn stack(bands: &BandSet) -> Array3<f32> {
    let (rows, cols) = (bands.b4.height(), bands.b4.width());
    let mut data = Array3::zeros((3, rows, cols));
    for (index, (_, band)) in bands.labelled().into_iter().enumerate() {
        data.index_axis_mut(Axis(0), index).assign(&single(band));
    }
    data
}

fn mean(bands: &BandSet, meta: &RasterMeta) -> Array3<f32> {
    let dtype = meta.dtype;
    let mut data = Array3::zeros((1, meta.height, meta.width));
    Zip::from(data.index_axis_mut(Axis(0), 0))
        .and(&single(&bands.b2))
        .and(&single(&bands.b3))
        .and(&single(&bands.b4))
        .for_each(|out, &b2, &b3, &b4| {
            let sum = f64::from(b2) + f64::from(b3) + f64::from(b4);
            *out = dtype.cast(sum / 3.0);
        });
    data
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raster::{DataType, GeoTransform};
    use ndarray::Array2;

    fn band(value: f32, width: usize, height: usize, epsg: Option<u32>) -> Raster {
        let mut meta = RasterMeta::new(
            width,
            height,
            DataType::UInt16,
            GeoTransform::north_up(500_000.0, 7_700_000.0, 10.0, 10.0),
        );
        meta.epsg = epsg;
        Raster::from_band(meta, Array2::from_elem((height, width), value)).unwrap()
    }

    fn from_grid(grid: &Array2<f32>) -> Raster {
        let (rows, cols) = grid.dim();
        let meta = RasterMeta::new(
            cols,
            rows,
            DataType::UInt16,
            GeoTransform::north_up(500_000.0, 7_700_000.0, 10.0, 10.0),
        )
        .with_epsg(32642);
        Raster::from_band(meta, grid.clone()).unwrap()
    }

    fn gradient(rows: usize, cols: usize, base: f32) -> Array2<f32> {
        Array2::from_shape_fn((rows, cols), |(r, c)| base + (r * cols + c) as f32)
    }

    #[test]
    fn test_rgb_band_order() {
        let set = BandSet::new(
            band(2.0, 4, 3, Some(32642)),
            band(3.0, 4, 3, Some(32642)),
            band(4.0, 4, 3, Some(32642)),
        );
        let out = BandCompositor::new(OutputMode::Rgb).composite(&set).unwrap();

        assert_eq!(out.shape(), (3, 3, 4));
        assert_eq!(out.data()[[0, 1, 1]], 2.0);
        assert_eq!(out.data()[[1, 1, 1]], 3.0);
        assert_eq!(out.data()[[2, 1, 1]], 4.0);
        assert_eq!(out.meta().epsg, Some(32642));
        assert_eq!(out.meta().transform, set.b4.meta().transform);
    }

    #[test]
    fn test_greyscale_mean() {
        let set = BandSet::new(
            band(10.0, 2, 2, Some(32642)),
            band(20.0, 2, 2, Some(32642)),
            band(30.0, 2, 2, Some(32642)),
        );
        let out = BandCompositor::new(OutputMode::Greyscale)
            .composite(&set)
            .unwrap();

        assert_eq!(out.shape(), (1, 2, 2));
        assert!(out.data().iter().all(|&v| v == 20.0));
        assert_eq!(out.meta().dtype, DataType::UInt16);
    }

    #[test]
    fn test_greyscale_mean_truncates_to_integer_type() {
        // (1 + 1 + 2) / 3 = 1.333..., truncated for uint16
        let set = BandSet::new(
            band(1.0, 1, 1, None),
            band(1.0, 1, 1, None),
            band(2.0, 1, 1, None),
        );
        let out = BandCompositor::new(OutputMode::Greyscale)
            .composite(&set)
            .unwrap();
        assert_eq!(out.data()[[0, 0, 0]], 1.0);
    }

    #[test]
    fn test_greyscale_mean_does_not_overflow() {
        let set = BandSet::new(
            band(65_535.0, 1, 1, None),
            band(65_535.0, 1, 1, None),
            band(65_535.0, 1, 1, None),
        );
        let out = BandCompositor::new(OutputMode::Greyscale)
            .composite(&set)
            .unwrap();
        assert_eq!(out.data()[[0, 0, 0]], 65_535.0);
    }

    #[test]
    fn test_shape_mismatch() {
        let set = BandSet::new(
            band(1.0, 4, 4, None),
            band(1.0, 5, 4, None),
            band(1.0, 4, 4, None),
        );
        let err = BandCompositor::new(OutputMode::Rgb)
            .composite(&set)
            .unwrap_err();
        match err {
            RasterError::ShapeMismatch {
                label,
                expected,
                actual,
            } => {
                assert_eq!(label, "B3");
                assert_eq!(expected, (1, 4, 4));
                assert_eq!(actual, (1, 4, 5));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_transposed_band_rejected() {
        // Same sample count, rows and columns swapped
        let set = BandSet::new(
            from_grid(&gradient(3, 5, 100.0)),
            from_grid(&gradient(5, 3, 200.0)),
            from_grid(&gradient(3, 5, 300.0)),
        );
        let err = BandCompositor::new(OutputMode::Greyscale)
            .composite(&set)
            .unwrap_err();
        match err {
            RasterError::ShapeMismatch {
                label,
                expected,
                actual,
            } => {
                assert_eq!(label, "B3");
                assert_eq!(expected, (1, 3, 5));
                assert_eq!(actual, (1, 5, 3));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_multi_band_input_rejected() {
        let meta = RasterMeta::new(2, 2, DataType::UInt16, GeoTransform::default());
        let two_band = Raster::filled(meta, 2, 1.0).unwrap();
        let set = BandSet::new(two_band, band(1.0, 2, 2, None), band(1.0, 2, 2, None));
        assert!(matches!(
            BandCompositor::new(OutputMode::Greyscale).composite(&set),
            Err(RasterError::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn test_fallback_epsg() {
        let set = BandSet::new(
            band(1.0, 2, 2, None),
            band(1.0, 2, 2, None),
            band(1.0, 2, 2, None),
        );
        let out = BandCompositor::new(OutputMode::Rgb).composite(&set).unwrap();
        assert_eq!(out.meta().epsg, Some(DEFAULT_FALLBACK_EPSG));

        let out = BandCompositor::new(OutputMode::Rgb)
            .with_fallback_epsg(3413)
            .composite(&set)
            .unwrap();
        assert_eq!(out.meta().epsg, Some(3413));
    }

    #[test]
    fn test_output_mode_parse() {
        assert_eq!("RGB".parse::<OutputMode>().unwrap(), OutputMode::Rgb);
        assert_eq!("grayscale".parse::<OutputMode>().unwrap(), OutputMode::Greyscale);
        assert!("cmyk".parse::<OutputMode>().is_err());
        assert_eq!(OutputMode::Greyscale.masked_filename(), "greyscale_masked.tif");
    }

    mod property_tests {
        use super::*;
        use ndarray::s;
        use proptest::prelude::*;

        fn grid(rows: usize, cols: usize, values: Vec<u16>) -> Array2<f32> {
            let samples = values.into_iter().map(f32::from).collect();
            Array2::from_shape_vec((rows, cols), samples).unwrap()
        }

        /// Three equal-shaped bands of arbitrary uint16 samples.
        fn band_triple() -> impl Strategy<Value = (Array2<f32>, Array2<f32>, Array2<f32>)> {
            (1usize..9, 1usize..9).prop_flat_map(|(rows, cols)| {
                let n = rows * cols;
                (
                    prop::collection::vec(any::<u16>(), n),
                    prop::collection::vec(any::<u16>(), n),
                    prop::collection::vec(any::<u16>(), n),
                )
                    .prop_map(move |(b2, b3, b4)| {
                        (grid(rows, cols, b2), grid(rows, cols, b3), grid(rows, cols, b4))
                    })
            })
        }

        proptest! {
            #[test]
            fn rgb_bands_are_b2_b3_b4((b2, b3, b4) in band_triple()) {
                let set = BandSet::new(from_grid(&b2), from_grid(&b3), from_grid(&b4));
                let out = BandCompositor::new(OutputMode::Rgb).composite(&set).unwrap();

                prop_assert_eq!(out.shape(), (3, b4.nrows(), b4.ncols()));
                prop_assert_eq!(out.data().slice(s![0, .., ..]), b2.view());
                prop_assert_eq!(out.data().slice(s![1, .., ..]), b3.view());
                prop_assert_eq!(out.data().slice(s![2, .., ..]), b4.view());
            }

            #[test]
            fn greyscale_is_cast_mean_per_pixel((b2, b3, b4) in band_triple()) {
                let set = BandSet::new(from_grid(&b2), from_grid(&b3), from_grid(&b4));
                let out = BandCompositor::new(OutputMode::Greyscale).composite(&set).unwrap();

                prop_assert_eq!(out.shape(), (1, b4.nrows(), b4.ncols()));
                for ((row, col), &value) in out.band(0).unwrap().indexed_iter() {
                    let sum = f64::from(b2[[row, col]])
                        + f64::from(b3[[row, col]])
                        + f64::from(b4[[row, col]]);
                    prop_assert_eq!(value, DataType::UInt16.cast(sum / 3.0));
                }
            }
        }
    }
}
