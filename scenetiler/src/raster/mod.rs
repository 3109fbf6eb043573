//! Raster model and GeoTIFF persistence.
//!
//! A [`Raster`] is a band-major `(bands, rows, cols)` grid of `f32` samples
//! together with the metadata needed to place it on the ground:
//!
//! ```text
//! ┌──────────────────────────┐
//! │ RasterMeta               │  width, height, DataType,
//! │                          │  GeoTransform, EPSG, nodata
//! ├──────────────────────────┤
//! │ Array3<f32>              │  band 0 ─ rows × cols
//! │                          │  band 1 ─ rows × cols
//! │                          │  ...
//! └──────────────────────────┘
//! ```
//!
//! Samples are held as `f32` regardless of the on-disk [`DataType`]; every
//! supported type (`u8`, `u16`, `i16`, `f32`) is exactly representable, so
//! reading and writing never alters a value.

mod dtype;
mod error;
mod geotiff;
mod model;
mod transform;

pub use dtype::DataType;
pub use error::{RasterError, RasterResult};
pub use geotiff::{read_geotiff, write_geotiff, GEOTIFF_EXTENSION};
pub use model::{Raster, RasterMeta};
pub use transform::GeoTransform;
