//! Regions of interest.
//!
//! A [`RegionGeometry`] is a (multi)polygon in a known EPSG CRS. Regions are
//! loaded and reprojected through a [`GeometrySource`]; the bundled
//! [`GeoJsonSource`] reads GeoJSON files and reprojects with `proj4rs`.

mod error;
mod geojson;
mod geometry;
mod projection;
mod source;

pub use error::{RegionError, RegionResult};
pub use geojson::parse_geojson;
pub use geometry::RegionGeometry;
pub use projection::{is_geographic_crs, project_point, reproject_region};
pub use source::{GeoJsonSource, GeometrySource};
