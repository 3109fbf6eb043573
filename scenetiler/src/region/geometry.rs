//! Region geometry type.

use geo::{BoundingRect, Coord, EuclideanDistance, MultiPolygon, Point, Polygon, Rect};

/// A named area of interest.
#[derive(Debug, Clone, PartialEq)]
pub struct RegionGeometry {
    /// Display name, used in logs and summaries.
    pub name: String,

    /// Region outline in the coordinates of `epsg`.
    pub geometry: MultiPolygon<f64>,

    /// EPSG code of the geometry's coordinates.
    pub epsg: u32,

    /// Buffer radius overriding the pipeline default, in CRS linear units
    /// (only meaningful once reprojected to a projected CRS).
    pub buffer_radius: Option<f64>,
}

impl RegionGeometry {
    pub fn new(name: impl Into<String>, geometry: MultiPolygon<f64>, epsg: u32) -> Self {
        Self {
            name: name.into(),
            geometry,
            epsg,
            buffer_radius: None,
        }
    }

    pub fn from_polygon(name: impl Into<String>, polygon: Polygon<f64>, epsg: u32) -> Self {
        Self::new(name, MultiPolygon::new(vec![polygon]), epsg)
    }

    pub fn with_buffer_radius(mut self, radius: f64) -> Self {
        self.buffer_radius = Some(radius);
        self
    }

    /// Bounding rectangle of the outline, `None` for an empty geometry.
    pub fn bounds(&self) -> Option<Rect<f64>> {
        self.geometry.bounding_rect()
    }

    /// Bounding rectangle of the outline buffered by `radius`.
    ///
    /// The envelope of a buffered shape is the shape's envelope grown by the
    /// radius on every side.
    pub fn buffered_bounds(&self, radius: f64) -> Option<Rect<f64>> {
        self.bounds().map(|rect| {
            Rect::new(
                Coord {
                    x: rect.min().x - radius,
                    y: rect.min().y - radius,
                },
                Coord {
                    x: rect.max().x + radius,
                    y: rect.max().y + radius,
                },
            )
        })
    }

    /// Returns true if `(x, y)` lies inside the outline buffered by `radius`.
    pub fn buffered_contains(&self, x: f64, y: f64, radius: f64) -> bool {
        Point::new(x, y).euclidean_distance(&self.geometry) <= radius
    }

    pub fn is_empty(&self) -> bool {
        self.geometry.0.is_empty()
    }
}
