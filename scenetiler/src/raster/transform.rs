//! Affine pixel-to-world transforms.

/// Affine mapping from pixel `(col, row)` to world `(x, y)`.
///
/// Coefficients follow the GDAL/rasterio convention:
///
/// ```text
/// x = a * col + b * row + c
/// y = d * col + e * row + f
/// ```
///
/// For a north-up image `b` and `d` are zero and `e` is negative.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoTransform {
    pub a: f64,
    pub b: f64,
    pub c: f64,
    pub d: f64,
    pub e: f64,
    pub f: f64,
}

impl GeoTransform {
    /// Create a transform from its six coefficients.
    pub fn new(a: f64, b: f64, c: f64, d: f64, e: f64, f: f64) -> Self {
        Self { a, b, c, d, e, f }
    }

    /// North-up transform with the given upper-left corner and pixel size.
    ///
    /// `pixel_height` is the positive ground size of a row; it is negated
    /// internally so rows grow southwards.
    pub fn north_up(origin_x: f64, origin_y: f64, pixel_width: f64, pixel_height: f64) -> Self {
        Self::new(pixel_width, 0.0, origin_x, 0.0, -pixel_height, origin_y)
    }

    /// Returns true when the transform has no rotation or shear terms.
    pub fn is_north_up(&self) -> bool {
        self.b == 0.0 && self.d == 0.0
    }

    /// Map a pixel coordinate (fractional allowed) to world coordinates.
    pub fn apply(&self, col: f64, row: f64) -> (f64, f64) {
        (
            self.a * col + self.b * row + self.c,
            self.d * col + self.e * row + self.f,
        )
    }

    /// World coordinates of the centre of pixel `(col, row)`.
    pub fn pixel_center(&self, col: usize, row: usize) -> (f64, f64) {
        self.apply(col as f64 + 0.5, row as f64 + 0.5)
    }

    /// This transform composed with a translation of `(col_off, row_off)`
    /// pixels, so that the new transform's `(0, 0)` is the old
    /// `(col_off, row_off)`.
    pub fn translated(&self, col_off: usize, row_off: usize) -> Self {
        let (c, f) = self.apply(col_off as f64, row_off as f64);
        Self { c, f, ..*self }
    }

    /// Inverse transform mapping world coordinates back to pixels.
    ///
    /// Returns `None` for a degenerate (non-invertible) transform.
    pub fn inverse(&self) -> Option<Self> {
        let det = self.a * self.e - self.b * self.d;
        if det == 0.0 || !det.is_finite() {
            return None;
        }
        let ia = self.e / det;
        let ib = -self.b / det;
        let id = -self.d / det;
        let ie = self.a / det;
        Some(Self {
            a: ia,
            b: ib,
            c: -(ia * self.c + ib * self.f),
            d: id,
            e: ie,
            f: -(id * self.c + ie * self.f),
        })
    }

    /// Coefficients in GDAL geotransform order `[c, a, b, f, d, e]`.
    pub fn to_gdal(&self) -> [f64; 6] {
        [self.c, self.a, self.b, self.f, self.d, self.e]
    }
}

impl Default for GeoTransform {
    fn default() -> Self {
        Self::new(1.0, 0.0, 0.0, 0.0, 1.0, 0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-9;

    #[test]
    fn test_north_up_apply() {
        let t = GeoTransform::north_up(500_000.0, 7_600_000.0, 10.0, 10.0);
        assert!(t.is_north_up());
        assert_eq!(t.apply(0.0, 0.0), (500_000.0, 7_600_000.0));
        assert_eq!(t.apply(2.0, 3.0), (500_020.0, 7_599_970.0));
        assert_eq!(t.pixel_center(0, 0), (500_005.0, 7_599_995.0));
    }

    #[test]
    fn test_translated_maps_origin_to_offset() {
        let t = GeoTransform::north_up(100.0, 200.0, 10.0, 10.0);
        let moved = t.translated(256, 512);
        assert_eq!(moved.apply(0.0, 0.0), t.apply(256.0, 512.0));
        assert_eq!(moved.a, t.a);
        assert_eq!(moved.e, t.e);
    }

    #[test]
    fn test_translated_with_rotation() {
        let t = GeoTransform::new(10.0, 2.0, 100.0, 1.0, -10.0, 200.0);
        let moved = t.translated(7, 3);
        let (x0, y0) = moved.apply(0.0, 0.0);
        let (x1, y1) = t.apply(7.0, 3.0);
        assert!((x0 - x1).abs() < EPS);
        assert!((y0 - y1).abs() < EPS);
    }

    #[test]
    fn test_inverse_roundtrip() {
        let t = GeoTransform::new(10.0, 2.0, 100.0, 1.0, -10.0, 200.0);
        let inv = t.inverse().unwrap();
        let (x, y) = t.apply(12.5, 40.25);
        let (col, row) = inv.apply(x, y);
        assert!((col - 12.5).abs() < EPS);
        assert!((row - 40.25).abs() < EPS);
    }

    #[test]
    fn test_degenerate_inverse() {
        let t = GeoTransform::new(0.0, 0.0, 1.0, 0.0, 0.0, 1.0);
        assert!(t.inverse().is_none());
    }

    #[test]
    fn test_gdal_order() {
        let t = GeoTransform::north_up(1.0, 2.0, 3.0, 4.0);
        assert_eq!(t.to_gdal(), [1.0, 3.0, 0.0, 2.0, 0.0, -4.0]);
    }
}
