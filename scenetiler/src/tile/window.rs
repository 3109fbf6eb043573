//! Lazy tile window enumeration.

use std::iter::FusedIterator;

use thiserror::Error;

use crate::raster::{GeoTransform, Raster};

/// Default tile edge length in pixels.
pub const DEFAULT_TILE_SIZE: usize = 256;

/// Rejected tile dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("tile size must be non-zero, got {width}x{height}")]
pub struct TileSizeError {
    pub width: usize,
    pub height: usize,
}

/// Tile dimensions in pixels, both non-zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TileSize {
    width: usize,
    height: usize,
}

impl TileSize {
    pub fn new(width: usize, height: usize) -> Result<Self, TileSizeError> {
        if width == 0 || height == 0 {
            return Err(TileSizeError { width, height });
        }
        Ok(Self { width, height })
    }

    /// Square tiles of `edge` pixels.
    pub fn square(edge: usize) -> Result<Self, TileSizeError> {
        Self::new(edge, edge)
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }
}

impl Default for TileSize {
    fn default() -> Self {
        Self {
            width: DEFAULT_TILE_SIZE,
            height: DEFAULT_TILE_SIZE,
        }
    }
}

/// A block of pixels within a parent raster.
///
/// `width`/`height` are the clipped extent, so windows on the right and
/// bottom edges may be smaller than the tile size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TileWindow {
    pub col_off: usize,
    pub row_off: usize,
    pub width: usize,
    pub height: usize,
}

impl TileWindow {
    /// True when the window has the full tile dimensions.
    pub fn is_full(&self, size: TileSize) -> bool {
        self.width == size.width && self.height == size.height
    }
}

/// Row-major iterator over the tile windows of a raster, each paired with
/// the parent transform translated to the window origin.
///
/// Yields exactly `ceil(W / Wt) * ceil(H / Ht)` windows.
#[derive(Debug, Clone)]
pub struct TileWindows {
    transform: GeoTransform,
    width: usize,
    height: usize,
    size: TileSize,
    cols: usize,
    next: usize,
    end: usize,
}

impl TileWindows {
    pub fn new(width: usize, height: usize, transform: GeoTransform, size: TileSize) -> Self {
        let cols = width.div_ceil(size.width);
        let rows = height.div_ceil(size.height);
        Self {
            transform,
            width,
            height,
            size,
            cols,
            next: 0,
            end: cols * rows,
        }
    }

    /// Windows covering a whole raster.
    pub fn for_raster(raster: &Raster, size: TileSize) -> Self {
        Self::new(
            raster.width(),
            raster.height(),
            raster.meta().transform,
            size,
        )
    }

    pub fn tile_size(&self) -> TileSize {
        self.size
    }

    fn window_at(&self, index: usize) -> (TileWindow, GeoTransform) {
        let col_off = (index % self.cols) * self.size.width;
        let row_off = (index / self.cols) * self.size.height;
        let window = TileWindow {
            col_off,
            row_off,
            width: self.size.width.min(self.width - col_off),
            height: self.size.height.min(self.height - row_off),
        };
        (window, self.transform.translated(col_off, row_off))
    }
}

impl Iterator for TileWindows {
    type Item = (TileWindow, GeoTransform);

    fn next(&mut self) -> Option<Self::Item> {
        if self.next >= self.end {
            return None;
        }
        let item = self.window_at(self.next);
        self.next += 1;
        Some(item)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.end - self.next;
        (remaining, Some(remaining))
    }

    fn nth(&mut self, n: usize) -> Option<Self::Item> {
        self.next = self.next.saturating_add(n).min(self.end);
        self.next()
    }
}

impl ExactSizeIterator for TileWindows {}

impl FusedIterator for TileWindows {}

/// Enumerate tile windows over a `width x height` grid.
pub fn tile_windows(
    width: usize,
    height: usize,
    transform: GeoTransform,
    size: TileSize,
) -> TileWindows {
    TileWindows::new(width, height, transform, size)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn size(w: usize, h: usize) -> TileSize {
        TileSize::new(w, h).unwrap()
    }

    #[test]
    fn test_zero_size_rejected() {
        assert_eq!(
            TileSize::new(0, 256),
            Err(TileSizeError {
                width: 0,
                height: 256
            })
        );
        assert!(TileSize::new(256, 0).is_err());
        assert_eq!(TileSize::default(), size(256, 256));
    }

    #[test]
    fn test_exact_fit() {
        let windows: Vec<_> = tile_windows(512, 512, GeoTransform::default(), size(256, 256))
            .map(|(w, _)| (w.col_off, w.row_off, w.width, w.height))
            .collect();
        assert_eq!(
            windows,
            vec![
                (0, 0, 256, 256),
                (256, 0, 256, 256),
                (0, 256, 256, 256),
                (256, 256, 256, 256),
            ]
        );
    }

    #[test]
    fn test_edge_windows_are_clipped() {
        let windows: Vec<_> = tile_windows(600, 300, GeoTransform::default(), size(256, 256))
            .map(|(w, _)| w)
            .collect();
        assert_eq!(windows.len(), 6);
        assert_eq!(windows[2].col_off, 512);
        assert_eq!(windows[2].width, 88);
        assert_eq!(windows[5].height, 44);
        assert!(windows[0].is_full(size(256, 256)));
        assert!(!windows[5].is_full(size(256, 256)));
    }

    #[test]
    fn test_window_transform() {
        let parent = GeoTransform::north_up(500_000.0, 7_700_000.0, 10.0, 10.0);
        let (_, transform) = tile_windows(512, 512, parent, size(256, 256))
            .nth(3)
            .unwrap();
        assert_eq!(transform.c, 502_560.0);
        assert_eq!(transform.f, 7_697_440.0);
        assert_eq!(transform.a, 10.0);
        assert_eq!(transform.e, -10.0);
    }

    #[test]
    fn test_empty_raster() {
        let mut windows = tile_windows(0, 100, GeoTransform::default(), size(16, 16));
        assert_eq!(windows.len(), 0);
        assert!(windows.next().is_none());
    }

    #[test]
    fn test_exact_size_and_clone() {
        let mut windows = tile_windows(100, 100, GeoTransform::default(), size(30, 30));
        assert_eq!(windows.len(), 16);
        windows.next();
        let copy = windows.clone();
        assert_eq!(windows.len(), 15);
        assert_eq!(copy.count(), 15);
    }

    mod property_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn window_count_matches_ceiling(
                w in 1usize..2000,
                h in 1usize..2000,
                tw in 1usize..512,
                th in 1usize..512,
            ) {
                let windows = tile_windows(w, h, GeoTransform::default(), size(tw, th));
                let expected = w.div_ceil(tw) * h.div_ceil(th);
                prop_assert_eq!(windows.len(), expected);
                prop_assert_eq!(windows.count(), expected);
            }

            #[test]
            fn windows_cover_every_pixel_once(
                w in 1usize..200,
                h in 1usize..200,
                tw in 1usize..64,
                th in 1usize..64,
            ) {
                let area: usize = tile_windows(w, h, GeoTransform::default(), size(tw, th))
                    .map(|(win, _)| {
                        assert!(win.width >= 1 && win.width <= tw);
                        assert!(win.height >= 1 && win.height <= th);
                        assert!(win.col_off + win.width <= w);
                        assert!(win.row_off + win.height <= h);
                        win.width * win.height
                    })
                    .sum();
                prop_assert_eq!(area, w * h);
            }

            #[test]
            fn window_transform_maps_origin(
                w in 1usize..1000,
                h in 1usize..1000,
                tw in 1usize..256,
                th in 1usize..256,
            ) {
                let parent = GeoTransform::north_up(1_000.0, 2_000.0, 10.0, 10.0);
                for (win, transform) in tile_windows(w, h, parent, size(tw, th)) {
                    let expected = parent.apply(win.col_off as f64, win.row_off as f64);
                    prop_assert_eq!(transform.apply(0.0, 0.0), expected);
                }
            }
        }
    }
}
