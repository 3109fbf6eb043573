//! Tiling.
//!
//! [`TileWindows`] enumerates fixed-size windows over a raster and
//! [`TileWriter`] writes the ones that pass the validity check.

mod window;
mod writer;

pub use window::{tile_windows, TileSize, TileSizeError, TileWindow, TileWindows, DEFAULT_TILE_SIZE};
pub use writer::{is_valid_block, tile_file_name, RejectReason, TileOutcome, TileReport, TileWriter};
