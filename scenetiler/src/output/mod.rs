//! Per-scene output layout.
//!
//! Every processed scene gets its own directory under its region's
//! directory in the output root:
//!
//! ```text
//! {root}/{region}/{key}/rgb.tif
//! {root}/{region}/{key}/rgb_masked.tif
//! {root}/{region}/{key}/tiles/tile_{col}-{row}.tif
//! ```
//!
//! The scene directory is created with a single `create_dir` call, so its
//! existence is the "already processed" marker and two workers can never
//! claim the same scene for the same region.

mod error;
mod key;
mod organizer;

pub use error::{OutputError, OutputResult};
pub use key::{region_dir_name, KeyStyle, SceneKey};
pub use organizer::{OutputOrganizer, Preparation, SceneDir, TILES_DIR};
