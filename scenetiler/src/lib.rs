//! SceneTiler - composite, mask and tile satellite scenes.
//!
//! For each region of interest the pipeline queries a scene catalogue,
//! picks the best acquisitions, merges their B02/B03/B04 bands into an RGB
//! or greyscale composite, crops the composite to a buffered region outline
//! and cuts it into fixed-size GeoTIFF tiles, keeping only tiles whose
//! pixels are all valid.
//!
//! # Example
//!
//! ```no_run
//! use std::path::Path;
//! use std::sync::Arc;
//!
//! use scenetiler::config::PipelineConfig;
//! use scenetiler::pipeline::Pipeline;
//! use scenetiler::region::GeoJsonSource;
//! use scenetiler::scene::LocalArchive;
//!
//! let archive = LocalArchive::open("/data/archive").unwrap();
//! let pipeline = Pipeline::new(
//!     Arc::new(archive),
//!     Arc::new(GeoJsonSource::new()),
//!     PipelineConfig::new("/data/output"),
//! );
//! let regions = pipeline.load_regions(Path::new("regions.geojson")).unwrap();
//! let summary = pipeline.run(&regions);
//! println!("{}", summary);
//! ```

pub mod composite;
pub mod config;
pub mod logging;
pub mod mask;
pub mod output;
pub mod pipeline;
pub mod raster;
pub mod region;
pub mod scene;
pub mod tile;

/// Version of the SceneTiler library.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
