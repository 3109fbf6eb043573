//! Configuration.
//!
//! - [`PipelineConfig`] - parameters of one pipeline run, with builders
//! - [`ConfigFile`] - the user's `~/.scenetiler/config.ini`, which maps onto
//!   a [`PipelineConfig`] plus logging settings

mod file;
mod parser;
mod settings;
mod writer;

pub use file::{
    config_directory, config_file_path, ConfigFile, ConfigFileError, ImagerySettings,
    LoggingSettings, OutputSettings, QuerySettings, RunSettings, TilingSettings,
    DEFAULT_LOG_FILE,
};
pub use settings::{
    default_staging_dir, PipelineConfig, RegionSelection, DEFAULT_BUFFER_RADIUS,
    DEFAULT_OUTPUT_DIR, DEFAULT_STAGING_DIR_NAME,
};
