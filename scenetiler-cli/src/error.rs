//! CLI error handling with user-friendly messages.
//!
//! Centralizes error handling for the CLI, providing consistent formatting
//! and appropriate exit codes.

use std::fmt;
use std::process;

use scenetiler::config::ConfigFileError;
use scenetiler::region::RegionError;
use scenetiler::scene::ServiceError;

/// CLI-specific errors with user-friendly messages.
#[derive(Debug)]
pub enum CliError {
    /// Failed to initialize logging
    LoggingInit(String),
    /// Configuration error
    Config(String),
    /// Failed to open the scene archive
    Archive(ServiceError),
    /// Failed to load the region file
    Regions(RegionError),
}

impl CliError {
    /// Exit the process with an appropriate error message and code.
    pub fn exit(&self) -> ! {
        eprintln!("Error: {}", self);

        if let CliError::Archive(_) = self {
            eprintln!();
            eprintln!("The archive directory must contain a scenes.json index and one");
            eprintln!("directory per scene id holding its band files.");
        }

        process::exit(1)
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::LoggingInit(msg) => write!(f, "Failed to initialize logging: {}", msg),
            CliError::Config(msg) => write!(f, "Configuration error: {}", msg),
            CliError::Archive(e) => write!(f, "Failed to open archive: {}", e),
            CliError::Regions(e) => write!(f, "Failed to load regions: {}", e),
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CliError::Archive(e) => Some(e),
            CliError::Regions(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ConfigFileError> for CliError {
    fn from(e: ConfigFileError) -> Self {
        CliError::Config(e.to_string())
    }
}

impl From<RegionError> for CliError {
    fn from(e: RegionError) -> Self {
        CliError::Regions(e)
    }
}
