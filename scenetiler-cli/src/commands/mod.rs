//! CLI command implementations.
//!
//! - [`config`] - Configuration inspection (path, show, init)
//! - [`run`] - Main command (process regions)

pub mod config;
pub mod run;
