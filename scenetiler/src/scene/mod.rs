//! Scene catalogue types and candidate selection.
//!
//! This module holds everything that happens before pixels are touched:
//!
//! - [`SceneRecord`] - metadata for one acquisition as reported by a catalogue
//! - [`CandidateSelector`] - ranks records and picks the best K
//! - [`SceneService`] - the query/download seam, injected by the caller
//! - [`resolve_bands`] - maps downloaded files to band labels by name
//! - [`LocalArchive`] - a directory-backed [`SceneService`]

mod bands;
mod local;
mod record;
mod selector;
mod service;

pub use bands::{resolve_bands, BandError, BandPaths, BandTriplet};
pub use local::{ArchiveEntry, LocalArchive, ARCHIVE_INDEX_FILE};
pub use record::SceneRecord;
pub use selector::{CandidateSelector, Selection};
pub use service::{BandFilter, QueryFilter, SceneService, ServiceError, DEFAULT_BAND_PATTERN};
