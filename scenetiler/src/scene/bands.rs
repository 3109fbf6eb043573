//! Band-label resolution for downloaded files.
//!
//! Catalogues return product files in no particular order, so bands are
//! recovered by matching each label against file names:
//!
//! ```text
//! T42WXS_20210712T065629_B03_10m.jp2  ──►  B03
//! T42WXS_20210712T065629_B02_10m.jp2  ──►  B02
//! T42WXS_20210712T065629_B04_10m.jp2  ──►  B04
//! ```
//!
//! A label must appear as a whole token delimited by `_`, `-`, `.` or the
//! name boundary, so `B02` never matches `B021` or `XB02`.

use std::path::{Path, PathBuf};

use regex::Regex;
use thiserror::Error;

/// Errors raised while matching downloaded files to band labels.
#[derive(Debug, Error)]
pub enum BandError {
    /// No downloaded file carries the label.
    #[error("no file found for band {label}")]
    Missing { label: String },

    /// More than one downloaded file carries the label.
    #[error("band {label} matched {} files", .candidates.len())]
    Ambiguous {
        label: String,
        candidates: Vec<PathBuf>,
    },

    /// The label cannot be turned into a matcher.
    #[error("invalid band label '{label}': {reason}")]
    InvalidLabel { label: String, reason: String },
}

/// The three band labels composited by the pipeline.
///
/// Positions are fixed: `b2` is written to composite band 1, `b3` to band 2
/// and `b4` to band 3.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BandTriplet {
    pub b2: String,
    pub b3: String,
    pub b4: String,
}

impl BandTriplet {
    pub fn new(b2: impl Into<String>, b3: impl Into<String>, b4: impl Into<String>) -> Self {
        Self {
            b2: b2.into(),
            b3: b3.into(),
            b4: b4.into(),
        }
    }

    /// Labels in composite order.
    pub fn labels(&self) -> [&str; 3] {
        [self.b2.as_str(), self.b3.as_str(), self.b4.as_str()]
    }
}

impl Default for BandTriplet {
    fn default() -> Self {
        Self::new("B02", "B03", "B04")
    }
}

/// Downloaded file paths keyed by band.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BandPaths {
    pub b2: PathBuf,
    pub b3: PathBuf,
    pub b4: PathBuf,
}

fn label_matcher(label: &str) -> Result<Regex, BandError> {
    let pattern = format!(r"(?:^|[_.\-]){}(?:[_.\-]|$)", regex::escape(label));
    Regex::new(&pattern).map_err(|e| BandError::InvalidLabel {
        label: label.to_string(),
        reason: e.to_string(),
    })
}

fn find_band(files: &[PathBuf], label: &str) -> Result<PathBuf, BandError> {
    let matcher = label_matcher(label)?;
    let mut candidates: Vec<PathBuf> = files
        .iter()
        .filter(|path| {
            path.file_name()
                .and_then(|name| name.to_str())
                .is_some_and(|name| matcher.is_match(name))
        })
        .cloned()
        .collect();

    match candidates.len() {
        0 => Err(BandError::Missing {
            label: label.to_string(),
        }),
        1 => Ok(candidates.remove(0)),
        _ => {
            candidates.sort();
            Err(BandError::Ambiguous {
                label: label.to_string(),
                candidates,
            })
        }
    }
}

/// Match each label of the triplet to exactly one downloaded file.
pub fn resolve_bands(files: &[PathBuf], triplet: &BandTriplet) -> Result<BandPaths, BandError> {
    Ok(BandPaths {
        b2: find_band(files, &triplet.b2)?,
        b3: find_band(files, &triplet.b3)?,
        b4: find_band(files, &triplet.b4)?,
    })
}

impl BandPaths {
    /// Paths in composite order.
    pub fn as_array(&self) -> [&Path; 3] {
        [self.b2.as_path(), self.b3.as_path(), self.b4.as_path()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn paths(names: &[&str]) -> Vec<PathBuf> {
        names.iter().map(|n| PathBuf::from("/dl").join(n)).collect()
    }

    #[test]
    fn test_resolves_regardless_of_order() {
        let files = paths(&[
            "T42WXS_B04_10m.tif",
            "T42WXS_B02_10m.tif",
            "T42WXS_B03_10m.tif",
        ]);
        let bands = resolve_bands(&files, &BandTriplet::default()).unwrap();
        assert!(bands.b2.ends_with("T42WXS_B02_10m.tif"));
        assert!(bands.b3.ends_with("T42WXS_B03_10m.tif"));
        assert!(bands.b4.ends_with("T42WXS_B04_10m.tif"));
    }

    #[test]
    fn test_label_must_be_whole_token() {
        let files = paths(&["X_B021_10m.tif", "XB02_10m.tif"]);
        let err = find_band(&files, "B02").unwrap_err();
        assert!(matches!(err, BandError::Missing { .. }));
    }

    #[test]
    fn test_label_at_name_boundaries() {
        let files = paths(&["B02.tif", "scene-B03", "a_B04"]);
        let bands = resolve_bands(&files, &BandTriplet::default()).unwrap();
        assert!(bands.b2.ends_with("B02.tif"));
        assert!(bands.b3.ends_with("scene-B03"));
        assert!(bands.b4.ends_with("a_B04"));
    }

    #[test]
    fn test_missing_band() {
        let files = paths(&["T_B02_10m.tif", "T_B03_10m.tif"]);
        let err = resolve_bands(&files, &BandTriplet::default()).unwrap_err();
        assert!(err.to_string().contains("B04"));
    }

    #[test]
    fn test_ambiguous_band() {
        let files = paths(&["T_B02_10m.tif", "T_B02_20m.tif"]);
        let err = find_band(&files, "B02").unwrap_err();
        match err {
            BandError::Ambiguous { candidates, .. } => assert_eq!(candidates.len(), 2),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_custom_labels_are_escaped() {
        let files = paths(&["img_band.1.tif", "img_bandX1.tif"]);
        let found = find_band(&files, "band.1").unwrap();
        assert!(found.ends_with("img_band.1.tif"));
    }
}
