//! Run summary.

use std::fmt;

/// A scene that was processed to completion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessedScene {
    pub scene_id: String,
    pub region: String,
    /// Number of tiles written.
    pub tiles: usize,
}

/// A scene whose output directory for the region already existed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedScene {
    pub scene_id: String,
    pub region: String,
}

/// A scene that failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedScene {
    pub scene_id: String,
    pub region: String,
    pub reason: String,
}

/// A region whose query failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedRegion {
    pub region: String,
    pub reason: String,
}

/// Warning raised during a run.
///
/// Warnings indicate non-fatal issues, such as a region that does not
/// intersect its scene.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunWarning {
    /// Scene id or region name the warning is about.
    pub subject: String,

    pub message: String,
}

impl RunWarning {
    pub fn new(subject: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
            message: message.into(),
        }
    }
}

/// Outcome of [`Pipeline::run`](super::Pipeline::run).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub processed: Vec<ProcessedScene>,

    pub skipped: Vec<SkippedScene>,

    pub failed: Vec<FailedScene>,

    /// Names of regions for which no scene matched the query.
    pub regions_without_imagery: Vec<String>,

    pub failed_regions: Vec<FailedRegion>,

    pub warnings: Vec<RunWarning>,
}

impl RunSummary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn processed_ids(&self) -> Vec<&str> {
        self.processed.iter().map(|s| s.scene_id.as_str()).collect()
    }

    pub fn skipped_ids(&self) -> Vec<&str> {
        self.skipped.iter().map(|s| s.scene_id.as_str()).collect()
    }

    pub fn failed_ids(&self) -> Vec<&str> {
        self.failed.iter().map(|s| s.scene_id.as_str()).collect()
    }

    /// Tiles written across all processed scenes.
    pub fn total_tiles(&self) -> usize {
        self.processed.iter().map(|s| s.tiles).sum()
    }

    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }

    /// True when no scene or region failed.
    pub fn is_success(&self) -> bool {
        self.failed.is_empty() && self.failed_regions.is_empty()
    }

    pub fn add_warning(&mut self, subject: impl Into<String>, message: impl Into<String>) {
        self.warnings.push(RunWarning::new(subject, message));
    }

    pub fn add_failed_region(&mut self, region: impl Into<String>, reason: impl Into<String>) {
        self.failed_regions.push(FailedRegion {
            region: region.into(),
            reason: reason.into(),
        });
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Processed: {} scene(s), {} tile(s)",
            self.processed.len(),
            self.total_tiles()
        )?;
        for scene in &self.processed {
            writeln!(f, "  {} [{}]: {} tile(s)", scene.scene_id, scene.region, scene.tiles)?;
        }
        writeln!(f, "Skipped (already processed): {}", self.skipped.len())?;
        for scene in &self.skipped {
            writeln!(f, "  {} [{}]", scene.scene_id, scene.region)?;
        }
        writeln!(f, "Failed: {}", self.failed.len())?;
        for scene in &self.failed {
            writeln!(f, "  {} [{}]: {}", scene.scene_id, scene.region, scene.reason)?;
        }
        if !self.regions_without_imagery.is_empty() {
            writeln!(
                f,
                "Regions without imagery: {}",
                self.regions_without_imagery.join(", ")
            )?;
        }
        for region in &self.failed_regions {
            writeln!(f, "Region {} failed: {}", region.region, region.reason)?;
        }
        for warning in &self.warnings {
            writeln!(f, "Warning: {}: {}", warning.subject, warning.message)?;
        }
        Ok(())
    }
}
