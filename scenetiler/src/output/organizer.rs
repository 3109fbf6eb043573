//! Scene directory preparation.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use super::{region_dir_name, KeyStyle, OutputError, OutputResult, SceneKey};
use crate::scene::SceneRecord;

/// Name of the tile subdirectory inside a scene directory.
pub const TILES_DIR: &str = "tiles";

/// A scene directory created by this run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SceneDir {
    pub key: SceneKey,
    pub path: PathBuf,
    pub tiles: PathBuf,
}

impl SceneDir {
    /// Path of a file directly inside the scene directory.
    pub fn file(&self, name: &str) -> PathBuf {
        self.path.join(name)
    }
}

/// Outcome of [`OutputOrganizer::prepare`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Preparation {
    /// The directory was created now and the scene should be processed.
    Created(SceneDir),
    /// The directory already existed; the scene is skipped.
    AlreadyProcessed,
}

/// Lays out scene directories under an output root, one subdirectory per
/// region so that regions sharing a scene never collide.
#[derive(Debug, Clone)]
pub struct OutputOrganizer {
    root: PathBuf,
    key_style: KeyStyle,
}

impl OutputOrganizer {
    pub fn new(root: impl Into<PathBuf>, key_style: KeyStyle) -> Self {
        Self {
            root: root.into(),
            key_style,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn key_style(&self) -> KeyStyle {
        self.key_style
    }

    pub fn key(&self, scene: &SceneRecord) -> SceneKey {
        SceneKey::new(scene, self.key_style)
    }

    /// Directory holding every scene of `region`.
    pub fn region_path(&self, region: &str) -> PathBuf {
        self.root.join(region_dir_name(region))
    }

    /// Path the scene's directory has, whether or not it exists.
    pub fn scene_path(&self, region: &str, scene: &SceneRecord) -> PathBuf {
        self.region_path(region).join(self.key(scene).as_str())
    }

    /// Claim the output directory of `scene` for `region`.
    ///
    /// Creates the region directory if needed, then the scene directory with one
    /// `create_dir` call. An existing scene directory means the scene was
    /// processed before and yields [`Preparation::AlreadyProcessed`] without
    /// touching anything inside it.
    pub fn prepare(&self, region: &str, scene: &SceneRecord) -> OutputResult<Preparation> {
        let region_path = self.region_path(region);
        fs::create_dir_all(&region_path).map_err(|source| OutputError::CreateDirectoryFailed {
            path: region_path.clone(),
            source,
        })?;

        let key = self.key(scene);
        let path = region_path.join(key.as_str());
        match fs::create_dir(&path) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                debug!(scene_id = %scene.id, region, path = %path.display(), "Scene directory exists");
                return Ok(Preparation::AlreadyProcessed);
            }
            Err(source) => return Err(OutputError::CreateDirectoryFailed { path, source }),
        }

        let tiles = path.join(TILES_DIR);
        if let Err(source) = fs::create_dir(&tiles) {
            // Release the claim so a later run can retry
            let _ = fs::remove_dir_all(&path);
            return Err(OutputError::CreateDirectoryFailed {
                path: tiles,
                source,
            });
        }

        debug!(scene_id = %scene.id, region, path = %path.display(), "Created scene directory");
        Ok(Preparation::Created(SceneDir { key, path, tiles }))
    }

    /// Remove a scene directory created by [`prepare`](Self::prepare).
    ///
    /// Used when the scene fails after preparation, so that the next run
    /// does not mistake it for processed.
    pub fn discard(&self, dir: &SceneDir) -> OutputResult<()> {
        match fs::remove_dir_all(&dir.path) {
            Ok(()) => {
                info!(path = %dir.path.display(), "Discarded incomplete scene directory");
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(OutputError::RemoveFailed {
                path: dir.path.clone(),
                source,
            }),
        }
    }
}
