//! Scene directory naming.

use std::fmt;
use std::str::FromStr;

use crate::scene::SceneRecord;

/// How a scene's directory name is derived.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum KeyStyle {
    /// The scene id.
    #[default]
    Id,
    /// `{id}_{YYYYMMDD}` using the ingestion date.
    IdWithDate,
}

impl KeyStyle {
    pub fn name(&self) -> &'static str {
        match self {
            KeyStyle::Id => "id",
            KeyStyle::IdWithDate => "id_with_date",
        }
    }
}

impl fmt::Display for KeyStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for KeyStyle {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "id" => Ok(KeyStyle::Id),
            "id_with_date" | "id_date" => Ok(KeyStyle::IdWithDate),
            other => Err(format!(
                "unknown key style '{}' (expected id or id_with_date)",
                other
            )),
        }
    }
}

/// Turn an id or name into a single path component.
///
/// Path separators would escape the output root, and `.`/`..`/empty names
/// would alias an existing directory.
fn path_component(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| if matches!(c, '/' | '\\') { '_' } else { c })
        .collect();
    match cleaned.as_str() {
        "" | "." | ".." => format!("_{}", cleaned),
        _ => cleaned,
    }
}

/// Directory name grouping all scenes of one region.
pub fn region_dir_name(region: &str) -> String {
    path_component(region)
}

/// Directory name of one scene's output.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SceneKey(String);

impl SceneKey {
    pub fn new(scene: &SceneRecord, style: KeyStyle) -> Self {
        let id = path_component(&scene.id);

        match style {
            KeyStyle::Id => Self(id),
            KeyStyle::IdWithDate => Self(format!(
                "{}_{}",
                id,
                scene.ingestion_date.format("%Y%m%d")
            )),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SceneKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for SceneKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
