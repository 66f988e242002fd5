use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::geom::Area;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceLocation {
    pub line: usize,
    pub column: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataErrorCode {
    ReadFile,
    JsonMalformed,
    XmlMalformed,
    InvalidRoot,
    UnknownDefType,
    UnknownField,
    DuplicateField,
    MissingField,
    InvalidValue,
    DuplicateDef,
    DuplicateMap,
}

#[derive(Debug, Clone)]
pub struct DataError {
    pub code: DataErrorCode,
    pub message: String,
    pub file_path: PathBuf,
    pub location: Option<SourceLocation>,
}

impl fmt::Display for DataError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.location {
            Some(loc) => write!(
                f,
                "{:?}: {} (file={}, line={}, column={})",
                self.code,
                self.message,
                self.file_path.display(),
                loc.line,
                loc.column
            ),
            None => write!(
                f,
                "{:?}: {} (file={})",
                self.code,
                self.message,
                self.file_path.display()
            ),
        }
    }
}

impl std::error::Error for DataError {}

/// Walkability rows, bottom row first. `.` is walkable, `#` blocked.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct WalkGrid {
    pub rows: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct MapDefinition {
    pub code: String,
    pub name: String,
    pub walk: WalkGrid,
}

/// `count` monsters of `class` around `(x, y)`. `width`/`height` are half-extents;
/// all-zero coordinates mean "anywhere on the map".
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct SpawnDefinition {
    pub class: String,
    #[serde(default)]
    pub x: i32,
    #[serde(default)]
    pub y: i32,
    #[serde(default)]
    pub width: i32,
    #[serde(default)]
    pub height: i32,
    #[serde(default = "default_spawn_count")]
    pub count: u32,
}

fn default_spawn_count() -> u32 {
    1
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ConnectorDefinition {
    pub src_area: Area,
    pub dst_map: String,
    pub dst_area: Area,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MonsterTemplate {
    pub id: i32,
    pub code: String,
    pub name: String,
    pub move_speed: f32,
    pub max_hp: u32,
}
