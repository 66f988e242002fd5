use std::collections::{HashMap, HashSet};
use std::fs;
use std::io;
use std::path::Path;

use serde::de::DeserializeOwned;
use tracing::{info, warn};

use crate::ServerPaths;

use super::compiler::parse_monster_defs;
use super::database::GameData;
use super::types::{
    ConnectorDefinition, DataError, DataErrorCode, MapDefinition, SourceLocation, SpawnDefinition,
};

pub const MAPS_FILE: &str = "maps.json";
pub const SPAWNS_FILE: &str = "spawns.json";
pub const CONNECTORS_FILE: &str = "connectors.json";
pub const MONSTERS_FILE: &str = "monsters.xml";

/// Loads every table from the data directory. Only `maps.json` is required;
/// missing spawn, connector or monster files load as empty tables.
pub fn load_game_data(paths: &ServerPaths) -> Result<GameData, DataError> {
    let data_dir = &paths.data_dir;

    let maps: Vec<MapDefinition> = read_json_required(&data_dir.join(MAPS_FILE))?;
    let mut seen_codes = HashSet::<&str>::new();
    for map in &maps {
        if !seen_codes.insert(map.code.as_str()) {
            return Err(DataError {
                code: DataErrorCode::DuplicateMap,
                message: format!("map code '{}' is defined more than once", map.code),
                file_path: data_dir.join(MAPS_FILE),
                location: None,
            });
        }
    }

    let spawns: HashMap<String, Vec<SpawnDefinition>> =
        read_json_optional(&data_dir.join(SPAWNS_FILE))?.unwrap_or_default();
    let connectors: HashMap<String, Vec<ConnectorDefinition>> =
        read_json_optional(&data_dir.join(CONNECTORS_FILE))?.unwrap_or_default();

    let monsters_path = data_dir.join(MONSTERS_FILE);
    let monsters = match read_text_optional(&monsters_path)? {
        Some(raw) => parse_monster_defs(&monsters_path, &raw)?,
        None => {
            warn!(path = %monsters_path.display(), "monster_defs_missing");
            Vec::new()
        }
    };

    for map_code in spawns.keys().chain(connectors.keys()) {
        if !seen_codes.contains(map_code.as_str()) {
            warn!(map_code = %map_code, "table_entry_for_unknown_map");
        }
    }

    let data = GameData::new(maps, spawns, connectors, monsters);
    info!(
        data_dir = %data_dir.display(),
        map_count = data.maps().len(),
        monster_def_count = data.monsters().len(),
        spawn_total = data.total_spawn_count(),
        "game_data_loaded"
    );
    Ok(data)
}

fn read_json_required<T: DeserializeOwned>(path: &Path) -> Result<T, DataError> {
    let raw = fs::read_to_string(path).map_err(|source| read_error(path, source))?;
    parse_json(path, &raw)
}

fn read_json_optional<T: DeserializeOwned>(path: &Path) -> Result<Option<T>, DataError> {
    match read_text_optional(path)? {
        Some(raw) => parse_json(path, &raw).map(Some),
        None => Ok(None),
    }
}

fn read_text_optional(path: &Path) -> Result<Option<String>, DataError> {
    match fs::read_to_string(path) {
        Ok(raw) => Ok(Some(raw)),
        Err(error) if error.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(source) => Err(read_error(path, source)),
    }
}

fn parse_json<T: DeserializeOwned>(path: &Path, raw: &str) -> Result<T, DataError> {
    serde_json::from_str::<T>(raw).map_err(|error| DataError {
        code: DataErrorCode::JsonMalformed,
        message: format!("invalid JSON: {error}"),
        file_path: path.to_path_buf(),
        location: Some(SourceLocation {
            line: error.line(),
            column: error.column(),
        }),
    })
}

fn read_error(path: &Path, source: io::Error) -> DataError {
    DataError {
        code: DataErrorCode::ReadFile,
        message: format!("failed to read data file: {source}"),
        file_path: path.to_path_buf(),
        location: None,
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use tempfile::TempDir;

    use super::*;

    fn setup_paths(root: &Path) -> ServerPaths {
        let data_dir = root.join("data");
        fs::create_dir_all(&data_dir).expect("data dir");
        ServerPaths {
            root: root.to_path_buf(),
            data_dir,
        }
    }

    fn write_file(path: &Path, content: &str) {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("mkdir");
        }
        fs::write(path, content).expect("write");
    }

    fn repo_data_dir() -> PathBuf {
        PathBuf::from(env!("CARGO_MANIFEST_DIR"))
            .join("..")
            .join("..")
            .join("data")
    }

    const ONE_MAP: &str =
        r#"[{"code":"test","name":"Test","walk":{"rows":["...","..."]}}]"#;

    #[test]
    fn maps_only_directory_loads_with_empty_tables() {
        let temp = TempDir::new().expect("temp");
        let paths = setup_paths(temp.path());
        write_file(&paths.data_dir.join(MAPS_FILE), ONE_MAP);

        let data = load_game_data(&paths).expect("load");

        assert_eq!(data.maps().len(), 1);
        assert!(data.spawns_for_map("test").is_empty());
        assert!(data.connectors_for_map("test").is_empty());
        assert!(data.monsters().is_empty());
    }

    #[test]
    fn missing_maps_file_is_a_read_error() {
        let temp = TempDir::new().expect("temp");
        let paths = setup_paths(temp.path());
        let err = load_game_data(&paths).expect_err("err");
        assert_eq!(err.code, DataErrorCode::ReadFile);
    }

    #[test]
    fn malformed_spawns_report_line_and_column() {
        let temp = TempDir::new().expect("temp");
        let paths = setup_paths(temp.path());
        write_file(&paths.data_dir.join(MAPS_FILE), ONE_MAP);
        write_file(
            &paths.data_dir.join(SPAWNS_FILE),
            "{\n  \"test\": [{\"class\": 5}]\n}",
        );

        let err = load_game_data(&paths).expect_err("err");

        assert_eq!(err.code, DataErrorCode::JsonMalformed);
        assert_eq!(err.location.map(|loc| loc.line), Some(2));
        assert!(err.file_path.ends_with(SPAWNS_FILE));
    }

    #[test]
    fn duplicate_map_codes_error() {
        let temp = TempDir::new().expect("temp");
        let paths = setup_paths(temp.path());
        write_file(
            &paths.data_dir.join(MAPS_FILE),
            r#"[{"code":"a","name":"A","walk":{"rows":["."]}},{"code":"a","name":"B","walk":{"rows":["."]}}]"#,
        );
        let err = load_game_data(&paths).expect_err("err");
        assert_eq!(err.code, DataErrorCode::DuplicateMap);
    }

    #[test]
    fn spawn_defaults_fill_missing_fields() {
        let temp = TempDir::new().expect("temp");
        let paths = setup_paths(temp.path());
        write_file(&paths.data_dir.join(MAPS_FILE), ONE_MAP);
        write_file(
            &paths.data_dir.join(SPAWNS_FILE),
            r#"{"test":[{"class":"PORING"}]}"#,
        );
        let data = load_game_data(&paths).expect("load");
        let spawn = &data.spawns_for_map("test")[0];
        assert_eq!((spawn.x, spawn.y, spawn.width, spawn.height), (0, 0, 0, 0));
        assert_eq!(spawn.count, 1);
    }

    #[test]
    fn bundled_data_directory_loads() {
        let temp = TempDir::new().expect("temp");
        let root = temp.path();
        let paths = ServerPaths {
            root: root.to_path_buf(),
            data_dir: repo_data_dir(),
        };
        let data = load_game_data(&paths).expect("bundled data");
        assert!(!data.maps().is_empty());
        assert!(data.monster_id_for_code("PORING").is_some());
        assert!(data.monster_by_id(1000).is_some());
    }
}
