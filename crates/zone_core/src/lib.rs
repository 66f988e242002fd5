use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

pub mod app;
pub mod config;
pub mod content;
pub mod entity;
pub mod geom;
pub mod map;
pub mod messaging;
pub mod world;

pub use app::{run_server, run_world, ServerConfig, ServerError, ServerSummary};
pub use config::WorldConfig;
pub use content::{
    load_game_data, parse_monster_defs, ConnectorDefinition, DataError, DataErrorCode, GameData,
    MapDefinition, MonsterTemplate, SourceLocation, SpawnDefinition, WalkGrid,
};
pub use entity::{
    Character, CharacterKind, CharacterState, CombatEntity, Direction, EntityHandle, EntityId,
    EntityStore, Monster, Player, Warp,
};
pub use geom::{Area, Position};
pub use map::{Map, MapId, WalkData, WalkDataError};
pub use messaging::{
    ConnectionId, NetworkConnection, OutboundBuffer, OutboundPacket, ServerMessage,
};
pub use world::{MapTickSummary, RemovedEntity, SystemId, TickReport, World, WorldError};

pub const ROOT_ENV_VAR: &str = "ZONE_ROOT";

#[derive(Debug, Clone)]
pub struct ServerPaths {
    pub root: PathBuf,
    pub data_dir: PathBuf,
}

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("failed to read environment variable {var}: {source}")]
    EnvVar {
        var: &'static str,
        #[source]
        source: env::VarError,
    },
    #[error("failed to resolve current executable path: {0}")]
    CurrentExe(#[source] std::io::Error),
    #[error("current executable path has no parent directory: {0}")]
    ExeHasNoParent(PathBuf),
    #[error(
        "ZONE_ROOT is set but does not point to a valid server root: {path}\n\
A valid root must contain Cargo.toml and a data/ directory."
    )]
    InvalidEnvRoot { path: PathBuf },
    #[error(
        "Could not detect server root by walking upward from executable directory: {start_dir}\n\
Expected a directory containing Cargo.toml and data/.\n\
Set {env_var} explicitly, for example:\n\
Bash/zsh: export {env_var}=\"/path/to/zone-server\""
    )]
    RootNotFound {
        start_dir: PathBuf,
        env_var: &'static str,
    },
}

pub fn resolve_server_paths() -> Result<ServerPaths, StartupError> {
    let root = resolve_root()?;
    Ok(server_paths_at(root))
}

pub fn server_paths_at(root: PathBuf) -> ServerPaths {
    let data_dir = root.join("data");
    ServerPaths { root, data_dir }
}

fn resolve_root() -> Result<PathBuf, StartupError> {
    match env::var(ROOT_ENV_VAR) {
        Ok(value) => {
            let raw = PathBuf::from(value);
            let normalized = normalize_path(&raw);
            if is_repo_marker(&normalized) {
                Ok(normalized)
            } else {
                Err(StartupError::InvalidEnvRoot { path: normalized })
            }
        }
        Err(env::VarError::NotPresent) => {
            let exe = env::current_exe().map_err(StartupError::CurrentExe)?;
            let exe_dir = exe
                .parent()
                .map(Path::to_path_buf)
                .ok_or_else(|| StartupError::ExeHasNoParent(exe.clone()))?;

            for candidate in exe_dir.ancestors() {
                if is_repo_marker(candidate) {
                    return Ok(normalize_path(candidate));
                }
            }

            Err(StartupError::RootNotFound {
                start_dir: normalize_path(&exe_dir),
                env_var: ROOT_ENV_VAR,
            })
        }
        Err(source) => Err(StartupError::EnvVar {
            var: ROOT_ENV_VAR,
            source,
        }),
    }
}

fn is_repo_marker(path: &Path) -> bool {
    path.join("Cargo.toml").is_file() && path.join("data").is_dir()
}

fn normalize_path(path: &Path) -> PathBuf {
    fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    #[test]
    fn repo_marker_requires_cargo_toml_and_data() {
        let temp = TempDir::new().expect("temp");
        assert!(!is_repo_marker(temp.path()));

        fs::create_dir_all(temp.path().join("data")).expect("data");
        assert!(!is_repo_marker(temp.path()));

        fs::write(temp.path().join("Cargo.toml"), "[workspace]\n").expect("toml");
        assert!(is_repo_marker(temp.path()));
    }

    #[test]
    fn server_paths_point_at_data_dir() {
        let paths = server_paths_at(PathBuf::from("/srv/zone"));
        assert_eq!(paths.data_dir, PathBuf::from("/srv/zone/data"));
    }
}
