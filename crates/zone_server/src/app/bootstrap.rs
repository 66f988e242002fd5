use std::env;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;
use zone_core::{ServerConfig, WorldConfig};

const CONFIG_PATH_ENV_VAR: &str = "ZONE_CONFIG";
const MAX_TICKS_ENV_VAR: &str = "ZONE_MAX_TICKS";
const RNG_SEED_ENV_VAR: &str = "ZONE_RNG_SEED";
const DEFAULT_CONFIG_FILE: &str = "zone_server.json";

pub(crate) struct ServerWiring {
    pub(crate) config: ServerConfig,
}

#[derive(Debug, Error)]
pub(crate) enum ConfigError {
    #[error("failed to read config '{}': {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("parse config '{}' at {field_path}: {message}", .path.display())]
    Parse {
        path: PathBuf,
        field_path: String,
        message: String,
    },
    #[error("{var}='{value}' is not a valid unsigned integer")]
    InvalidEnv { var: &'static str, value: String },
}

/// Optional overrides read from `zone_server.json`. Absent keys keep the
/// built-in defaults.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct ServerFileConfig {
    target_tps: Option<u32>,
    max_ticks_per_frame: Option<u32>,
    metrics_log_interval_ms: Option<u64>,
    max_ticks: Option<u64>,
    world: Option<WorldConfig>,
}

pub(crate) fn build_server() -> Result<ServerWiring, ExitCode> {
    init_tracing();
    info!("=== Zone Server Startup ===");

    match load_server_config() {
        Ok(config) => {
            info!(
                target_tps = config.target_tps,
                max_ticks = ?config.max_ticks,
                rng_seed = ?config.world.rng_seed,
                "config_loaded"
            );
            Ok(ServerWiring { config })
        }
        Err(err) => {
            error!(error = %err, "config_invalid");
            Err(ExitCode::FAILURE)
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_names(true)
        .compact()
        .init();
}

fn load_server_config() -> Result<ServerConfig, ConfigError> {
    let explicit_path = env::var(CONFIG_PATH_ENV_VAR).ok().map(PathBuf::from);
    let file_config = match &explicit_path {
        Some(path) => Some(read_config_file(path)?),
        None => {
            let default_path = Path::new(DEFAULT_CONFIG_FILE);
            if default_path.is_file() {
                Some(read_config_file(default_path)?)
            } else {
                None
            }
        }
    };

    let mut config = ServerConfig::default();
    if let Some(file_config) = file_config {
        apply_file_config(&mut config, file_config);
    }
    let max_ticks = parse_env_u64(MAX_TICKS_ENV_VAR, env::var(MAX_TICKS_ENV_VAR).ok())?;
    if let Some(max_ticks) = max_ticks {
        config.max_ticks = Some(max_ticks);
    }
    let rng_seed = parse_env_u64(RNG_SEED_ENV_VAR, env::var(RNG_SEED_ENV_VAR).ok())?;
    if let Some(seed) = rng_seed {
        config.world.rng_seed = Some(seed);
    }
    Ok(config)
}

fn read_config_file(path: &Path) -> Result<ServerFileConfig, ConfigError> {
    let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    parse_config_json(path, &raw)
}

fn parse_config_json(path: &Path, raw: &str) -> Result<ServerFileConfig, ConfigError> {
    let mut deserializer = serde_json::Deserializer::from_str(raw);
    serde_path_to_error::deserialize::<_, ServerFileConfig>(&mut deserializer).map_err(|error| {
        let field_path = error.path().to_string();
        let source = error.into_inner();
        ConfigError::Parse {
            path: path.to_path_buf(),
            field_path,
            message: source.to_string(),
        }
    })
}

fn apply_file_config(config: &mut ServerConfig, file: ServerFileConfig) {
    if let Some(target_tps) = file.target_tps {
        config.target_tps = target_tps;
    }
    if let Some(max_ticks_per_frame) = file.max_ticks_per_frame {
        config.max_ticks_per_frame = max_ticks_per_frame;
    }
    if let Some(interval_ms) = file.metrics_log_interval_ms {
        config.metrics_log_interval = Duration::from_millis(interval_ms);
    }
    if file.max_ticks.is_some() {
        config.max_ticks = file.max_ticks;
    }
    if let Some(world) = file.world {
        config.world = world;
    }
}

fn parse_env_u64(var: &'static str, value: Option<String>) -> Result<Option<u64>, ConfigError> {
    let Some(value) = value else {
        return Ok(None);
    };
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    trimmed
        .parse::<u64>()
        .map(Some)
        .map_err(|_| ConfigError::InvalidEnv { var, value })
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    #[test]
    fn file_overrides_apply_on_top_of_defaults() {
        let temp = TempDir::new().expect("temp");
        let path = temp.path().join(DEFAULT_CONFIG_FILE);
        fs::write(
            &path,
            r#"{"target_tps": 30, "max_ticks": 90, "world": {"rng_seed": 5}}"#,
        )
        .expect("write");

        let file = read_config_file(&path).expect("config");
        let mut config = ServerConfig::default();
        apply_file_config(&mut config, file);

        assert_eq!(config.target_tps, 30);
        assert_eq!(config.max_ticks, Some(90));
        assert_eq!(config.world.rng_seed, Some(5));
        assert_eq!(
            config.world.max_entity_id,
            WorldConfig::default().max_entity_id
        );
        assert_eq!(
            config.max_ticks_per_frame,
            ServerConfig::default().max_ticks_per_frame
        );
    }

    #[test]
    fn parse_error_names_the_field_path() {
        let err = parse_config_json(
            Path::new("zone_server.json"),
            r#"{"world": {"keep_alive_timeout_seconds": "soon"}}"#,
        )
        .expect_err("err");

        match err {
            ConfigError::Parse { field_path, .. } => {
                assert_eq!(field_path, "world.keep_alive_timeout_seconds");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let err = parse_config_json(Path::new("zone_server.json"), r#"{"tps": 10}"#)
            .expect_err("err");
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn missing_file_is_a_read_error() {
        let temp = TempDir::new().expect("temp");
        let err = read_config_file(&temp.path().join("absent.json")).expect_err("err");
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn env_values_parse_or_report() {
        assert_eq!(parse_env_u64(MAX_TICKS_ENV_VAR, None).expect("none"), None);
        assert_eq!(
            parse_env_u64(MAX_TICKS_ENV_VAR, Some(" 12 ".to_string())).expect("value"),
            Some(12)
        );
        assert_eq!(
            parse_env_u64(RNG_SEED_ENV_VAR, Some(String::new())).expect("blank"),
            None
        );
        assert!(matches!(
            parse_env_u64(RNG_SEED_ENV_VAR, Some("abc".to_string())),
            Err(ConfigError::InvalidEnv { .. })
        ));
    }
}
