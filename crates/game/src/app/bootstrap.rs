use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use engine::{
    compile_thing_defs, resolve_app_paths, AppPaths, ConfigurationError, ContentCompileError,
    ContentRequest, RegistryError, StartupError,
};
use serde::Deserialize;
use thiserror::Error;
use tracing::info;
use tracing_subscriber::EnvFilter;

use super::session::GameSession;

const SEED_ENV_VAR: &str = "DUNGEON_SEED";
const ENABLED_MODS_ENV_VAR: &str = "DUNGEON_ENABLED_MODS";
const CONFIG_FILE_NAME: &str = "game.json";
const MIN_MAP_SIDE: u32 = 3;
const MAX_MAP_SIDE: u32 = 256;

#[derive(Debug, Error)]
pub(crate) enum GameError {
    #[error(transparent)]
    Startup(#[from] StartupError),
    #[error("failed to read config {path}: {source}")]
    ReadConfig {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("invalid config {path} at {json_path}: {message}")]
    ParseConfig {
        path: PathBuf,
        json_path: String,
        message: String,
    },
    #[error("invalid config: {0}")]
    InvalidConfig(String),
    #[error("DUNGEON_SEED must be an unsigned integer, got '{value}'")]
    InvalidSeedOverride { value: String },
    #[error(transparent)]
    Content(#[from] ContentCompileError),
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),
    #[error(transparent)]
    Registry(#[from] RegistryError),
    #[error("failed to serialize save: {0}")]
    SerializeSave(#[source] serde_json::Error),
    #[error("failed to write save {path}: {source}")]
    WriteSave {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("terminal i/o failed: {0}")]
    Terminal(#[source] io::Error),
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct GameConfig {
    pub(crate) seed: u64,
    pub(crate) map_width: u32,
    pub(crate) map_height: u32,
    pub(crate) starting_gold: u32,
    pub(crate) listeners: Vec<String>,
    pub(crate) enabled_mods: Vec<String>,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            seed: 1337,
            map_width: 24,
            map_height: 16,
            starting_gold: 20,
            listeners: vec![
                "raise_watchtowers".to_string(),
                "scatter_treasure".to_string(),
                "spawn_monsters".to_string(),
            ],
            enabled_mods: Vec::new(),
        }
    }
}

impl GameConfig {
    fn validate(&self) -> Result<(), GameError> {
        if self.map_width < MIN_MAP_SIDE || self.map_height < MIN_MAP_SIDE {
            return Err(GameError::InvalidConfig(format!(
                "map must be at least {MIN_MAP_SIDE}x{MIN_MAP_SIDE}, got {}x{}",
                self.map_width, self.map_height
            )));
        }
        if self.map_width > MAX_MAP_SIDE || self.map_height > MAX_MAP_SIDE {
            return Err(GameError::InvalidConfig(format!(
                "map must be at most {MAX_MAP_SIDE}x{MAX_MAP_SIDE}, got {}x{}",
                self.map_width, self.map_height
            )));
        }
        Ok(())
    }
}

pub(crate) fn build_app() -> Result<GameSession, GameError> {
    init_tracing();
    info!("=== Dungeon Startup ===");

    let paths = resolve_app_paths()?;
    let config = load_game_config(&paths)?;
    let config = apply_env_overrides(
        config,
        std::env::var(SEED_ENV_VAR).ok(),
        std::env::var(ENABLED_MODS_ENV_VAR).ok(),
    )?;
    config.validate()?;
    info!(
        root = %paths.root.display(),
        seed = config.seed,
        listeners = config.listeners.len(),
        enabled_mods = config.enabled_mods.len(),
        "config_loaded"
    );

    let database = compile_thing_defs(
        &paths,
        &ContentRequest {
            enabled_mods: config.enabled_mods.clone(),
        },
    )?;
    info!(thing_defs = database.len(), "content_compiled");

    GameSession::new(paths, &config, &database)
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .compact()
        .init();
}

/// Missing config file means defaults.
pub(crate) fn load_game_config(paths: &AppPaths) -> Result<GameConfig, GameError> {
    let path = paths.config_dir.join(CONFIG_FILE_NAME);
    let raw = match fs::read_to_string(&path) {
        Ok(raw) => raw,
        Err(error) if error.kind() == io::ErrorKind::NotFound => return Ok(GameConfig::default()),
        Err(source) => return Err(GameError::ReadConfig { path, source }),
    };
    parse_game_config(&path, &raw)
}

fn parse_game_config(path: &Path, raw: &str) -> Result<GameConfig, GameError> {
    let mut deserializer = serde_json::Deserializer::from_str(raw);
    serde_path_to_error::deserialize::<_, GameConfig>(&mut deserializer).map_err(|error| {
        let json_path = error.path().to_string();
        GameError::ParseConfig {
            path: path.to_path_buf(),
            json_path,
            message: error.into_inner().to_string(),
        }
    })
}

pub(crate) fn apply_env_overrides(
    mut config: GameConfig,
    seed: Option<String>,
    enabled_mods: Option<String>,
) -> Result<GameConfig, GameError> {
    if let Some(raw) = seed {
        config.seed = raw
            .trim()
            .parse()
            .map_err(|_| GameError::InvalidSeedOverride { value: raw.clone() })?;
    }
    if let Some(raw) = enabled_mods {
        config.enabled_mods = parse_enabled_mods(&raw);
    }
    Ok(config)
}

fn parse_enabled_mods(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(ToString::to_string)
        .collect()
}
