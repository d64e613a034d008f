use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

pub mod ability;
pub mod atomic_io;
pub mod build_world;
pub mod content;
pub mod names;
pub mod registry;
pub mod ui;
pub mod world;

#[cfg(test)]
mod test_support;

pub use ability::{
    attempt_placement, AbilityActor, AbilityRegistry, FactoryAbility, PlacementError,
    PlacementReceipt,
};
pub use atomic_io::write_text_atomic;
pub use build_world::{
    find_legal_site, place_anywhere, place_thing, BuildWorldListener, BuildWorldPipeline,
    BuildWorldReport, ListenerError, ListenerOutcome, ListenerRegistry, ListenerState,
};
pub use content::{
    compile_thing_defs, ContentCompileError, ContentErrorCode, ContentFactory, ContentRequest,
    DefFactory, SourceLocation, ThingDef, ThingDefDatabase, ThingDefId, ThingRecipe,
};
pub use names::{generate_file_name, generate_name, NameGrammar, NameGrammarError};
pub use registry::RegistryError;
pub use ui::{PopupConfig, PopupHandle, PopupKind, UiContext, UiElement};
pub use world::{
    refresh_fields_of_view, Component, ComponentKind, ComponentList, ConfigurationError,
    DisplayMessage, Entity, EntityId, IllegalSiteReason, Rgb, SceneWorld, SightRadius, Thing,
    TileKind, TilePos, Tilemap,
};

pub const ROOT_ENV_VAR: &str = "DUNGEON_ROOT";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppPaths {
    pub root: PathBuf,
    pub base_content_dir: PathBuf,
    pub mods_dir: PathBuf,
    pub config_dir: PathBuf,
    pub saves_dir: PathBuf,
}

impl AppPaths {
    /// Standard layout below `root`. Creates nothing.
    pub fn under_root(root: PathBuf) -> Self {
        Self {
            base_content_dir: root.join("assets").join("base"),
            mods_dir: root.join("mods"),
            config_dir: root.join("config"),
            saves_dir: root.join("saves"),
            root,
        }
    }
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
    #[error("failed to create saves directory at {path}: {source}")]
    CreateSavesDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error(
        "DUNGEON_ROOT is set but does not point to a valid project root: {path}\n\
A valid root must contain Cargo.toml and either crates/ or assets/."
    )]
    InvalidEnvRoot { path: PathBuf },
    #[error(
        "Could not detect project root by walking upward from executable directory: {start_dir}\n\
Expected a directory containing Cargo.toml and either crates/ or assets/.\n\
Set {env_var} explicitly, for example:\n\
Bash/zsh: export {env_var}=\"/path/to/dungeon\""
    )]
    RootNotFound {
        start_dir: PathBuf,
        env_var: &'static str,
    },
}

pub fn resolve_app_paths() -> Result<AppPaths, StartupError> {
    let paths = AppPaths::under_root(resolve_root()?);
    fs::create_dir_all(&paths.saves_dir).map_err(|source| StartupError::CreateSavesDir {
        path: paths.saves_dir.clone(),
        source,
    })?;
    Ok(paths)
}

fn resolve_root() -> Result<PathBuf, StartupError> {
    match env::var(ROOT_ENV_VAR) {
        Ok(value) => {
            let normalized = normalize_path(&PathBuf::from(value));
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

            exe_dir
                .ancestors()
                .find(|candidate| is_repo_marker(candidate))
                .map(normalize_path)
                .ok_or_else(|| StartupError::RootNotFound {
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
    let cargo_toml = path.join("Cargo.toml").is_file();
    let has_crates = path.join("crates").is_dir();
    let has_assets = path.join("assets").is_dir();

    cargo_toml && (has_crates || has_assets)
}

fn normalize_path(path: &Path) -> PathBuf {
    fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    #[test]
    fn repo_marker_requires_cargo_toml() {
        let temp = TempDir::new().expect("temp");
        fs::create_dir_all(temp.path().join("assets")).expect("assets");
        assert!(!is_repo_marker(temp.path()));

        fs::write(temp.path().join("Cargo.toml"), "[workspace]\n").expect("manifest");
        assert!(is_repo_marker(temp.path()));
    }

    #[test]
    fn layout_hangs_off_the_root() {
        let paths = AppPaths::under_root(PathBuf::from("/srv/dungeon"));
        assert_eq!(paths.base_content_dir, PathBuf::from("/srv/dungeon/assets/base"));
        assert_eq!(paths.mods_dir, PathBuf::from("/srv/dungeon/mods"));
        assert_eq!(paths.config_dir, PathBuf::from("/srv/dungeon/config"));
        assert_eq!(paths.saves_dir, PathBuf::from("/srv/dungeon/saves"));
    }
}
