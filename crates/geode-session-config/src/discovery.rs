//! Layered config loading.
//!
//! Two layers are read, and a section present in a later layer replaces the
//! whole section from an earlier one:
//!
//! 1. `config.toml` in the user config directory
//! 2. `geode-session.toml` in the project directory
//!
//! Loading never fails. A layer that cannot be read or parsed is skipped, and a
//! section that parses but fails validation is dropped on its own; both end up
//! in [`LoadedConfig::warnings`] and the remaining settings fall back to
//! defaults.

use std::fmt;
use std::path::{Path, PathBuf};

use crate::{ConfigError, GeodeSessionConfig, Result};

const PROJECT_CONFIG_FILE: &str = "geode-session.toml";
const USER_CONFIG_FILE: &str = "config.toml";
const APP_NAME: &str = "geode-session";

/// Overrides the platform user config directory.
pub const CONFIG_DIR_ENV: &str = "GEODE_SESSION_CONFIG_DIR";

/// Which layer a config file belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigLayer {
    User,
    Project,
}

impl fmt::Display for ConfigLayer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigLayer::User => write!(f, "user"),
            ConfigLayer::Project => write!(f, "project"),
        }
    }
}

/// A config file that was looked for.
#[derive(Debug, Clone)]
pub struct ConfigSource {
    pub layer: ConfigLayer,
    pub path: PathBuf,
    /// True when the file was parsed and at least partly merged.
    pub loaded: bool,
}

/// Merged configuration plus what happened while building it.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub config: GeodeSessionConfig,
    /// Layers in precedence order, lowest first.
    pub sources: Vec<ConfigSource>,
    pub warnings: Vec<String>,
}

impl LoadedConfig {
    pub fn loaded_from(&self) -> Vec<&Path> {
        self.sources
            .iter()
            .filter(|s| s.loaded)
            .map(|s| s.path.as_path())
            .collect()
    }
}

/// Load and merge the user and project layers.
///
/// `project_dir` defaults to the working directory. `config_dir` replaces the
/// user config directory from [`user_config_dir`].
pub fn load_config(project_dir: Option<&Path>, config_dir: Option<&Path>) -> LoadedConfig {
    let mut loaded = LoadedConfig {
        config: GeodeSessionConfig::new(),
        sources: Vec::with_capacity(2),
        warnings: Vec::new(),
    };

    if let Some(path) = user_config_path(config_dir) {
        merge_layer(&mut loaded, ConfigLayer::User, path);
    }
    let project_path = project_config_path(project_dir.unwrap_or_else(|| Path::new(".")));
    merge_layer(&mut loaded, ConfigLayer::Project, project_path);

    loaded
}

/// Write `config` as TOML, creating parent directories as needed.
pub fn save_config(config: &GeodeSessionConfig, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent).map_err(|e| ConfigError::WriteFile {
            path: parent.display().to_string(),
            source: e,
        })?;
    }

    std::fs::write(path, config.to_toml()?).map_err(|e| ConfigError::WriteFile {
        path: path.display().to_string(),
        source: e,
    })
}

/// `GEODE_SESSION_CONFIG_DIR`, else `<platform config dir>/geode-session`.
pub fn user_config_dir() -> Option<PathBuf> {
    if let Ok(dir) = std::env::var(CONFIG_DIR_ENV)
        && !dir.is_empty()
    {
        return Some(PathBuf::from(dir));
    }
    dirs::config_dir().map(|d| d.join(APP_NAME))
}

/// User config file under `config_dir`, or under [`user_config_dir`].
pub fn user_config_path(config_dir: Option<&Path>) -> Option<PathBuf> {
    match config_dir {
        Some(dir) => Some(dir.join(USER_CONFIG_FILE)),
        None => user_config_dir().map(|d| d.join(USER_CONFIG_FILE)),
    }
}

pub fn project_config_path(dir: &Path) -> PathBuf {
    dir.join(PROJECT_CONFIG_FILE)
}

fn merge_layer(loaded: &mut LoadedConfig, layer: ConfigLayer, path: PathBuf) {
    let merged = match read_layer(&path) {
        Ok(Some(mut config)) => {
            for rejected in config.retain_valid() {
                loaded.warnings.push(format!(
                    "{layer} config {}: {rejected}; section ignored",
                    path.display()
                ));
            }
            loaded.config.merge(config);
            true
        }
        Ok(None) => false,
        Err(e) => {
            loaded
                .warnings
                .push(format!("{layer} config {} skipped: {e}", path.display()));
            false
        }
    };
    loaded.sources.push(ConfigSource {
        layer,
        path,
        loaded: merged,
    });
}

fn read_layer(path: &Path) -> Result<Option<GeodeSessionConfig>> {
    if !path.is_file() {
        return Ok(None);
    }
    let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
        path: path.display().to_string(),
        source: e,
    })?;
    GeodeSessionConfig::from_toml(&contents).map(Some)
}
