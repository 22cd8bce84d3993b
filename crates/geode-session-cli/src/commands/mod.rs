//! CLI command handlers.

pub mod config;
pub mod decode;
pub mod demo;

use std::path::PathBuf;

use geode_session_config::LoadedConfig;

/// Shared context for all commands.
#[derive(Debug, Clone)]
pub struct Context {
    /// Output as JSON for scripting.
    pub json_output: bool,
    /// Verbose output enabled.
    pub verbose: bool,
    /// User config directory override from the command line.
    pub config_dir: Option<PathBuf>,
    /// Merged configuration and the files it came from.
    pub loaded: LoadedConfig,
}

impl Context {
    /// User config file path, honouring `--config-dir`.
    pub fn user_config_path(&self) -> Option<PathBuf> {
        geode_session_config::user_config_path(self.config_dir.as_deref())
    }
}
