//! Configuration system for geode-session.
//!
//! Provides TOML-based configuration with:
//! - `[session]`, `[region]`, `[pool]` and `[logging]` sections
//! - Config file layering (user config dir + project-local overrides)
//! - Capability traits so the session crate can read settings without
//!   depending on the file layout

pub mod discovery;
pub mod error;
pub mod provider;
pub mod types;

pub use discovery::{
    CONFIG_DIR_ENV, ConfigLayer, ConfigSource, LoadedConfig, load_config, project_config_path,
    save_config, user_config_dir, user_config_path,
};
pub use error::{ConfigError, Result};
pub use provider::{ConfigProvider, HasSessionConfig, SessionSettingsProvider, defaults};
pub use types::*;
