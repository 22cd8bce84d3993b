//! Configuration types mapping to the TOML schema.
//!
//! Top-level config:
//! ```toml
//! [session]                # repository defaults for new sessions
//! [region]                 # region name, capacity and reaper period
//! [pool]                   # data grid client pool
//! [logging]                # log level and JSON log files
//! ```

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::ConfigError;
use crate::provider::defaults;

// ─────────────────────────────────────────────────────────────────────────────
// Top-level Config
// ─────────────────────────────────────────────────────────────────────────────

/// Root configuration structure.
///
/// Maps to the full TOML config file. All sections are optional so that
/// partial configs (e.g., project-local overrides) can be loaded and merged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeodeSessionConfig {
    /// Session repository settings.
    pub session: Option<SessionSection>,

    /// Cache region settings.
    pub region: Option<RegionSection>,

    /// Client connection pool settings.
    pub pool: Option<PoolSection>,

    /// Logging settings.
    pub logging: Option<LoggingSection>,
}

impl GeodeSessionConfig {
    /// Create an empty config.
    pub fn new() -> Self {
        Self::default()
    }

    /// Config with every section present and set to its defaults.
    pub fn with_defaults() -> Self {
        Self {
            session: Some(SessionSection::default()),
            region: Some(RegionSection::default()),
            pool: Some(PoolSection::default()),
            logging: Some(LoggingSection::default()),
        }
    }

    /// Parse from a TOML string.
    pub fn from_toml(toml_str: &str) -> crate::Result<Self> {
        Ok(toml::from_str(toml_str)?)
    }

    /// Serialize to a TOML string.
    pub fn to_toml(&self) -> crate::Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Merge another config on top of this one (other takes priority).
    pub fn merge(&mut self, other: GeodeSessionConfig) {
        if other.session.is_some() {
            self.session = other.session;
        }

        if other.region.is_some() {
            self.region = other.region;
        }

        if other.pool.is_some() {
            self.pool = other.pool;
        }

        if other.logging.is_some() {
            self.logging = other.logging;
        }
    }

    /// Reject values that parse but cannot be used.
    pub fn validate(&self) -> crate::Result<()> {
        if let Some(ref session) = self.session {
            session.validate()?;
        }
        if let Some(ref region) = self.region {
            region.validate()?;
        }
        if let Some(ref pool) = self.pool {
            pool.validate()?;
        }
        Ok(())
    }

    /// Drop every section that fails validation, keeping the rest.
    ///
    /// Returns one error per dropped section.
    pub fn retain_valid(&mut self) -> Vec<ConfigError> {
        let mut rejected = Vec::new();
        if let Some(Err(e)) = self.session.as_ref().map(SessionSection::validate) {
            self.session = None;
            rejected.push(e);
        }
        if let Some(Err(e)) = self.region.as_ref().map(RegionSection::validate) {
            self.region = None;
            rejected.push(e);
        }
        if let Some(Err(e)) = self.pool.as_ref().map(PoolSection::validate) {
            self.pool = None;
            rejected.push(e);
        }
        rejected
    }

    /// Session section, or its defaults when absent.
    pub fn session_or_default(&self) -> SessionSection {
        self.session.clone().unwrap_or_default()
    }

    /// Region section, or its defaults when absent.
    pub fn region_or_default(&self) -> RegionSection {
        self.region.clone().unwrap_or_default()
    }

    /// Pool section, or its defaults when absent.
    pub fn pool_or_default(&self) -> PoolSection {
        self.pool.clone().unwrap_or_default()
    }

    /// Logging section, or its defaults when absent.
    pub fn logging_or_default(&self) -> LoggingSection {
        self.logging.clone().unwrap_or_default()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Session Configuration
// ─────────────────────────────────────────────────────────────────────────────

/// Session repository configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionSection {
    /// Idle seconds before a session expires; `<= 0` means never.
    pub max_inactive_interval_secs: i64,
    /// Registry name of the session serializer.
    pub serializer: String,
}

impl Default for SessionSection {
    fn default() -> Self {
        Self {
            max_inactive_interval_secs: defaults::MAX_INACTIVE_INTERVAL_SECS,
            serializer: defaults::SERIALIZER.to_string(),
        }
    }
}

impl SessionSection {
    pub fn validate(&self) -> crate::Result<()> {
        if self.serializer.trim().is_empty() {
            return Err(ConfigError::invalid("session.serializer", "must not be empty"));
        }
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Region Configuration
// ─────────────────────────────────────────────────────────────────────────────

/// Cache region configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegionSection {
    /// Region name.
    pub name: String,
    /// Entries held before LRU eviction (local region only).
    pub max_entries: usize,
    /// Expiration task period in milliseconds.
    pub expiration_interval_ms: u64,
}

impl Default for RegionSection {
    fn default() -> Self {
        Self {
            name: defaults::REGION_NAME.to_string(),
            max_entries: defaults::MAX_ENTRIES,
            expiration_interval_ms: defaults::EXPIRATION_INTERVAL_MS,
        }
    }
}

impl RegionSection {
    pub fn validate(&self) -> crate::Result<()> {
        if self.name.trim().is_empty() {
            return Err(ConfigError::invalid("region.name", "must not be empty"));
        }
        if self.max_entries == 0 {
            return Err(ConfigError::invalid("region.max_entries", "must be at least 1"));
        }
        if self.expiration_interval_ms == 0 {
            return Err(ConfigError::invalid(
                "region.expiration_interval_ms",
                "must be at least 1",
            ));
        }
        Ok(())
    }

    pub fn expiration_interval(&self) -> Duration {
        Duration::from_millis(self.expiration_interval_ms)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Pool Configuration
// ─────────────────────────────────────────────────────────────────────────────

/// Data grid client pool configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolSection {
    /// Pool name.
    pub name: String,
    /// Server or locator endpoints (`host:port`).
    pub servers: Vec<String>,
    /// Whether the pool receives server-side entry notifications.
    pub subscription_enabled: bool,
    /// Read timeout in milliseconds.
    pub read_timeout_ms: u64,
    /// Attempts per operation before giving up.
    pub retry_attempts: u32,
}

impl Default for PoolSection {
    fn default() -> Self {
        Self {
            name: defaults::POOL_NAME.to_string(),
            servers: vec![defaults::POOL_SERVER.to_string()],
            subscription_enabled: true,
            read_timeout_ms: defaults::READ_TIMEOUT_MS,
            retry_attempts: defaults::RETRY_ATTEMPTS,
        }
    }
}

impl PoolSection {
    pub fn validate(&self) -> crate::Result<()> {
        if self.servers.is_empty() {
            return Err(ConfigError::invalid("pool.servers", "at least one server is required"));
        }
        Ok(())
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Logging Configuration
// ─────────────────────────────────────────────────────────────────────────────

/// Logging configuration section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    /// Default filter directive when `RUST_LOG` is unset.
    pub level: String,
    /// Whether to write daily-rotated JSON log files.
    pub json_file: bool,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: defaults::LOG_LEVEL.to_string(),
            json_file: true,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_config() {
        let config = GeodeSessionConfig::from_toml(
            r#"
[session]
max_inactive_interval_secs = 600
serializer = "data-session"

[region]
name = "WebSessions"
max_entries = 500
expiration_interval_ms = 250

[pool]
name = "grid"
servers = ["a:40404", "b:40404"]
subscription_enabled = false
read_timeout_ms = 2000
retry_attempts = 3

[logging]
level = "debug"
json_file = false
"#,
        )
        .unwrap();

        let session = config.session.as_ref().unwrap();
        assert_eq!(session.max_inactive_interval_secs, 600);

        let region = config.region.as_ref().unwrap();
        assert_eq!(region.name, "WebSessions");
        assert_eq!(region.expiration_interval(), Duration::from_millis(250));

        let pool = config.pool.as_ref().unwrap();
        assert_eq!(pool.servers.len(), 2);
        assert!(!pool.subscription_enabled);
        assert_eq!(pool.read_timeout(), Duration::from_secs(2));

        assert_eq!(config.logging.as_ref().unwrap().level, "debug");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_section_uses_defaults() {
        let config = GeodeSessionConfig::from_toml(
            r#"
[region]
name = "Other"
"#,
        )
        .unwrap();

        let region = config.region.unwrap();
        assert_eq!(region.name, "Other");
        assert_eq!(region.max_entries, defaults::MAX_ENTRIES);
        assert!(config.session.is_none());
    }

    #[test]
    fn test_empty_config() {
        let config = GeodeSessionConfig::from_toml("").unwrap();
        assert_eq!(config, GeodeSessionConfig::new());
        assert_eq!(config.session_or_default(), SessionSection::default());
    }

    #[test]
    fn test_merge_overrides_present_sections() {
        let mut base = GeodeSessionConfig::with_defaults();
        let overlay = GeodeSessionConfig {
            session: Some(SessionSection {
                max_inactive_interval_secs: 5,
                ..Default::default()
            }),
            ..Default::default()
        };

        base.merge(overlay);

        assert_eq!(base.session_or_default().max_inactive_interval_secs, 5);
        assert_eq!(base.region_or_default(), RegionSection::default());
    }

    #[test]
    fn test_toml_roundtrip() {
        let config = GeodeSessionConfig::with_defaults();
        let text = config.to_toml().unwrap();
        assert!(text.contains("[session]"));
        assert_eq!(GeodeSessionConfig::from_toml(&text).unwrap(), config);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let config = GeodeSessionConfig::from_toml("[region]\nmax_entries = 0\n").unwrap();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("region.max_entries"));

        let config = GeodeSessionConfig::from_toml("[pool]\nservers = []\n").unwrap();
        assert!(matches!(config.validate(), Err(ConfigError::Invalid { .. })));
    }

    #[test]
    fn test_retain_valid_drops_only_bad_sections() {
        let mut config = GeodeSessionConfig::from_toml(
            r#"
[session]
serializer = " "

[region]
name = "Carts"

[pool]
servers = []
"#,
        )
        .unwrap();

        let rejected = config.retain_valid();

        assert_eq!(rejected.len(), 2);
        assert!(rejected[0].to_string().contains("session.serializer"));
        assert!(rejected[1].to_string().contains("pool.servers"));
        assert!(config.session.is_none());
        assert!(config.pool.is_none());
        assert_eq!(config.region_or_default().name, "Carts");
        assert!(config.validate().is_ok());
    }
}
