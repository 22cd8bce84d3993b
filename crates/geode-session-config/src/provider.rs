//! Configuration traits for decoupled config passing between crates.
//!
//! The session crate reads its settings through [`HasSessionConfig`] so it
//! can be configured from a loaded [`GeodeSessionConfig`] or from a
//! standalone [`SessionSettingsProvider`].

use std::time::Duration;

use crate::GeodeSessionConfig;

/// Base trait for all configuration types.
///
/// Implementations should be cheaply cloneable and thread-safe.
pub trait ConfigProvider: Clone + Send + Sync + 'static {}

/// Session replication configuration.
pub trait HasSessionConfig: ConfigProvider {
    /// Name of the region sessions are stored in.
    fn region_name(&self) -> &str;

    /// Idle seconds before a new session expires; `<= 0` means never.
    fn max_inactive_interval_secs(&self) -> i64;

    /// Registry name of the session serializer.
    fn serializer_name(&self) -> &str;

    /// Entries a local region keeps before LRU eviction.
    fn max_entries(&self) -> usize {
        defaults::MAX_ENTRIES
    }

    /// Period of the region expiration task.
    fn expiration_interval(&self) -> Duration {
        defaults::expiration_interval()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Default values
// ─────────────────────────────────────────────────────────────────────────────

/// Default configuration values.
pub mod defaults {
    use std::time::Duration;

    pub const MAX_INACTIVE_INTERVAL_SECS: i64 = 1800;
    pub const SERIALIZER: &str = "data-session";
    pub const REGION_NAME: &str = "Sessions";
    pub const MAX_ENTRIES: usize = 10_000;
    pub const EXPIRATION_INTERVAL_MS: u64 = 1000;
    pub const POOL_NAME: &str = "DEFAULT";
    pub const POOL_SERVER: &str = "localhost:40404";
    pub const READ_TIMEOUT_MS: u64 = 10_000;
    pub const RETRY_ATTEMPTS: u32 = 1;
    pub const LOG_LEVEL: &str = "info";

    pub fn expiration_interval() -> Duration {
        Duration::from_millis(EXPIRATION_INTERVAL_MS)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Standalone provider
// ─────────────────────────────────────────────────────────────────────────────

/// Standalone session configuration.
#[derive(Debug, Clone)]
pub struct SessionSettingsProvider {
    pub max_inactive_interval_secs: i64,
    pub serializer: String,
    pub region_name: String,
    pub max_entries: usize,
    pub expiration_interval: Duration,
}

impl Default for SessionSettingsProvider {
    fn default() -> Self {
        Self {
            max_inactive_interval_secs: defaults::MAX_INACTIVE_INTERVAL_SECS,
            serializer: defaults::SERIALIZER.to_string(),
            region_name: defaults::REGION_NAME.to_string(),
            max_entries: defaults::MAX_ENTRIES,
            expiration_interval: defaults::expiration_interval(),
        }
    }
}

impl ConfigProvider for SessionSettingsProvider {}

impl HasSessionConfig for SessionSettingsProvider {
    fn region_name(&self) -> &str {
        &self.region_name
    }

    fn max_inactive_interval_secs(&self) -> i64 {
        self.max_inactive_interval_secs
    }

    fn serializer_name(&self) -> &str {
        &self.serializer
    }

    fn max_entries(&self) -> usize {
        self.max_entries
    }

    fn expiration_interval(&self) -> Duration {
        self.expiration_interval
    }
}

impl From<&GeodeSessionConfig> for SessionSettingsProvider {
    fn from(config: &GeodeSessionConfig) -> Self {
        let session = config.session_or_default();
        let region = config.region_or_default();
        let expiration_interval = region.expiration_interval();
        Self {
            max_inactive_interval_secs: session.max_inactive_interval_secs,
            serializer: session.serializer,
            region_name: region.name,
            max_entries: region.max_entries,
            expiration_interval,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// File-backed provider
// ─────────────────────────────────────────────────────────────────────────────

impl ConfigProvider for GeodeSessionConfig {}

impl HasSessionConfig for GeodeSessionConfig {
    fn region_name(&self) -> &str {
        self.region
            .as_ref()
            .map(|r| r.name.as_str())
            .unwrap_or(defaults::REGION_NAME)
    }

    fn max_inactive_interval_secs(&self) -> i64 {
        self.session
            .as_ref()
            .map(|s| s.max_inactive_interval_secs)
            .unwrap_or(defaults::MAX_INACTIVE_INTERVAL_SECS)
    }

    fn serializer_name(&self) -> &str {
        self.session
            .as_ref()
            .map(|s| s.serializer.as_str())
            .unwrap_or(defaults::SERIALIZER)
    }

    fn max_entries(&self) -> usize {
        self.region
            .as_ref()
            .map(|r| r.max_entries)
            .unwrap_or(defaults::MAX_ENTRIES)
    }

    fn expiration_interval(&self) -> Duration {
        self.region
            .as_ref()
            .map(|r| r.expiration_interval())
            .unwrap_or_else(defaults::expiration_interval)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::RegionSection;

    #[test]
    fn test_settings_provider_defaults() {
        let provider = SessionSettingsProvider::default();
        assert_eq!(provider.region_name(), "Sessions");
        assert_eq!(provider.max_inactive_interval_secs(), 1800);
        assert_eq!(provider.serializer_name(), "data-session");
        assert_eq!(provider.expiration_interval(), Duration::from_secs(1));
    }

    #[test]
    fn test_empty_file_config_falls_back_to_defaults() {
        let config = GeodeSessionConfig::new();
        assert_eq!(config.region_name(), defaults::REGION_NAME);
        assert_eq!(config.max_entries(), defaults::MAX_ENTRIES);
    }

    #[test]
    fn test_file_config_provider() {
        let config = GeodeSessionConfig {
            region: Some(RegionSection {
                name: "Carts".into(),
                max_entries: 12,
                expiration_interval_ms: 50,
            }),
            ..Default::default()
        };

        assert_eq!(config.region_name(), "Carts");
        assert_eq!(config.max_entries(), 12);
        assert_eq!(config.expiration_interval(), Duration::from_millis(50));

        let standalone = SessionSettingsProvider::from(&config);
        assert_eq!(standalone.region_name, "Carts");
        assert_eq!(standalone.max_inactive_interval_secs, 1800);
        assert_eq!(standalone.max_entries, 12);
        assert_eq!(standalone.expiration_interval, Duration::from_millis(50));
    }
}
