//! Configuration for the session repository and the local region.

use std::time::Duration;

use geode_session_config::{HasSessionConfig, defaults};

/// Default maximum number of entries held by a [`LocalRegion`](crate::LocalRegion).
pub const DEFAULT_MAX_ENTRIES: usize = defaults::MAX_ENTRIES;

/// Default max inactive interval for new sessions (30 minutes).
pub const DEFAULT_MAX_INACTIVE_INTERVAL_SECS: i64 = defaults::MAX_INACTIVE_INTERVAL_SECS;

/// Default region name.
pub const DEFAULT_REGION_NAME: &str = defaults::REGION_NAME;

/// Registry name of the default session serializer.
pub const DEFAULT_SERIALIZER: &str = defaults::SERIALIZER;

/// Configuration for the in-process region.
#[derive(Debug, Clone)]
pub struct LocalRegionConfig {
    /// Region name reported through [`Region::name`](crate::Region::name).
    pub name: String,

    /// Maximum number of entries before LRU eviction.
    pub max_entries: usize,

    /// Interval between runs of the expiration task.
    pub expiration_interval: Duration,
}

impl Default for LocalRegionConfig {
    fn default() -> Self {
        Self {
            name: DEFAULT_REGION_NAME.to_string(),
            max_entries: DEFAULT_MAX_ENTRIES,
            expiration_interval: defaults::expiration_interval(),
        }
    }
}

impl LocalRegionConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from any session configuration provider.
    pub fn from_session_config<C: HasSessionConfig>(config: &C) -> Self {
        Self {
            name: config.region_name().to_string(),
            max_entries: config.max_entries(),
            expiration_interval: config.expiration_interval(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_max_entries(mut self, max: usize) -> Self {
        self.max_entries = max;
        self
    }

    pub fn with_expiration_interval(mut self, interval: Duration) -> Self {
        self.expiration_interval = interval;
        self
    }
}

/// Configuration for [`SessionRepository`](crate::SessionRepository).
#[derive(Debug, Clone)]
pub struct RepositoryConfig {
    /// Max inactive interval given to new sessions; `<= 0` means never expire.
    pub max_inactive_interval_secs: i64,

    /// Registry name of the session serializer used for writes.
    pub serializer: String,
}

impl Default for RepositoryConfig {
    fn default() -> Self {
        Self {
            max_inactive_interval_secs: DEFAULT_MAX_INACTIVE_INTERVAL_SECS,
            serializer: DEFAULT_SERIALIZER.to_string(),
        }
    }
}

impl RepositoryConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from any session configuration provider.
    pub fn from_session_config<C: HasSessionConfig>(config: &C) -> Self {
        Self {
            max_inactive_interval_secs: config.max_inactive_interval_secs(),
            serializer: config.serializer_name().to_string(),
        }
    }

    pub fn with_max_inactive_interval_secs(mut self, secs: i64) -> Self {
        self.max_inactive_interval_secs = secs;
        self
    }

    pub fn with_serializer(mut self, name: impl Into<String>) -> Self {
        self.serializer = name.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geode_session_config::SessionSettingsProvider;

    #[test]
    fn test_builders() {
        let config = RepositoryConfig::new()
            .with_max_inactive_interval_secs(5)
            .with_serializer("custom");
        assert_eq!(config.max_inactive_interval_secs, 5);
        assert_eq!(config.serializer, "custom");

        let region = LocalRegionConfig::new().with_name("R").with_max_entries(3);
        assert_eq!(region.name, "R");
        assert_eq!(region.max_entries, 3);
    }

    #[test]
    fn test_from_session_config() {
        let provider = SessionSettingsProvider {
            max_inactive_interval_secs: 42,
            region_name: "Web".into(),
            max_entries: 7,
            ..Default::default()
        };

        let repo = RepositoryConfig::from_session_config(&provider);
        assert_eq!(repo.max_inactive_interval_secs, 42);
        assert_eq!(repo.serializer, DEFAULT_SERIALIZER);

        let region = LocalRegionConfig::from_session_config(&provider);
        assert_eq!(region.name, "Web");
        assert_eq!(region.max_entries, 7);
    }
}
