//! Error types for session replication operations.

/// Error type for session serialization and repository operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The byte stream was truncated or malformed.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// A frame named a type identifier that is not registered.
    #[error("Unknown serializer type id: {0:#010X}")]
    UnknownType(u32),

    /// No serializer is registered under the configured name.
    #[error("Unknown serializer: {0}")]
    UnknownSerializer(String),

    /// A different serializer already owns the type identifier.
    #[error("Type id {id:#010X} already registered to '{existing}', cannot register '{attempted}'")]
    RegistryConflict {
        id: u32,
        existing: &'static str,
        attempted: &'static str,
    },

    /// The cache region could not be reached.
    #[error("Cache unavailable: {0}")]
    CacheUnavailable(String),

    /// The region has no baseline to apply a delta onto.
    #[error("Invalid delta: {0}")]
    InvalidDelta(String),
}

impl Error {
    /// Build a serialization error from anything displayable.
    pub(crate) fn malformed(msg: impl std::fmt::Display) -> Self {
        Error::Serialization(msg.to_string())
    }
}

/// Result type for session replication operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_type_formats_hex() {
        let err = Error::UnknownType(0x8192ACE5);
        assert_eq!(err.to_string(), "Unknown serializer type id: 0x8192ACE5");
    }

    #[test]
    fn test_conflict_message_names_both_serializers() {
        let err = Error::RegistryConflict {
            id: 1,
            existing: "data-session",
            attempted: "other",
        };
        let msg = err.to_string();
        assert!(msg.contains("data-session"));
        assert!(msg.contains("other"));
    }
}
