//! Structured error types for config and protocol operations.

use thiserror::Error;

/// Errors surfaced by config access, path parsing, sweep generation and the
/// work-queue protocol. All of these are fatal to the calling operation;
/// only the polling loops retry, and they do so as steady-state behavior,
/// not error recovery.
#[derive(Debug, Error)]
pub enum SweepError {
    /// Config access to an absent key.
    #[error("key '{key}' not found in config")]
    KeyNotFound { key: String },

    /// Composite config path violates the `base[+overlay][-filter]` grammar.
    /// Raised before any I/O happens.
    #[error("malformed config path '{path}': {reason}")]
    MalformedPath { path: String, reason: String },

    /// A caller broke an API contract: a search key missing from the base
    /// config, a search value that is not a sequence, a non-mapping document
    /// root, and the like.
    #[error("contract violation: {0}")]
    ContractViolation(String),

    /// Usage-tracking mode outside {none, count, hist}.
    #[error("invalid usage mode '{0}' (expected none, count, or hist)")]
    InvalidUsageMode(String),

    /// Lock invariant broken, e.g. releasing a global lock that is not held.
    #[error("protocol violation: {0}")]
    ProtocolViolation(String),

    /// Storage backend failure at the given location.
    #[error("storage error at '{url}'")]
    Storage {
        url: String,
        #[source]
        source: std::io::Error,
    },

    /// YAML document at the given location failed to parse or serialize.
    #[error("invalid yaml at '{url}': {source}")]
    Yaml {
        url: String,
        #[source]
        source: serde_yaml::Error,
    },

    /// Result-record encoding failure.
    #[error("failed to encode results: {0}")]
    Json(#[from] serde_json::Error),
}

impl SweepError {
    // Convenience constructors

    pub fn key_not_found(key: impl Into<String>) -> Self {
        SweepError::KeyNotFound { key: key.into() }
    }

    pub fn malformed_path(path: impl Into<String>, reason: impl Into<String>) -> Self {
        SweepError::MalformedPath {
            path: path.into(),
            reason: reason.into(),
        }
    }

    pub fn contract(msg: impl Into<String>) -> Self {
        SweepError::ContractViolation(msg.into())
    }

    pub fn protocol(msg: impl Into<String>) -> Self {
        SweepError::ProtocolViolation(msg.into())
    }

    pub fn storage(url: impl Into<String>, source: std::io::Error) -> Self {
        SweepError::Storage {
            url: url.into(),
            source,
        }
    }

    pub fn yaml(url: impl Into<String>, source: serde_yaml::Error) -> Self {
        SweepError::Yaml {
            url: url.into(),
            source,
        }
    }
}

/// Result type for sweeprun operations.
pub type Result<T> = std::result::Result<T, SweepError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_name_the_offender() {
        let err = SweepError::key_not_found("model.lr");
        assert!(err.to_string().contains("model.lr"));

        let err = SweepError::malformed_path("a-b-c", "more than one filter separator");
        assert!(err.to_string().contains("a-b-c"));
        assert!(err.to_string().contains("filter separator"));
    }
}
