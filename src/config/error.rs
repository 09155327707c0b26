//! Configuration errors.

use std::sync::Arc;
use thiserror::Error;

/// Errors raised while loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("failed to read configuration: {0}")]
    Io(Arc<dyn std::error::Error + Send + Sync>),

    /// The document is not valid TOML or lacks required keys.
    #[error("failed to parse configuration: {0}")]
    Parse(#[source] Box<toml::de::Error>),

    /// A value is out of range.
    #[error("invalid `{field}`: {reason}")]
    Invalid {
        /// Dotted key of the offending value.
        field: &'static str,
        /// What is wrong with it.
        reason: String,
    },

    /// A `status.phase_map` key names no phase.
    #[error("unknown phase `{0}` in status.phase_map")]
    UnknownPhase(String),

    /// A secret's environment variable is unset or blank.
    #[error("environment variable `{0}` is not set")]
    MissingSecret(String),
}

impl ConfigError {
    /// Wraps an I/O error.
    pub fn io(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Io(Arc::new(err))
    }

    /// Builds an [`Self::Invalid`] error.
    pub fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            field,
            reason: reason.into(),
        }
    }
}

/// Result type for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;
