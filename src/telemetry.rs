//! Tracing subscriber installation.
//!
//! The library only emits `tracing` events; binaries and tests that want to
//! see them call [`init_tracing`] once at start-up.

use thiserror::Error;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Errors raised while installing the subscriber.
#[derive(Debug, Error)]
pub enum TelemetryError {
    /// The filter directive does not parse.
    #[error("invalid log filter `{filter}`: {reason}")]
    InvalidFilter {
        /// Rejected directive.
        filter: String,
        /// Parser message.
        reason: String,
    },

    /// A global subscriber is already set.
    #[error("tracing subscriber already installed: {0}")]
    AlreadyInstalled(String),
}

/// Parses a filter directive such as `info` or `specsync=debug,warn`.
///
/// # Errors
///
/// Returns [`TelemetryError::InvalidFilter`] when the directive is invalid.
pub fn parse_filter(directive: &str) -> Result<EnvFilter, TelemetryError> {
    EnvFilter::try_new(directive).map_err(|err| TelemetryError::InvalidFilter {
        filter: directive.to_owned(),
        reason: err.to_string(),
    })
}

/// Installs a `fmt` subscriber as the global default.
///
/// `RUST_LOG` takes precedence over `default_filter` when it is set and
/// valid.
///
/// # Errors
///
/// Returns [`TelemetryError::InvalidFilter`] for a bad `default_filter`
/// when `RUST_LOG` does not apply, or [`TelemetryError::AlreadyInstalled`]
/// when another subscriber was installed first.
pub fn init_tracing(default_filter: &str) -> Result<(), TelemetryError> {
    let filter = EnvFilter::try_from_default_env().or_else(|_| parse_filter(default_filter))?;
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true))
        .with(filter)
        .try_init()
        .map_err(|err| TelemetryError::AlreadyInstalled(err.to_string()))
}
