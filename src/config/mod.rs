//! Synchronisation settings loaded from TOML.
//!
//! Secrets never live in the file: the configuration names the environment
//! variables holding them, and an [`EnvSource`] resolves them at start-up.

mod env;
mod error;

pub use env::{EnvSource, ProcessEnv};
pub use error::{ConfigError, ConfigResult};

use crate::tracker::{
    adapters::github::GitHubSettings,
    services::{DEFAULT_MAX_CHILDREN, RateLimitPolicy, StatusSettings},
};
use crate::webhook::WebhookSecret;
use crate::workflow::domain::Phase;
use camino::Utf8Path;
use cap_std::{ambient_authority, fs_utf8::Dir};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

/// Root configuration document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Remote tracker connection.
    pub tracker: TrackerConfig,

    /// Retry budget for throttled calls.
    #[serde(default)]
    pub rate_limit: RateLimitConfig,

    /// Project board status updates.
    #[serde(default)]
    pub status: StatusConfig,

    /// Inbound webhook authentication.
    #[serde(default)]
    pub webhook: WebhookConfig,

    /// Log filtering.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Remote tracker connection settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackerConfig {
    /// Repository owner.
    pub owner: String,

    /// Repository name.
    pub repository: String,

    /// API root.
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,

    /// Environment variable holding the access token.
    #[serde(default = "default_token_env")]
    pub token_env: String,

    /// Largest child batch accepted in one call.
    #[serde(default = "default_max_children")]
    pub max_children: usize,
}

/// Rate limit retry settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimitConfig {
    /// Retries after the first attempt.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Base backoff delay in milliseconds.
    #[serde(default = "default_initial_delay_ms")]
    pub initial_delay_ms: u64,
}

/// Project board status settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusConfig {
    /// Project board identifier; board updates are off without one.
    #[serde(default)]
    pub project_id: Option<String>,

    /// Name of the single-select status field.
    #[serde(default = "default_field_name")]
    pub field_name: String,

    /// Option applied when the mapped one does not exist.
    #[serde(default = "default_fallback")]
    pub fallback: String,

    /// Status option name per phase name.
    #[serde(default)]
    pub phase_map: BTreeMap<String, String>,

    /// Verification retries after the first check.
    #[serde(default = "default_verify_retries")]
    pub verify_retries: u32,

    /// Delay before the first verification check, in milliseconds.
    #[serde(default = "default_initial_delay_ms")]
    pub verify_initial_delay_ms: u64,
}

/// Webhook settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebhookConfig {
    /// Environment variable holding the shared secret.
    #[serde(default = "default_secret_env")]
    pub secret_env: String,
}

/// Logging settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// `tracing` filter directive used when `RUST_LOG` is unset.
    #[serde(default = "default_filter")]
    pub filter: String,
}

fn default_api_base_url() -> String {
    "https://api.github.com".to_owned()
}

fn default_token_env() -> String {
    "GITHUB_TOKEN".to_owned()
}

const fn default_max_children() -> usize {
    DEFAULT_MAX_CHILDREN
}

const fn default_max_retries() -> u32 {
    RateLimitPolicy::DEFAULT_MAX_RETRIES
}

const fn default_initial_delay_ms() -> u64 {
    1000
}

fn default_field_name() -> String {
    "Status".to_owned()
}

fn default_fallback() -> String {
    "Todo".to_owned()
}

const fn default_verify_retries() -> u32 {
    3
}

fn default_secret_env() -> String {
    "SPECSYNC_WEBHOOK_SECRET".to_owned()
}

fn default_filter() -> String {
    "info".to_owned()
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            initial_delay_ms: default_initial_delay_ms(),
        }
    }
}

impl Default for StatusConfig {
    fn default() -> Self {
        Self {
            project_id: None,
            field_name: default_field_name(),
            fallback: default_fallback(),
            phase_map: BTreeMap::new(),
            verify_retries: default_verify_retries(),
            verify_initial_delay_ms: default_initial_delay_ms(),
        }
    }
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self {
            secret_env: default_secret_env(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: default_filter(),
        }
    }
}

impl SyncConfig {
    /// Parses and validates a TOML document.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] for malformed TOML or missing required
    /// keys, or the first [`Self::validate`] failure.
    pub fn from_toml_str(source: &str) -> ConfigResult<Self> {
        let config: Self = toml::from_str(source).map_err(|err| ConfigError::Parse(Box::new(err)))?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses, and validates the file at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] when the file cannot be read, otherwise
    /// as for [`Self::from_toml_str`].
    pub fn load(path: &Utf8Path) -> ConfigResult<Self> {
        let file_name = path
            .file_name()
            .ok_or_else(|| ConfigError::invalid("path", format!("`{path}` names no file")))?;
        let parent = path
            .parent()
            .filter(|parent| !parent.as_str().is_empty())
            .unwrap_or_else(|| Utf8Path::new("."));
        let dir = Dir::open_ambient_dir(parent, ambient_authority()).map_err(ConfigError::io)?;
        let source = dir.read_to_string(file_name).map_err(ConfigError::io)?;
        tracing::debug!(path = %path, "loaded configuration");
        Self::from_toml_str(&source)
    }

    /// Checks the values serde cannot.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] for a blank owner, repository, or
    /// fallback, or a zero child limit, and [`ConfigError::UnknownPhase`] for
    /// a `phase_map` key that names no phase.
    pub fn validate(&self) -> ConfigResult<()> {
        require_non_blank("tracker.owner", &self.tracker.owner)?;
        require_non_blank("tracker.repository", &self.tracker.repository)?;
        require_non_blank("tracker.api_base_url", &self.tracker.api_base_url)?;
        if self.tracker.max_children == 0 {
            return Err(ConfigError::invalid(
                "tracker.max_children",
                "must be greater than zero",
            ));
        }
        require_non_blank("status.field_name", &self.status.field_name)?;
        require_non_blank("status.fallback", &self.status.fallback)?;
        self.phase_map()?;
        Ok(())
    }

    /// Returns the retry policy for [`crate::tracker::services::RateLimitedClient`].
    #[must_use]
    pub const fn rate_limit_policy(&self) -> RateLimitPolicy {
        RateLimitPolicy {
            max_retries: self.rate_limit.max_retries,
            initial_delay: Duration::from_millis(self.rate_limit.initial_delay_ms),
        }
    }

    /// Returns the settings for [`crate::tracker::services::StatusVerificationService`].
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::UnknownPhase`] for an unrecognised
    /// `phase_map` key.
    pub fn status_settings(&self) -> ConfigResult<StatusSettings> {
        Ok(StatusSettings {
            field_name: self.status.field_name.clone(),
            fallback: self.status.fallback.clone(),
            verify_retries: self.status.verify_retries,
            verify_initial_delay: Duration::from_millis(self.status.verify_initial_delay_ms),
            phase_map: self.phase_map()?,
        })
    }

    /// Returns the GitHub connection settings, reading the token from `env`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingSecret`] when the token variable is
    /// unset or blank.
    pub fn github_settings(&self, env: &impl EnvSource) -> ConfigResult<GitHubSettings> {
        let token = secret_from(env, &self.tracker.token_env)?;
        Ok(GitHubSettings {
            api_base_url: self.tracker.api_base_url.clone(),
            owner: self.tracker.owner.clone(),
            repository: self.tracker.repository.clone(),
            token,
        })
    }

    /// Returns the webhook secret, reading it from `env`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingSecret`] when the secret variable is
    /// unset or blank.
    pub fn webhook_secret(&self, env: &impl EnvSource) -> ConfigResult<WebhookSecret> {
        let secret = secret_from(env, &self.webhook.secret_env)?;
        WebhookSecret::new(secret)
            .map_err(|_| ConfigError::MissingSecret(self.webhook.secret_env.clone()))
    }

    fn phase_map(&self) -> ConfigResult<BTreeMap<Phase, String>> {
        self.status
            .phase_map
            .iter()
            .map(|(phase, status)| {
                Phase::try_from(phase.as_str())
                    .map(|parsed| (parsed, status.clone()))
                    .map_err(|_| ConfigError::UnknownPhase(phase.clone()))
            })
            .collect()
    }
}

fn require_non_blank(field: &'static str, value: &str) -> ConfigResult<()> {
    if value.trim().is_empty() {
        return Err(ConfigError::invalid(field, "must not be empty"));
    }
    Ok(())
}

fn secret_from(env: &impl EnvSource, name: &str) -> ConfigResult<String> {
    env.var(name)
        .filter(|value| !value.trim().is_empty())
        .ok_or_else(|| ConfigError::MissingSecret(name.to_owned()))
}

#[cfg(test)]
mod tests;
