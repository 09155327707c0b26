//! Project board status updates with verify-and-retry.

use crate::tracker::{
    domain::{RemoteNodeId, StatusField, StatusVerification},
    ports::{RemoteTracker, RemoteTrackerError, Sleeper},
};
use crate::workflow::domain::Phase;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, RwLock};
use std::time::Duration;
use thiserror::Error;

/// Service-level errors for status synchronisation.
#[derive(Debug, Error)]
pub enum StatusSyncError {
    /// Neither the desired option nor the configured fallback exists.
    #[error(
        "status option `{desired}` not found and fallback `{fallback}` is missing; available: {available:?}"
    )]
    FallbackMissing {
        /// Requested option name.
        desired: String,
        /// Configured fallback option name.
        fallback: String,
        /// Options the field offers.
        available: Vec<String>,
    },

    /// The tracker throttled a call; verification was abandoned.
    #[error("status sync aborted by rate limiting: {0}")]
    RateLimited(RemoteTrackerError),

    /// Any other tracker failure.
    #[error(transparent)]
    Remote(RemoteTrackerError),

    /// The field cache lock was poisoned.
    #[error("status field cache unavailable: {0}")]
    CacheUnavailable(String),
}

impl From<RemoteTrackerError> for StatusSyncError {
    fn from(err: RemoteTrackerError) -> Self {
        if err.is_rate_limit() {
            Self::RateLimited(err)
        } else {
            Self::Remote(err)
        }
    }
}

/// Result type for status synchronisation operations.
pub type StatusSyncResult<T> = Result<T, StatusSyncError>;

/// Status service settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusSettings {
    /// Name of the single-select status field.
    pub field_name: String,
    /// Option applied when the desired one does not exist.
    pub fallback: String,
    /// Verification retries after the first check.
    pub verify_retries: u32,
    /// Delay before the first verification check; doubles per attempt.
    pub verify_initial_delay: Duration,
    /// Status option name per phase.
    pub phase_map: BTreeMap<Phase, String>,
}

impl StatusSettings {
    /// Returns the status option name for `phase`.
    #[must_use]
    pub fn status_for(&self, phase: Phase) -> &str {
        self.phase_map
            .get(&phase)
            .map_or_else(|| default_status(phase), String::as_str)
    }
}

impl Default for StatusSettings {
    fn default() -> Self {
        Self {
            field_name: "Status".to_owned(),
            fallback: "Todo".to_owned(),
            verify_retries: 3,
            verify_initial_delay: Duration::from_secs(1),
            phase_map: BTreeMap::new(),
        }
    }
}

/// Board column used when a phase has no configured mapping.
#[must_use]
pub const fn default_status(phase: Phase) -> &'static str {
    match phase {
        Phase::Requirements | Phase::Design | Phase::Tasks => "Todo",
        Phase::Implementation => "In Progress",
        Phase::Testing => "In Review",
        Phase::Completed => "Done",
    }
}

/// Sets board status options and confirms they stuck.
///
/// Field definitions are fetched once per project and cached; call
/// [`Self::refresh`] after the board is reconfigured.
pub struct StatusVerificationService<T, S>
where
    T: RemoteTracker,
    S: Sleeper,
{
    tracker: Arc<T>,
    sleeper: Arc<S>,
    settings: StatusSettings,
    fields: RwLock<HashMap<String, StatusField>>,
}

impl<T, S> StatusVerificationService<T, S>
where
    T: RemoteTracker,
    S: Sleeper,
{
    /// Creates a service with an empty field cache.
    #[must_use]
    pub fn new(tracker: Arc<T>, sleeper: Arc<S>, settings: StatusSettings) -> Self {
        Self {
            tracker,
            sleeper,
            settings,
            fields: RwLock::new(HashMap::new()),
        }
    }

    /// Returns the service settings.
    #[must_use]
    pub const fn settings(&self) -> &StatusSettings {
        &self.settings
    }

    /// Returns the status field of `project_id`, fetching it on first use.
    ///
    /// # Errors
    ///
    /// Returns [`StatusSyncError`] when the fetch fails or the cache lock is
    /// poisoned.
    pub async fn resolve_field_options(&self, project_id: &str) -> StatusSyncResult<StatusField> {
        if let Some(cached) = self.cached_field(project_id)? {
            return Ok(cached);
        }
        let field = self
            .tracker
            .fetch_status_field(project_id, &self.settings.field_name)
            .await?;
        self.fields
            .write()
            .map_err(|err| StatusSyncError::CacheUnavailable(err.to_string()))?
            .insert(project_id.to_owned(), field.clone());
        tracing::debug!(
            project_id,
            options = field.options.len(),
            "cached status field options"
        );
        Ok(field)
    }

    /// Drops the cached field of `project_id` and fetches it again.
    ///
    /// # Errors
    ///
    /// As for [`Self::resolve_field_options`].
    pub async fn refresh(&self, project_id: &str) -> StatusSyncResult<StatusField> {
        self.fields
            .write()
            .map_err(|err| StatusSyncError::CacheUnavailable(err.to_string()))?
            .remove(project_id);
        self.resolve_field_options(project_id).await
    }

    fn cached_field(&self, project_id: &str) -> StatusSyncResult<Option<StatusField>> {
        let cache = self
            .fields
            .read()
            .map_err(|err| StatusSyncError::CacheUnavailable(err.to_string()))?;
        Ok(cache.get(project_id).cloned())
    }

    /// Adds the issue `content` to the board, returning its item identifier.
    ///
    /// # Errors
    ///
    /// Returns [`StatusSyncError`] when the tracker call fails.
    pub async fn ensure_item(
        &self,
        project_id: &str,
        content: &RemoteNodeId,
    ) -> StatusSyncResult<String> {
        Ok(self.tracker.add_project_item(project_id, content).await?)
    }

    /// Sets the item's status to `desired`, returning the option actually
    /// applied.
    ///
    /// Matching is exact, then case-insensitive, then the configured
    /// fallback.
    ///
    /// # Errors
    ///
    /// Returns [`StatusSyncError::FallbackMissing`] when neither the desired
    /// option nor the fallback exists, or the tracker error.
    pub async fn update_status(
        &self,
        project_id: &str,
        item_id: &str,
        desired: &str,
    ) -> StatusSyncResult<String> {
        let field = self.resolve_field_options(project_id).await?;
        let option = match field.find_option(desired) {
            Some(option) => option,
            None => {
                tracing::warn!(
                    project_id,
                    desired,
                    fallback = %self.settings.fallback,
                    "status option not found, using fallback"
                );
                field.find_option(&self.settings.fallback).ok_or_else(|| {
                    StatusSyncError::FallbackMissing {
                        desired: desired.to_owned(),
                        fallback: self.settings.fallback.clone(),
                        available: field
                            .option_names()
                            .into_iter()
                            .map(str::to_owned)
                            .collect(),
                    }
                })?
            }
        };
        self.tracker
            .update_status_field(project_id, item_id, &field.field_id, &option.id)
            .await?;
        Ok(option.name.clone())
    }

    /// Polls the item's status until it equals `expected`, re-applying the
    /// update between checks.
    ///
    /// Check `n` (from zero) is preceded by a wait of
    /// `verify_initial_delay * 2^n`. Non-convergence is reported in the
    /// returned value, not as an error.
    ///
    /// # Errors
    ///
    /// Returns [`StatusSyncError::RateLimited`] as soon as any call is
    /// throttled, or the first other failure.
    pub async fn verify_and_retry(
        &self,
        project_id: &str,
        item_id: &str,
        expected: &str,
        max_retries: u32,
    ) -> StatusSyncResult<StatusVerification> {
        let mut actual_status = None;
        for attempt in 0..=max_retries {
            self.sleeper.sleep(self.verify_delay(attempt)).await;
            let observed = self
                .tracker
                .get_item_status(project_id, item_id, &self.settings.field_name)
                .await?;
            if observed.as_deref() == Some(expected) {
                return Ok(StatusVerification {
                    success: true,
                    attempts: attempt.saturating_add(1),
                    actual_status: observed,
                });
            }
            tracing::debug!(
                project_id,
                item_id,
                expected,
                observed = observed.as_deref().unwrap_or("<none>"),
                attempt,
                "status not yet applied"
            );
            actual_status = observed;
            if attempt < max_retries {
                self.update_status(project_id, item_id, expected).await?;
            }
        }
        let attempts = max_retries.saturating_add(1);
        tracing::warn!(
            project_id,
            item_id,
            expected,
            attempts,
            "status did not converge"
        );
        Ok(StatusVerification {
            success: false,
            attempts,
            actual_status,
        })
    }

    fn verify_delay(&self, attempt: u32) -> Duration {
        self.settings
            .verify_initial_delay
            .saturating_mul(2_u32.saturating_pow(attempt))
    }

    /// Moves the item to the column mapped for `phase` and verifies it.
    ///
    /// # Errors
    ///
    /// As for [`Self::update_status`] and [`Self::verify_and_retry`].
    pub async fn sync_phase_status(
        &self,
        project_id: &str,
        item_id: &str,
        phase: Phase,
    ) -> StatusSyncResult<StatusVerification> {
        let desired = self.settings.status_for(phase).to_owned();
        let applied = self.update_status(project_id, item_id, &desired).await?;
        self.verify_and_retry(project_id, item_id, &applied, self.settings.verify_retries)
            .await
    }
}
