//! Rate-limit-aware retry around remote tracker calls.

use crate::tracker::{
    domain::{IssueDraft, RemoteIssue, RemoteIssueState, RemoteNodeId, RemoteNumber, StatusField},
    ports::{RemoteTracker, RemoteTrackerError, RemoteTrackerResult, Sleeper},
};
use async_trait::async_trait;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

/// Retry budget for throttled calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitPolicy {
    /// Retries after the first attempt.
    pub max_retries: u32,
    /// Base delay when the tracker gives no hint.
    pub initial_delay: Duration,
}

impl RateLimitPolicy {
    /// Default retry count.
    pub const DEFAULT_MAX_RETRIES: u32 = 3;
    /// Default base delay.
    pub const DEFAULT_INITIAL_DELAY: Duration = Duration::from_millis(1000);

    /// Returns the fallback delay before retry number `attempt + 1`:
    /// `initial_delay * 2^attempt`.
    #[must_use]
    pub fn backoff(&self, attempt: u32) -> Duration {
        self.initial_delay
            .saturating_mul(2_u32.saturating_pow(attempt))
    }
}

impl Default for RateLimitPolicy {
    fn default() -> Self {
        Self {
            max_retries: Self::DEFAULT_MAX_RETRIES,
            initial_delay: Self::DEFAULT_INITIAL_DELAY,
        }
    }
}

/// Retries throttled remote calls with bounded exponential backoff.
///
/// Only [`RemoteTrackerError::RateLimited`] is retried; every other error is
/// returned on first sight. A call that is throttled on every attempt is
/// tried exactly `max_retries + 1` times and then fails with
/// [`RemoteTrackerError::RateLimitExceeded`].
#[derive(Debug)]
pub struct RateLimitedClient<S>
where
    S: Sleeper,
{
    policy: RateLimitPolicy,
    sleeper: Arc<S>,
}

impl<S> Clone for RateLimitedClient<S>
where
    S: Sleeper,
{
    fn clone(&self) -> Self {
        Self {
            policy: self.policy,
            sleeper: Arc::clone(&self.sleeper),
        }
    }
}

impl<S> RateLimitedClient<S>
where
    S: Sleeper,
{
    /// Creates a client with the given retry policy.
    #[must_use]
    pub const fn new(policy: RateLimitPolicy, sleeper: Arc<S>) -> Self {
        Self { policy, sleeper }
    }

    /// Returns the retry policy.
    #[must_use]
    pub const fn policy(&self) -> RateLimitPolicy {
        self.policy
    }

    /// Runs `call`, retrying while the tracker reports throttling.
    ///
    /// # Errors
    ///
    /// Returns the first non-throttling error unchanged, or
    /// [`RemoteTrackerError::RateLimitExceeded`] once the retry budget is
    /// spent.
    pub async fn call<T, F, Fut>(&self, operation: &str, mut call: F) -> RemoteTrackerResult<T>
    where
        F: FnMut() -> Fut + Send,
        Fut: Future<Output = RemoteTrackerResult<T>> + Send,
        T: Send,
    {
        let mut attempt: u32 = 0;
        loop {
            match call().await {
                Err(RemoteTrackerError::RateLimited { retry_after }) => {
                    let attempts = attempt.saturating_add(1);
                    if attempt >= self.policy.max_retries {
                        tracing::warn!(operation, attempts, "rate limit retries exhausted");
                        return Err(RemoteTrackerError::RateLimitExceeded { attempts });
                    }
                    let delay = retry_after.unwrap_or_else(|| self.policy.backoff(attempt));
                    tracing::warn!(
                        operation,
                        attempt = attempts,
                        max_retries = self.policy.max_retries,
                        delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                        "rate limited, backing off"
                    );
                    self.sleeper.sleep(delay).await;
                    attempt = attempts;
                }
                outcome => return outcome,
            }
        }
    }
}

/// [`RemoteTracker`] decorator routing every call through a
/// [`RateLimitedClient`].
pub struct RateLimitedTracker<T, S>
where
    T: RemoteTracker,
    S: Sleeper,
{
    inner: Arc<T>,
    client: RateLimitedClient<S>,
}

impl<T, S> RateLimitedTracker<T, S>
where
    T: RemoteTracker,
    S: Sleeper,
{
    /// Wraps `inner` with retry behaviour.
    #[must_use]
    pub const fn new(inner: Arc<T>, client: RateLimitedClient<S>) -> Self {
        Self { inner, client }
    }
}

#[async_trait]
impl<T, S> RemoteTracker for RateLimitedTracker<T, S>
where
    T: RemoteTracker,
    S: Sleeper,
{
    async fn create_issue(&self, draft: &IssueDraft) -> RemoteTrackerResult<RemoteIssue> {
        self.client
            .call("create_issue", || self.inner.create_issue(draft))
            .await
    }

    async fn get_issue(&self, number: RemoteNumber) -> RemoteTrackerResult<RemoteIssue> {
        self.client
            .call("get_issue", || self.inner.get_issue(number))
            .await
    }

    async fn update_issue_state(
        &self,
        number: RemoteNumber,
        state: RemoteIssueState,
    ) -> RemoteTrackerResult<()> {
        self.client
            .call("update_issue_state", || {
                self.inner.update_issue_state(number, state)
            })
            .await
    }

    async fn update_issue_body(&self, number: RemoteNumber, body: &str) -> RemoteTrackerResult<()> {
        self.client
            .call("update_issue_body", || self.inner.update_issue_body(number, body))
            .await
    }

    async fn add_comment(&self, number: RemoteNumber, body: &str) -> RemoteTrackerResult<()> {
        self.client
            .call("add_comment", || self.inner.add_comment(number, body))
            .await
    }

    async fn resolve_node_id(&self, number: RemoteNumber) -> RemoteTrackerResult<RemoteNodeId> {
        self.client
            .call("resolve_node_id", || self.inner.resolve_node_id(number))
            .await
    }

    async fn link_sub_issue(
        &self,
        parent: RemoteNumber,
        child_remote_id: u64,
    ) -> RemoteTrackerResult<()> {
        self.client
            .call("link_sub_issue", || {
                self.inner.link_sub_issue(parent, child_remote_id)
            })
            .await
    }

    async fn list_sub_issues(&self, parent: RemoteNumber) -> RemoteTrackerResult<Vec<RemoteIssue>> {
        self.client
            .call("list_sub_issues", || self.inner.list_sub_issues(parent))
            .await
    }

    async fn add_project_item(
        &self,
        project_id: &str,
        content: &RemoteNodeId,
    ) -> RemoteTrackerResult<String> {
        self.client
            .call("add_project_item", || {
                self.inner.add_project_item(project_id, content)
            })
            .await
    }

    async fn fetch_status_field(
        &self,
        project_id: &str,
        field_name: &str,
    ) -> RemoteTrackerResult<StatusField> {
        self.client
            .call("fetch_status_field", || {
                self.inner.fetch_status_field(project_id, field_name)
            })
            .await
    }

    async fn update_status_field(
        &self,
        project_id: &str,
        item_id: &str,
        field_id: &str,
        option_id: &str,
    ) -> RemoteTrackerResult<()> {
        self.client
            .call("update_status_field", || {
                self.inner
                    .update_status_field(project_id, item_id, field_id, option_id)
            })
            .await
    }

    async fn get_item_status(
        &self,
        project_id: &str,
        item_id: &str,
        field_name: &str,
    ) -> RemoteTrackerResult<Option<String>> {
        self.client
            .call("get_item_status", || {
                self.inner.get_item_status(project_id, item_id, field_name)
            })
            .await
    }
}
