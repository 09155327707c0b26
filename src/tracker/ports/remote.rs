//! Port for the remote issue tracker and its project board.

use crate::tracker::domain::{
    IssueDraft, RemoteIssue, RemoteIssueState, RemoteNodeId, RemoteNumber, StatusField,
};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Result type for remote tracker operations.
pub type RemoteTrackerResult<T> = Result<T, RemoteTrackerError>;

/// Remote issue tracker contract.
///
/// Implementations report throttling as [`RemoteTrackerError::RateLimited`]
/// and never retry themselves; retries belong to
/// [`crate::tracker::services::RateLimitedClient`].
#[async_trait]
pub trait RemoteTracker: Send + Sync {
    /// Creates an issue.
    async fn create_issue(&self, draft: &IssueDraft) -> RemoteTrackerResult<RemoteIssue>;

    /// Fetches an issue by number.
    async fn get_issue(&self, number: RemoteNumber) -> RemoteTrackerResult<RemoteIssue>;

    /// Opens or closes an issue.
    async fn update_issue_state(
        &self,
        number: RemoteNumber,
        state: RemoteIssueState,
    ) -> RemoteTrackerResult<()>;

    /// Replaces an issue body.
    async fn update_issue_body(&self, number: RemoteNumber, body: &str)
    -> RemoteTrackerResult<()>;

    /// Adds a comment to an issue.
    async fn add_comment(&self, number: RemoteNumber, body: &str) -> RemoteTrackerResult<()>;

    /// Resolves the graph node identifier of an issue.
    async fn resolve_node_id(&self, number: RemoteNumber) -> RemoteTrackerResult<RemoteNodeId>;

    /// Links `child_remote_id` as a sub-issue of `parent`.
    async fn link_sub_issue(
        &self,
        parent: RemoteNumber,
        child_remote_id: u64,
    ) -> RemoteTrackerResult<()>;

    /// Lists the sub-issues currently linked to `parent`.
    async fn list_sub_issues(&self, parent: RemoteNumber) -> RemoteTrackerResult<Vec<RemoteIssue>>;

    /// Adds an issue to a project board and returns the board item
    /// identifier. Adding an issue that is already on the board returns the
    /// existing item.
    async fn add_project_item(
        &self,
        project_id: &str,
        content: &RemoteNodeId,
    ) -> RemoteTrackerResult<String>;

    /// Fetches the single-select field named `field_name` of a project.
    async fn fetch_status_field(
        &self,
        project_id: &str,
        field_name: &str,
    ) -> RemoteTrackerResult<StatusField>;

    /// Sets a single-select field value on a project item.
    async fn update_status_field(
        &self,
        project_id: &str,
        item_id: &str,
        field_id: &str,
        option_id: &str,
    ) -> RemoteTrackerResult<()>;

    /// Returns the current option name of `field_name` on a project item.
    async fn get_item_status(
        &self,
        project_id: &str,
        item_id: &str,
        field_name: &str,
    ) -> RemoteTrackerResult<Option<String>>;
}

/// Errors returned by remote tracker implementations.
#[derive(Debug, Clone, Error)]
pub enum RemoteTrackerError {
    /// The tracker throttled the request.
    #[error("rate limited by remote tracker (retry after {retry_after:?})")]
    RateLimited {
        /// Delay hint supplied by the tracker.
        retry_after: Option<Duration>,
    },

    /// Throttling persisted through every retry.
    #[error("rate limit exceeded after {attempts} attempts")]
    RateLimitExceeded {
        /// Number of attempts made.
        attempts: u32,
    },

    /// The requested resource does not exist.
    #[error("remote resource not found: {0}")]
    NotFound(String),

    /// The tracker rejected the request.
    #[error("remote tracker returned {status}: {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Error message from the response.
        message: String,
    },

    /// The response could not be interpreted.
    #[error("invalid response from remote tracker: {0}")]
    InvalidResponse(String),

    /// Network or client failure.
    #[error("transport error: {0}")]
    Transport(Arc<dyn std::error::Error + Send + Sync>),
}

impl RemoteTrackerError {
    /// Wraps a transport error.
    pub fn transport(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Transport(Arc::new(err))
    }

    /// Returns whether the error stems from throttling.
    #[must_use]
    pub const fn is_rate_limit(&self) -> bool {
        matches!(
            self,
            Self::RateLimited { .. } | Self::RateLimitExceeded { .. }
        )
    }
}
