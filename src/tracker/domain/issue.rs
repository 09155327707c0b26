//! Remote issue snapshots and creation drafts.

use super::{RemoteNodeId, RemoteNumber, TrackerDomainError};
use serde::{Deserialize, Serialize};

/// Open/closed state of a remote issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RemoteIssueState {
    /// The issue is open.
    Open,
    /// The issue is closed.
    Closed,
}

impl RemoteIssueState {
    /// Returns the wire representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Closed => "closed",
        }
    }

    /// Returns whether the state is [`Self::Closed`].
    #[must_use]
    pub const fn is_closed(self) -> bool {
        matches!(self, Self::Closed)
    }
}

/// Snapshot of an issue as returned by the remote tracker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteIssue {
    /// Numeric database identifier (used for sub-issue linking).
    pub id: u64,
    /// Repository-scoped issue number.
    pub number: RemoteNumber,
    /// Graph node identifier, when the tracker returned one.
    pub node_id: Option<RemoteNodeId>,
    /// Issue title.
    pub title: String,
    /// Issue body (Markdown).
    pub body: String,
    /// Open/closed state.
    pub state: RemoteIssueState,
    /// Label names.
    pub labels: Vec<String>,
}

/// Payload for creating a remote issue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueDraft {
    title: String,
    body: String,
    labels: Vec<String>,
}

impl IssueDraft {
    /// Creates a draft with a validated title.
    ///
    /// # Errors
    ///
    /// Returns [`TrackerDomainError::EmptyIssueTitle`] when the title is
    /// blank.
    pub fn new(
        title: impl Into<String>,
        body: impl Into<String>,
    ) -> Result<Self, TrackerDomainError> {
        let raw = title.into();
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(TrackerDomainError::EmptyIssueTitle);
        }
        Ok(Self {
            title: trimmed.to_owned(),
            body: body.into(),
            labels: Vec::new(),
        })
    }

    /// Adds a label to the draft.
    #[must_use]
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.labels.push(label.into());
        self
    }

    /// Returns the title.
    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Returns the body.
    #[must_use]
    pub fn body(&self) -> &str {
        &self.body
    }

    /// Returns the labels.
    #[must_use]
    pub fn labels(&self) -> &[String] {
        &self.labels
    }
}
