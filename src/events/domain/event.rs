//! Workflow event envelope and payloads.

use crate::checklist::ChecklistChecksum;
use crate::tracker::domain::RemoteNumber;
use crate::workflow::domain::{Phase, SubTaskId, UnitOfWorkId};
use chrono::{DateTime, Utc};
use mockable::Clock;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Unique identifier for a published event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventId(Uuid);

impl EventId {
    /// Creates a new random event identifier.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Returns the wrapped UUID.
    #[must_use]
    pub const fn into_inner(self) -> Uuid {
        self.0
    }
}

impl Default for EventId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Discriminant used to route events to subscribers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    /// A unit of work moved to another phase.
    PhaseChanged,
    /// A sub-task was completed locally.
    TaskCompleted,
    /// A sub-task was reopened locally.
    TaskReopened,
    /// A remote issue was closed.
    RemoteIssueClosed,
    /// A remote issue was reopened.
    RemoteIssueReopened,
    /// A remote issue body or title was edited.
    RemoteIssueEdited,
    /// A label was added to a remote issue.
    RemoteIssueLabeled,
    /// A comment was added to a remote issue.
    RemoteIssueCommented,
    /// A pull request was closed or merged.
    PullRequestClosed,
    /// A checklist was reconciled with at least one change.
    ChecklistChanged,
    /// A reconciliation attempt failed.
    SyncFailed,
}

impl EventType {
    /// Returns the canonical name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::PhaseChanged => "phase_changed",
            Self::TaskCompleted => "task_completed",
            Self::TaskReopened => "task_reopened",
            Self::RemoteIssueClosed => "remote_issue_closed",
            Self::RemoteIssueReopened => "remote_issue_reopened",
            Self::RemoteIssueEdited => "remote_issue_edited",
            Self::RemoteIssueLabeled => "remote_issue_labeled",
            Self::RemoteIssueCommented => "remote_issue_commented",
            Self::PullRequestClosed => "pull_request_closed",
            Self::ChecklistChanged => "checklist_changed",
            Self::SyncFailed => "sync_failed",
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Typed event payloads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventPayload {
    /// A unit of work moved between phases.
    PhaseChanged {
        /// Unit of work that moved.
        unit_of_work_id: UnitOfWorkId,
        /// Phase before the transition.
        from: Phase,
        /// Phase after the transition.
        to: Phase,
    },
    /// A sub-task was completed locally.
    TaskCompleted {
        /// Completed sub-task.
        sub_task_id: SubTaskId,
    },
    /// A sub-task was reopened locally.
    TaskReopened {
        /// Reopened sub-task.
        sub_task_id: SubTaskId,
    },
    /// A remote issue was closed.
    RemoteIssueClosed {
        /// Issue number.
        remote_number: RemoteNumber,
    },
    /// A remote issue was reopened.
    RemoteIssueReopened {
        /// Issue number.
        remote_number: RemoteNumber,
    },
    /// A remote issue was edited.
    RemoteIssueEdited {
        /// Issue number.
        remote_number: RemoteNumber,
        /// New body, when the body changed.
        body: Option<String>,
    },
    /// A label was added to a remote issue.
    RemoteIssueLabeled {
        /// Issue number.
        remote_number: RemoteNumber,
        /// Added label.
        label: String,
    },
    /// A comment was added to a remote issue.
    RemoteIssueCommented {
        /// Issue number.
        remote_number: RemoteNumber,
        /// Comment author login.
        author: String,
        /// Comment body.
        body: String,
    },
    /// A pull request was closed.
    PullRequestClosed {
        /// Pull request number.
        number: u64,
        /// Whether the pull request was merged.
        merged: bool,
    },
    /// A checklist reconciliation changed at least one item.
    ChecklistChanged {
        /// Unit of work whose checklist changed.
        unit_of_work_id: UnitOfWorkId,
        /// Checksum after reconciliation.
        checksum: ChecklistChecksum,
        /// Number of flipped items.
        changed_items: usize,
    },
    /// A reconciliation attempt failed.
    SyncFailed {
        /// Local entity identifier.
        entity_id: String,
        /// Failure description.
        message: String,
    },
}

impl EventPayload {
    /// Returns the routing discriminant.
    #[must_use]
    pub const fn event_type(&self) -> EventType {
        match self {
            Self::PhaseChanged { .. } => EventType::PhaseChanged,
            Self::TaskCompleted { .. } => EventType::TaskCompleted,
            Self::TaskReopened { .. } => EventType::TaskReopened,
            Self::RemoteIssueClosed { .. } => EventType::RemoteIssueClosed,
            Self::RemoteIssueReopened { .. } => EventType::RemoteIssueReopened,
            Self::RemoteIssueEdited { .. } => EventType::RemoteIssueEdited,
            Self::RemoteIssueLabeled { .. } => EventType::RemoteIssueLabeled,
            Self::RemoteIssueCommented { .. } => EventType::RemoteIssueCommented,
            Self::PullRequestClosed { .. } => EventType::PullRequestClosed,
            Self::ChecklistChanged { .. } => EventType::ChecklistChanged,
            Self::SyncFailed { .. } => EventType::SyncFailed,
        }
    }
}

/// An immutable, timestamped workflow event.
///
/// Once constructed an event exposes no mutators; the bus hands every
/// subscriber the same shared instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowEvent {
    id: EventId,
    version: u32,
    subject_id: String,
    occurred_at: DateTime<Utc>,
    payload: EventPayload,
}

impl WorkflowEvent {
    /// Schema version stamped on newly created events.
    pub const SCHEMA_VERSION: u32 = 1;

    /// Creates an event about `subject_id` at the clock's current time.
    #[must_use]
    pub fn new(subject_id: impl Into<String>, payload: EventPayload, clock: &impl Clock) -> Self {
        Self {
            id: EventId::new(),
            version: Self::SCHEMA_VERSION,
            subject_id: subject_id.into(),
            occurred_at: clock.utc(),
            payload,
        }
    }

    /// Returns the event identifier.
    #[must_use]
    pub const fn id(&self) -> EventId {
        self.id
    }

    /// Returns the payload schema version.
    #[must_use]
    pub const fn version(&self) -> u32 {
        self.version
    }

    /// Returns the identifier of the entity the event is about.
    #[must_use]
    pub fn subject_id(&self) -> &str {
        &self.subject_id
    }

    /// Returns when the event occurred.
    #[must_use]
    pub const fn occurred_at(&self) -> DateTime<Utc> {
        self.occurred_at
    }

    /// Returns the payload.
    #[must_use]
    pub const fn payload(&self) -> &EventPayload {
        &self.payload
    }

    /// Returns the routing discriminant.
    #[must_use]
    pub const fn event_type(&self) -> EventType {
        self.payload.event_type()
    }
}
