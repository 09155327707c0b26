//! Sub-tasks decomposed from a unit of work's checklist.

use super::{SubTaskId, UnitOfWorkId, WorkflowDomainError};
use crate::tracker::domain::RemoteNumber;
use serde::{Deserialize, Serialize};

/// A unit of work's child task, mirrored as a remote child issue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubTask {
    id: SubTaskId,
    parent_unit_of_work_id: UnitOfWorkId,
    title: String,
    description: String,
    remote_number: Option<RemoteNumber>,
    closed: bool,
}

impl SubTask {
    /// Creates an open, unlinked sub-task.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowDomainError::EmptyTitle`] when the title is blank.
    pub fn new(
        parent_unit_of_work_id: UnitOfWorkId,
        title: impl Into<String>,
        description: impl Into<String>,
    ) -> Result<Self, WorkflowDomainError> {
        let raw = title.into();
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(WorkflowDomainError::EmptyTitle);
        }
        Ok(Self {
            id: SubTaskId::new(),
            parent_unit_of_work_id,
            title: trimmed.to_owned(),
            description: description.into(),
            remote_number: None,
            closed: false,
        })
    }

    /// Returns the identifier.
    #[must_use]
    pub const fn id(&self) -> SubTaskId {
        self.id
    }

    /// Returns the owning unit of work.
    #[must_use]
    pub const fn parent_unit_of_work_id(&self) -> UnitOfWorkId {
        self.parent_unit_of_work_id
    }

    /// Returns the title.
    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Returns the description.
    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Returns the remote issue number once created.
    #[must_use]
    pub const fn remote_number(&self) -> Option<RemoteNumber> {
        self.remote_number
    }

    /// Returns whether the sub-task was last seen closed.
    #[must_use]
    pub const fn is_closed(&self) -> bool {
        self.closed
    }

    /// Binds the sub-task to its remote issue.
    pub const fn link_remote(&mut self, number: RemoteNumber) {
        self.remote_number = Some(number);
    }

    /// Records the sub-task as closed.
    pub const fn mark_closed(&mut self) {
        self.closed = true;
    }

    /// Records the sub-task as open.
    pub const fn mark_open(&mut self) {
        self.closed = false;
    }
}
