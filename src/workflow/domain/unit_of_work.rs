//! Unit of work aggregate root.

use super::{Phase, UnitOfWorkId, WorkflowDomainError};
use camino::{Utf8Component, Utf8Path, Utf8PathBuf};
use chrono::{DateTime, Utc};
use mockable::Clock;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Workspace-relative path of the document backing a unit of work.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DocumentRef(Utf8PathBuf);

impl DocumentRef {
    /// Creates a validated document reference.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowDomainError::InvalidDocumentRef`] when the path is
    /// empty, absolute, or escapes the workspace with `..`.
    pub fn new(value: impl Into<String>) -> Result<Self, WorkflowDomainError> {
        let raw = value.into();
        let path = Utf8PathBuf::from(raw.trim());
        let escapes = path.components().any(|component| {
            matches!(
                component,
                Utf8Component::ParentDir | Utf8Component::RootDir | Utf8Component::Prefix(_)
            )
        });
        if path.as_str().is_empty() || path.is_absolute() || escapes {
            return Err(WorkflowDomainError::InvalidDocumentRef(raw));
        }
        Ok(Self(path))
    }

    /// Returns the relative path.
    #[must_use]
    pub fn as_path(&self) -> &Utf8Path {
        &self.0
    }

    /// Returns the relative path as `str`.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl TryFrom<String> for DocumentRef {
    type Error = WorkflowDomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<DocumentRef> for String {
    fn from(value: DocumentRef) -> Self {
        value.0.into_string()
    }
}

impl fmt::Display for DocumentRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The tracked specification whose phase and checklist are reconciled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitOfWork {
    id: UnitOfWorkId,
    name: String,
    phase: Phase,
    previous_phase: Option<Phase>,
    document_ref: DocumentRef,
    branch_ref: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

/// Parameter object for reconstructing a persisted unit of work.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistedUnitOfWorkData {
    /// Persisted identifier.
    pub id: UnitOfWorkId,
    /// Persisted name.
    pub name: String,
    /// Persisted phase.
    pub phase: Phase,
    /// Phase before the last transition, if any.
    pub previous_phase: Option<Phase>,
    /// Persisted document reference.
    pub document_ref: DocumentRef,
    /// Persisted branch reference.
    pub branch_ref: Option<String>,
    /// Persisted creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Persisted latest update timestamp.
    pub updated_at: DateTime<Utc>,
}

impl UnitOfWork {
    /// Creates a unit of work in the [`Phase::Requirements`] phase.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowDomainError::EmptyName`] when the name is blank.
    pub fn new(
        name: impl Into<String>,
        document_ref: DocumentRef,
        clock: &impl Clock,
    ) -> Result<Self, WorkflowDomainError> {
        let raw = name.into();
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(WorkflowDomainError::EmptyName);
        }
        let timestamp = clock.utc();
        Ok(Self {
            id: UnitOfWorkId::new(),
            name: trimmed.to_owned(),
            phase: Phase::Requirements,
            previous_phase: None,
            document_ref,
            branch_ref: None,
            created_at: timestamp,
            updated_at: timestamp,
        })
    }

    /// Reconstructs a unit of work from persisted storage.
    #[must_use]
    pub fn from_persisted(data: PersistedUnitOfWorkData) -> Self {
        Self {
            id: data.id,
            name: data.name,
            phase: data.phase,
            previous_phase: data.previous_phase,
            document_ref: data.document_ref,
            branch_ref: data.branch_ref,
            created_at: data.created_at,
            updated_at: data.updated_at,
        }
    }

    /// Returns the identifier.
    #[must_use]
    pub const fn id(&self) -> UnitOfWorkId {
        self.id
    }

    /// Returns the name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the current phase.
    #[must_use]
    pub const fn phase(&self) -> Phase {
        self.phase
    }

    /// Returns the phase before the last transition.
    #[must_use]
    pub const fn previous_phase(&self) -> Option<Phase> {
        self.previous_phase
    }

    /// Returns the document reference.
    #[must_use]
    pub const fn document_ref(&self) -> &DocumentRef {
        &self.document_ref
    }

    /// Returns the branch reference, if any.
    #[must_use]
    pub fn branch_ref(&self) -> Option<&str> {
        self.branch_ref.as_deref()
    }

    /// Returns the creation timestamp.
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Returns the latest update timestamp.
    #[must_use]
    pub const fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Sets the working branch.
    pub fn set_branch_ref(&mut self, branch_ref: impl Into<String>, clock: &impl Clock) {
        self.branch_ref = Some(branch_ref.into());
        self.updated_at = clock.utc();
    }

    /// Moves forward to `target`, returning the phase left behind.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowDomainError::InvalidTransition`] unless `target`
    /// comes after the current phase.
    pub fn advance_to(
        &mut self,
        target: Phase,
        clock: &impl Clock,
    ) -> Result<Phase, WorkflowDomainError> {
        if !self.phase.can_advance_to(target) {
            return Err(WorkflowDomainError::InvalidTransition {
                from: self.phase,
                to: target,
            });
        }
        Ok(self.move_to(target, clock))
    }

    /// Moves back to [`Phase::Implementation`] after a remote reopen,
    /// returning the phase left behind.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowDomainError::InvalidReopen`] unless the current
    /// phase is [`Phase::Testing`] or [`Phase::Completed`].
    pub fn reopen(&mut self, clock: &impl Clock) -> Result<Phase, WorkflowDomainError> {
        if !self.phase.can_reopen() {
            return Err(WorkflowDomainError::InvalidReopen(self.phase));
        }
        Ok(self.move_to(Phase::Implementation, clock))
    }

    fn move_to(&mut self, target: Phase, clock: &impl Clock) -> Phase {
        let from = self.phase;
        self.previous_phase = Some(from);
        self.phase = target;
        self.updated_at = clock.utc();
        from
    }
}
