//! Error types for workflow domain validation and parsing.

use super::Phase;
use thiserror::Error;

/// Errors returned while constructing or mutating workflow values.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum WorkflowDomainError {
    /// The unit of work name is empty after trimming.
    #[error("unit of work name must not be empty")]
    EmptyName,

    /// The sub-task title is empty after trimming.
    #[error("sub-task title must not be empty")]
    EmptyTitle,

    /// The document reference is not a relative path inside the workspace.
    #[error("invalid document reference '{0}', expected a relative path")]
    InvalidDocumentRef(String),

    /// The requested phase transition does not move forward.
    #[error("cannot move from {from} to {to}: phases only advance")]
    InvalidTransition {
        /// Current phase.
        from: Phase,
        /// Requested phase.
        to: Phase,
    },

    /// Reopening is only possible from testing or completed.
    #[error("cannot reopen from {0}: only testing or completed work can be reopened")]
    InvalidReopen(Phase),
}

/// Error returned while parsing phases from persistence.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown phase: {0}")]
pub struct ParsePhaseError(pub String);
