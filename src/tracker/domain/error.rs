//! Error types for tracker domain validation and parsing.

use thiserror::Error;

/// Errors returned while constructing tracker domain values.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TrackerDomainError {
    /// The remote issue number is invalid.
    #[error("invalid remote number {0}, expected a positive integer")]
    InvalidRemoteNumber(u64),

    /// The remote node identifier is empty after trimming.
    #[error("remote node identifier must not be empty")]
    EmptyNodeId,

    /// The issue title is empty after trimming.
    #[error("issue title must not be empty")]
    EmptyIssueTitle,

    /// An issue template failed to render.
    #[error("failed to render {template} template: {reason}")]
    TemplateRender {
        /// Template name.
        template: &'static str,
        /// Renderer error message.
        reason: String,
    },
}

/// Error returned while parsing persisted sync enums.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown {kind}: {value}")]
pub struct ParseSyncValueError {
    /// The enum being parsed.
    pub kind: &'static str,
    /// The rejected value.
    pub value: String,
}
