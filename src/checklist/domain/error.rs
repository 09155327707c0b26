//! Error types for checklist parsing.

use thiserror::Error;

/// Errors returned while constructing the checklist engine.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ChecklistError {
    /// A line pattern failed to compile.
    #[error("invalid checklist pattern '{pattern}': {reason}")]
    InvalidPattern {
        /// Pattern source.
        pattern: String,
        /// Compiler diagnostic.
        reason: String,
    },
}
