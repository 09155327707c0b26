//! Unit of work lifecycle management.
//!
//! A unit of work moves through ordered phases; entering a phase triggers
//! the remote issue, checklist, and board actions owed to it. The module
//! follows hexagonal architecture:
//!
//! - Units of work, sub-tasks, and phases in [`domain`]
//! - Repository, document, and quality gate contracts in [`ports`]
//! - Filesystem, in-memory, and gate implementations in [`adapters`]
//! - Transitions, reconciliation, and the phase state machine in
//!   [`services`]

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod services;

#[cfg(test)]
mod tests;
