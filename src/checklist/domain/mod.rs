//! Domain model for checklist reconciliation.
//!
//! Everything here is pure: no I/O, no clock, no async. The engine operates
//! on document text and returns new values.

mod checksum;
mod engine;
mod error;
mod item;
mod snapshot;

pub use checksum::ChecklistChecksum;
pub use engine::ChecklistDiffEngine;
pub use error::ChecklistError;
pub use item::{ChecklistChange, ChecklistItem};
pub use snapshot::{ChecklistProgress, ChecklistSnapshot};
