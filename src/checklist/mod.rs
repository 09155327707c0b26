//! Checklist parsing, hashing, diffing, and patching.
//!
//! A checklist is re-derived from its document on every read. Items are
//! identified by `(section, text)`; line numbers are only used to target
//! patches and never to correlate two snapshots. The module follows the same
//! layering as the other bounded contexts:
//!
//! - Value objects and the diff engine in [`domain`]

pub mod domain;

#[cfg(test)]
mod tests;

pub use domain::{
    ChecklistChange, ChecklistChecksum, ChecklistDiffEngine, ChecklistError, ChecklistItem,
    ChecklistProgress, ChecklistSnapshot,
};
