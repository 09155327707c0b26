//! Parsed checklist snapshots and completion progress.

use super::{ChecklistChecksum, ChecklistDiffEngine, ChecklistItem};
use serde::{Deserialize, Serialize};

/// Items parsed from one document together with their checksum.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChecklistSnapshot {
    items: Vec<ChecklistItem>,
    checksum: ChecklistChecksum,
}

impl ChecklistSnapshot {
    /// Builds a snapshot from already-parsed items.
    #[must_use]
    pub fn new(items: Vec<ChecklistItem>) -> Self {
        let checksum = ChecklistChecksum::compute(&items);
        Self { items, checksum }
    }

    /// Parses `document` and builds its snapshot.
    #[must_use]
    pub fn from_document(engine: &ChecklistDiffEngine, document: &str) -> Self {
        Self::new(engine.parse(document))
    }

    /// Returns the parsed items.
    #[must_use]
    pub fn items(&self) -> &[ChecklistItem] {
        &self.items
    }

    /// Returns the snapshot checksum.
    #[must_use]
    pub const fn checksum(&self) -> &ChecklistChecksum {
        &self.checksum
    }

    /// Returns whether the snapshot contains no items.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Returns completion counts.
    #[must_use]
    pub fn progress(&self) -> ChecklistProgress {
        ChecklistProgress {
            total: self.items.len(),
            completed: self.items.iter().filter(|item| item.checked()).count(),
        }
    }

    /// Returns the unchecked items in document order.
    pub fn pending(&self) -> impl Iterator<Item = &ChecklistItem> {
        self.items.iter().filter(|item| !item.checked())
    }

    /// Renders the items as a standalone Markdown checklist.
    ///
    /// A `###` heading is emitted whenever the section changes, so parsing
    /// the output yields the same `(section, text)` keys and check states.
    #[must_use]
    pub fn to_markdown(&self) -> String {
        let mut out = String::new();
        let mut section = "";
        for item in &self.items {
            if item.section() != section {
                section = item.section();
                if !out.is_empty() {
                    out.push('\n');
                }
                out.push_str("### ");
                out.push_str(section);
                out.push_str("\n\n");
            }
            out.push_str(if item.checked() { "- [x] " } else { "- [ ] " });
            out.push_str(item.text());
            out.push('\n');
        }
        out
    }
}

/// Checklist completion counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChecklistProgress {
    /// Number of items.
    pub total: usize,
    /// Number of ticked items.
    pub completed: usize,
}

impl ChecklistProgress {
    /// Returns the completed share as a whole percentage.
    ///
    /// An empty checklist reports `0`.
    #[must_use]
    pub fn percent(self) -> usize {
        self.completed
            .saturating_mul(100)
            .checked_div(self.total)
            .unwrap_or(0)
    }

    /// Returns whether every item is ticked.
    ///
    /// An empty checklist is not considered complete.
    #[must_use]
    pub const fn is_complete(self) -> bool {
        self.total > 0 && self.completed == self.total
    }
}
