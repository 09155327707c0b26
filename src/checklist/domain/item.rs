//! Checklist item and change value objects.

use serde::{Deserialize, Serialize};

/// A single checkbox line parsed from a document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChecklistItem {
    section: String,
    text: String,
    checked: bool,
    source_line: usize,
}

impl ChecklistItem {
    /// Creates a checklist item.
    ///
    /// Section and text are trimmed; `source_line` is the zero-based line
    /// index the item was read from.
    #[must_use]
    pub fn new(
        section: impl Into<String>,
        text: impl Into<String>,
        checked: bool,
        source_line: usize,
    ) -> Self {
        Self {
            section: section.into().trim().to_owned(),
            text: text.into().trim().to_owned(),
            checked,
            source_line,
        }
    }

    /// Returns the nearest enclosing heading text, or `""` before any
    /// heading.
    #[must_use]
    pub fn section(&self) -> &str {
        &self.section
    }

    /// Returns the item label.
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Returns whether the checkbox is ticked.
    #[must_use]
    pub const fn checked(&self) -> bool {
        self.checked
    }

    /// Returns the zero-based source line.
    ///
    /// Only meaningful for the document the item was parsed from.
    #[must_use]
    pub const fn source_line(&self) -> usize {
        self.source_line
    }

    /// Returns the identity key used to correlate snapshots.
    #[must_use]
    pub fn key(&self) -> (&str, &str) {
        (&self.section, &self.text)
    }
}

/// A check-state flip on an item present in both compared snapshots.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChecklistChange {
    /// Section of the changed item.
    pub section: String,
    /// Label of the changed item.
    pub text: String,
    /// Check state in the source snapshot.
    pub old_value: bool,
    /// Check state in the target snapshot.
    pub new_value: bool,
}

impl ChecklistChange {
    /// Creates a change record.
    #[must_use]
    pub fn new(
        section: impl Into<String>,
        text: impl Into<String>,
        old_value: bool,
        new_value: bool,
    ) -> Self {
        Self {
            section: section.into(),
            text: text.into(),
            old_value,
            new_value,
        }
    }
}
