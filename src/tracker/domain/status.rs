//! Project board status field definitions and verification results.

use serde::{Deserialize, Serialize};

/// One selectable option of a single-select status field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusOption {
    /// Option identifier used by the update mutation.
    pub id: String,
    /// Human-visible option name.
    pub name: String,
}

impl StatusOption {
    /// Creates an option.
    #[must_use]
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

/// Status field definition for a project board.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusField {
    /// Field identifier.
    pub field_id: String,
    /// Field name, usually `Status`.
    pub name: String,
    /// Enumerated options in board order.
    pub options: Vec<StatusOption>,
}

impl StatusField {
    /// Finds an option by exact name, falling back to a case-insensitive
    /// match.
    #[must_use]
    pub fn find_option(&self, name: &str) -> Option<&StatusOption> {
        self.options
            .iter()
            .find(|option| option.name == name)
            .or_else(|| {
                self.options
                    .iter()
                    .find(|option| option.name.eq_ignore_ascii_case(name))
            })
    }

    /// Returns the option names in board order.
    #[must_use]
    pub fn option_names(&self) -> Vec<&str> {
        self.options.iter().map(|option| option.name.as_str()).collect()
    }
}

/// Result of polling a status update until it converges.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusVerification {
    /// Whether the observed status matched the expected one.
    pub success: bool,
    /// Number of checks performed.
    pub attempts: u32,
    /// Last status observed on the board, if any.
    pub actual_status: Option<String>,
}
