//! Lifecycle phases of a unit of work.

use super::ParsePhaseError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Canonical lifecycle phase, ordered from first to last.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// Requirements are being written.
    Requirements,
    /// The design is being written.
    Design,
    /// Work is being decomposed into sub-tasks.
    Tasks,
    /// Sub-tasks are being implemented.
    Implementation,
    /// The implementation is under test.
    Testing,
    /// The unit of work is done.
    Completed,
}

impl Phase {
    /// Every phase in canonical order.
    pub const ALL: [Self; 6] = [
        Self::Requirements,
        Self::Design,
        Self::Tasks,
        Self::Implementation,
        Self::Testing,
        Self::Completed,
    ];

    /// Returns the canonical storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Requirements => "requirements",
            Self::Design => "design",
            Self::Tasks => "tasks",
            Self::Implementation => "implementation",
            Self::Testing => "testing",
            Self::Completed => "completed",
        }
    }

    /// Returns the zero-based position in the canonical ordering.
    #[must_use]
    pub const fn ordinal(self) -> u8 {
        match self {
            Self::Requirements => 0,
            Self::Design => 1,
            Self::Tasks => 2,
            Self::Implementation => 3,
            Self::Testing => 4,
            Self::Completed => 5,
        }
    }

    /// Returns the following phase, or `None` from [`Self::Completed`].
    #[must_use]
    pub const fn next(self) -> Option<Self> {
        match self {
            Self::Requirements => Some(Self::Design),
            Self::Design => Some(Self::Tasks),
            Self::Tasks => Some(Self::Implementation),
            Self::Implementation => Some(Self::Testing),
            Self::Testing => Some(Self::Completed),
            Self::Completed => None,
        }
    }

    /// Returns whether moving to `target` is a forward transition.
    #[must_use]
    pub const fn can_advance_to(self, target: Self) -> bool {
        target.ordinal() > self.ordinal()
    }

    /// Returns whether a remote reopen may move this phase back.
    #[must_use]
    pub const fn can_reopen(self) -> bool {
        matches!(self, Self::Testing | Self::Completed)
    }
}

impl TryFrom<&str> for Phase {
    type Error = ParsePhaseError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let normalized = value.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|phase| phase.as_str() == normalized)
            .ok_or_else(|| ParsePhaseError(value.to_owned()))
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
