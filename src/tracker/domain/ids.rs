//! Identifier types for remote tracker items.

use super::TrackerDomainError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Positive issue number on the remote tracker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u64", into = "u64")]
pub struct RemoteNumber(u64);

impl RemoteNumber {
    /// Largest number representable in the `sync_records` schema.
    const MAX_PERSISTED_VALUE: u64 = i64::MAX.unsigned_abs();

    /// Creates a validated remote number.
    ///
    /// # Errors
    ///
    /// Returns [`TrackerDomainError::InvalidRemoteNumber`] when the value is
    /// zero or exceeds `i64::MAX`.
    pub const fn new(value: u64) -> Result<Self, TrackerDomainError> {
        if value == 0 || value > Self::MAX_PERSISTED_VALUE {
            return Err(TrackerDomainError::InvalidRemoteNumber(value));
        }
        Ok(Self(value))
    }

    /// Returns the underlying numeric value.
    #[must_use]
    pub const fn value(self) -> u64 {
        self.0
    }
}

impl TryFrom<u64> for RemoteNumber {
    type Error = TrackerDomainError;

    fn try_from(value: u64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<RemoteNumber> for u64 {
    fn from(value: RemoteNumber) -> Self {
        value.0
    }
}

impl fmt::Display for RemoteNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Opaque global node identifier used by the tracker's graph API.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RemoteNodeId(String);

impl RemoteNodeId {
    /// Creates a validated node identifier.
    ///
    /// # Errors
    ///
    /// Returns [`TrackerDomainError::EmptyNodeId`] when the value is blank.
    pub fn new(value: impl Into<String>) -> Result<Self, TrackerDomainError> {
        let raw = value.into();
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(TrackerDomainError::EmptyNodeId);
        }
        Ok(Self(trimmed.to_owned()))
    }

    /// Returns the identifier as `str`.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for RemoteNodeId {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl fmt::Display for RemoteNodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
