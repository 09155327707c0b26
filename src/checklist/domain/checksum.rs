//! Order-sensitive content hash of a checklist snapshot.

use super::ChecklistItem;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

/// Hex-encoded SHA-256 digest of a checklist.
///
/// Items are fed in encountered order as length-prefixed
/// `(section, text, checked)` tuples, so reordering changes the digest.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChecklistChecksum(String);

impl ChecklistChecksum {
    /// Computes the checksum of the given items.
    #[must_use]
    pub fn compute(items: &[ChecklistItem]) -> Self {
        let mut hasher = Sha256::new();
        for item in items {
            feed_field(&mut hasher, item.section());
            feed_field(&mut hasher, item.text());
            hasher.update(if item.checked() { b"1" } else { b"0" });
            hasher.update(b"\n");
        }
        Self(hex::encode(hasher.finalize()))
    }

    /// Wraps a previously persisted digest.
    #[must_use]
    pub fn from_persisted(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Returns the digest as a hex string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

fn feed_field(hasher: &mut Sha256, value: &str) {
    hasher.update(value.len().to_string().as_bytes());
    hasher.update(b":");
    hasher.update(value.as_bytes());
}

impl AsRef<str> for ChecklistChecksum {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl fmt::Display for ChecklistChecksum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
