//! Port for backoff waits.

use async_trait::async_trait;
use std::time::Duration;

/// Suspends the current task.
///
/// Every backoff in the crate waits through this port so tests can observe
/// the requested delays without waiting on the wall clock.
#[async_trait]
pub trait Sleeper: Send + Sync {
    /// Waits for `duration`.
    async fn sleep(&self, duration: Duration);
}
