//! Tracker synchronisation services.

mod issue_sync;
mod rate_limit;
mod status;

pub use issue_sync::{
    ChildSyncOutcome, DEFAULT_MAX_CHILDREN, IssueSyncError, IssueSyncResult,
    RemoteIssueSyncService,
};
pub use rate_limit::{RateLimitPolicy, RateLimitedClient, RateLimitedTracker};
pub use status::{
    StatusSettings, StatusSyncError, StatusSyncResult, StatusVerificationService, default_status,
};
