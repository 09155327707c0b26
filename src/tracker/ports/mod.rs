//! Port contracts for remote tracker synchronisation.

mod remote;
mod repository;
mod sleeper;

pub use remote::{RemoteTracker, RemoteTrackerError, RemoteTrackerResult};
pub use repository::{SyncRecordRepository, SyncRecordRepositoryError, SyncRecordRepositoryResult};
pub use sleeper::Sleeper;
