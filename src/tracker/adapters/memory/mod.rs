//! In-memory tracker adapters for tests and deterministic local runs.

mod sync_record;
mod tracker;

pub use sync_record::InMemorySyncRecordRepository;
pub use tracker::{InMemoryTracker, TrackerOperation};
