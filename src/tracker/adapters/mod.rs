//! Adapters for the tracker ports.
//!
//! - [`memory`]: in-process fakes for the tracker and the sync record store
//! - [`postgres`]: Diesel-backed sync record persistence
//! - [`github`]: `reqwest` client for the GitHub REST and GraphQL APIs
//! - [`sleeper`]: Tokio-backed and recording [`Sleeper`] implementations
//!
//! [`Sleeper`]: crate::tracker::ports::Sleeper

pub mod github;
pub mod memory;
pub mod postgres;
pub mod sleeper;
