//! GitHub adapter for the remote tracker port.
//!
//! Issues, comments, and sub-issue links use the REST API; the Projects v2
//! status field is read and written through GraphQL.

mod client;
mod models;
mod queries;


pub use client::{GitHubSettings, GitHubTracker};
