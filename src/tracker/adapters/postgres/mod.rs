//! `PostgreSQL` adapters for sync record persistence.

mod models;
mod repository;
mod schema;


pub use models::SyncRecordRow;
pub use repository::{PostgresSyncRecordRepository, SyncPgPool};
