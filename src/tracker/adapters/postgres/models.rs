//! Diesel row models for sync record persistence.

use super::schema::sync_records;
use chrono::{DateTime, Utc};
use diesel::prelude::*;

/// Query result row and insert/update model for sync records.
#[derive(Debug, Clone, PartialEq, Eq, Queryable, Selectable, Insertable, AsChangeset)]
#[diesel(table_name = sync_records)]
#[diesel(primary_key(entity_type, entity_id))]
#[diesel(check_for_backend(diesel::pg::Pg))]
#[diesel(treat_none_as_null = true)]
pub struct SyncRecordRow {
    /// Local entity kind.
    pub entity_type: String,
    /// Local entity identifier.
    pub entity_id: String,
    /// Numeric remote identifier.
    pub remote_id: i64,
    /// Repository-scoped issue number.
    pub remote_number: i64,
    /// Graph node identifier.
    pub remote_node_id: Option<String>,
    /// Parent issue number for child items.
    pub parent_remote_number: Option<i64>,
    /// Last reconciliation timestamp.
    pub last_synced_at: DateTime<Utc>,
    /// Last reconciliation outcome.
    pub sync_status: String,
    /// Last failure message.
    pub error_message: Option<String>,
    /// Checksum of the last reconciled checklist.
    pub checklist_checksum: Option<String>,
}
