//! Diesel schema for sync record persistence.

diesel::table! {
    /// Local records correlating entities with remote issues.
    sync_records (entity_type, entity_id) {
        /// Local entity kind.
        #[max_length = 50]
        entity_type -> Varchar,
        /// Local entity identifier.
        #[max_length = 255]
        entity_id -> Varchar,
        /// Numeric remote identifier.
        remote_id -> Int8,
        /// Repository-scoped issue number.
        remote_number -> Int8,
        /// Graph node identifier.
        #[max_length = 255]
        remote_node_id -> Nullable<Varchar>,
        /// Parent issue number for child items.
        parent_remote_number -> Nullable<Int8>,
        /// Last reconciliation timestamp.
        last_synced_at -> Timestamptz,
        /// Last reconciliation outcome.
        #[max_length = 20]
        sync_status -> Varchar,
        /// Last failure message.
        error_message -> Nullable<Text>,
        /// Checksum of the last reconciled checklist.
        #[max_length = 64]
        checklist_checksum -> Nullable<Varchar>,
    }
}
