//! `PostgreSQL` repository implementation for sync record storage.

use super::{models::SyncRecordRow, schema::sync_records};
use crate::checklist::ChecklistChecksum;
use crate::tracker::{
    domain::{
        PersistedSyncRecordData, RemoteLink, RemoteNodeId, RemoteNumber, SyncEntity,
        SyncEntityType, SyncRecord, SyncStatus,
    },
    ports::{SyncRecordRepository, SyncRecordRepositoryError, SyncRecordRepositoryResult},
};
use async_trait::async_trait;
use diesel::pg::PgConnection;
use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, Pool};
use diesel::result::{DatabaseErrorKind, Error as DieselError};

/// `PostgreSQL` connection pool type used by sync record adapters.
pub type SyncPgPool = Pool<ConnectionManager<PgConnection>>;

/// `PostgreSQL`-backed sync record repository.
#[derive(Debug, Clone)]
pub struct PostgresSyncRecordRepository {
    pool: SyncPgPool,
}

impl PostgresSyncRecordRepository {
    /// Creates a new repository from a `PostgreSQL` connection pool.
    #[must_use]
    pub const fn new(pool: SyncPgPool) -> Self {
        Self { pool }
    }

    async fn run_blocking<F, T>(&self, f: F) -> SyncRecordRepositoryResult<T>
    where
        F: FnOnce(&mut PgConnection) -> SyncRecordRepositoryResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || {
            let mut connection = pool.get().map_err(SyncRecordRepositoryError::persistence)?;
            f(&mut connection)
        })
        .await
        .map_err(SyncRecordRepositoryError::persistence)?
    }
}

#[async_trait]
impl SyncRecordRepository for PostgresSyncRecordRepository {
    async fn store(&self, record: &SyncRecord) -> SyncRecordRepositoryResult<()> {
        let entity = record.entity().clone();
        let row = record_to_row(record)?;
        self.run_blocking(move |connection| {
            diesel::insert_into(sync_records::table)
                .values(&row)
                .execute(connection)
                .map_err(|err| match err {
                    DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _) => {
                        SyncRecordRepositoryError::DuplicateRecord(entity.clone())
                    }
                    _ => SyncRecordRepositoryError::persistence(err),
                })?;
            Ok(())
        })
        .await
    }

    async fn update(&self, record: &SyncRecord) -> SyncRecordRepositoryResult<()> {
        let entity = record.entity().clone();
        let row = record_to_row(record)?;
        self.run_blocking(move |connection| {
            let affected = diesel::update(
                sync_records::table
                    .filter(sync_records::entity_type.eq(entity.entity_type().as_str()))
                    .filter(sync_records::entity_id.eq(entity.entity_id())),
            )
            .set(&row)
            .execute(connection)
            .map_err(SyncRecordRepositoryError::persistence)?;
            if affected == 0 {
                return Err(SyncRecordRepositoryError::NotFound(entity));
            }
            Ok(())
        })
        .await
    }

    async fn find(&self, entity: &SyncEntity) -> SyncRecordRepositoryResult<Option<SyncRecord>> {
        let lookup = entity.clone();
        self.run_blocking(move |connection| {
            let row = sync_records::table
                .filter(sync_records::entity_type.eq(lookup.entity_type().as_str()))
                .filter(sync_records::entity_id.eq(lookup.entity_id()))
                .select(SyncRecordRow::as_select())
                .first::<SyncRecordRow>(connection)
                .optional()
                .map_err(SyncRecordRepositoryError::persistence)?;
            row.map(row_to_record).transpose()
        })
        .await
    }

    async fn find_by_remote_number(
        &self,
        number: RemoteNumber,
    ) -> SyncRecordRepositoryResult<Option<SyncRecord>> {
        let remote_number = to_column(number)?;
        self.run_blocking(move |connection| {
            let row = sync_records::table
                .filter(sync_records::remote_number.eq(remote_number))
                .select(SyncRecordRow::as_select())
                .first::<SyncRecordRow>(connection)
                .optional()
                .map_err(SyncRecordRepositoryError::persistence)?;
            row.map(row_to_record).transpose()
        })
        .await
    }

    async fn find_children(
        &self,
        parent: RemoteNumber,
    ) -> SyncRecordRepositoryResult<Vec<SyncRecord>> {
        let parent_number = to_column(parent)?;
        self.run_blocking(move |connection| {
            sync_records::table
                .filter(sync_records::parent_remote_number.eq(parent_number))
                .order(sync_records::remote_number.asc())
                .select(SyncRecordRow::as_select())
                .load::<SyncRecordRow>(connection)
                .map_err(SyncRecordRepositoryError::persistence)?
                .into_iter()
                .map(row_to_record)
                .collect()
        })
        .await
    }
}

fn to_column(number: RemoteNumber) -> SyncRecordRepositoryResult<i64> {
    i64::try_from(number.value()).map_err(SyncRecordRepositoryError::persistence)
}

fn from_column(value: i64) -> SyncRecordRepositoryResult<RemoteNumber> {
    let unsigned = u64::try_from(value).map_err(SyncRecordRepositoryError::persistence)?;
    RemoteNumber::new(unsigned).map_err(SyncRecordRepositoryError::persistence)
}

/// Converts a domain record into its row representation.
pub(super) fn record_to_row(record: &SyncRecord) -> SyncRecordRepositoryResult<SyncRecordRow> {
    Ok(SyncRecordRow {
        entity_type: record.entity().entity_type().as_str().to_owned(),
        entity_id: record.entity().entity_id().to_owned(),
        remote_id: i64::try_from(record.remote_id())
            .map_err(SyncRecordRepositoryError::persistence)?,
        remote_number: to_column(record.remote_number())?,
        remote_node_id: record.remote_node_id().map(|id| id.as_str().to_owned()),
        parent_remote_number: record.parent_remote_number().map(to_column).transpose()?,
        last_synced_at: record.last_synced_at(),
        sync_status: record.sync_status().as_str().to_owned(),
        error_message: record.error_message().map(str::to_owned),
        checklist_checksum: record
            .checklist_checksum()
            .map(|checksum| checksum.as_str().to_owned()),
    })
}

/// Reconstructs a domain record from its row representation.
pub(super) fn row_to_record(row: SyncRecordRow) -> SyncRecordRepositoryResult<SyncRecord> {
    let SyncRecordRow {
        entity_type: persisted_entity_type,
        entity_id,
        remote_id,
        remote_number,
        remote_node_id,
        parent_remote_number,
        last_synced_at,
        sync_status: persisted_status,
        error_message,
        checklist_checksum,
    } = row;

    let entity_type = SyncEntityType::try_from(persisted_entity_type.as_str())
        .map_err(SyncRecordRepositoryError::persistence)?;
    let status = SyncStatus::try_from(persisted_status.as_str())
        .map_err(SyncRecordRepositoryError::persistence)?;
    let node_id = remote_node_id
        .map(RemoteNodeId::new)
        .transpose()
        .map_err(SyncRecordRepositoryError::persistence)?;

    Ok(SyncRecord::from_persisted(PersistedSyncRecordData {
        entity: SyncEntity::new(entity_type, entity_id),
        link: RemoteLink {
            remote_id: u64::try_from(remote_id).map_err(SyncRecordRepositoryError::persistence)?,
            remote_number: from_column(remote_number)?,
            remote_node_id: node_id,
            parent_remote_number: parent_remote_number.map(from_column).transpose()?,
        },
        last_synced_at,
        sync_status: status,
        error_message,
        checklist_checksum: checklist_checksum.map(ChecklistChecksum::from_persisted),
    }))
}
