//! Repository port for sync record persistence.

use crate::tracker::domain::{RemoteNumber, SyncEntity, SyncRecord};
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

/// Result type for sync record repository operations.
pub type SyncRecordRepositoryResult<T> = Result<T, SyncRecordRepositoryError>;

/// Sync record persistence contract.
///
/// There is deliberately no delete: records are updated in place so that
/// failure history is retained.
#[async_trait]
pub trait SyncRecordRepository: Send + Sync {
    /// Stores a new record.
    ///
    /// # Errors
    ///
    /// Returns [`SyncRecordRepositoryError::DuplicateRecord`] when a record
    /// already exists for the same entity.
    async fn store(&self, record: &SyncRecord) -> SyncRecordRepositoryResult<()>;

    /// Persists changes to an existing record.
    ///
    /// # Errors
    ///
    /// Returns [`SyncRecordRepositoryError::NotFound`] when no record exists
    /// for the entity.
    async fn update(&self, record: &SyncRecord) -> SyncRecordRepositoryResult<()>;

    /// Finds the record for an entity.
    async fn find(&self, entity: &SyncEntity) -> SyncRecordRepositoryResult<Option<SyncRecord>>;

    /// Finds the record mirrored by a remote issue number.
    async fn find_by_remote_number(
        &self,
        number: RemoteNumber,
    ) -> SyncRecordRepositoryResult<Option<SyncRecord>>;

    /// Returns every child record linked under `parent`.
    async fn find_children(
        &self,
        parent: RemoteNumber,
    ) -> SyncRecordRepositoryResult<Vec<SyncRecord>>;
}

/// Errors returned by sync record repository implementations.
#[derive(Debug, Clone, Error)]
pub enum SyncRecordRepositoryError {
    /// A record for the entity already exists.
    #[error("duplicate sync record for {0}")]
    DuplicateRecord(SyncEntity),

    /// No record exists for the entity.
    #[error("sync record not found for {0}")]
    NotFound(SyncEntity),

    /// Persistence-layer failure.
    #[error("persistence error: {0}")]
    Persistence(Arc<dyn std::error::Error + Send + Sync>),
}

impl SyncRecordRepositoryError {
    /// Wraps a persistence error.
    pub fn persistence(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Persistence(Arc::new(err))
    }
}
