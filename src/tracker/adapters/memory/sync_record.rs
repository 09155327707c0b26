//! In-memory sync record repository.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, RwLock};

use crate::tracker::{
    domain::{RemoteNumber, SyncEntity, SyncRecord},
    ports::{SyncRecordRepository, SyncRecordRepositoryError, SyncRecordRepositoryResult},
};

/// Thread-safe in-memory sync record repository.
#[derive(Debug, Clone, Default)]
pub struct InMemorySyncRecordRepository {
    state: Arc<RwLock<InMemorySyncRecordState>>,
}

#[derive(Debug, Default)]
struct InMemorySyncRecordState {
    records: HashMap<SyncEntity, SyncRecord>,
    number_index: HashMap<RemoteNumber, SyncEntity>,
    failing_entities: HashSet<SyncEntity>,
}

impl InMemorySyncRecordRepository {
    /// Creates an empty repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent write for `entity` fail with a persistence
    /// error.
    ///
    /// # Errors
    ///
    /// Returns [`SyncRecordRepositoryError::Persistence`] when the state lock
    /// is poisoned.
    pub fn fail_writes_for(&self, entity: SyncEntity) -> SyncRecordRepositoryResult<()> {
        let mut state = self.write_state()?;
        state.failing_entities.insert(entity);
        Ok(())
    }

    /// Returns the number of stored records.
    ///
    /// # Errors
    ///
    /// Returns [`SyncRecordRepositoryError::Persistence`] when the state lock
    /// is poisoned.
    pub fn len(&self) -> SyncRecordRepositoryResult<usize> {
        Ok(self.read_state()?.records.len())
    }

    /// Returns whether the repository holds no records.
    ///
    /// # Errors
    ///
    /// Returns [`SyncRecordRepositoryError::Persistence`] when the state lock
    /// is poisoned.
    pub fn is_empty(&self) -> SyncRecordRepositoryResult<bool> {
        Ok(self.len()? == 0)
    }

    fn read_state(
        &self,
    ) -> SyncRecordRepositoryResult<std::sync::RwLockReadGuard<'_, InMemorySyncRecordState>> {
        self.state.read().map_err(|err| {
            SyncRecordRepositoryError::persistence(std::io::Error::other(err.to_string()))
        })
    }

    fn write_state(
        &self,
    ) -> SyncRecordRepositoryResult<std::sync::RwLockWriteGuard<'_, InMemorySyncRecordState>> {
        self.state.write().map_err(|err| {
            SyncRecordRepositoryError::persistence(std::io::Error::other(err.to_string()))
        })
    }
}

fn injected_failure(
    state: &InMemorySyncRecordState,
    entity: &SyncEntity,
) -> SyncRecordRepositoryResult<()> {
    if state.failing_entities.contains(entity) {
        return Err(SyncRecordRepositoryError::persistence(std::io::Error::other(
            format!("injected write failure for {entity}"),
        )));
    }
    Ok(())
}

#[async_trait]
impl SyncRecordRepository for InMemorySyncRecordRepository {
    async fn store(&self, record: &SyncRecord) -> SyncRecordRepositoryResult<()> {
        let mut state = self.write_state()?;
        let entity = record.entity().clone();
        injected_failure(&state, &entity)?;
        if state.records.contains_key(&entity) {
            return Err(SyncRecordRepositoryError::DuplicateRecord(entity));
        }
        state
            .number_index
            .insert(record.remote_number(), entity.clone());
        state.records.insert(entity, record.clone());
        Ok(())
    }

    async fn update(&self, record: &SyncRecord) -> SyncRecordRepositoryResult<()> {
        let mut state = self.write_state()?;
        let entity = record.entity().clone();
        injected_failure(&state, &entity)?;
        let previous_number = state
            .records
            .get(&entity)
            .ok_or_else(|| SyncRecordRepositoryError::NotFound(entity.clone()))?
            .remote_number();
        if previous_number != record.remote_number() {
            state.number_index.remove(&previous_number);
        }
        state
            .number_index
            .insert(record.remote_number(), entity.clone());
        state.records.insert(entity, record.clone());
        Ok(())
    }

    async fn find(&self, entity: &SyncEntity) -> SyncRecordRepositoryResult<Option<SyncRecord>> {
        Ok(self.read_state()?.records.get(entity).cloned())
    }

    async fn find_by_remote_number(
        &self,
        number: RemoteNumber,
    ) -> SyncRecordRepositoryResult<Option<SyncRecord>> {
        let state = self.read_state()?;
        Ok(state
            .number_index
            .get(&number)
            .and_then(|entity| state.records.get(entity))
            .cloned())
    }

    async fn find_children(
        &self,
        parent: RemoteNumber,
    ) -> SyncRecordRepositoryResult<Vec<SyncRecord>> {
        let state = self.read_state()?;
        let mut children: Vec<SyncRecord> = state
            .records
            .values()
            .filter(|record| record.parent_remote_number() == Some(parent))
            .cloned()
            .collect();
        children.sort_by_key(SyncRecord::remote_number);
        Ok(children)
    }
}
