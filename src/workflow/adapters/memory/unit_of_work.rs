//! In-memory unit of work repository.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::workflow::{
    domain::{UnitOfWork, UnitOfWorkId},
    ports::{UnitOfWorkRepository, WorkflowRepositoryError, WorkflowRepositoryResult},
};

/// Thread-safe in-memory unit of work repository.
#[derive(Debug, Clone, Default)]
pub struct InMemoryUnitOfWorkRepository {
    state: Arc<RwLock<HashMap<UnitOfWorkId, UnitOfWork>>>,
}

impl InMemoryUnitOfWorkRepository {
    /// Creates an empty repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

fn poisoned(err: impl std::fmt::Display) -> WorkflowRepositoryError {
    WorkflowRepositoryError::persistence(std::io::Error::other(err.to_string()))
}

#[async_trait]
impl UnitOfWorkRepository for InMemoryUnitOfWorkRepository {
    async fn store(&self, unit_of_work: &UnitOfWork) -> WorkflowRepositoryResult<()> {
        let mut state = self.state.write().map_err(poisoned)?;
        if state.contains_key(&unit_of_work.id()) {
            return Err(WorkflowRepositoryError::DuplicateUnitOfWork(
                unit_of_work.id(),
            ));
        }
        state.insert(unit_of_work.id(), unit_of_work.clone());
        Ok(())
    }

    async fn update(&self, unit_of_work: &UnitOfWork) -> WorkflowRepositoryResult<()> {
        let mut state = self.state.write().map_err(poisoned)?;
        let slot = state
            .get_mut(&unit_of_work.id())
            .ok_or(WorkflowRepositoryError::UnitOfWorkNotFound(unit_of_work.id()))?;
        *slot = unit_of_work.clone();
        Ok(())
    }

    async fn find_by_id(&self, id: UnitOfWorkId) -> WorkflowRepositoryResult<Option<UnitOfWork>> {
        let state = self.state.read().map_err(poisoned)?;
        Ok(state.get(&id).cloned())
    }
}
