//! In-memory sub-task repository.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::workflow::{
    domain::{SubTask, SubTaskId, UnitOfWorkId},
    ports::{SubTaskRepository, WorkflowRepositoryError, WorkflowRepositoryResult},
};

/// Thread-safe in-memory sub-task repository.
#[derive(Debug, Clone, Default)]
pub struct InMemorySubTaskRepository {
    state: Arc<RwLock<InMemorySubTaskState>>,
}

#[derive(Debug, Default)]
struct InMemorySubTaskState {
    sub_tasks: HashMap<SubTaskId, SubTask>,
    parent_index: HashMap<UnitOfWorkId, Vec<SubTaskId>>,
}

impl InMemorySubTaskRepository {
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
impl SubTaskRepository for InMemorySubTaskRepository {
    async fn store(&self, sub_task: &SubTask) -> WorkflowRepositoryResult<()> {
        let mut state = self.state.write().map_err(poisoned)?;
        if state.sub_tasks.contains_key(&sub_task.id()) {
            return Err(WorkflowRepositoryError::DuplicateSubTask(sub_task.id()));
        }
        state
            .parent_index
            .entry(sub_task.parent_unit_of_work_id())
            .or_default()
            .push(sub_task.id());
        state.sub_tasks.insert(sub_task.id(), sub_task.clone());
        Ok(())
    }

    async fn update(&self, sub_task: &SubTask) -> WorkflowRepositoryResult<()> {
        let mut state = self.state.write().map_err(poisoned)?;
        let slot = state
            .sub_tasks
            .get_mut(&sub_task.id())
            .ok_or(WorkflowRepositoryError::SubTaskNotFound(sub_task.id()))?;
        *slot = sub_task.clone();
        Ok(())
    }

    async fn find_by_id(&self, id: SubTaskId) -> WorkflowRepositoryResult<Option<SubTask>> {
        let state = self.state.read().map_err(poisoned)?;
        Ok(state.sub_tasks.get(&id).cloned())
    }

    async fn find_by_parent(&self, parent: UnitOfWorkId) -> WorkflowRepositoryResult<Vec<SubTask>> {
        let state = self.state.read().map_err(poisoned)?;
        Ok(state
            .parent_index
            .get(&parent)
            .map(|ids| {
                ids.iter()
                    .filter_map(|id| state.sub_tasks.get(id).cloned())
                    .collect()
            })
            .unwrap_or_default())
    }
}
