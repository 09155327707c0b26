//! Repository ports for units of work and sub-tasks.

use crate::workflow::domain::{SubTask, SubTaskId, UnitOfWork, UnitOfWorkId};
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

/// Result type for workflow repository operations.
pub type WorkflowRepositoryResult<T> = Result<T, WorkflowRepositoryError>;

/// Unit of work persistence contract.
#[async_trait]
pub trait UnitOfWorkRepository: Send + Sync {
    /// Stores a new unit of work.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowRepositoryError::DuplicateUnitOfWork`] when the
    /// identifier already exists.
    async fn store(&self, unit_of_work: &UnitOfWork) -> WorkflowRepositoryResult<()>;

    /// Persists phase, branch, and timestamp changes.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowRepositoryError::UnitOfWorkNotFound`] when the unit
    /// of work does not exist.
    async fn update(&self, unit_of_work: &UnitOfWork) -> WorkflowRepositoryResult<()>;

    /// Finds a unit of work by identifier.
    async fn find_by_id(&self, id: UnitOfWorkId) -> WorkflowRepositoryResult<Option<UnitOfWork>>;
}

/// Sub-task persistence contract.
#[async_trait]
pub trait SubTaskRepository: Send + Sync {
    /// Stores a new sub-task.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowRepositoryError::DuplicateSubTask`] when the
    /// identifier already exists.
    async fn store(&self, sub_task: &SubTask) -> WorkflowRepositoryResult<()>;

    /// Persists link and closed-state changes.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowRepositoryError::SubTaskNotFound`] when the sub-task
    /// does not exist.
    async fn update(&self, sub_task: &SubTask) -> WorkflowRepositoryResult<()>;

    /// Finds a sub-task by identifier.
    async fn find_by_id(&self, id: SubTaskId) -> WorkflowRepositoryResult<Option<SubTask>>;

    /// Returns the sub-tasks of a unit of work in creation order.
    async fn find_by_parent(&self, parent: UnitOfWorkId)
    -> WorkflowRepositoryResult<Vec<SubTask>>;
}

/// Errors returned by workflow repository implementations.
#[derive(Debug, Clone, Error)]
pub enum WorkflowRepositoryError {
    /// A unit of work with the same identifier already exists.
    #[error("duplicate unit of work identifier: {0}")]
    DuplicateUnitOfWork(UnitOfWorkId),

    /// A sub-task with the same identifier already exists.
    #[error("duplicate sub-task identifier: {0}")]
    DuplicateSubTask(SubTaskId),

    /// The unit of work was not found.
    #[error("unit of work not found: {0}")]
    UnitOfWorkNotFound(UnitOfWorkId),

    /// The sub-task was not found.
    #[error("sub-task not found: {0}")]
    SubTaskNotFound(SubTaskId),

    /// Persistence-layer failure.
    #[error("persistence error: {0}")]
    Persistence(Arc<dyn std::error::Error + Send + Sync>),
}

impl WorkflowRepositoryError {
    /// Wraps a persistence error.
    pub fn persistence(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Persistence(Arc::new(err))
    }
}
