//! Port contracts for workflow persistence, documents, and quality gates.

mod document;
mod gate;
mod repository;

pub use document::{DocumentStore, DocumentStoreError, DocumentStoreResult};
pub use gate::QualityGate;
pub use repository::{
    SubTaskRepository, UnitOfWorkRepository, WorkflowRepositoryError, WorkflowRepositoryResult,
};
