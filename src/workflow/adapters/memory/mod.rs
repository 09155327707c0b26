//! In-memory workflow adapters for tests and deterministic local runs.

mod document;
mod sub_task;
mod unit_of_work;

pub use document::InMemoryDocumentStore;
pub use sub_task::InMemorySubTaskRepository;
pub use unit_of_work::InMemoryUnitOfWorkRepository;
