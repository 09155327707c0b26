//! Domain model for unit-of-work lifecycle management.
//!
//! Units of work advance through an ordered set of phases; sub-tasks are
//! decomposed from their checklist. Transitions are validated here and
//! nowhere else.

mod error;
mod gate;
mod ids;
mod phase;
mod sub_task;
mod unit_of_work;

pub use error::{ParsePhaseError, WorkflowDomainError};
pub use gate::GateReport;
pub use ids::{SubTaskId, UnitOfWorkId};
pub use phase::Phase;
pub use sub_task::SubTask;
pub use unit_of_work::{DocumentRef, PersistedUnitOfWorkData, UnitOfWork};
