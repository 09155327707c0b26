//! Workflow orchestration services.

mod reconcile;
mod state_machine;
mod transition;

pub use reconcile::{
    ChecklistReconciliationService, ReconcileDependencies, ReconcileDirection, ReconcileError,
    ReconcileOutcome, ReconcileResult,
};
pub use state_machine::{
    ActionOutcome, ActionResult, PhaseOutcome, PhaseStateMachine, PhaseStateMachineDeps,
    StatusBinding,
};
pub use transition::{PhaseTransitionError, PhaseTransitionResult, PhaseTransitionService};
