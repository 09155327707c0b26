//! Port for phase-scoped quality gates.

use crate::workflow::domain::{GateReport, Phase, UnitOfWork};
use async_trait::async_trait;

/// A check run when a unit of work enters a phase.
///
/// Gates report; they never block a transition.
#[async_trait]
pub trait QualityGate: Send + Sync {
    /// Returns the gate name used in reports and logs.
    fn name(&self) -> &str;

    /// Returns whether the gate runs for `phase`.
    fn applies_to(&self, phase: Phase) -> bool;

    /// Evaluates the gate.
    async fn check(&self, unit_of_work: &UnitOfWork, phase: Phase) -> GateReport;
}
