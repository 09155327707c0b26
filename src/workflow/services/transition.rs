//! Phase transitions committed to storage and announced on the bus.

use crate::events::{EventBus, EventPayload, WorkflowEvent};
use crate::workflow::{
    domain::{Phase, UnitOfWork, UnitOfWorkId, WorkflowDomainError},
    ports::{UnitOfWorkRepository, WorkflowRepositoryError},
};
use mockable::Clock;
use std::sync::Arc;
use thiserror::Error;

/// Service-level errors for phase transitions.
#[derive(Debug, Error)]
pub enum PhaseTransitionError {
    /// The unit of work does not exist.
    #[error("unit of work not found: {0}")]
    NotFound(UnitOfWorkId),

    /// The transition is not allowed from the current phase.
    #[error(transparent)]
    Domain(#[from] WorkflowDomainError),

    /// Repository operation failed.
    #[error(transparent)]
    Repository(#[from] WorkflowRepositoryError),
}

/// Result type for phase transition operations.
pub type PhaseTransitionResult<T> = Result<T, PhaseTransitionError>;

/// Moves units of work between phases.
///
/// The new phase is committed before `PhaseChanged` is published, so
/// subscribers always observe the stored state. A failure to publish is
/// logged and does not undo the transition.
pub struct PhaseTransitionService<U, C>
where
    U: UnitOfWorkRepository,
    C: Clock + Send + Sync,
{
    units: Arc<U>,
    bus: EventBus,
    clock: Arc<C>,
}

impl<U, C> Clone for PhaseTransitionService<U, C>
where
    U: UnitOfWorkRepository,
    C: Clock + Send + Sync,
{
    fn clone(&self) -> Self {
        Self {
            units: Arc::clone(&self.units),
            bus: self.bus.clone(),
            clock: Arc::clone(&self.clock),
        }
    }
}

impl<U, C> PhaseTransitionService<U, C>
where
    U: UnitOfWorkRepository,
    C: Clock + Send + Sync,
{
    /// Creates a transition service.
    #[must_use]
    pub const fn new(units: Arc<U>, bus: EventBus, clock: Arc<C>) -> Self {
        Self { units, bus, clock }
    }

    /// Advances a unit of work to `target`.
    ///
    /// # Errors
    ///
    /// Returns [`PhaseTransitionError::NotFound`] for an unknown identifier,
    /// [`PhaseTransitionError::Domain`] unless `target` comes after the
    /// current phase, or the repository error.
    pub async fn transition(
        &self,
        id: UnitOfWorkId,
        target: Phase,
    ) -> PhaseTransitionResult<UnitOfWork> {
        let mut unit_of_work = self.load(id).await?;
        let from = unit_of_work.advance_to(target, &*self.clock)?;
        self.commit(unit_of_work, from).await
    }

    /// Moves a tested or completed unit of work back to implementation.
    ///
    /// # Errors
    ///
    /// Returns [`PhaseTransitionError::Domain`] unless the unit of work is in
    /// testing or completed, or the lookup or repository error.
    pub async fn reopen(&self, id: UnitOfWorkId) -> PhaseTransitionResult<UnitOfWork> {
        let mut unit_of_work = self.load(id).await?;
        let from = unit_of_work.reopen(&*self.clock)?;
        self.commit(unit_of_work, from).await
    }

    async fn load(&self, id: UnitOfWorkId) -> PhaseTransitionResult<UnitOfWork> {
        self.units
            .find_by_id(id)
            .await?
            .ok_or(PhaseTransitionError::NotFound(id))
    }

    async fn commit(
        &self,
        unit_of_work: UnitOfWork,
        from: Phase,
    ) -> PhaseTransitionResult<UnitOfWork> {
        self.units.update(&unit_of_work).await?;
        tracing::info!(
            unit_of_work = %unit_of_work.id(),
            from = %from,
            to = %unit_of_work.phase(),
            "phase changed"
        );
        let event = WorkflowEvent::new(
            unit_of_work.id().to_string(),
            EventPayload::PhaseChanged {
                unit_of_work_id: unit_of_work.id(),
                from,
                to: unit_of_work.phase(),
            },
            &*self.clock,
        );
        match self.bus.publish(event).await {
            Ok(report) if !report.is_clean() => tracing::warn!(
                unit_of_work = %unit_of_work.id(),
                failures = report.failures.len(),
                "phase change subscribers reported failures"
            ),
            Ok(_) => {}
            Err(err) => tracing::error!(
                unit_of_work = %unit_of_work.id(),
                error = %err,
                "failed to publish phase change"
            ),
        }
        Ok(unit_of_work)
    }
}
