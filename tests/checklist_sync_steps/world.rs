//! Shared world state for checklist synchronisation BDD scenarios.

use std::sync::Arc;

use mockable::DefaultClock;
use rstest::fixture;
use eyre::WrapErr;
use specsync::{
    checklist::ChecklistDiffEngine,
    events::EventBus,
    tracker::{
        adapters::{
            memory::{InMemorySyncRecordRepository, InMemoryTracker},
            sleeper::RecordingSleeper,
        },
        services::RemoteIssueSyncService,
    },
    workflow::{
        adapters::memory::{
            InMemoryDocumentStore, InMemorySubTaskRepository, InMemoryUnitOfWorkRepository,
        },
        domain::{Phase, UnitOfWork},
        services::{
            ChecklistReconciliationService, PhaseStateMachine, PhaseStateMachineDeps,
            PhaseTransitionService, ReconcileDependencies, ReconcileResult, ReconcileOutcome,
        },
    },
};

/// Document every scenario starts from.
pub const DOCUMENT: &str = "\
# Checkout

## Build

- [ ] Parse input
- [x] Render output

## Verify

- [ ] Write tests
";

/// Reconciliation service used by the BDD world.
pub type Reconciler = ChecklistReconciliationService<
    InMemorySyncRecordRepository,
    InMemoryTracker,
    InMemoryDocumentStore,
    DefaultClock,
>;

/// Scenario world for checklist synchronisation behaviour tests.
pub struct SyncWorld {
    pub bus: EventBus,
    pub units: Arc<InMemoryUnitOfWorkRepository>,
    pub documents: Arc<InMemoryDocumentStore>,
    pub tracker: Arc<InMemoryTracker>,
    pub issues:
        Arc<RemoteIssueSyncService<InMemorySyncRecordRepository, InMemoryTracker, DefaultClock>>,
    pub reconciler: Arc<Reconciler>,
    pub transitions: PhaseTransitionService<InMemoryUnitOfWorkRepository, DefaultClock>,
    pub unit_of_work: Option<UnitOfWork>,
    pub last_reconcile: Option<ReconcileResult<ReconcileOutcome>>,
}

impl SyncWorld {
    /// Creates a world whose state machine listens on a ready bus.
    ///
    /// # Panics
    ///
    /// Panics when the checklist patterns fail to compile or the machine
    /// cannot subscribe.
    #[must_use]
    pub fn new() -> Self {
        let bus = EventBus::new();
        let clock = Arc::new(DefaultClock);
        let engine = Arc::new(ChecklistDiffEngine::new().expect("checklist patterns compile"));
        let units = Arc::new(InMemoryUnitOfWorkRepository::new());
        let sub_tasks = Arc::new(InMemorySubTaskRepository::new());
        let documents = Arc::new(InMemoryDocumentStore::new());
        let records = Arc::new(InMemorySyncRecordRepository::new());
        let tracker = Arc::new(InMemoryTracker::new());

        let issues = Arc::new(RemoteIssueSyncService::new(
            Arc::clone(&records),
            Arc::clone(&tracker),
            Arc::clone(&clock),
        ));
        let reconciler = Arc::new(ChecklistReconciliationService::new(ReconcileDependencies {
            records: Arc::clone(&records),
            tracker: Arc::clone(&tracker),
            documents: Arc::clone(&documents),
            engine: Arc::clone(&engine),
            bus: bus.clone(),
            clock: Arc::clone(&clock),
        }));
        let transitions = PhaseTransitionService::new(Arc::clone(&units), bus.clone(), clock);
        let machine: Arc<PhaseStateMachine<_, _, _, _, _, RecordingSleeper, _>> =
            Arc::new(PhaseStateMachine::new(PhaseStateMachineDeps {
                units: Arc::clone(&units),
                sub_tasks,
                documents: Arc::clone(&documents),
                records,
                issues: Arc::clone(&issues),
                reconciler: Arc::clone(&reconciler),
                transitions: transitions.clone(),
                status: None,
                engine,
                gates: Vec::new(),
            }));
        machine.subscribe(&bus, 10).expect("machine subscribed");
        bus.mark_ready();

        Self {
            bus,
            units,
            documents,
            tracker,
            issues,
            reconciler,
            transitions,
            unit_of_work: None,
            last_reconcile: None,
        }
    }

    /// Returns the scenario's unit of work.
    ///
    /// # Errors
    ///
    /// Returns an error when no unit of work has been created yet.
    pub fn unit_of_work(&self) -> Result<&UnitOfWork, eyre::Report> {
        self.unit_of_work
            .as_ref()
            .ok_or_else(|| eyre::eyre!("missing unit of work in scenario world"))
    }

    /// Transitions the unit of work to `phase` and lets the state machine
    /// run its actions.
    ///
    /// # Errors
    ///
    /// Returns an error for an unknown phase name or a rejected transition.
    pub fn move_to(&mut self, phase: &str) -> Result<(), eyre::Report> {
        let target = Phase::try_from(phase)
            .map_err(|err| eyre::eyre!("invalid phase in scenario: {err}"))?;
        let id = self.unit_of_work()?.id();
        let moved = run_async(self.transitions.transition(id, target))
            .wrap_err("transition unit of work")?;
        self.unit_of_work = Some(moved);
        Ok(())
    }
}

impl Default for SyncWorld {
    fn default() -> Self {
        Self::new()
    }
}

/// Fixture that creates a new scenario world.
#[fixture]
pub fn world() -> SyncWorld {
    SyncWorld::default()
}

/// Runs an async operation within sync step definitions.
pub fn run_async<T>(future: impl std::future::Future<Output = T>) -> T {
    tokio::task::block_in_place(|| tokio::runtime::Handle::current().block_on(future))
}
