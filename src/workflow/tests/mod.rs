//! Unit tests for the workflow module.

mod state_machine_tests;

use crate::checklist::ChecklistDiffEngine;
use crate::events::{EventBus, EventHandler, EventType, HandlerError, WorkflowEvent};
use crate::tracker::{
    adapters::{
        memory::{InMemorySyncRecordRepository, InMemoryTracker},
        sleeper::RecordingSleeper,
    },
    domain::{StatusField, StatusOption},
    services::{RemoteIssueSyncService, StatusSettings, StatusVerificationService},
};
use crate::workflow::{
    adapters::{
        gates::ChecklistCompleteGate,
        memory::{InMemoryDocumentStore, InMemorySubTaskRepository, InMemoryUnitOfWorkRepository},
    },
    domain::{DocumentRef, UnitOfWork},
    ports::{DocumentStore, UnitOfWorkRepository},
    services::{
        ChecklistReconciliationService, PhaseStateMachine, PhaseStateMachineDeps,
        PhaseTransitionService, ReconcileDependencies, StatusBinding,
    },
};
use async_trait::async_trait;
use mockable::DefaultClock;
use rstest::fixture;
use std::sync::{Arc, Mutex};

pub(super) const PROJECT: &str = "PVT_board";

pub(super) type Machine = PhaseStateMachine<
    InMemoryUnitOfWorkRepository,
    InMemorySubTaskRepository,
    InMemoryDocumentStore,
    InMemorySyncRecordRepository,
    InMemoryTracker,
    RecordingSleeper,
    DefaultClock,
>;

/// Records every event it receives.
#[derive(Default)]
pub(super) struct EventRecorder {
    events: Mutex<Vec<WorkflowEvent>>,
}

impl EventRecorder {
    pub(super) fn events(&self) -> Vec<WorkflowEvent> {
        self.events.lock().expect("recorder lock").clone()
    }

    pub(super) fn of_type(&self, event_type: EventType) -> Vec<WorkflowEvent> {
        self.events()
            .into_iter()
            .filter(|event| event.event_type() == event_type)
            .collect()
    }
}

#[async_trait]
impl EventHandler for EventRecorder {
    fn name(&self) -> &str {
        "recorder"
    }

    async fn handle(&self, event: &WorkflowEvent) -> Result<(), HandlerError> {
        self.events.lock().expect("recorder lock").push(event.clone());
        Ok(())
    }
}

pub(super) struct Harness {
    pub(super) bus: EventBus,
    pub(super) units: Arc<InMemoryUnitOfWorkRepository>,
    pub(super) sub_tasks: Arc<InMemorySubTaskRepository>,
    pub(super) documents: Arc<InMemoryDocumentStore>,
    pub(super) records: Arc<InMemorySyncRecordRepository>,
    pub(super) tracker: Arc<InMemoryTracker>,
    pub(super) issues:
        Arc<RemoteIssueSyncService<InMemorySyncRecordRepository, InMemoryTracker, DefaultClock>>,
    pub(super) reconciler: Arc<
        ChecklistReconciliationService<
            InMemorySyncRecordRepository,
            InMemoryTracker,
            InMemoryDocumentStore,
            DefaultClock,
        >,
    >,
    pub(super) transitions: PhaseTransitionService<InMemoryUnitOfWorkRepository, DefaultClock>,
    pub(super) machine: Arc<Machine>,
    pub(super) recorder: Arc<EventRecorder>,
}

impl Harness {
    /// Stores a unit of work in the requirements phase backed by `document`.
    pub(super) async fn seed(&self, document: &str) -> UnitOfWork {
        let document_ref = DocumentRef::new("specs/checkout.md").expect("valid document ref");
        self.documents
            .write(&document_ref, document)
            .await
            .expect("document written");
        let unit_of_work =
            UnitOfWork::new("Checkout flow", document_ref, &DefaultClock).expect("unit of work");
        self.units.store(&unit_of_work).await.expect("unit stored");
        unit_of_work
    }

    pub(super) async fn document(&self, unit_of_work: &UnitOfWork) -> String {
        self.documents
            .read(unit_of_work.document_ref())
            .await
            .expect("document readable")
    }
}

fn board_field() -> StatusField {
    StatusField {
        field_id: "PVTSSF_status".to_owned(),
        name: "Status".to_owned(),
        options: vec![
            StatusOption::new("opt_todo", "Todo"),
            StatusOption::new("opt_progress", "In Progress"),
            StatusOption::new("opt_review", "In Review"),
            StatusOption::new("opt_done", "Done"),
        ],
    }
}

#[fixture]
pub(super) fn harness() -> Harness {
    let bus = EventBus::new();
    let clock = Arc::new(DefaultClock);
    let engine = Arc::new(ChecklistDiffEngine::new().expect("checklist patterns compile"));
    let units = Arc::new(InMemoryUnitOfWorkRepository::new());
    let sub_tasks = Arc::new(InMemorySubTaskRepository::new());
    let documents = Arc::new(InMemoryDocumentStore::new());
    let records = Arc::new(InMemorySyncRecordRepository::new());
    let tracker = Arc::new(
        InMemoryTracker::new()
            .with_status_field(PROJECT, board_field())
            .expect("register field"),
    );
    let sleeper = Arc::new(RecordingSleeper::new());

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
    let status = StatusBinding {
        project_id: PROJECT.to_owned(),
        service: Arc::new(StatusVerificationService::new(
            Arc::clone(&tracker),
            sleeper,
            StatusSettings::default(),
        )),
    };
    let machine = Arc::new(PhaseStateMachine::new(PhaseStateMachineDeps {
        units: Arc::clone(&units),
        sub_tasks: Arc::clone(&sub_tasks),
        documents: Arc::clone(&documents),
        records: Arc::clone(&records),
        issues: Arc::clone(&issues),
        reconciler: Arc::clone(&reconciler),
        transitions: transitions.clone(),
        status: Some(status),
        engine: Arc::clone(&engine),
        gates: vec![Arc::new(ChecklistCompleteGate::new(
            Arc::clone(&documents),
            engine,
        ))],
    }));
    machine.subscribe(&bus, 10).expect("machine subscribed");

    let recorder = Arc::new(EventRecorder::default());
    for event_type in [
        EventType::PhaseChanged,
        EventType::ChecklistChanged,
        EventType::SyncFailed,
    ] {
        bus.subscribe(event_type, Arc::clone(&recorder) as Arc<dyn EventHandler>, 0)
            .expect("recorder subscribed");
    }
    bus.mark_ready();

    Harness {
        bus,
        units,
        sub_tasks,
        documents,
        records,
        tracker,
        issues,
        reconciler,
        transitions,
        machine,
        recorder,
    }
}
