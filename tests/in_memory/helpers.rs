//! Shared wiring for end-to-end tests.
//!
//! The stack is built from a TOML configuration the same way a host
//! application would: documents on disk, a rate-limited tracker, a board
//! status binding, and a webhook dispatcher publishing to the shared bus.

use camino::Utf8PathBuf;
use mockable::DefaultClock;
use reqwest::header::{HeaderMap, HeaderValue};
use rstest::fixture;
use specsync::{
    checklist::ChecklistDiffEngine,
    config::{EnvSource, SyncConfig},
    events::{EventBus, PublishReport},
    tracker::{
        adapters::{
            memory::{InMemorySyncRecordRepository, InMemoryTracker},
            sleeper::RecordingSleeper,
        },
        domain::{RemoteNumber, StatusField, StatusOption},
        services::{
            RateLimitedClient, RateLimitedTracker, RemoteIssueSyncService,
            StatusVerificationService,
        },
    },
    webhook::{
        DELIVERY_HEADER, EVENT_HEADER, SIGNATURE_HEADER, WebhookDispatcher, WebhookResult,
        WebhookSecret, sign,
    },
    workflow::{
        adapters::{
            fs::FsDocumentStore,
            gates::ChecklistCompleteGate,
            memory::{InMemorySubTaskRepository, InMemoryUnitOfWorkRepository},
        },
        domain::{DocumentRef, Phase, UnitOfWork},
        ports::{DocumentStore, UnitOfWorkRepository},
        services::{
            ChecklistReconciliationService, PhaseOutcome, PhaseStateMachine,
            PhaseStateMachineDeps, PhaseTransitionService, ReconcileDependencies, StatusBinding,
        },
    },
};
use std::collections::HashMap;
use std::sync::Arc;
use tempfile::TempDir;

/// Board identifier used by [`CONFIG`].
pub const PROJECT: &str = "PVT_checkout_board";

/// Configuration the stack is built from.
pub const CONFIG: &str = r#"
[tracker]
owner = "acme"
repository = "checkout"
max_children = 10

[rate_limit]
max_retries = 2
initial_delay_ms = 50

[status]
project_id = "PVT_checkout_board"
verify_retries = 1
verify_initial_delay_ms = 10

[webhook]
secret_env = "CHECKOUT_HOOK_SECRET"
"#;

/// Document every test starts from.
pub const DOCUMENT: &str = "\
# Checkout

## Build

- [ ] Parse input
- [x] Render output

## Verify

- [ ] Write tests
";

/// Tracker as the services see it.
pub type Tracker = RateLimitedTracker<InMemoryTracker, RecordingSleeper>;

/// State machine over the end-to-end adapters.
pub type Machine = PhaseStateMachine<
    InMemoryUnitOfWorkRepository,
    InMemorySubTaskRepository,
    FsDocumentStore,
    InMemorySyncRecordRepository,
    Tracker,
    RecordingSleeper,
    DefaultClock,
>;

struct StaticEnv(HashMap<&'static str, &'static str>);

impl EnvSource for StaticEnv {
    fn var(&self, name: &str) -> Option<String> {
        self.0.get(name).map(|value| (*value).to_owned())
    }
}

/// A fully wired synchronisation stack.
pub struct Stack {
    /// Workspace the documents live in; removed on drop.
    pub workspace: TempDir,
    /// Shared event bus.
    pub bus: EventBus,
    /// The fake tracker behind the rate limiter.
    pub remote: Arc<InMemoryTracker>,
    /// Delays taken by the rate limiter.
    pub throttle_sleeper: Arc<RecordingSleeper>,
    /// Unit of work store.
    pub units: Arc<InMemoryUnitOfWorkRepository>,
    /// Sub-task store.
    pub sub_tasks: Arc<InMemorySubTaskRepository>,
    /// Filesystem document store rooted at the workspace.
    pub documents: Arc<FsDocumentStore>,
    /// Sync record store.
    pub records: Arc<InMemorySyncRecordRepository>,
    /// Transition service publishing `PhaseChanged`.
    pub transitions: PhaseTransitionService<InMemoryUnitOfWorkRepository, DefaultClock>,
    /// The phase state machine.
    pub machine: Arc<Machine>,
    /// Inbound webhook entry point.
    pub dispatcher: WebhookDispatcher<DefaultClock>,
    secret: WebhookSecret,
}

impl Stack {
    /// Writes `contents` to `specs/checkout.md` and stores a unit of work
    /// for it.
    ///
    /// # Errors
    ///
    /// Returns an error when the document or unit of work cannot be stored.
    pub async fn seed(&self, contents: &str) -> eyre::Result<UnitOfWork> {
        let document_ref = DocumentRef::new("specs/checkout.md")?;
        self.documents.write(&document_ref, contents).await?;
        let unit_of_work = UnitOfWork::new("Checkout flow", document_ref, &DefaultClock)?;
        self.units.store(&unit_of_work).await?;
        Ok(unit_of_work)
    }

    /// Moves `unit_of_work` to `phase` and returns the actions the machine
    /// ran.
    ///
    /// # Errors
    ///
    /// Returns an error when the transition is rejected or the machine did
    /// not run.
    pub async fn advance(
        &self,
        unit_of_work: &UnitOfWork,
        phase: Phase,
    ) -> eyre::Result<PhaseOutcome> {
        self.transitions.transition(unit_of_work.id(), phase).await?;
        self.machine
            .last_outcome()
            .ok_or_else(|| eyre::eyre!("state machine recorded no outcome"))
    }

    /// Reads the document straight from the workspace directory.
    ///
    /// # Errors
    ///
    /// Returns an error when the file cannot be read.
    pub fn document_on_disk(&self) -> eyre::Result<String> {
        Ok(std::fs::read_to_string(
            self.workspace.path().join("specs").join("checkout.md"),
        )?)
    }

    /// Signs `body` with the configured secret and dispatches it.
    ///
    /// # Errors
    ///
    /// Returns the dispatcher's error.
    pub async fn deliver(
        &self,
        event_name: &str,
        body: &[u8],
    ) -> WebhookResult<Option<PublishReport>> {
        let signature = sign(&self.secret, body)?;
        self.deliver_signed(event_name, body, &signature).await
    }

    /// Dispatches `body` with an explicit signature header.
    ///
    /// # Errors
    ///
    /// Returns the dispatcher's error.
    pub async fn deliver_signed(
        &self,
        event_name: &str,
        body: &[u8],
        signature: &str,
    ) -> WebhookResult<Option<PublishReport>> {
        let mut headers = HeaderMap::new();
        if let Ok(value) = HeaderValue::from_str(event_name) {
            headers.insert(EVENT_HEADER, value);
        }
        if let Ok(value) = HeaderValue::from_str(signature) {
            headers.insert(SIGNATURE_HEADER, value);
        }
        headers.insert(DELIVERY_HEADER, HeaderValue::from_static("0b1e5c20-e2e"));
        self.dispatcher.dispatch(&headers, body).await
    }
}

/// Returns remote issue `value`.
///
/// # Errors
///
/// Returns an error for zero.
pub fn number(value: u64) -> eyre::Result<RemoteNumber> {
    Ok(RemoteNumber::new(value)?)
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

/// Builds a stack from [`CONFIG`].
///
/// # Errors
///
/// Returns an error when the configuration or any adapter cannot be set up.
pub fn build_stack() -> eyre::Result<Stack> {
    let config = SyncConfig::from_toml_str(CONFIG)?;
    let env = StaticEnv(HashMap::from([("CHECKOUT_HOOK_SECRET", "rotate-me-often")]));
    let secret = config.webhook_secret(&env)?;
    let project_id = config
        .status
        .project_id
        .clone()
        .ok_or_else(|| eyre::eyre!("board project missing from configuration"))?;

    let workspace = tempfile::tempdir()?;
    let root = Utf8PathBuf::from_path_buf(workspace.path().to_path_buf())
        .map_err(|path| eyre::eyre!("non UTF-8 workspace: {}", path.display()))?;

    let bus = EventBus::new();
    let clock = Arc::new(DefaultClock);
    let engine = Arc::new(ChecklistDiffEngine::new()?);
    let remote = Arc::new(InMemoryTracker::new().with_status_field(PROJECT, board_field())?);
    let throttle_sleeper = Arc::new(RecordingSleeper::new());
    let tracker = Arc::new(RateLimitedTracker::new(
        Arc::clone(&remote),
        RateLimitedClient::new(config.rate_limit_policy(), Arc::clone(&throttle_sleeper)),
    ));
    let units = Arc::new(InMemoryUnitOfWorkRepository::new());
    let sub_tasks = Arc::new(InMemorySubTaskRepository::new());
    let documents = Arc::new(FsDocumentStore::new(root));
    let records = Arc::new(InMemorySyncRecordRepository::new());

    let issues = Arc::new(
        RemoteIssueSyncService::new(Arc::clone(&records), Arc::clone(&tracker), Arc::clone(&clock))
            .with_max_children(config.tracker.max_children),
    );
    let reconciler = Arc::new(ChecklistReconciliationService::new(ReconcileDependencies {
        records: Arc::clone(&records),
        tracker: Arc::clone(&tracker),
        documents: Arc::clone(&documents),
        engine: Arc::clone(&engine),
        bus: bus.clone(),
        clock: Arc::clone(&clock),
    }));
    let transitions =
        PhaseTransitionService::new(Arc::clone(&units), bus.clone(), Arc::clone(&clock));
    let status = StatusBinding {
        project_id,
        service: Arc::new(StatusVerificationService::new(
            Arc::clone(&tracker),
            Arc::new(RecordingSleeper::new()),
            config.status_settings()?,
        )),
    };
    let machine = Arc::new(PhaseStateMachine::new(PhaseStateMachineDeps {
        units: Arc::clone(&units),
        sub_tasks: Arc::clone(&sub_tasks),
        documents: Arc::clone(&documents),
        records: Arc::clone(&records),
        issues,
        reconciler,
        transitions: transitions.clone(),
        status: Some(status),
        engine: Arc::clone(&engine),
        gates: vec![Arc::new(ChecklistCompleteGate::new(
            Arc::clone(&documents),
            engine,
        ))],
    }));
    machine.subscribe(&bus, 10)?;
    let dispatcher = WebhookDispatcher::new(secret.clone(), bus.clone(), clock);
    bus.mark_ready();

    Ok(Stack {
        workspace,
        bus,
        remote,
        throttle_sleeper,
        units,
        sub_tasks,
        documents,
        records,
        transitions,
        machine,
        dispatcher,
        secret,
    })
}

/// Provides a fresh stack for each test.
#[fixture]
pub fn stack() -> Stack {
    build_stack().expect("stack should build from the test configuration")
}
