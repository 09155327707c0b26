//! Event-driven phase actions for units of work.

use crate::checklist::{ChecklistDiffEngine, ChecklistSnapshot};
use crate::events::{
    EventBus, EventBusError, EventHandler, EventPayload, EventType, HandlerError,
    SubscriptionId, WorkflowEvent,
};
use crate::tracker::{
    domain::{ParentBody, RemoteNumber, SyncEntity, SyncRecord, render_parent_body,
        render_progress_comment},
    ports::{RemoteTracker, Sleeper, SyncRecordRepository},
    services::{IssueSyncError, RemoteIssueSyncService, StatusVerificationService},
};
use crate::workflow::{
    domain::{GateReport, Phase, SubTask, SubTaskId, UnitOfWork, UnitOfWorkId},
    ports::{DocumentStore, QualityGate, SubTaskRepository, UnitOfWorkRepository},
};
use async_trait::async_trait;
use mockable::Clock;
use std::collections::HashSet;
use std::sync::{Arc, RwLock};

use super::{ChecklistReconciliationService, PhaseTransitionService};

/// Result of one phase action: a short detail on success, the failure
/// message otherwise.
pub type ActionResult = Result<String, String>;

/// Outcome of one action run for a phase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionOutcome {
    /// Action name.
    pub name: &'static str,
    /// Detail or failure message.
    pub result: ActionResult,
}

/// Everything that happened when a unit of work entered a phase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhaseOutcome {
    /// Unit of work the actions ran for.
    pub unit_of_work_id: UnitOfWorkId,
    /// Phase that was entered.
    pub phase: Phase,
    /// Actions in execution order.
    pub actions: Vec<ActionOutcome>,
    /// Reports of the gates scoped to the phase.
    pub gates: Vec<GateReport>,
}

impl PhaseOutcome {
    /// Returns whether every action succeeded and every gate passed.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.actions.iter().all(|action| action.result.is_ok())
            && self.gates.iter().all(|gate| gate.passed)
    }

    /// Returns the outcome of the named action, if it ran.
    #[must_use]
    pub fn action(&self, name: &str) -> Option<&ActionOutcome> {
        self.actions.iter().find(|action| action.name == name)
    }
}

/// Project board the parent issues are tracked on.
pub struct StatusBinding<T, Sl>
where
    T: RemoteTracker,
    Sl: Sleeper,
{
    /// Project board identifier.
    pub project_id: String,
    /// Status service for that board.
    pub service: Arc<StatusVerificationService<T, Sl>>,
}

/// Collaborators of [`PhaseStateMachine`].
pub struct PhaseStateMachineDeps<U, S, D, R, T, Sl, C>
where
    U: UnitOfWorkRepository,
    S: SubTaskRepository,
    D: DocumentStore,
    R: SyncRecordRepository,
    T: RemoteTracker,
    Sl: Sleeper,
    C: Clock + Send + Sync,
{
    /// Unit of work store.
    pub units: Arc<U>,
    /// Sub-task store.
    pub sub_tasks: Arc<S>,
    /// Document store.
    pub documents: Arc<D>,
    /// Sync record store, used to resolve remote numbers.
    pub records: Arc<R>,
    /// Issue synchronisation.
    pub issues: Arc<RemoteIssueSyncService<R, T, C>>,
    /// Checklist reconciliation.
    pub reconciler: Arc<ChecklistReconciliationService<R, T, D, C>>,
    /// Phase transitions, used for remote reopen.
    pub transitions: PhaseTransitionService<U, C>,
    /// Board status updates; `None` disables them.
    pub status: Option<StatusBinding<T, Sl>>,
    /// Shared checklist engine.
    pub engine: Arc<ChecklistDiffEngine>,
    /// Quality gates, filtered per phase.
    pub gates: Vec<Arc<dyn QualityGate>>,
}

/// Runs the actions owed to each phase and reacts to remote issue events.
///
/// Subscribed to `PhaseChanged`, the remote issue close, reopen, and edit
/// events, `TaskCompleted`, and `TaskReopened`. A parent body edit triggers
/// a checklist reconciliation. Phase action failures are captured in
/// a [`PhaseOutcome`] and logged; they never fail the handler.
pub struct PhaseStateMachine<U, S, D, R, T, Sl, C>
where
    U: UnitOfWorkRepository,
    S: SubTaskRepository,
    D: DocumentStore,
    R: SyncRecordRepository,
    T: RemoteTracker,
    Sl: Sleeper,
    C: Clock + Send + Sync,
{
    deps: PhaseStateMachineDeps<U, S, D, R, T, Sl, C>,
    last_outcome: RwLock<Option<PhaseOutcome>>,
}

const ENSURE_PARENT: &str = "ensure_parent_issue";
const DECOMPOSE: &str = "decompose_sub_tasks";
const PROGRESS: &str = "report_progress";
const RECONCILE: &str = "reconcile_checklist";
const CLOSE_PARENT: &str = "close_parent_issue";
const SYNC_STATUS: &str = "sync_board_status";

impl<U, S, D, R, T, Sl, C> PhaseStateMachine<U, S, D, R, T, Sl, C>
where
    U: UnitOfWorkRepository + 'static,
    S: SubTaskRepository + 'static,
    D: DocumentStore + 'static,
    R: SyncRecordRepository + 'static,
    T: RemoteTracker + 'static,
    Sl: Sleeper + 'static,
    C: Clock + Send + Sync + 'static,
{
    /// Event types the machine reacts to.
    pub const SUBSCRIBED_EVENTS: [EventType; 6] = [
        EventType::PhaseChanged,
        EventType::RemoteIssueClosed,
        EventType::RemoteIssueReopened,
        EventType::RemoteIssueEdited,
        EventType::TaskCompleted,
        EventType::TaskReopened,
    ];

    /// Creates a state machine.
    #[must_use]
    pub fn new(deps: PhaseStateMachineDeps<U, S, D, R, T, Sl, C>) -> Self {
        Self {
            deps,
            last_outcome: RwLock::new(None),
        }
    }

    /// Subscribes the machine to every event type it handles.
    ///
    /// # Errors
    ///
    /// Returns [`EventBusError`] when the registry is unavailable.
    pub fn subscribe(
        self: &Arc<Self>,
        bus: &EventBus,
        priority: i32,
    ) -> Result<Vec<SubscriptionId>, EventBusError> {
        Self::SUBSCRIBED_EVENTS
            .into_iter()
            .map(|event_type| {
                let handler: Arc<dyn EventHandler> = Arc::clone(self) as Arc<dyn EventHandler>;
                bus.subscribe(event_type, handler, priority)
            })
            .collect()
    }

    /// Returns the outcome of the most recent phase entry.
    #[must_use]
    pub fn last_outcome(&self) -> Option<PhaseOutcome> {
        self.last_outcome
            .read()
            .ok()
            .and_then(|outcome| outcome.clone())
    }

    /// Runs the actions and gates for `unit_of_work` entering `phase`.
    pub async fn enter_phase(&self, unit_of_work: &UnitOfWork, phase: Phase) -> PhaseOutcome {
        let mut actions = Vec::new();
        match phase {
            Phase::Requirements | Phase::Design => {
                actions.push(self.ensure_parent(unit_of_work).await);
                actions.push(self.sync_status(unit_of_work, phase).await);
            }
            Phase::Tasks => {
                actions.push(self.ensure_parent(unit_of_work).await);
                actions.push(self.decompose(unit_of_work).await);
            }
            Phase::Implementation => {
                actions.push(self.report_progress(unit_of_work).await);
                actions.push(self.reconcile(unit_of_work).await);
            }
            Phase::Testing => {
                actions.push(self.reconcile(unit_of_work).await);
                actions.push(self.sync_status(unit_of_work, phase).await);
            }
            Phase::Completed => {
                actions.push(self.close_parent(unit_of_work).await);
                actions.push(self.sync_status(unit_of_work, phase).await);
            }
        }
        let gates = self.run_gates(unit_of_work, phase).await;

        for action in &actions {
            if let Err(message) = &action.result {
                tracing::warn!(
                    unit_of_work = %unit_of_work.id(),
                    phase = %phase,
                    action = action.name,
                    error = %message,
                    "phase action failed"
                );
            }
        }
        PhaseOutcome {
            unit_of_work_id: unit_of_work.id(),
            phase,
            actions,
            gates,
        }
    }

    async fn ensure_parent(&self, unit_of_work: &UnitOfWork) -> ActionOutcome {
        ActionOutcome {
            name: ENSURE_PARENT,
            result: self.try_ensure_parent(unit_of_work).await,
        }
    }

    async fn try_ensure_parent(&self, unit_of_work: &UnitOfWork) -> ActionResult {
        let document = self
            .deps
            .documents
            .read(unit_of_work.document_ref())
            .await
            .map_err(|err| err.to_string())?;
        let snapshot = ChecklistSnapshot::from_document(&self.deps.engine, &document);
        let checklist = snapshot.to_markdown();
        let body = render_parent_body(ParentBody {
            phase: unit_of_work.phase().as_str(),
            document: unit_of_work.document_ref().as_str(),
            checklist: &checklist,
        })
        .map_err(|err| err.to_string())?;
        let record = self
            .deps
            .issues
            .create_parent(unit_of_work, &body)
            .await
            .map_err(|err| err.to_string())?;
        Ok(format!("parent issue {}", record.remote_number()))
    }

    async fn parent_record(&self, unit_of_work: &UnitOfWork) -> Result<SyncRecord, String> {
        let entity = SyncEntity::unit_of_work(unit_of_work.id());
        self.deps
            .issues
            .find_record(&entity)
            .await
            .map_err(|err| err.to_string())?
            .ok_or_else(|| IssueSyncError::NotLinked(entity).to_string())
    }

    async fn decompose(&self, unit_of_work: &UnitOfWork) -> ActionOutcome {
        ActionOutcome {
            name: DECOMPOSE,
            result: self.try_decompose(unit_of_work).await,
        }
    }

    async fn try_decompose(&self, unit_of_work: &UnitOfWork) -> ActionResult {
        let parent = self.parent_record(unit_of_work).await?.remote_number();
        let created = self.create_sub_tasks(unit_of_work).await?;
        let sub_tasks = self
            .deps
            .sub_tasks
            .find_by_parent(unit_of_work.id())
            .await
            .map_err(|err| err.to_string())?;
        let outcomes = self
            .deps
            .issues
            .create_children(parent, &sub_tasks)
            .await
            .map_err(|err| err.to_string())?;

        let mut failed = 0_usize;
        for (sub_task, outcome) in sub_tasks.iter().zip(&outcomes) {
            match &outcome.record {
                Some(record) if sub_task.remote_number().is_none() => {
                    self.link_sub_task(sub_task, record.remote_number()).await?;
                }
                _ => {}
            }
            if outcome.error.is_some() {
                failed += 1;
            }
        }
        if failed > 0 {
            return Err(format!(
                "{failed} of {} child issues failed to sync",
                outcomes.len()
            ));
        }
        Ok(format!(
            "{created} new sub-tasks, {} child issues linked",
            outcomes.len()
        ))
    }

    /// Stores a sub-task for every unchecked item not already tracked under
    /// the same section and title. Returns how many were created.
    async fn create_sub_tasks(&self, unit_of_work: &UnitOfWork) -> Result<usize, String> {
        let document = self
            .deps
            .documents
            .read(unit_of_work.document_ref())
            .await
            .map_err(|err| err.to_string())?;
        let existing = self
            .deps
            .sub_tasks
            .find_by_parent(unit_of_work.id())
            .await
            .map_err(|err| err.to_string())?;
        let mut tracked: HashSet<(String, String)> = existing
            .iter()
            .map(|sub_task| (sub_task.description().to_owned(), sub_task.title().to_owned()))
            .collect();

        let mut created = 0_usize;
        for item in self.deps.engine.parse(&document) {
            let key = (item.section().to_owned(), item.text().to_owned());
            if item.checked() || !tracked.insert(key) {
                continue;
            }
            let sub_task = SubTask::new(unit_of_work.id(), item.text(), item.section())
                .map_err(|err| err.to_string())?;
            self.deps
                .sub_tasks
                .store(&sub_task)
                .await
                .map_err(|err| err.to_string())?;
            created += 1;
        }
        Ok(created)
    }

    async fn link_sub_task(&self, sub_task: &SubTask, number: RemoteNumber) -> Result<(), String> {
        let mut linked = sub_task.clone();
        linked.link_remote(number);
        self.deps
            .sub_tasks
            .update(&linked)
            .await
            .map_err(|err| err.to_string())
    }

    async fn report_progress(&self, unit_of_work: &UnitOfWork) -> ActionOutcome {
        ActionOutcome {
            name: PROGRESS,
            result: self.try_report_progress(unit_of_work).await,
        }
    }

    async fn try_report_progress(&self, unit_of_work: &UnitOfWork) -> ActionResult {
        let document = self
            .deps
            .documents
            .read(unit_of_work.document_ref())
            .await
            .map_err(|err| err.to_string())?;
        let snapshot = ChecklistSnapshot::from_document(&self.deps.engine, &document);
        let progress = snapshot.progress();
        let pending: Vec<&str> = snapshot.pending().map(|item| item.text()).collect();
        tracing::info!(
            unit_of_work = %unit_of_work.id(),
            completed = progress.completed,
            total = progress.total,
            "checklist progress"
        );
        let comment = render_progress_comment(
            progress.completed,
            progress.total,
            progress.percent(),
            &pending,
        )
        .map_err(|err| err.to_string())?;
        self.deps
            .issues
            .post_comment(&SyncEntity::unit_of_work(unit_of_work.id()), &comment)
            .await
            .map_err(|err| err.to_string())?;
        Ok(format!("{}/{}", progress.completed, progress.total))
    }

    async fn reconcile(&self, unit_of_work: &UnitOfWork) -> ActionOutcome {
        let result = self
            .deps
            .reconciler
            .reconcile(unit_of_work)
            .await
            .map(|outcome| {
                format!(
                    "{:?}, {} changes",
                    outcome.direction,
                    outcome.changes.len()
                )
            })
            .map_err(|err| err.to_string());
        ActionOutcome {
            name: RECONCILE,
            result,
        }
    }

    async fn close_parent(&self, unit_of_work: &UnitOfWork) -> ActionOutcome {
        let result = self
            .deps
            .issues
            .close_parent_if_complete(unit_of_work)
            .await
            .map(|closed| {
                if closed {
                    "parent issue closed".to_owned()
                } else {
                    "child issues still open".to_owned()
                }
            })
            .map_err(|err| err.to_string());
        ActionOutcome {
            name: CLOSE_PARENT,
            result,
        }
    }

    async fn sync_status(&self, unit_of_work: &UnitOfWork, phase: Phase) -> ActionOutcome {
        ActionOutcome {
            name: SYNC_STATUS,
            result: self.try_sync_status(unit_of_work, phase).await,
        }
    }

    async fn try_sync_status(&self, unit_of_work: &UnitOfWork, phase: Phase) -> ActionResult {
        let Some(binding) = &self.deps.status else {
            return Ok("no project board configured".to_owned());
        };
        let record = self.parent_record(unit_of_work).await?;
        let node_id = record
            .remote_node_id()
            .ok_or_else(|| format!("parent issue {} has no node id", record.remote_number()))?;
        let item_id = binding
            .service
            .ensure_item(&binding.project_id, node_id)
            .await
            .map_err(|err| err.to_string())?;
        let verification = binding
            .service
            .sync_phase_status(&binding.project_id, &item_id, phase)
            .await
            .map_err(|err| err.to_string())?;
        let observed = verification.actual_status.unwrap_or_default();
        if verification.success {
            Ok(format!("status {observed}"))
        } else {
            Ok(format!(
                "status unverified after {} checks, board shows `{observed}`",
                verification.attempts
            ))
        }
    }

    async fn run_gates(&self, unit_of_work: &UnitOfWork, phase: Phase) -> Vec<GateReport> {
        let mut reports = Vec::new();
        for gate in self.deps.gates.iter().filter(|gate| gate.applies_to(phase)) {
            let report = gate.check(unit_of_work, phase).await;
            if !report.passed {
                tracing::warn!(
                    unit_of_work = %unit_of_work.id(),
                    phase = %phase,
                    gate = gate.name(),
                    findings = report.findings.len(),
                    "quality gate failed"
                );
            }
            reports.push(report);
        }
        reports
    }

    async fn on_phase_changed(&self, unit_of_work_id: UnitOfWorkId, phase: Phase) {
        let unit_of_work = match self.deps.units.find_by_id(unit_of_work_id).await {
            Ok(Some(unit_of_work)) => unit_of_work,
            Ok(None) => {
                tracing::warn!(
                    unit_of_work = %unit_of_work_id,
                    "phase change for unknown unit of work"
                );
                return;
            }
            Err(err) => {
                tracing::error!(
                    unit_of_work = %unit_of_work_id,
                    error = %err,
                    "unit of work lookup failed"
                );
                return;
            }
        };
        let outcome = self.enter_phase(&unit_of_work, phase).await;
        tracing::info!(
            unit_of_work = %unit_of_work_id,
            phase = %phase,
            clean = outcome.is_clean(),
            "phase actions finished"
        );
        match self.last_outcome.write() {
            Ok(mut slot) => *slot = Some(outcome),
            Err(err) => tracing::error!(error = %err, "phase outcome slot poisoned"),
        }
    }

    async fn on_remote_reopened(&self, number: RemoteNumber) -> Result<(), HandlerError> {
        let Some(entity) = self.entity_for(number).await? else {
            return Ok(());
        };
        if let Some(sub_task_id) = entity.as_sub_task() {
            return self.set_sub_task_closed(sub_task_id, false).await;
        }
        let Some(unit_of_work_id) = entity.as_unit_of_work() else {
            return Ok(());
        };
        let unit_of_work = self
            .deps
            .units
            .find_by_id(unit_of_work_id)
            .await
            .map_err(|err| HandlerError::from_error(&err))?;
        let Some(unit_of_work) = unit_of_work else {
            tracing::warn!(unit_of_work = %unit_of_work_id, "reopened issue has no unit of work");
            return Ok(());
        };
        if !unit_of_work.phase().can_reopen() {
            tracing::debug!(
                unit_of_work = %unit_of_work_id,
                phase = %unit_of_work.phase(),
                "parent reopened outside testing or completed, ignored"
            );
            return Ok(());
        }
        self.deps
            .transitions
            .reopen(unit_of_work_id)
            .await
            .map(|_| ())
            .map_err(|err| HandlerError::from_error(&err))
    }

    async fn on_remote_edited(&self, number: RemoteNumber) -> Result<(), HandlerError> {
        let Some(unit_of_work_id) = self
            .entity_for(number)
            .await?
            .and_then(|entity| entity.as_unit_of_work())
        else {
            return Ok(());
        };
        let unit_of_work = self
            .deps
            .units
            .find_by_id(unit_of_work_id)
            .await
            .map_err(|err| HandlerError::from_error(&err))?;
        let Some(unit_of_work) = unit_of_work else {
            return Ok(());
        };
        if let Err(err) = self.deps.reconciler.reconcile(&unit_of_work).await {
            tracing::warn!(
                unit_of_work = %unit_of_work_id,
                error = %err,
                "reconciliation after remote edit failed"
            );
        }
        Ok(())
    }

    async fn on_child_closed(
        &self,
        sub_task_id: SubTaskId,
        close_remote: bool,
    ) -> Result<(), HandlerError> {
        self.set_sub_task_closed(sub_task_id, true).await?;
        if close_remote {
            match self.deps.issues.close_child(sub_task_id).await {
                Ok(_) => {}
                Err(IssueSyncError::NotLinked(entity)) => {
                    tracing::debug!(entity = %entity, "completed sub-task has no child issue");
                    return Ok(());
                }
                Err(err) => return Err(HandlerError::from_error(&err)),
            }
        }
        self.close_parent_for(sub_task_id).await
    }

    async fn on_task_reopened(&self, sub_task_id: SubTaskId) -> Result<(), HandlerError> {
        self.set_sub_task_closed(sub_task_id, false).await?;
        match self.deps.issues.reopen_child(sub_task_id).await {
            Ok(_) => Ok(()),
            Err(IssueSyncError::NotLinked(entity)) => {
                tracing::debug!(entity = %entity, "reopened sub-task has no child issue");
                Ok(())
            }
            Err(err) => Err(HandlerError::from_error(&err)),
        }
    }

    async fn close_parent_for(&self, sub_task_id: SubTaskId) -> Result<(), HandlerError> {
        let Some(sub_task) = self
            .deps
            .sub_tasks
            .find_by_id(sub_task_id)
            .await
            .map_err(|err| HandlerError::from_error(&err))?
        else {
            return Ok(());
        };
        let unit_of_work = self
            .deps
            .units
            .find_by_id(sub_task.parent_unit_of_work_id())
            .await
            .map_err(|err| HandlerError::from_error(&err))?;
        let Some(unit_of_work) = unit_of_work else {
            return Ok(());
        };
        match self.deps.issues.close_parent_if_complete(&unit_of_work).await {
            Ok(_) => Ok(()),
            Err(IssueSyncError::NotLinked(entity)) => {
                tracing::debug!(entity = %entity, "unit of work has no parent issue");
                Ok(())
            }
            Err(err) => Err(HandlerError::from_error(&err)),
        }
    }

    async fn set_sub_task_closed(
        &self,
        sub_task_id: SubTaskId,
        closed: bool,
    ) -> Result<(), HandlerError> {
        let found = self
            .deps
            .sub_tasks
            .find_by_id(sub_task_id)
            .await
            .map_err(|err| HandlerError::from_error(&err))?;
        let Some(mut sub_task) = found else {
            tracing::debug!(sub_task = %sub_task_id, "event for unknown sub-task");
            return Ok(());
        };
        if sub_task.is_closed() == closed {
            return Ok(());
        }
        if closed {
            sub_task.mark_closed();
        } else {
            sub_task.mark_open();
        }
        self.deps
            .sub_tasks
            .update(&sub_task)
            .await
            .map_err(|err| HandlerError::from_error(&err))
    }

    async fn entity_for(&self, number: RemoteNumber) -> Result<Option<SyncEntity>, HandlerError> {
        let record = self
            .deps
            .records
            .find_by_remote_number(number)
            .await
            .map_err(|err| HandlerError::from_error(&err))?;
        if record.is_none() {
            tracing::debug!(remote_number = number.value(), "event for untracked issue");
        }
        Ok(record.map(|found| found.entity().clone()))
    }
}

#[async_trait]
impl<U, S, D, R, T, Sl, C> EventHandler for PhaseStateMachine<U, S, D, R, T, Sl, C>
where
    U: UnitOfWorkRepository + 'static,
    S: SubTaskRepository + 'static,
    D: DocumentStore + 'static,
    R: SyncRecordRepository + 'static,
    T: RemoteTracker + 'static,
    Sl: Sleeper + 'static,
    C: Clock + Send + Sync + 'static,
{
    fn name(&self) -> &str {
        "phase-state-machine"
    }

    async fn handle(&self, event: &WorkflowEvent) -> Result<(), HandlerError> {
        match event.payload() {
            EventPayload::PhaseChanged {
                unit_of_work_id,
                to,
                ..
            } => {
                self.on_phase_changed(*unit_of_work_id, *to).await;
                Ok(())
            }
            EventPayload::RemoteIssueReopened { remote_number } => {
                self.on_remote_reopened(*remote_number).await
            }
            EventPayload::RemoteIssueClosed { remote_number } => {
                match self
                    .entity_for(*remote_number)
                    .await?
                    .and_then(|entity| entity.as_sub_task())
                {
                    Some(sub_task_id) => self.on_child_closed(sub_task_id, false).await,
                    None => Ok(()),
                }
            }
            EventPayload::RemoteIssueEdited {
                remote_number,
                body: Some(_),
            } => self.on_remote_edited(*remote_number).await,
            EventPayload::TaskCompleted { sub_task_id } => {
                self.on_child_closed(*sub_task_id, true).await
            }
            EventPayload::TaskReopened { sub_task_id } => self.on_task_reopened(*sub_task_id).await,
            _ => Ok(()),
        }
    }
}
