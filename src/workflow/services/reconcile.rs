//! Two-way checklist reconciliation between a document and its parent issue.

use crate::checklist::{ChecklistChange, ChecklistChecksum, ChecklistDiffEngine, ChecklistItem};
use crate::events::{EventBus, EventPayload, WorkflowEvent};
use crate::tracker::{
    domain::{SyncEntity, SyncRecord},
    ports::{RemoteTracker, RemoteTrackerError, SyncRecordRepository, SyncRecordRepositoryError},
};
use crate::workflow::{
    domain::UnitOfWork,
    ports::{DocumentStore, DocumentStoreError},
};
use mockable::Clock;
use std::sync::Arc;
use thiserror::Error;

/// Which side was patched by a reconciliation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileDirection {
    /// Both sides already agreed.
    InSync,
    /// The document's check states were pushed to the issue body.
    LocalToRemote,
    /// The issue body's check states were pulled into the document.
    RemoteToLocal,
}

/// Result of one reconciliation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcileOutcome {
    /// Patched side.
    pub direction: ReconcileDirection,
    /// Flips applied to the patched side.
    pub changes: Vec<ChecklistChange>,
    /// Checksum recorded as the new baseline.
    pub checksum: ChecklistChecksum,
}

/// Service-level errors for checklist reconciliation.
#[derive(Debug, Error)]
pub enum ReconcileError {
    /// The unit of work has no parent issue.
    #[error("{0} is not linked to a remote issue")]
    NotLinked(SyncEntity),

    /// Reading or writing the document failed.
    #[error(transparent)]
    Document(#[from] DocumentStoreError),

    /// The remote tracker call failed.
    #[error(transparent)]
    Remote(#[from] RemoteTrackerError),

    /// Sync record persistence failed.
    #[error(transparent)]
    Repository(#[from] SyncRecordRepositoryError),
}

/// Result type for reconciliation operations.
pub type ReconcileResult<T> = Result<T, ReconcileError>;

/// Keeps a unit of work's document checklist and its parent issue body in
/// agreement.
///
/// The checksum stored on the parent's sync record is the baseline. A side
/// whose checksum differs from the baseline has changed since the last
/// reconciliation. When only the issue changed its states are pulled into
/// the document; otherwise the document wins and is pushed to the issue.
pub struct ChecklistReconciliationService<R, T, D, C>
where
    R: SyncRecordRepository,
    T: RemoteTracker,
    D: DocumentStore,
    C: Clock + Send + Sync,
{
    records: Arc<R>,
    tracker: Arc<T>,
    documents: Arc<D>,
    engine: Arc<ChecklistDiffEngine>,
    bus: EventBus,
    clock: Arc<C>,
}

/// Collaborators of [`ChecklistReconciliationService`].
pub struct ReconcileDependencies<R, T, D, C> {
    /// Sync record store.
    pub records: Arc<R>,
    /// Remote tracker.
    pub tracker: Arc<T>,
    /// Document store.
    pub documents: Arc<D>,
    /// Shared checklist engine.
    pub engine: Arc<ChecklistDiffEngine>,
    /// Bus receiving `ChecklistChanged` and `SyncFailed`.
    pub bus: EventBus,
    /// Clock for record timestamps and events.
    pub clock: Arc<C>,
}

impl<R, T, D, C> ChecklistReconciliationService<R, T, D, C>
where
    R: SyncRecordRepository,
    T: RemoteTracker,
    D: DocumentStore,
    C: Clock + Send + Sync,
{
    /// Creates a reconciliation service.
    #[must_use]
    pub fn new(dependencies: ReconcileDependencies<R, T, D, C>) -> Self {
        let ReconcileDependencies {
            records,
            tracker,
            documents,
            engine,
            bus,
            clock,
        } = dependencies;
        Self {
            records,
            tracker,
            documents,
            engine,
            bus,
            clock,
        }
    }

    /// Reconciles the checklist of `unit_of_work` with its parent issue.
    ///
    /// On failure after the sync record is found, the record is marked
    /// failed and `SyncFailed` is published before the error is returned.
    ///
    /// # Errors
    ///
    /// Returns [`ReconcileError::NotLinked`] when there is no parent issue,
    /// or the document, tracker, or repository error that stopped the run.
    pub async fn reconcile(&self, unit_of_work: &UnitOfWork) -> ReconcileResult<ReconcileOutcome> {
        let entity = SyncEntity::unit_of_work(unit_of_work.id());
        let mut record = self
            .records
            .find(&entity)
            .await?
            .ok_or_else(|| ReconcileError::NotLinked(entity.clone()))?;

        match self.run(unit_of_work, &record).await {
            Ok(outcome) => {
                record.record_checksum(outcome.checksum.clone(), &*self.clock);
                self.records.update(&record).await?;
                if !outcome.changes.is_empty() {
                    self.publish(
                        unit_of_work,
                        EventPayload::ChecklistChanged {
                            unit_of_work_id: unit_of_work.id(),
                            checksum: outcome.checksum.clone(),
                            changed_items: outcome.changes.len(),
                        },
                    )
                    .await;
                }
                Ok(outcome)
            }
            Err(err) => {
                tracing::warn!(
                    unit_of_work = %unit_of_work.id(),
                    error = %err,
                    "checklist reconciliation failed"
                );
                record.mark_failed(err.to_string(), &*self.clock);
                if let Err(persist_err) = self.records.update(&record).await {
                    tracing::warn!(
                        entity = %entity,
                        error = %persist_err,
                        "could not record reconciliation failure"
                    );
                }
                self.publish(
                    unit_of_work,
                    EventPayload::SyncFailed {
                        entity_id: entity.to_string(),
                        message: err.to_string(),
                    },
                )
                .await;
                Err(err)
            }
        }
    }

    async fn run(
        &self,
        unit_of_work: &UnitOfWork,
        record: &SyncRecord,
    ) -> ReconcileResult<ReconcileOutcome> {
        let document = self.documents.read(unit_of_work.document_ref()).await?;
        let issue = self.tracker.get_issue(record.remote_number()).await?;
        let local = self.engine.parse(&document);
        let remote = self.engine.parse(&issue.body);
        let local_sum = ChecklistDiffEngine::hash(&local);
        let remote_sum = ChecklistDiffEngine::hash(&remote);

        if local_sum == remote_sum {
            return Ok(ReconcileOutcome {
                direction: ReconcileDirection::InSync,
                changes: Vec::new(),
                checksum: local_sum,
            });
        }

        let baseline = record.checklist_checksum();
        let local_changed = baseline != Some(&local_sum);
        let remote_changed = baseline != Some(&remote_sum);

        if remote_changed && !local_changed {
            let changes = ChecklistDiffEngine::diff(&local, &remote);
            let patched = self.engine.apply(&document, &changes);
            if !changes.is_empty() {
                self.documents
                    .write(unit_of_work.document_ref(), &patched)
                    .await?;
            }
            let checksum = ChecklistDiffEngine::hash(&self.engine.parse(&patched));
            tracing::info!(
                unit_of_work = %unit_of_work.id(),
                changes = changes.len(),
                "pulled checklist changes from remote issue"
            );
            return Ok(ReconcileOutcome {
                direction: ReconcileDirection::RemoteToLocal,
                changes,
                checksum,
            });
        }

        if remote_changed {
            log_conflict(unit_of_work, &local, &remote);
        }
        let changes = ChecklistDiffEngine::diff(&remote, &local);
        if !changes.is_empty() {
            let patched = self.engine.apply(&issue.body, &changes);
            self.tracker
                .update_issue_body(record.remote_number(), &patched)
                .await?;
        }
        tracing::info!(
            unit_of_work = %unit_of_work.id(),
            changes = changes.len(),
            "pushed checklist changes to remote issue"
        );
        Ok(ReconcileOutcome {
            direction: ReconcileDirection::LocalToRemote,
            changes,
            checksum: local_sum,
        })
    }

    async fn publish(&self, unit_of_work: &UnitOfWork, payload: EventPayload) {
        let event = WorkflowEvent::new(unit_of_work.id().to_string(), payload, &*self.clock);
        if let Err(err) = self.bus.publish(event).await {
            tracing::error!(
                unit_of_work = %unit_of_work.id(),
                error = %err,
                "failed to publish reconciliation event"
            );
        }
    }
}

fn log_conflict(unit_of_work: &UnitOfWork, local: &[ChecklistItem], remote: &[ChecklistItem]) {
    let conflicting = ChecklistDiffEngine::diff(remote, local).len();
    if conflicting > 0 {
        tracing::warn!(
            unit_of_work = %unit_of_work.id(),
            conflicting,
            "checklist edited on both sides, document wins"
        );
    }
}
