//! Parent and child issue synchronisation.

use crate::tracker::{
    domain::{
        IssueDraft, RemoteIssue, RemoteIssueState, RemoteLink, RemoteNumber, SyncEntity,
        SyncRecord, TrackerDomainError, render_child_body,
    },
    ports::{RemoteTracker, RemoteTrackerError, SyncRecordRepository, SyncRecordRepositoryError},
};
use crate::workflow::domain::{SubTask, SubTaskId, UnitOfWork};
use mockable::Clock;
use std::sync::Arc;
use thiserror::Error;

/// Default maximum number of sub-issues per parent.
pub const DEFAULT_MAX_CHILDREN: usize = 100;

/// Service-level errors for issue synchronisation.
#[derive(Debug, Error)]
pub enum IssueSyncError {
    /// The batch exceeds the provider's sub-issue limit; nothing was created.
    #[error("{count} child items exceed the provider limit of {limit}")]
    TooManyChildren {
        /// Submitted batch size.
        count: usize,
        /// Configured limit.
        limit: usize,
    },

    /// The entity has no sync record.
    #[error("{0} is not linked to a remote issue")]
    NotLinked(SyncEntity),

    /// Domain validation failed.
    #[error(transparent)]
    Domain(#[from] TrackerDomainError),

    /// The remote tracker call failed.
    #[error(transparent)]
    Remote(#[from] RemoteTrackerError),

    /// Sync record persistence failed.
    #[error(transparent)]
    Repository(#[from] SyncRecordRepositoryError),
}

/// Result type for issue synchronisation operations.
pub type IssueSyncResult<T> = Result<T, IssueSyncError>;

/// Outcome of synchronising one sub-task in a batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChildSyncOutcome {
    /// Sub-task the outcome refers to.
    pub sub_task_id: SubTaskId,
    /// The record as persisted, absent when no remote issue exists.
    pub record: Option<SyncRecord>,
    /// Failure description, if any step failed.
    pub error: Option<String>,
    /// Whether the sub-task was already linked before this batch.
    pub already_linked: bool,
}

impl ChildSyncOutcome {
    /// Returns whether the sub-task ended up linked without error.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.error.is_none() && self.record.as_ref().is_some_and(SyncRecord::is_synced)
    }
}

/// Creates, links, and closes remote issues mirroring local work.
///
/// The tracker is expected to handle throttling itself, typically by being a
/// [`super::RateLimitedTracker`].
pub struct RemoteIssueSyncService<R, T, C>
where
    R: SyncRecordRepository,
    T: RemoteTracker,
    C: Clock + Send + Sync,
{
    records: Arc<R>,
    tracker: Arc<T>,
    clock: Arc<C>,
    max_children: usize,
}

impl<R, T, C> RemoteIssueSyncService<R, T, C>
where
    R: SyncRecordRepository,
    T: RemoteTracker,
    C: Clock + Send + Sync,
{
    /// Creates a service with the default sub-issue limit.
    #[must_use]
    pub const fn new(records: Arc<R>, tracker: Arc<T>, clock: Arc<C>) -> Self {
        Self {
            records,
            tracker,
            clock,
            max_children: DEFAULT_MAX_CHILDREN,
        }
    }

    /// Overrides the sub-issue limit.
    #[must_use]
    pub const fn with_max_children(mut self, max_children: usize) -> Self {
        self.max_children = max_children;
        self
    }

    /// Returns the sync record for `entity`, if any.
    ///
    /// # Errors
    ///
    /// Returns [`IssueSyncError::Repository`] when the lookup fails.
    pub async fn find_record(&self, entity: &SyncEntity) -> IssueSyncResult<Option<SyncRecord>> {
        Ok(self.records.find(entity).await?)
    }

    /// Creates the parent issue for a unit of work.
    ///
    /// Idempotent: when a record already exists it is returned without any
    /// remote call.
    ///
    /// # Errors
    ///
    /// Returns [`IssueSyncError`] when the draft is invalid, the tracker
    /// rejects the issue, or the record cannot be stored.
    pub async fn create_parent(
        &self,
        unit_of_work: &UnitOfWork,
        body: &str,
    ) -> IssueSyncResult<SyncRecord> {
        let entity = SyncEntity::unit_of_work(unit_of_work.id());
        if let Some(existing) = self.records.find(&entity).await? {
            tracing::debug!(
                entity = %entity,
                remote_number = existing.remote_number().value(),
                "parent issue already exists"
            );
            return Ok(existing);
        }

        let draft = IssueDraft::new(unit_of_work.name(), body)?
            .with_label(format!("phase:{}", unit_of_work.phase()));
        let issue = self.tracker.create_issue(&draft).await?;
        let mut record = SyncRecord::new(
            entity,
            RemoteLink {
                remote_id: issue.id,
                remote_number: issue.number,
                remote_node_id: issue.node_id,
                parent_remote_number: None,
            },
            &*self.clock,
        );
        record.mark_success(&*self.clock);
        self.records.store(&record).await?;
        tracing::info!(
            unit_of_work = %unit_of_work.id(),
            remote_number = record.remote_number().value(),
            "created parent issue"
        );
        Ok(record)
    }

    /// Creates and links child issues for `sub_tasks`, in order.
    ///
    /// The batch is rejected up front when it exceeds the sub-issue limit.
    /// Per-item failures never abort the batch: they are recorded on the
    /// item's sync record (or, when no remote issue exists, only in the
    /// outcome) and processing continues. A new child's record is stored as
    /// pending before it is linked. Sub-tasks that already have a successful
    /// record, or whose issue the parent already lists, are skipped; others
    /// are re-linked.
    ///
    /// # Errors
    ///
    /// Returns [`IssueSyncError::TooManyChildren`] before any remote call
    /// when the batch is too large.
    pub async fn create_children(
        &self,
        parent: RemoteNumber,
        sub_tasks: &[SubTask],
    ) -> IssueSyncResult<Vec<ChildSyncOutcome>> {
        if sub_tasks.len() > self.max_children {
            return Err(IssueSyncError::TooManyChildren {
                count: sub_tasks.len(),
                limit: self.max_children,
            });
        }

        let mut outcomes = Vec::with_capacity(sub_tasks.len());
        for sub_task in sub_tasks {
            let outcome = self.sync_child(parent, sub_task).await;
            if let Some(error) = &outcome.error {
                tracing::warn!(
                    sub_task = %sub_task.id(),
                    parent = parent.value(),
                    error = %error,
                    "child issue sync failed"
                );
            }
            outcomes.push(outcome);
        }
        Ok(outcomes)
    }

    async fn sync_child(&self, parent: RemoteNumber, sub_task: &SubTask) -> ChildSyncOutcome {
        let entity = SyncEntity::sub_task(sub_task.id());
        let failed = |error: String| ChildSyncOutcome {
            sub_task_id: sub_task.id(),
            record: None,
            error: Some(error),
            already_linked: false,
        };

        let existing = match self.records.find(&entity).await {
            Ok(existing) => existing,
            Err(err) => return failed(err.to_string()),
        };
        if let Some(record) = existing {
            if record.is_synced() {
                return ChildSyncOutcome {
                    sub_task_id: sub_task.id(),
                    record: Some(record),
                    error: None,
                    already_linked: true,
                };
            }
            return self.relink_child(parent, sub_task.id(), record).await;
        }

        let issue = match self.create_child_issue(parent, sub_task).await {
            Ok(issue) => issue,
            Err(err) => return failed(err.to_string()),
        };

        let record = SyncRecord::new(
            entity,
            RemoteLink {
                remote_id: issue.id,
                remote_number: issue.number,
                remote_node_id: None,
                parent_remote_number: Some(parent),
            },
            &*self.clock,
        );
        if let Err(err) = self.records.store(&record).await {
            return failed(format!(
                "remote issue {} created but record not stored: {err}",
                record.remote_number()
            ));
        }
        self.finish_link(parent, sub_task.id(), record).await
    }

    async fn create_child_issue(
        &self,
        parent: RemoteNumber,
        sub_task: &SubTask,
    ) -> IssueSyncResult<RemoteIssue> {
        let body = render_child_body(sub_task.description(), parent.value())?;
        let draft = IssueDraft::new(sub_task.title(), body)?;
        Ok(self.tracker.create_issue(&draft).await?)
    }

    /// Retries linking a child whose record is not synced.
    ///
    /// A child the parent already lists is not linked again and its record
    /// is left as found, so a failed state update keeps its message.
    async fn relink_child(
        &self,
        parent: RemoteNumber,
        sub_task_id: SubTaskId,
        mut record: SyncRecord,
    ) -> ChildSyncOutcome {
        match self.is_linked_remotely(parent, &record).await {
            Ok(true) => {
                tracing::debug!(
                    entity = %record.entity(),
                    parent = parent.value(),
                    "child issue already linked, record left unchanged"
                );
                return ChildSyncOutcome {
                    sub_task_id,
                    record: Some(record),
                    error: None,
                    already_linked: true,
                };
            }
            Ok(false) => {}
            Err(err) => {
                return ChildSyncOutcome {
                    sub_task_id,
                    record: Some(record),
                    error: Some(err.to_string()),
                    already_linked: false,
                };
            }
        }

        record.mark_pending(&*self.clock);
        if let Err(err) = self.records.update(&record).await {
            return ChildSyncOutcome {
                sub_task_id,
                record: Some(record),
                error: Some(err.to_string()),
                already_linked: false,
            };
        }
        self.finish_link(parent, sub_task_id, record).await
    }

    /// Links a stored pending child record and persists the result.
    async fn finish_link(
        &self,
        parent: RemoteNumber,
        sub_task_id: SubTaskId,
        mut record: SyncRecord,
    ) -> ChildSyncOutcome {
        let link_error = self.link_child(parent, &mut record).await.err();
        match &link_error {
            None => record.mark_success(&*self.clock),
            Some(err) => record.mark_failed(err.to_string(), &*self.clock),
        }
        let persist_error = self.records.update(&record).await.err();
        if persist_error.is_none() {
            self.verify_persisted(&record).await;
        }
        ChildSyncOutcome {
            sub_task_id,
            record: Some(record),
            error: link_error
                .map(|err| err.to_string())
                .or_else(|| persist_error.map(|err| err.to_string())),
            already_linked: false,
        }
    }

    async fn is_linked_remotely(
        &self,
        parent: RemoteNumber,
        record: &SyncRecord,
    ) -> Result<bool, RemoteTrackerError> {
        let linked = self.tracker.list_sub_issues(parent).await?;
        Ok(linked.iter().any(|issue| issue.number == record.remote_number()))
    }

    /// Resolves the child's node identifier and links it under `parent`.
    async fn link_child(
        &self,
        parent: RemoteNumber,
        record: &mut SyncRecord,
    ) -> Result<(), RemoteTrackerError> {
        if record.remote_node_id().is_none() {
            let node_id = self.tracker.resolve_node_id(record.remote_number()).await?;
            record.set_node_id(node_id);
        }
        self.tracker
            .link_sub_issue(parent, record.remote_id())
            .await
    }

    /// Re-reads a freshly written record; divergence is logged, not retried.
    async fn verify_persisted(&self, expected: &SyncRecord) {
        match self.records.find(expected.entity()).await {
            Ok(Some(actual)) if actual == *expected => {}
            Ok(Some(_)) => tracing::warn!(
                entity = %expected.entity(),
                "persisted sync record differs from the written record"
            ),
            Ok(None) => tracing::warn!(
                entity = %expected.entity(),
                "sync record missing immediately after write"
            ),
            Err(err) => tracing::warn!(
                entity = %expected.entity(),
                error = %err,
                "could not verify sync record"
            ),
        }
    }

    /// Closes the child issue of a sub-task.
    ///
    /// # Errors
    ///
    /// Returns [`IssueSyncError::NotLinked`] when the sub-task has no record,
    /// or the remote or repository error that stopped the update. A remote
    /// failure is also recorded on the sync record.
    pub async fn close_child(&self, sub_task_id: SubTaskId) -> IssueSyncResult<SyncRecord> {
        self.set_state(SyncEntity::sub_task(sub_task_id), RemoteIssueState::Closed)
            .await
    }

    /// Reopens the child issue of a sub-task.
    ///
    /// # Errors
    ///
    /// As for [`Self::close_child`].
    pub async fn reopen_child(&self, sub_task_id: SubTaskId) -> IssueSyncResult<SyncRecord> {
        self.set_state(SyncEntity::sub_task(sub_task_id), RemoteIssueState::Open)
            .await
    }

    /// Opens or closes the parent issue of a unit of work.
    ///
    /// # Errors
    ///
    /// As for [`Self::close_child`].
    pub async fn sync_parent_state(
        &self,
        unit_of_work: &UnitOfWork,
        state: RemoteIssueState,
    ) -> IssueSyncResult<SyncRecord> {
        self.set_state(SyncEntity::unit_of_work(unit_of_work.id()), state)
            .await
    }

    async fn set_state(
        &self,
        entity: SyncEntity,
        state: RemoteIssueState,
    ) -> IssueSyncResult<SyncRecord> {
        let mut record = self.require_record(entity).await?;
        if let Err(err) = self
            .tracker
            .update_issue_state(record.remote_number(), state)
            .await
        {
            record.mark_failed(err.to_string(), &*self.clock);
            if let Err(persist_err) = self.records.update(&record).await {
                tracing::warn!(
                    entity = %record.entity(),
                    error = %persist_err,
                    "could not record failed state update"
                );
            }
            return Err(err.into());
        }
        record.mark_success(&*self.clock);
        self.records.update(&record).await?;
        tracing::debug!(
            entity = %record.entity(),
            remote_number = record.remote_number().value(),
            state = state.as_str(),
            "remote issue state updated"
        );
        Ok(record)
    }

    async fn require_record(&self, entity: SyncEntity) -> IssueSyncResult<SyncRecord> {
        self.records
            .find(&entity)
            .await?
            .ok_or(IssueSyncError::NotLinked(entity))
    }

    /// Returns whether every linked child of `parent` is closed remotely.
    ///
    /// Each child's state is fetched fresh; a parent with no linked children
    /// counts as complete.
    ///
    /// # Errors
    ///
    /// Returns [`IssueSyncError`] when a lookup fails.
    pub async fn are_all_children_closed(&self, parent: RemoteNumber) -> IssueSyncResult<bool> {
        let children = self.records.find_children(parent).await?;
        for child in &children {
            let issue = self.tracker.get_issue(child.remote_number()).await?;
            if !issue.state.is_closed() {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Closes the parent issue once every child is closed.
    ///
    /// Returns whether the parent was closed.
    ///
    /// # Errors
    ///
    /// Returns [`IssueSyncError::NotLinked`] when the unit of work has no
    /// parent issue, or the error that stopped the check or update.
    pub async fn close_parent_if_complete(
        &self,
        unit_of_work: &UnitOfWork,
    ) -> IssueSyncResult<bool> {
        let entity = SyncEntity::unit_of_work(unit_of_work.id());
        let record = self.require_record(entity.clone()).await?;
        if !self.are_all_children_closed(record.remote_number()).await? {
            return Ok(false);
        }
        self.set_state(entity, RemoteIssueState::Closed).await?;
        tracing::info!(
            unit_of_work = %unit_of_work.id(),
            remote_number = record.remote_number().value(),
            "closed parent issue, all children closed"
        );
        Ok(true)
    }

    /// Posts a comment on the issue mirroring `entity`.
    ///
    /// # Errors
    ///
    /// Returns [`IssueSyncError::NotLinked`] when the entity has no record,
    /// or the remote error.
    pub async fn post_comment(&self, entity: &SyncEntity, body: &str) -> IssueSyncResult<()> {
        let record = self.require_record(entity.clone()).await?;
        self.tracker
            .add_comment(record.remote_number(), body)
            .await?;
        Ok(())
    }
}
