//! In-memory remote tracker with failure injection.

use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::{Arc, RwLock, RwLockWriteGuard};

use crate::tracker::{
    domain::{
        IssueDraft, RemoteIssue, RemoteIssueState, RemoteNodeId, RemoteNumber, StatusField,
    },
    ports::{RemoteTracker, RemoteTrackerError, RemoteTrackerResult},
};

/// Remote tracker operations, used to inject failures and count calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TrackerOperation {
    /// [`RemoteTracker::create_issue`].
    CreateIssue,
    /// [`RemoteTracker::get_issue`].
    GetIssue,
    /// [`RemoteTracker::update_issue_state`].
    UpdateIssueState,
    /// [`RemoteTracker::update_issue_body`].
    UpdateIssueBody,
    /// [`RemoteTracker::add_comment`].
    AddComment,
    /// [`RemoteTracker::resolve_node_id`].
    ResolveNodeId,
    /// [`RemoteTracker::link_sub_issue`].
    LinkSubIssue,
    /// [`RemoteTracker::list_sub_issues`].
    ListSubIssues,
    /// [`RemoteTracker::add_project_item`].
    AddProjectItem,
    /// [`RemoteTracker::fetch_status_field`].
    FetchStatusField,
    /// [`RemoteTracker::update_status_field`].
    UpdateStatusField,
    /// [`RemoteTracker::get_item_status`].
    GetItemStatus,
}

/// Thread-safe fake tracker backed by in-process maps.
///
/// Issue numbers and identifiers are allocated sequentially from 1.
#[derive(Debug, Clone, Default)]
pub struct InMemoryTracker {
    state: Arc<RwLock<InMemoryTrackerState>>,
}

#[derive(Debug, Default)]
struct InMemoryTrackerState {
    issues: BTreeMap<RemoteNumber, RemoteIssue>,
    sub_issues: HashMap<RemoteNumber, Vec<RemoteNumber>>,
    comments: HashMap<RemoteNumber, Vec<String>>,
    status_fields: HashMap<String, StatusField>,
    project_items: HashMap<(String, RemoteNodeId), String>,
    item_status: HashMap<String, String>,
    pinned_status: HashMap<String, Option<String>>,
    failures: HashMap<TrackerOperation, VecDeque<RemoteTrackerError>>,
    calls: HashMap<TrackerOperation, usize>,
    next_number: u64,
}

impl InMemoryTracker {
    /// Creates an empty tracker.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the status field of a project board.
    ///
    /// # Errors
    ///
    /// Returns [`RemoteTrackerError::Transport`] when the state lock is
    /// poisoned.
    pub fn with_status_field(
        self,
        project_id: &str,
        field: StatusField,
    ) -> RemoteTrackerResult<Self> {
        self.write_state()?
            .status_fields
            .insert(project_id.to_owned(), field);
        Ok(self)
    }

    /// Queues `error` to be returned by the next call to `operation`.
    ///
    /// # Errors
    ///
    /// Returns [`RemoteTrackerError::Transport`] when the state lock is
    /// poisoned.
    pub fn fail_next(
        &self,
        operation: TrackerOperation,
        error: RemoteTrackerError,
    ) -> RemoteTrackerResult<()> {
        self.write_state()?
            .failures
            .entry(operation)
            .or_default()
            .push_back(error);
        Ok(())
    }

    /// Forces [`RemoteTracker::get_item_status`] to report `status` for an
    /// item regardless of updates, simulating an eventually consistent board
    /// that never converges.
    ///
    /// # Errors
    ///
    /// Returns [`RemoteTrackerError::Transport`] when the state lock is
    /// poisoned.
    pub fn pin_item_status(&self, item_id: &str, status: Option<&str>) -> RemoteTrackerResult<()> {
        self.write_state()?
            .pinned_status
            .insert(item_id.to_owned(), status.map(str::to_owned));
        Ok(())
    }

    /// Closes or reopens an issue as if a person did it on the tracker.
    ///
    /// # Errors
    ///
    /// Returns [`RemoteTrackerError::NotFound`] when the issue does not
    /// exist.
    pub fn set_state_externally(
        &self,
        number: RemoteNumber,
        state: RemoteIssueState,
    ) -> RemoteTrackerResult<()> {
        let mut guard = self.write_state()?;
        issue_mut(&mut guard, number)?.state = state;
        Ok(())
    }

    /// Replaces an issue body as if a person edited it on the tracker.
    ///
    /// # Errors
    ///
    /// Returns [`RemoteTrackerError::NotFound`] when the issue does not
    /// exist.
    pub fn set_body_externally(&self, number: RemoteNumber, body: &str) -> RemoteTrackerResult<()> {
        let mut guard = self.write_state()?;
        body.clone_into(&mut issue_mut(&mut guard, number)?.body);
        Ok(())
    }

    /// Returns a snapshot of every issue, ordered by number.
    ///
    /// # Errors
    ///
    /// Returns [`RemoteTrackerError::Transport`] when the state lock is
    /// poisoned.
    pub fn issues(&self) -> RemoteTrackerResult<Vec<RemoteIssue>> {
        Ok(self.write_state()?.issues.values().cloned().collect())
    }

    /// Returns the comments posted on an issue.
    ///
    /// # Errors
    ///
    /// Returns [`RemoteTrackerError::Transport`] when the state lock is
    /// poisoned.
    pub fn comments(&self, number: RemoteNumber) -> RemoteTrackerResult<Vec<String>> {
        Ok(self
            .write_state()?
            .comments
            .get(&number)
            .cloned()
            .unwrap_or_default())
    }

    /// Returns the stored status of a project item, ignoring pins.
    ///
    /// # Errors
    ///
    /// Returns [`RemoteTrackerError::Transport`] when the state lock is
    /// poisoned.
    pub fn item_status(&self, item_id: &str) -> RemoteTrackerResult<Option<String>> {
        Ok(self.write_state()?.item_status.get(item_id).cloned())
    }

    /// Returns how many times `operation` has been invoked.
    ///
    /// # Errors
    ///
    /// Returns [`RemoteTrackerError::Transport`] when the state lock is
    /// poisoned.
    pub fn calls(&self, operation: TrackerOperation) -> RemoteTrackerResult<usize> {
        Ok(self
            .write_state()?
            .calls
            .get(&operation)
            .copied()
            .unwrap_or_default())
    }

    fn write_state(&self) -> RemoteTrackerResult<RwLockWriteGuard<'_, InMemoryTrackerState>> {
        self.state
            .write()
            .map_err(|err| RemoteTrackerError::transport(std::io::Error::other(err.to_string())))
    }

    /// Locks state, counts the call, and surfaces any injected failure.
    fn begin(
        &self,
        operation: TrackerOperation,
    ) -> RemoteTrackerResult<RwLockWriteGuard<'_, InMemoryTrackerState>> {
        let mut state = self.write_state()?;
        *state.calls.entry(operation).or_default() += 1;
        if let Some(error) = state
            .failures
            .get_mut(&operation)
            .and_then(VecDeque::pop_front)
        {
            return Err(error);
        }
        Ok(state)
    }
}

fn issue_mut(
    state: &mut InMemoryTrackerState,
    number: RemoteNumber,
) -> RemoteTrackerResult<&mut RemoteIssue> {
    state
        .issues
        .get_mut(&number)
        .ok_or_else(|| RemoteTrackerError::NotFound(format!("issue {number}")))
}

fn issue(state: &InMemoryTrackerState, number: RemoteNumber) -> RemoteTrackerResult<&RemoteIssue> {
    state
        .issues
        .get(&number)
        .ok_or_else(|| RemoteTrackerError::NotFound(format!("issue {number}")))
}

fn node_id_for(number: RemoteNumber) -> RemoteTrackerResult<RemoteNodeId> {
    RemoteNodeId::new(format!("I_{}", number.value()))
        .map_err(|err| RemoteTrackerError::InvalidResponse(err.to_string()))
}

#[async_trait]
impl RemoteTracker for InMemoryTracker {
    async fn create_issue(&self, draft: &IssueDraft) -> RemoteTrackerResult<RemoteIssue> {
        let mut state = self.begin(TrackerOperation::CreateIssue)?;
        state.next_number += 1;
        let number = RemoteNumber::new(state.next_number)
            .map_err(|err| RemoteTrackerError::InvalidResponse(err.to_string()))?;
        let created = RemoteIssue {
            id: number.value() + 1000,
            number,
            node_id: Some(node_id_for(number)?),
            title: draft.title().to_owned(),
            body: draft.body().to_owned(),
            state: RemoteIssueState::Open,
            labels: draft.labels().to_vec(),
        };
        state.issues.insert(number, created.clone());
        Ok(created)
    }

    async fn get_issue(&self, number: RemoteNumber) -> RemoteTrackerResult<RemoteIssue> {
        let state = self.begin(TrackerOperation::GetIssue)?;
        issue(&state, number).cloned()
    }

    async fn update_issue_state(
        &self,
        number: RemoteNumber,
        new_state: RemoteIssueState,
    ) -> RemoteTrackerResult<()> {
        let mut state = self.begin(TrackerOperation::UpdateIssueState)?;
        issue_mut(&mut state, number)?.state = new_state;
        Ok(())
    }

    async fn update_issue_body(&self, number: RemoteNumber, body: &str) -> RemoteTrackerResult<()> {
        let mut state = self.begin(TrackerOperation::UpdateIssueBody)?;
        body.clone_into(&mut issue_mut(&mut state, number)?.body);
        Ok(())
    }

    async fn add_comment(&self, number: RemoteNumber, body: &str) -> RemoteTrackerResult<()> {
        let mut state = self.begin(TrackerOperation::AddComment)?;
        issue(&state, number)?;
        state
            .comments
            .entry(number)
            .or_default()
            .push(body.to_owned());
        Ok(())
    }

    async fn resolve_node_id(&self, number: RemoteNumber) -> RemoteTrackerResult<RemoteNodeId> {
        let state = self.begin(TrackerOperation::ResolveNodeId)?;
        issue(&state, number)?
            .node_id
            .clone()
            .ok_or_else(|| {
                RemoteTrackerError::InvalidResponse(format!("issue {number} has no node id"))
            })
    }

    async fn link_sub_issue(
        &self,
        parent: RemoteNumber,
        child_remote_id: u64,
    ) -> RemoteTrackerResult<()> {
        let mut state = self.begin(TrackerOperation::LinkSubIssue)?;
        issue(&state, parent)?;
        let child = state
            .issues
            .values()
            .find(|candidate| candidate.id == child_remote_id)
            .map(|candidate| candidate.number)
            .ok_or_else(|| RemoteTrackerError::NotFound(format!("issue id {child_remote_id}")))?;
        let children = state.sub_issues.entry(parent).or_default();
        if children.contains(&child) {
            return Err(RemoteTrackerError::Api {
                status: 422,
                message: format!("issue {child} is already a sub-issue of {parent}"),
            });
        }
        children.push(child);
        Ok(())
    }

    async fn list_sub_issues(&self, parent: RemoteNumber) -> RemoteTrackerResult<Vec<RemoteIssue>> {
        let state = self.begin(TrackerOperation::ListSubIssues)?;
        issue(&state, parent)?;
        state
            .sub_issues
            .get(&parent)
            .map(|children| {
                children
                    .iter()
                    .map(|child| issue(&state, *child).cloned())
                    .collect()
            })
            .unwrap_or_else(|| Ok(Vec::new()))
    }

    async fn add_project_item(
        &self,
        project_id: &str,
        content: &RemoteNodeId,
    ) -> RemoteTrackerResult<String> {
        let mut state = self.begin(TrackerOperation::AddProjectItem)?;
        let item_id = state
            .project_items
            .entry((project_id.to_owned(), content.clone()))
            .or_insert_with(|| format!("PVTI_{content}"))
            .clone();
        Ok(item_id)
    }

    async fn fetch_status_field(
        &self,
        project_id: &str,
        field_name: &str,
    ) -> RemoteTrackerResult<StatusField> {
        let state = self.begin(TrackerOperation::FetchStatusField)?;
        state
            .status_fields
            .get(project_id)
            .filter(|field| field.name.eq_ignore_ascii_case(field_name))
            .cloned()
            .ok_or_else(|| {
                RemoteTrackerError::NotFound(format!("field {field_name} in project {project_id}"))
            })
    }

    async fn update_status_field(
        &self,
        project_id: &str,
        item_id: &str,
        field_id: &str,
        option_id: &str,
    ) -> RemoteTrackerResult<()> {
        let mut state = self.begin(TrackerOperation::UpdateStatusField)?;
        let option_name = state
            .status_fields
            .get(project_id)
            .filter(|field| field.field_id == field_id)
            .and_then(|field| field.options.iter().find(|option| option.id == option_id))
            .map(|option| option.name.clone())
            .ok_or_else(|| RemoteTrackerError::Api {
                status: 422,
                message: format!("unknown option {option_id} for field {field_id}"),
            })?;
        state.item_status.insert(item_id.to_owned(), option_name);
        Ok(())
    }

    async fn get_item_status(
        &self,
        _project_id: &str,
        item_id: &str,
        _field_name: &str,
    ) -> RemoteTrackerResult<Option<String>> {
        let state = self.begin(TrackerOperation::GetItemStatus)?;
        if let Some(pinned) = state.pinned_status.get(item_id) {
            return Ok(pinned.clone());
        }
        Ok(state.item_status.get(item_id).cloned())
    }
}
