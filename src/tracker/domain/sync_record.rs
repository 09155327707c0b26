//! Sync records correlating local entities with remote issues.

use super::{ParseSyncValueError, RemoteNodeId, RemoteNumber};
use crate::checklist::ChecklistChecksum;
use crate::workflow::domain::{SubTaskId, UnitOfWorkId};
use chrono::{DateTime, Utc};
use mockable::Clock;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Kind of local entity a sync record belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncEntityType {
    /// A unit of work, mirrored as a parent issue.
    UnitOfWork,
    /// A sub-task, mirrored as a child issue.
    SubTask,
}

impl SyncEntityType {
    /// Returns the canonical storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::UnitOfWork => "unit_of_work",
            Self::SubTask => "sub_task",
        }
    }
}

impl TryFrom<&str> for SyncEntityType {
    type Error = ParseSyncValueError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.trim().to_ascii_lowercase().as_str() {
            "unit_of_work" => Ok(Self::UnitOfWork),
            "sub_task" => Ok(Self::SubTask),
            _ => Err(ParseSyncValueError {
                kind: "sync entity type",
                value: value.to_owned(),
            }),
        }
    }
}

/// Outcome of the latest reconciliation attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncStatus {
    /// The last attempt succeeded.
    Success,
    /// The last attempt failed; see the error message.
    Failed,
    /// An attempt is in progress or has not completed.
    Pending,
}

impl SyncStatus {
    /// Returns the canonical storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Failed => "failed",
            Self::Pending => "pending",
        }
    }
}

impl TryFrom<&str> for SyncStatus {
    type Error = ParseSyncValueError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.trim().to_ascii_lowercase().as_str() {
            "success" => Ok(Self::Success),
            "failed" => Ok(Self::Failed),
            "pending" => Ok(Self::Pending),
            _ => Err(ParseSyncValueError {
                kind: "sync status",
                value: value.to_owned(),
            }),
        }
    }
}

/// Key of a sync record: at most one record exists per key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SyncEntity {
    entity_type: SyncEntityType,
    entity_id: String,
}

impl SyncEntity {
    /// Creates a key from raw parts.
    #[must_use]
    pub fn new(entity_type: SyncEntityType, entity_id: impl Into<String>) -> Self {
        Self {
            entity_type,
            entity_id: entity_id.into(),
        }
    }

    /// Key for a unit of work.
    #[must_use]
    pub fn unit_of_work(id: UnitOfWorkId) -> Self {
        Self::new(SyncEntityType::UnitOfWork, id.to_string())
    }

    /// Key for a sub-task.
    #[must_use]
    pub fn sub_task(id: SubTaskId) -> Self {
        Self::new(SyncEntityType::SubTask, id.to_string())
    }

    /// Returns the entity type.
    #[must_use]
    pub const fn entity_type(&self) -> SyncEntityType {
        self.entity_type
    }

    /// Returns the local entity identifier.
    #[must_use]
    pub fn entity_id(&self) -> &str {
        &self.entity_id
    }

    /// Returns the unit of work this key refers to, if it is one.
    #[must_use]
    pub fn as_unit_of_work(&self) -> Option<UnitOfWorkId> {
        match self.entity_type {
            SyncEntityType::UnitOfWork => Uuid::parse_str(&self.entity_id)
                .ok()
                .map(UnitOfWorkId::from_uuid),
            SyncEntityType::SubTask => None,
        }
    }

    /// Returns the sub-task this key refers to, if it is one.
    #[must_use]
    pub fn as_sub_task(&self) -> Option<SubTaskId> {
        match self.entity_type {
            SyncEntityType::SubTask => Uuid::parse_str(&self.entity_id)
                .ok()
                .map(SubTaskId::from_uuid),
            SyncEntityType::UnitOfWork => None,
        }
    }
}

impl fmt::Display for SyncEntity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.entity_type.as_str(), self.entity_id)
    }
}

/// Remote identifiers assigned when an issue is created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteLink {
    /// Numeric remote identifier.
    pub remote_id: u64,
    /// Repository-scoped number.
    pub remote_number: RemoteNumber,
    /// Graph node identifier, if already known.
    pub remote_node_id: Option<RemoteNodeId>,
    /// Parent issue number for child items.
    pub parent_remote_number: Option<RemoteNumber>,
}

/// Local record of a remote issue mirroring a unit of work or sub-task.
///
/// Records are created once and then updated in place on every
/// reconciliation attempt, so failure history stays visible.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncRecord {
    entity: SyncEntity,
    remote_id: u64,
    remote_number: RemoteNumber,
    remote_node_id: Option<RemoteNodeId>,
    parent_remote_number: Option<RemoteNumber>,
    last_synced_at: DateTime<Utc>,
    sync_status: SyncStatus,
    error_message: Option<String>,
    checklist_checksum: Option<ChecklistChecksum>,
}

/// Parameter object for reconstructing a persisted sync record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistedSyncRecordData {
    /// Record key.
    pub entity: SyncEntity,
    /// Remote identifiers.
    pub link: RemoteLink,
    /// Last reconciliation timestamp.
    pub last_synced_at: DateTime<Utc>,
    /// Last reconciliation outcome.
    pub sync_status: SyncStatus,
    /// Last failure message.
    pub error_message: Option<String>,
    /// Checksum of the last reconciled checklist.
    pub checklist_checksum: Option<ChecklistChecksum>,
}

impl SyncRecord {
    /// Creates a pending record for a freshly created remote issue.
    #[must_use]
    pub fn new(entity: SyncEntity, link: RemoteLink, clock: &impl Clock) -> Self {
        Self {
            entity,
            remote_id: link.remote_id,
            remote_number: link.remote_number,
            remote_node_id: link.remote_node_id,
            parent_remote_number: link.parent_remote_number,
            last_synced_at: clock.utc(),
            sync_status: SyncStatus::Pending,
            error_message: None,
            checklist_checksum: None,
        }
    }

    /// Reconstructs a record from persisted storage.
    #[must_use]
    pub fn from_persisted(data: PersistedSyncRecordData) -> Self {
        Self {
            entity: data.entity,
            remote_id: data.link.remote_id,
            remote_number: data.link.remote_number,
            remote_node_id: data.link.remote_node_id,
            parent_remote_number: data.link.parent_remote_number,
            last_synced_at: data.last_synced_at,
            sync_status: data.sync_status,
            error_message: data.error_message,
            checklist_checksum: data.checklist_checksum,
        }
    }

    /// Returns the record key.
    #[must_use]
    pub const fn entity(&self) -> &SyncEntity {
        &self.entity
    }

    /// Returns the numeric remote identifier.
    #[must_use]
    pub const fn remote_id(&self) -> u64 {
        self.remote_id
    }

    /// Returns the remote issue number.
    #[must_use]
    pub const fn remote_number(&self) -> RemoteNumber {
        self.remote_number
    }

    /// Returns the remote node identifier, if resolved.
    #[must_use]
    pub const fn remote_node_id(&self) -> Option<&RemoteNodeId> {
        self.remote_node_id.as_ref()
    }

    /// Returns the parent issue number for child records.
    #[must_use]
    pub const fn parent_remote_number(&self) -> Option<RemoteNumber> {
        self.parent_remote_number
    }

    /// Returns the last reconciliation timestamp.
    #[must_use]
    pub const fn last_synced_at(&self) -> DateTime<Utc> {
        self.last_synced_at
    }

    /// Returns the last reconciliation outcome.
    #[must_use]
    pub const fn sync_status(&self) -> SyncStatus {
        self.sync_status
    }

    /// Returns the last failure message.
    #[must_use]
    pub fn error_message(&self) -> Option<&str> {
        self.error_message.as_deref()
    }

    /// Returns the checksum of the last reconciled checklist.
    #[must_use]
    pub const fn checklist_checksum(&self) -> Option<&ChecklistChecksum> {
        self.checklist_checksum.as_ref()
    }

    /// Returns whether the last attempt succeeded.
    #[must_use]
    pub const fn is_synced(&self) -> bool {
        matches!(self.sync_status, SyncStatus::Success)
    }

    /// Records a successful attempt and clears any previous failure.
    pub fn mark_success(&mut self, clock: &impl Clock) {
        self.sync_status = SyncStatus::Success;
        self.error_message = None;
        self.last_synced_at = clock.utc();
    }

    /// Records a failed attempt.
    pub fn mark_failed(&mut self, message: impl Into<String>, clock: &impl Clock) {
        self.sync_status = SyncStatus::Failed;
        self.error_message = Some(message.into());
        self.last_synced_at = clock.utc();
    }

    /// Records that an attempt has started.
    pub fn mark_pending(&mut self, clock: &impl Clock) {
        self.sync_status = SyncStatus::Pending;
        self.last_synced_at = clock.utc();
    }

    /// Stores the checksum of a successfully reconciled checklist.
    pub fn record_checksum(&mut self, checksum: ChecklistChecksum, clock: &impl Clock) {
        self.checklist_checksum = Some(checksum);
        self.mark_success(clock);
    }

    /// Sets the resolved node identifier.
    pub fn set_node_id(&mut self, node_id: RemoteNodeId) {
        self.remote_node_id = Some(node_id);
    }
}
