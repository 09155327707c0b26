//! Domain model for remote tracker synchronisation.
//!
//! Remote issues, project status fields, and the sync records that tie local
//! entities to them. No I/O happens here.

mod error;
mod ids;
mod issue;
mod status;
mod sync_record;
mod template;

pub use error::{ParseSyncValueError, TrackerDomainError};
pub use ids::{RemoteNodeId, RemoteNumber};
pub use issue::{IssueDraft, RemoteIssue, RemoteIssueState};
pub use status::{StatusField, StatusOption, StatusVerification};
pub use sync_record::{
    PersistedSyncRecordData, RemoteLink, SyncEntity, SyncEntityType, SyncRecord, SyncStatus,
};
pub use template::{ParentBody, render_child_body, render_parent_body, render_progress_comment};
