//! Wire models for the GitHub REST and GraphQL APIs.

use crate::tracker::{
    domain::{RemoteIssue, RemoteIssueState, RemoteNodeId, RemoteNumber, StatusField, StatusOption},
    ports::{RemoteTrackerError, RemoteTrackerResult},
};
use serde::{Deserialize, Serialize};

/// Issue creation body.
#[derive(Debug, Serialize)]
pub(super) struct CreateIssueBody<'a> {
    pub title: &'a str,
    pub body: &'a str,
    pub labels: &'a [String],
}

/// Partial issue update body.
#[derive(Debug, Default, Serialize)]
pub(super) struct UpdateIssueBody<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<&'a str>,
}

/// Comment creation body.
#[derive(Debug, Serialize)]
pub(super) struct CommentBody<'a> {
    pub body: &'a str,
}

/// Sub-issue link body.
#[derive(Debug, Serialize)]
pub(super) struct SubIssueBody {
    pub sub_issue_id: u64,
}

#[derive(Debug, Deserialize)]
pub(super) struct LabelResponse {
    pub name: String,
}

/// Issue as returned by the REST API.
#[derive(Debug, Deserialize)]
pub(super) struct IssueResponse {
    pub id: u64,
    pub number: u64,
    pub node_id: Option<String>,
    pub title: String,
    pub body: Option<String>,
    pub state: String,
    #[serde(default)]
    pub labels: Vec<LabelResponse>,
}

impl IssueResponse {
    pub(super) fn into_domain(self) -> RemoteTrackerResult<RemoteIssue> {
        let number = RemoteNumber::new(self.number)
            .map_err(|err| RemoteTrackerError::InvalidResponse(err.to_string()))?;
        let node_id = self
            .node_id
            .map(RemoteNodeId::new)
            .transpose()
            .map_err(|err| RemoteTrackerError::InvalidResponse(err.to_string()))?;
        let state = match self.state.as_str() {
            "open" => RemoteIssueState::Open,
            "closed" => RemoteIssueState::Closed,
            other => {
                return Err(RemoteTrackerError::InvalidResponse(format!(
                    "unknown issue state {other}"
                )));
            }
        };
        Ok(RemoteIssue {
            id: self.id,
            number,
            node_id,
            title: self.title,
            body: self.body.unwrap_or_default(),
            state,
            labels: self.labels.into_iter().map(|label| label.name).collect(),
        })
    }
}

/// GraphQL request envelope.
#[derive(Debug, Serialize)]
pub(super) struct GraphQlRequest<'a, V> {
    pub query: &'a str,
    pub variables: V,
}

#[derive(Debug, Deserialize)]
pub(super) struct GraphQlError {
    pub message: String,
    #[serde(rename = "type")]
    pub kind: Option<String>,
}

/// GraphQL response envelope.
#[derive(Debug, Deserialize)]
pub(super) struct GraphQlResponse<T> {
    pub data: Option<T>,
    pub errors: Option<Vec<GraphQlError>>,
}

impl<T> GraphQlResponse<T> {
    /// Returns the data or maps GraphQL errors onto tracker errors.
    pub(super) fn into_data(self) -> RemoteTrackerResult<T> {
        if let Some(errors) = self.errors.filter(|errors| !errors.is_empty()) {
            if errors
                .iter()
                .any(|error| error.kind.as_deref() == Some("RATE_LIMITED"))
            {
                return Err(RemoteTrackerError::RateLimited { retry_after: None });
            }
            let message = errors
                .into_iter()
                .map(|error| error.message)
                .collect::<Vec<_>>()
                .join("; ");
            return Err(RemoteTrackerError::InvalidResponse(message));
        }
        self.data
            .ok_or_else(|| RemoteTrackerError::InvalidResponse("missing data".to_owned()))
    }
}

#[derive(Debug, Deserialize)]
pub(super) struct NodeRef {
    pub id: String,
}

#[derive(Debug, Deserialize)]
pub(super) struct AddItemPayload {
    pub item: Option<NodeRef>,
}

#[derive(Debug, Deserialize)]
pub(super) struct AddItemData {
    #[serde(rename = "addProjectV2ItemById")]
    pub add_item: AddItemPayload,
}

#[derive(Debug, Deserialize)]
pub(super) struct OptionNode {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub(super) struct FieldNode {
    pub id: Option<String>,
    pub name: Option<String>,
    #[serde(default)]
    pub options: Vec<OptionNode>,
}

#[derive(Debug, Deserialize)]
pub(super) struct ProjectNode {
    pub field: Option<FieldNode>,
}

#[derive(Debug, Deserialize)]
pub(super) struct FieldData {
    pub node: Option<ProjectNode>,
}

impl FieldData {
    pub(super) fn into_status_field(self, field_name: &str) -> RemoteTrackerResult<StatusField> {
        let field = self
            .node
            .and_then(|project| project.field)
            .ok_or_else(|| RemoteTrackerError::NotFound(format!("project field {field_name}")))?;
        let (Some(field_id), Some(name)) = (field.id, field.name) else {
            return Err(RemoteTrackerError::InvalidResponse(format!(
                "field {field_name} is not a single-select field"
            )));
        };
        Ok(StatusField {
            field_id,
            name,
            options: field
                .options
                .into_iter()
                .map(|option| StatusOption::new(option.id, option.name))
                .collect(),
        })
    }
}

#[derive(Debug, Deserialize)]
pub(super) struct FieldValue {
    pub name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(super) struct ItemNode {
    #[serde(rename = "fieldValueByName")]
    pub field_value: Option<FieldValue>,
}

#[derive(Debug, Deserialize)]
pub(super) struct ItemStatusData {
    pub node: Option<ItemNode>,
}
