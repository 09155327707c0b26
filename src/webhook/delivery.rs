//! Mapping of tracker webhook payloads onto workflow events.

use super::{WebhookError, WebhookResult};
use crate::events::{EventPayload, WorkflowEvent};
use crate::tracker::domain::RemoteNumber;
use mockable::Clock;
use serde::Deserialize;
use serde_json::Value;

/// A parsed, not yet interpreted, webhook delivery.
#[derive(Debug, Clone, PartialEq)]
pub struct WebhookDelivery {
    /// Event name from the event header, e.g. `issues`.
    pub event_name: String,
    /// Decoded JSON body.
    pub payload: Value,
}

#[derive(Debug, Deserialize)]
struct IssuesBody {
    action: String,
    issue: IssueBody,
    #[serde(default)]
    label: Option<LabelBody>,
    #[serde(default)]
    changes: Option<ChangesBody>,
}

#[derive(Debug, Deserialize)]
struct IssueBody {
    number: u64,
    #[serde(default)]
    body: Option<String>,
}

#[derive(Debug, Deserialize)]
struct LabelBody {
    name: String,
}

#[derive(Debug, Deserialize)]
struct ChangesBody {
    #[serde(default)]
    body: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct IssueCommentBody {
    action: String,
    issue: IssueBody,
    comment: CommentBody,
}

#[derive(Debug, Deserialize)]
struct CommentBody {
    body: String,
    user: UserBody,
}

#[derive(Debug, Deserialize)]
struct UserBody {
    login: String,
}

#[derive(Debug, Deserialize)]
struct PullRequestEnvelope {
    action: String,
    pull_request: PullRequestBody,
}

#[derive(Debug, Deserialize)]
struct PullRequestBody {
    number: u64,
    #[serde(default)]
    merged: bool,
}

impl WebhookDelivery {
    /// Decodes a delivery body.
    ///
    /// # Errors
    ///
    /// Returns [`WebhookError::InvalidPayload`] when `body` is not JSON.
    pub fn parse(event_name: impl Into<String>, body: &[u8]) -> WebhookResult<Self> {
        let payload = serde_json::from_slice(body).map_err(WebhookError::InvalidPayload)?;
        Ok(Self {
            event_name: event_name.into(),
            payload,
        })
    }

    /// Maps the delivery onto a workflow event payload.
    ///
    /// Handled deliveries are `issues` (`closed`, `reopened`, `edited`,
    /// `labeled`), `issue_comment` (`created`), and `pull_request`
    /// (`closed`). Anything else yields `Ok(None)`.
    ///
    /// # Errors
    ///
    /// Returns [`WebhookError::InvalidPayload`] when a handled event lacks
    /// the expected fields, or [`WebhookError::InvalidReference`] for an
    /// impossible issue number.
    pub fn to_payload(&self) -> WebhookResult<Option<EventPayload>> {
        match self.event_name.as_str() {
            "issues" => self.issues_payload(),
            "issue_comment" => self.comment_payload(),
            "pull_request" => self.pull_request_payload(),
            _ => Ok(None),
        }
    }

    /// Maps the delivery onto a timestamped workflow event.
    ///
    /// # Errors
    ///
    /// As for [`Self::to_payload`].
    pub fn to_event(&self, clock: &impl Clock) -> WebhookResult<Option<WorkflowEvent>> {
        Ok(self.to_payload()?.map(|payload| {
            let subject = subject_for(&payload);
            WorkflowEvent::new(subject, payload, clock)
        }))
    }

    fn decode<'a, T: Deserialize<'a>>(&'a self) -> WebhookResult<T> {
        T::deserialize(&self.payload).map_err(WebhookError::InvalidPayload)
    }

    fn issues_payload(&self) -> WebhookResult<Option<EventPayload>> {
        let body: IssuesBody = self.decode()?;
        let remote_number = RemoteNumber::new(body.issue.number)?;
        let payload = match body.action.as_str() {
            "closed" => EventPayload::RemoteIssueClosed { remote_number },
            "reopened" => EventPayload::RemoteIssueReopened { remote_number },
            "edited" => {
                let body_changed = body.changes.is_some_and(|changes| changes.body.is_some());
                EventPayload::RemoteIssueEdited {
                    remote_number,
                    body: body.issue.body.filter(|_| body_changed),
                }
            }
            "labeled" => match body.label {
                Some(label) => EventPayload::RemoteIssueLabeled {
                    remote_number,
                    label: label.name,
                },
                None => return Ok(None),
            },
            _ => return Ok(None),
        };
        Ok(Some(payload))
    }

    fn comment_payload(&self) -> WebhookResult<Option<EventPayload>> {
        let body: IssueCommentBody = self.decode()?;
        if body.action != "created" {
            return Ok(None);
        }
        Ok(Some(EventPayload::RemoteIssueCommented {
            remote_number: RemoteNumber::new(body.issue.number)?,
            author: body.comment.user.login,
            body: body.comment.body,
        }))
    }

    fn pull_request_payload(&self) -> WebhookResult<Option<EventPayload>> {
        let body: PullRequestEnvelope = self.decode()?;
        if body.action != "closed" {
            return Ok(None);
        }
        Ok(Some(EventPayload::PullRequestClosed {
            number: body.pull_request.number,
            merged: body.pull_request.merged,
        }))
    }
}

fn subject_for(payload: &EventPayload) -> String {
    match payload {
        EventPayload::RemoteIssueClosed { remote_number }
        | EventPayload::RemoteIssueReopened { remote_number }
        | EventPayload::RemoteIssueEdited { remote_number, .. }
        | EventPayload::RemoteIssueLabeled { remote_number, .. }
        | EventPayload::RemoteIssueCommented { remote_number, .. } => {
            format!("issue:{}", remote_number.value())
        }
        EventPayload::PullRequestClosed { number, .. } => format!("pull_request:{number}"),
        other => other.event_type().to_string(),
    }
}
