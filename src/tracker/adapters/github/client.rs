//! GitHub implementation of the remote tracker port.

use super::models::{
    AddItemData, CommentBody, CreateIssueBody, FieldData, GraphQlRequest, GraphQlResponse,
    IssueResponse, ItemStatusData, SubIssueBody, UpdateIssueBody,
};
use super::queries;
use crate::tracker::{
    domain::{IssueDraft, RemoteIssue, RemoteIssueState, RemoteNodeId, RemoteNumber, StatusField},
    ports::{RemoteTracker, RemoteTrackerError, RemoteTrackerResult},
};
use async_trait::async_trait;
use reqwest::header::{ACCEPT, AUTHORIZATION, HeaderMap, HeaderValue, USER_AGENT};
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde::Serialize;
use serde::de::{DeserializeOwned, IgnoredAny};
use serde_json::json;
use std::time::Duration;

const API_VERSION: &str = "2022-11-28";
const USER_AGENT_VALUE: &str = concat!("specsync/", env!("CARGO_PKG_VERSION"));

/// Connection settings for [`GitHubTracker`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GitHubSettings {
    /// API root, e.g. `https://api.github.com`.
    pub api_base_url: String,
    /// Repository owner.
    pub owner: String,
    /// Repository name.
    pub repository: String,
    /// Access token.
    pub token: String,
}

/// GitHub issues and Projects v2 client.
///
/// Throttling is reported as [`RemoteTrackerError::RateLimited`]; wrap the
/// tracker in [`crate::tracker::services::RateLimitedTracker`] to retry.
#[derive(Debug, Clone)]
pub struct GitHubTracker {
    http: reqwest::Client,
    api_base_url: String,
    owner: String,
    repository: String,
}

impl GitHubTracker {
    /// Builds a client with authentication headers.
    ///
    /// # Errors
    ///
    /// Returns [`RemoteTrackerError::Transport`] when the token is not a
    /// valid header value or the HTTP client cannot be built.
    pub fn new(settings: GitHubSettings) -> RemoteTrackerResult<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/vnd.github+json"));
        headers.insert(USER_AGENT, HeaderValue::from_static(USER_AGENT_VALUE));
        headers.insert("x-github-api-version", HeaderValue::from_static(API_VERSION));
        let mut auth = HeaderValue::from_str(&format!("Bearer {}", settings.token))
            .map_err(RemoteTrackerError::transport)?;
        auth.set_sensitive(true);
        headers.insert(AUTHORIZATION, auth);

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .build()
            .map_err(RemoteTrackerError::transport)?;

        Ok(Self {
            http,
            api_base_url: settings.api_base_url.trim_end_matches('/').to_owned(),
            owner: settings.owner,
            repository: settings.repository,
        })
    }

    fn issues_url(&self, suffix: &str) -> String {
        format!(
            "{}/repos/{}/{}/issues{suffix}",
            self.api_base_url, self.owner, self.repository
        )
    }

    fn rest(&self, method: Method, url: String) -> RequestBuilder {
        self.http.request(method, url)
    }

    async fn fetch_issue(&self, number: RemoteNumber) -> RemoteTrackerResult<RemoteIssue> {
        let url = self.issues_url(&format!("/{}", number.value()));
        let response = send(self.rest(Method::GET, url)).await?;
        decode::<IssueResponse>(response).await?.into_domain()
    }

    async fn patch_issue(
        &self,
        number: RemoteNumber,
        body: &UpdateIssueBody<'_>,
    ) -> RemoteTrackerResult<()> {
        let url = self.issues_url(&format!("/{}", number.value()));
        send(self.rest(Method::PATCH, url).json(body)).await?;
        Ok(())
    }

    async fn graphql<V, T>(&self, query: &str, variables: V) -> RemoteTrackerResult<T>
    where
        V: Serialize + Send,
        T: DeserializeOwned + Send,
    {
        let url = format!("{}/graphql", self.api_base_url);
        let request = self
            .rest(Method::POST, url)
            .json(&GraphQlRequest { query, variables });
        let response = send(request).await?;
        decode::<GraphQlResponse<T>>(response).await?.into_data()
    }
}

async fn send(request: RequestBuilder) -> RemoteTrackerResult<Response> {
    let response = request.send().await.map_err(RemoteTrackerError::transport)?;
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let retry_after = parse_retry_after(response.headers());
    let quota_exhausted = response
        .headers()
        .get("x-ratelimit-remaining")
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.trim() == "0");
    let message = response.text().await.unwrap_or_default();
    Err(classify_failure(status, retry_after, quota_exhausted, message))
}

async fn decode<T: DeserializeOwned>(response: Response) -> RemoteTrackerResult<T> {
    response
        .json::<T>()
        .await
        .map_err(|err| RemoteTrackerError::InvalidResponse(err.to_string()))
}

/// Reads a `retry-after` header expressed in whole seconds.
pub(super) fn parse_retry_after(headers: &HeaderMap) -> Option<Duration> {
    headers
        .get("retry-after")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
}

/// Maps a non-success HTTP response onto a tracker error.
pub(super) fn classify_failure(
    status: StatusCode,
    retry_after: Option<Duration>,
    quota_exhausted: bool,
    message: String,
) -> RemoteTrackerError {
    let throttled = status == StatusCode::TOO_MANY_REQUESTS
        || (status == StatusCode::FORBIDDEN && (quota_exhausted || retry_after.is_some()));
    if throttled {
        return RemoteTrackerError::RateLimited { retry_after };
    }
    if status == StatusCode::NOT_FOUND {
        return RemoteTrackerError::NotFound(message);
    }
    RemoteTrackerError::Api {
        status: status.as_u16(),
        message,
    }
}

#[async_trait]
impl RemoteTracker for GitHubTracker {
    async fn create_issue(&self, draft: &IssueDraft) -> RemoteTrackerResult<RemoteIssue> {
        let body = CreateIssueBody {
            title: draft.title(),
            body: draft.body(),
            labels: draft.labels(),
        };
        let response = send(self.rest(Method::POST, self.issues_url("")).json(&body)).await?;
        let issue = decode::<IssueResponse>(response).await?.into_domain()?;
        tracing::debug!(number = issue.number.value(), "created remote issue");
        Ok(issue)
    }

    async fn get_issue(&self, number: RemoteNumber) -> RemoteTrackerResult<RemoteIssue> {
        self.fetch_issue(number).await
    }

    async fn update_issue_state(
        &self,
        number: RemoteNumber,
        state: RemoteIssueState,
    ) -> RemoteTrackerResult<()> {
        let body = UpdateIssueBody {
            state: Some(state.as_str()),
            ..UpdateIssueBody::default()
        };
        self.patch_issue(number, &body).await
    }

    async fn update_issue_body(&self, number: RemoteNumber, body: &str) -> RemoteTrackerResult<()> {
        let update = UpdateIssueBody {
            body: Some(body),
            ..UpdateIssueBody::default()
        };
        self.patch_issue(number, &update).await
    }

    async fn add_comment(&self, number: RemoteNumber, body: &str) -> RemoteTrackerResult<()> {
        let url = self.issues_url(&format!("/{}/comments", number.value()));
        send(self.rest(Method::POST, url).json(&CommentBody { body })).await?;
        Ok(())
    }

    async fn resolve_node_id(&self, number: RemoteNumber) -> RemoteTrackerResult<RemoteNodeId> {
        self.fetch_issue(number).await?.node_id.ok_or_else(|| {
            RemoteTrackerError::InvalidResponse(format!("issue {number} has no node id"))
        })
    }

    async fn link_sub_issue(
        &self,
        parent: RemoteNumber,
        child_remote_id: u64,
    ) -> RemoteTrackerResult<()> {
        let url = self.issues_url(&format!("/{}/sub_issues", parent.value()));
        let body = SubIssueBody {
            sub_issue_id: child_remote_id,
        };
        send(self.rest(Method::POST, url).json(&body)).await?;
        Ok(())
    }

    async fn list_sub_issues(&self, parent: RemoteNumber) -> RemoteTrackerResult<Vec<RemoteIssue>> {
        let url = self.issues_url(&format!("/{}/sub_issues?per_page=100", parent.value()));
        let response = send(self.rest(Method::GET, url)).await?;
        decode::<Vec<IssueResponse>>(response)
            .await?
            .into_iter()
            .map(IssueResponse::into_domain)
            .collect()
    }

    async fn add_project_item(
        &self,
        project_id: &str,
        content: &RemoteNodeId,
    ) -> RemoteTrackerResult<String> {
        let data: AddItemData = self
            .graphql(
                queries::ADD_PROJECT_ITEM,
                json!({ "project": project_id, "content": content.as_str() }),
            )
            .await?;
        data.add_item.item.map(|item| item.id).ok_or_else(|| {
            RemoteTrackerError::InvalidResponse("project item was not created".to_owned())
        })
    }

    async fn fetch_status_field(
        &self,
        project_id: &str,
        field_name: &str,
    ) -> RemoteTrackerResult<StatusField> {
        let data: FieldData = self
            .graphql(
                queries::STATUS_FIELD,
                json!({ "project": project_id, "name": field_name }),
            )
            .await?;
        data.into_status_field(field_name)
    }

    async fn update_status_field(
        &self,
        project_id: &str,
        item_id: &str,
        field_id: &str,
        option_id: &str,
    ) -> RemoteTrackerResult<()> {
        let _: IgnoredAny = self
            .graphql(
                queries::UPDATE_STATUS,
                json!({
                    "project": project_id,
                    "item": item_id,
                    "field": field_id,
                    "option": option_id,
                }),
            )
            .await?;
        Ok(())
    }

    async fn get_item_status(
        &self,
        _project_id: &str,
        item_id: &str,
        field_name: &str,
    ) -> RemoteTrackerResult<Option<String>> {
        let data: ItemStatusData = self
            .graphql(
                queries::ITEM_STATUS,
                json!({ "item": item_id, "name": field_name }),
            )
            .await?;
        Ok(data
            .node
            .and_then(|item| item.field_value)
            .and_then(|value| value.name))
    }
}
