//! Error types for webhook handling.

use crate::events::EventBusError;
use crate::tracker::domain::TrackerDomainError;
use thiserror::Error;

/// Errors returned while authenticating, parsing, or dispatching a delivery.
#[derive(Debug, Error)]
pub enum WebhookError {
    /// The shared secret is empty.
    #[error("webhook secret must not be empty")]
    EmptySecret,

    /// The delivery carries no signature header.
    #[error("missing webhook signature header")]
    MissingSignature,

    /// The signature header is not `sha256=<hex>`.
    #[error("malformed webhook signature: {0}")]
    MalformedSignature(String),

    /// The signature does not match the body.
    #[error("webhook signature mismatch")]
    SignatureMismatch,

    /// The delivery carries no event name header.
    #[error("missing webhook event name header")]
    MissingEventName,

    /// The body is not the JSON shape expected for its event.
    #[error("invalid webhook payload: {0}")]
    InvalidPayload(#[source] serde_json::Error),

    /// The payload names an issue number the tracker cannot have issued.
    #[error(transparent)]
    InvalidReference(#[from] TrackerDomainError),

    /// Publishing the mapped event failed.
    #[error(transparent)]
    Publish(#[from] EventBusError),
}

/// Result type for webhook operations.
pub type WebhookResult<T> = Result<T, WebhookError>;
