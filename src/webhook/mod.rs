//! Inbound tracker webhooks.
//!
//! Deliveries are authenticated with an HMAC-SHA256 signature over the raw
//! body, mapped onto [`crate::events::WorkflowEvent`] values, and published on
//! the [`crate::events::EventBus`]. Only the remote events the workflow
//! reacts to are mapped; every other delivery is accepted and dropped.

pub mod delivery;
pub mod dispatcher;
pub mod error;
pub mod signature;

pub use delivery::WebhookDelivery;
pub use dispatcher::WebhookDispatcher;
pub use error::{WebhookError, WebhookResult};
pub use signature::{
    DELIVERY_HEADER, EVENT_HEADER, SIGNATURE_HEADER, WebhookSecret, sign, verify_signature,
};

#[cfg(test)]
mod tests;
