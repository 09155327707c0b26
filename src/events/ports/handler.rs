//! Subscriber contract for the event bus.

use crate::events::domain::WorkflowEvent;
use async_trait::async_trait;
use thiserror::Error;

/// A subscriber registered on the event bus for one or more event types.
///
/// Handlers are isolated from each other: an error or panic in one handler
/// is logged by the bus and never prevents delivery to the next.
#[async_trait]
pub trait EventHandler: Send + Sync {
    /// Short name used in logs and publish reports.
    fn name(&self) -> &str;

    /// Handles a published event.
    ///
    /// # Errors
    ///
    /// Returns [`HandlerError`] when the handler could not process the event.
    async fn handle(&self, event: &WorkflowEvent) -> Result<(), HandlerError>;
}

/// Failure reported by an event handler.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{message}")]
pub struct HandlerError {
    message: String,
}

impl HandlerError {
    /// Creates a handler error with a description.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// Wraps any error as a handler failure.
    #[must_use]
    pub fn from_error(err: &(dyn std::error::Error + Send + Sync)) -> Self {
        Self::new(err.to_string())
    }

    /// Returns the failure description.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}
