//! In-process publish/subscribe for workflow events.
//!
//! The bus is the single fan-out point through which the phase state
//! machine, quality checks, and notification subscribers observe domain
//! events. The module follows hexagonal architecture:
//!
//! - Event types in [`domain`]
//! - The subscriber contract in [`ports`]
//! - The bus itself in [`services`]

pub mod domain;
pub mod ports;
pub mod services;

#[cfg(test)]
mod tests;

pub use domain::{EventId, EventPayload, EventType, WorkflowEvent};
pub use ports::{EventHandler, HandlerError};
pub use services::{EventBus, EventBusError, HandlerFailure, PublishReport, SubscriptionId};
