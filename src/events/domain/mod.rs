//! Workflow event types.
//!
//! Payloads form a closed sum type; subscribers pattern-match on a known
//! shape instead of inspecting untyped data.

mod event;

pub use event::{EventId, EventPayload, EventType, WorkflowEvent};
