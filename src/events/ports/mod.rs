//! Port contracts for event subscribers.

mod handler;

pub use handler::{EventHandler, HandlerError};
