//! Event bus service.

mod bus;

pub use bus::{EventBus, EventBusError, HandlerFailure, PublishReport, SubscriptionId};
