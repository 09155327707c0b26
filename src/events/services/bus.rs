//! Priority-ordered, error-isolating publish/subscribe bus.
//!
//! Handlers registered for one event type run sequentially, highest
//! priority first, each in its own task so that an error or a panic is
//! contained. Publishes for different event types share no lock across an
//! `.await` and therefore proceed independently.

use crate::events::{
    domain::{EventType, WorkflowEvent},
    ports::EventHandler,
};
use serde::Serialize;
use std::cmp::Reverse;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, RwLock};
use thiserror::Error;
use tokio::sync::watch;

/// Handle returned by [`EventBus::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sub-{}", self.0)
    }
}

/// Errors returned by the bus itself (never by handlers).
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum EventBusError {
    /// The handler registry lock was poisoned.
    #[error("event bus registry unavailable: {0}")]
    RegistryUnavailable(String),

    /// The readiness channel closed before the bus became ready.
    #[error("event bus closed before becoming ready")]
    Closed,
}

/// A handler that failed while processing an event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HandlerFailure {
    /// Handler name.
    pub handler: String,
    /// Failure description, including panics.
    pub message: String,
}

/// Outcome of publishing a single event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PublishReport {
    /// Event type that was published.
    pub event_type: EventType,
    /// Handlers that completed successfully.
    pub delivered: usize,
    /// Handlers that returned an error or panicked.
    pub failures: Vec<HandlerFailure>,
}

impl PublishReport {
    const fn empty(event_type: EventType) -> Self {
        Self {
            event_type,
            delivered: 0,
            failures: Vec::new(),
        }
    }

    /// Returns the number of handlers the event reached.
    #[must_use]
    pub fn attempted(&self) -> usize {
        self.delivered + self.failures.len()
    }

    /// Returns whether every handler completed successfully.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

struct Subscription {
    id: SubscriptionId,
    priority: i32,
    handler: Arc<dyn EventHandler>,
}

#[derive(Default)]
struct Registry {
    next_id: u64,
    by_type: HashMap<EventType, Vec<Subscription>>,
}

struct BusInner {
    registry: RwLock<Registry>,
    ready: watch::Sender<bool>,
}

/// In-process event bus.
///
/// Clone-friendly via an internal `Arc`; all clones share one registry.
/// The bus has no persistence or replay: an event published for a type with
/// no handlers is dropped. Callers that need reliable fan-out wait on
/// [`Self::ready`] before publishing.
#[derive(Clone)]
pub struct EventBus {
    inner: Arc<BusInner>,
}

impl EventBus {
    /// Creates an empty bus that is not yet ready.
    #[must_use]
    pub fn new() -> Self {
        let (ready, _) = watch::channel(false);
        Self {
            inner: Arc::new(BusInner {
                registry: RwLock::new(Registry::default()),
                ready,
            }),
        }
    }

    /// Registers `handler` for `event_type`.
    ///
    /// Handlers with equal priority run in registration order.
    ///
    /// # Errors
    ///
    /// Returns [`EventBusError::RegistryUnavailable`] when the registry lock
    /// is poisoned.
    pub fn subscribe(
        &self,
        event_type: EventType,
        handler: Arc<dyn EventHandler>,
        priority: i32,
    ) -> Result<SubscriptionId, EventBusError> {
        let mut registry = self.inner.registry.write().map_err(registry_unavailable)?;
        let id = SubscriptionId(registry.next_id);
        registry.next_id += 1;

        tracing::debug!(
            event_type = %event_type,
            handler = handler.name(),
            priority,
            subscription = %id,
            "handler subscribed"
        );
        let subscriptions = registry.by_type.entry(event_type).or_default();
        subscriptions.push(Subscription {
            id,
            priority,
            handler,
        });
        subscriptions.sort_by_key(|subscription| (Reverse(subscription.priority), subscription.id));
        Ok(id)
    }

    /// Removes a subscription. Returns whether it existed.
    ///
    /// # Errors
    ///
    /// Returns [`EventBusError::RegistryUnavailable`] when the registry lock
    /// is poisoned.
    pub fn unsubscribe(&self, id: SubscriptionId) -> Result<bool, EventBusError> {
        let mut registry = self.inner.registry.write().map_err(registry_unavailable)?;
        let mut removed = false;
        for subscriptions in registry.by_type.values_mut() {
            let before = subscriptions.len();
            subscriptions.retain(|subscription| subscription.id != id);
            removed |= subscriptions.len() != before;
        }
        Ok(removed)
    }

    /// Returns the number of handlers registered for `event_type`.
    ///
    /// # Errors
    ///
    /// Returns [`EventBusError::RegistryUnavailable`] when the registry lock
    /// is poisoned.
    pub fn handler_count(&self, event_type: EventType) -> Result<usize, EventBusError> {
        let registry = self.inner.registry.read().map_err(registry_unavailable)?;
        Ok(registry.by_type.get(&event_type).map_or(0, Vec::len))
    }

    /// Marks the bus ready; wakes every [`Self::ready`] waiter.
    pub fn mark_ready(&self) {
        self.inner.ready.send_replace(true);
    }

    /// Returns whether [`Self::mark_ready`] has been called.
    #[must_use]
    pub fn is_ready(&self) -> bool {
        *self.inner.ready.borrow()
    }

    /// Resolves once the bus has been marked ready.
    ///
    /// # Errors
    ///
    /// Returns [`EventBusError::Closed`] if the readiness channel closes
    /// first.
    pub async fn ready(&self) -> Result<(), EventBusError> {
        let mut receiver = self.inner.ready.subscribe();
        receiver
            .wait_for(|ready| *ready)
            .await
            .map(|_| ())
            .map_err(|_| EventBusError::Closed)
    }

    /// Delivers `event` to every handler registered for its type.
    ///
    /// Resolves only after each handler has completed or failed. Handler
    /// errors and panics are logged and recorded in the report; they never
    /// stop delivery to subsequent handlers.
    ///
    /// # Errors
    ///
    /// Returns [`EventBusError::RegistryUnavailable`] when the registry lock
    /// is poisoned.
    pub async fn publish(&self, event: WorkflowEvent) -> Result<PublishReport, EventBusError> {
        let event_type = event.event_type();
        let handlers = self.handlers_for(event_type)?;
        let mut report = PublishReport::empty(event_type);
        if handlers.is_empty() {
            tracing::debug!(
                event_type = %event_type,
                event_id = %event.id(),
                "no handlers registered, event dropped"
            );
            return Ok(report);
        }

        let shared = Arc::new(event);
        for handler in handlers {
            let task_event = Arc::clone(&shared);
            let task_handler = Arc::clone(&handler);
            let outcome = tokio::spawn(async move { task_handler.handle(&task_event).await }).await;

            let failure = match outcome {
                Ok(Ok(())) => None,
                Ok(Err(err)) => Some(err.message().to_owned()),
                Err(join_err) if join_err.is_panic() => {
                    Some(format!("handler panicked: {join_err}"))
                }
                Err(join_err) => Some(format!("handler task aborted: {join_err}")),
            };

            match failure {
                None => report.delivered += 1,
                Some(message) => {
                    tracing::error!(
                        event_type = %event_type,
                        event_id = %shared.id(),
                        handler = handler.name(),
                        error = %message,
                        "event handler failed"
                    );
                    report.failures.push(HandlerFailure {
                        handler: handler.name().to_owned(),
                        message,
                    });
                }
            }
        }
        Ok(report)
    }

    fn handlers_for(
        &self,
        event_type: EventType,
    ) -> Result<Vec<Arc<dyn EventHandler>>, EventBusError> {
        let registry = self.inner.registry.read().map_err(registry_unavailable)?;
        Ok(registry
            .by_type
            .get(&event_type)
            .map(|subscriptions| {
                subscriptions
                    .iter()
                    .map(|subscription| Arc::clone(&subscription.handler))
                    .collect()
            })
            .unwrap_or_default())
    }
}

fn registry_unavailable(err: impl fmt::Display) -> EventBusError {
    EventBusError::RegistryUnavailable(err.to_string())
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("ready", &self.is_ready())
            .finish_non_exhaustive()
    }
}
