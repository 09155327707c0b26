//! Authenticated webhook dispatch onto the event bus.

use super::{
    DELIVERY_HEADER, EVENT_HEADER, SIGNATURE_HEADER, WebhookDelivery, WebhookError, WebhookResult,
    WebhookSecret, verify_signature,
};
use crate::events::{EventBus, PublishReport};
use mockable::Clock;
use reqwest::header::HeaderMap;
use std::sync::Arc;

/// Verifies, maps, and publishes webhook deliveries.
pub struct WebhookDispatcher<C>
where
    C: Clock + Send + Sync,
{
    secret: WebhookSecret,
    bus: EventBus,
    clock: Arc<C>,
}

impl<C> WebhookDispatcher<C>
where
    C: Clock + Send + Sync,
{
    /// Creates a dispatcher publishing onto `bus`.
    #[must_use]
    pub const fn new(secret: WebhookSecret, bus: EventBus, clock: Arc<C>) -> Self {
        Self { secret, bus, clock }
    }

    /// Handles one delivery.
    ///
    /// The signature is checked before the body is parsed. Deliveries that
    /// map to no workflow event return `Ok(None)`.
    ///
    /// # Errors
    ///
    /// Returns the [`WebhookError`] that rejected the delivery, or
    /// [`WebhookError::Publish`] when the bus is unavailable.
    pub async fn dispatch(
        &self,
        headers: &HeaderMap,
        body: &[u8],
    ) -> WebhookResult<Option<PublishReport>> {
        let delivery_id = header(headers, DELIVERY_HEADER).unwrap_or("<none>");
        if let Err(err) = verify_signature(&self.secret, body, header(headers, SIGNATURE_HEADER)) {
            tracing::warn!(delivery_id, error = %err, "webhook rejected");
            return Err(err);
        }
        let event_name = header(headers, EVENT_HEADER).ok_or(WebhookError::MissingEventName)?;
        let delivery = WebhookDelivery::parse(event_name, body)?;
        let Some(event) = delivery.to_event(&*self.clock)? else {
            tracing::debug!(delivery_id, event_name, "webhook ignored");
            return Ok(None);
        };
        tracing::info!(
            delivery_id,
            event_name,
            event_type = %event.event_type(),
            subject = event.subject_id(),
            "webhook accepted"
        );
        let report = self.bus.publish(event).await?;
        Ok(Some(report))
    }
}

fn header<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|value| value.to_str().ok())
}
