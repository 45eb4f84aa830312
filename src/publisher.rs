//! Publishes domain events to NATS when a connection is configured.

use crate::domain::events::ShopEvent;

#[derive(Clone, Debug, Default)]
pub struct EventPublisher {
    nats: Option<async_nats::Client>,
}

impl EventPublisher {
    pub const SUBJECT_PREFIX: &'static str = "plantshop";

    pub fn new(nats: Option<async_nats::Client>) -> Self { Self { nats } }

    /// Publishing is best effort: failures are logged, never returned.
    pub async fn publish(&self, event: ShopEvent) {
        let subject = format!("{}.{}", Self::SUBJECT_PREFIX, event.kind());
        let Some(client) = &self.nats else {
            tracing::debug!(%subject, ?event, "event not published, no NATS connection");
            return;
        };
        let payload = match serde_json::to_vec(&event) {
            Ok(p) => p,
            Err(e) => {
                tracing::warn!(%subject, error = %e, "failed to serialize event");
                return;
            }
        };
        if let Err(e) = client.publish(subject.clone(), payload.into()).await {
            tracing::warn!(%subject, error = %e, "failed to publish event");
        }
    }
}
