//! Publishes domain events to NATS when a connection is configured.

use crate::domain::DomainEvent;

#[derive(Clone, Default)]
pub struct EventPublisher {
    nats: Option<async_nats::Client>,
}

impl EventPublisher {
    pub fn new(nats: Option<async_nats::Client>) -> Self {
        Self { nats }
    }

    /// Log-only publisher.
    pub fn disabled() -> Self {
        Self::default()
    }

    /// Failures are logged and swallowed; a lost notification never fails a request.
    pub async fn publish(&self, events: Vec<DomainEvent>) {
        for event in events {
            let subject = event.subject();
            tracing::debug!(%subject, ?event, "domain event");
            let Some(client) = &self.nats else { continue };
            let payload = match serde_json::to_vec(&event) {
                Ok(payload) => payload,
                Err(e) => {
                    tracing::warn!(%subject, error = %e, "failed to encode domain event");
                    continue;
                }
            };
            if let Err(e) = client.publish(subject.clone(), payload.into()).await {
                tracing::warn!(%subject, error = %e, "failed to publish domain event");
            }
        }
    }
}
