//! Publisher seam for transaction events.

use async_trait::async_trait;

use crate::error::BrokerError;
use crate::topology::Outcome;

/// Publishes messages to the topic exchange.
///
/// `publish` returns `Ok(false)` — not an error — when the message was
/// accepted locally but no bound queue matched the routing key, or when
/// the broker could not confirm delivery. Callers on the success path
/// treat that as an operational alert, not a request failure.
#[async_trait]
pub trait EventPublisher: Send + Sync {
    /// Publishes a message with an explicit routing key.
    async fn publish_raw(&self, routing_key: &str, body: &[u8]) -> Result<bool, BrokerError>;

    /// Publishes a transaction event for the given outcome.
    async fn publish(&self, outcome: Outcome, body: &[u8]) -> Result<bool, BrokerError> {
        self.publish_raw(outcome.routing_key(), body).await
    }
}
