//! Exchange, queue, and routing-key topology.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// The single topic exchange all transaction events flow through.
pub const EXCHANGE: &str = "order_exchange";

/// Queue for the shipping label generator.
pub const QUEUE_SHIPPING: &str = "successful_transaction_shipping";

/// Queue for the inventory availability updater.
pub const QUEUE_INVENTORY: &str = "successful_transaction_inventory";

/// Queue for the payment-failure notification dispatcher.
pub const QUEUE_NOTIFICATION: &str = "unsuccessful_transaction_queue";

/// Dead-letter queue for messages a consumer rejected or failed on.
pub const QUEUE_PARKED: &str = "transaction_parked";

/// Routing key for parked messages.
pub const ROUTING_KEY_PARKED: &str = "transaction.parked";

/// Every queue binding declared at bootstrap: (queue, routing key).
///
/// The shipping and inventory queues deliberately share a routing key;
/// distinct queue names are what produce the fan-out.
pub const BINDINGS: &[(&str, &str)] = &[
    (QUEUE_SHIPPING, "transaction.successful"),
    (QUEUE_INVENTORY, "transaction.successful"),
    (QUEUE_NOTIFICATION, "transaction.unsuccessful"),
    (QUEUE_PARKED, ROUTING_KEY_PARKED),
];

/// Payment outcome, encoded on the wire as the routing key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Successful,
    Unsuccessful,
}

impl Outcome {
    /// Returns the `transaction.<outcome>` routing key.
    pub fn routing_key(&self) -> &'static str {
        match self {
            Outcome::Successful => "transaction.successful",
            Outcome::Unsuccessful => "transaction.unsuccessful",
        }
    }

    /// Returns the outcome name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::Successful => "successful",
            Outcome::Unsuccessful => "unsuccessful",
        }
    }
}

impl std::fmt::Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Bounded-retry policy for broker connection bootstrap.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Attempt ceiling; the connection fails hard after this many tries.
    pub max_attempts: u32,
    /// Delay before the first retry.
    pub initial_delay: Duration,
}

impl RetryPolicy {
    /// Returns the backoff delay before the given retry attempt
    /// (1-based). Escalates linearly with the attempt number.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.initial_delay * attempt
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 10,
            initial_delay: Duration::from_secs(3),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_routing_keys() {
        assert_eq!(Outcome::Successful.routing_key(), "transaction.successful");
        assert_eq!(
            Outcome::Unsuccessful.routing_key(),
            "transaction.unsuccessful"
        );
    }

    #[test]
    fn test_fanout_queues_share_routing_key() {
        let bound_to_success: Vec<&str> = BINDINGS
            .iter()
            .filter(|(_, key)| *key == Outcome::Successful.routing_key())
            .map(|(queue, _)| *queue)
            .collect();
        assert_eq!(bound_to_success, vec![QUEUE_SHIPPING, QUEUE_INVENTORY]);
    }

    #[test]
    fn test_retry_backoff_escalates() {
        let policy = RetryPolicy {
            max_attempts: 3,
            initial_delay: Duration::from_millis(100),
        };
        assert_eq!(policy.delay_for(1), Duration::from_millis(100));
        assert_eq!(policy.delay_for(3), Duration::from_millis(300));
    }
}
