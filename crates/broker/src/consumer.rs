//! Consumer seam and the park-then-ack policy.

use async_trait::async_trait;

/// What a handler decided about one delivery.
///
/// Every verdict leads to an acknowledgment; `Rejected` and `Failed`
/// additionally park a copy of the message so it stays visible without
/// blocking the queue or looping through redelivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandlerVerdict {
    /// Message validated and side effects applied.
    Processed,

    /// Message failed validation; no side effects were performed.
    Rejected(String),

    /// Message validated but business processing failed. Retries are the
    /// owning service's concern, not the broker's.
    Failed(String),
}

/// Per-message processing logic for one consumer group.
#[async_trait]
pub trait MessageHandler: Send + Sync {
    /// Handles a single delivery. Must not panic on malformed input.
    async fn handle(&self, body: &[u8]) -> HandlerVerdict;
}

/// Wraps a rejected or failed message for the parked queue, preserving
/// the source queue and reason alongside the original payload.
pub fn parked_payload(queue: &str, reason: &str, body: &[u8]) -> Vec<u8> {
    let payload = match serde_json::from_slice::<serde_json::Value>(body) {
        Ok(value) => value,
        Err(_) => serde_json::Value::String(String::from_utf8_lossy(body).into_owned()),
    };

    serde_json::to_vec(&serde_json::json!({
        "queue": queue,
        "reason": reason,
        "payload": payload,
    }))
    .unwrap_or_default()
}
