//! In-memory broker for standalone mode and tests.
//!
//! Faithful to the topic-exchange model: named queues bind to routing
//! keys, a publish fans out to every bound queue, and an unroutable
//! publish reports `false`. Each queue's consumer side can be taken
//! exactly once, mirroring the one-loop-per-consumer-group deployment.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender, unbounded_channel};

use crate::consumer::{HandlerVerdict, MessageHandler, parked_payload};
use crate::error::BrokerError;
use crate::publisher::EventPublisher;
use crate::topology::{BINDINGS, ROUTING_KEY_PARKED};

struct QueueState {
    routing_key: String,
    sender: UnboundedSender<Vec<u8>>,
    receiver: Option<UnboundedReceiver<Vec<u8>>>,
}

#[derive(Default)]
struct Inner {
    queues: HashMap<String, QueueState>,
    published: Vec<(String, Vec<u8>)>,
}

/// Thread-safe in-memory topic broker.
#[derive(Clone, Default)]
pub struct InMemoryBroker {
    inner: Arc<Mutex<Inner>>,
}

impl InMemoryBroker {
    /// Creates a broker with the standard topology already declared.
    pub fn new() -> Self {
        let broker = Self::default();
        for (queue, key) in BINDINGS {
            broker.bind(queue, key);
        }
        broker
    }

    /// Declares a queue and binds it to a routing key. Idempotent.
    pub fn bind(&self, queue: &str, routing_key: &str) {
        let mut inner = self.inner.lock().unwrap();
        inner.queues.entry(queue.to_string()).or_insert_with(|| {
            let (sender, receiver) = unbounded_channel();
            QueueState {
                routing_key: routing_key.to_string(),
                sender,
                receiver: Some(receiver),
            }
        });
    }

    /// Takes the consume side of a queue. Each queue supports exactly
    /// one consumer loop.
    pub fn take_consumer(&self, queue: &str) -> Result<UnboundedReceiver<Vec<u8>>, BrokerError> {
        let mut inner = self.inner.lock().unwrap();
        let state = inner
            .queues
            .get_mut(queue)
            .ok_or_else(|| BrokerError::UnknownQueue(queue.to_string()))?;
        state
            .receiver
            .take()
            .ok_or_else(|| BrokerError::ConsumerTaken(queue.to_string()))
    }

    /// Runs a consumer loop for one queue: deliveries are processed one
    /// at a time, rejected/failed messages are parked, and every message
    /// is acknowledged by moving past it.
    pub async fn run_consumer<H: MessageHandler>(
        &self,
        queue: &str,
        handler: H,
    ) -> Result<(), BrokerError> {
        let mut receiver = self.take_consumer(queue)?;
        tracing::info!(queue, "consumer loop started");

        while let Some(body) = receiver.recv().await {
            metrics::counter!("consumer_messages_received", "queue" => queue.to_string())
                .increment(1);
            match handler.handle(&body).await {
                HandlerVerdict::Processed => {
                    metrics::counter!("consumer_messages_processed", "queue" => queue.to_string())
                        .increment(1);
                }
                HandlerVerdict::Rejected(reason) => {
                    tracing::warn!(queue, %reason, "message rejected, parking");
                    metrics::counter!("consumer_messages_parked", "queue" => queue.to_string())
                        .increment(1);
                    let parked = parked_payload(queue, &reason, &body);
                    self.publish_raw(ROUTING_KEY_PARKED, &parked).await?;
                }
                HandlerVerdict::Failed(reason) => {
                    tracing::error!(queue, %reason, "message processing failed, parking");
                    metrics::counter!("consumer_messages_parked", "queue" => queue.to_string())
                        .increment(1);
                    let parked = parked_payload(queue, &reason, &body);
                    self.publish_raw(ROUTING_KEY_PARKED, &parked).await?;
                }
            }
        }

        tracing::info!(queue, "consumer loop stopped");
        Ok(())
    }

    /// Returns every message published so far, with its routing key.
    pub fn published(&self) -> Vec<(String, Vec<u8>)> {
        self.inner.lock().unwrap().published.clone()
    }

    /// Returns the number of messages published with the given key.
    pub fn published_count(&self, routing_key: &str) -> usize {
        self.inner
            .lock()
            .unwrap()
            .published
            .iter()
            .filter(|(key, _)| key == routing_key)
            .count()
    }
}

#[async_trait]
impl EventPublisher for InMemoryBroker {
    async fn publish_raw(&self, routing_key: &str, body: &[u8]) -> Result<bool, BrokerError> {
        let mut inner = self.inner.lock().unwrap();
        inner
            .published
            .push((routing_key.to_string(), body.to_vec()));

        let mut routed = false;
        for state in inner.queues.values() {
            if state.routing_key == routing_key {
                // Receiver may have been taken and dropped; the binding
                // still counts as routed.
                let _ = state.sender.send(body.to_vec());
                routed = true;
            }
        }
        Ok(routed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::topology::{Outcome, QUEUE_INVENTORY, QUEUE_PARKED, QUEUE_SHIPPING};
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingHandler {
        verdict: HandlerVerdict,
        seen: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl MessageHandler for CountingHandler {
        async fn handle(&self, _body: &[u8]) -> HandlerVerdict {
            self.seen.fetch_add(1, Ordering::SeqCst);
            self.verdict.clone()
        }
    }

    #[tokio::test]
    async fn test_publish_fans_out_to_all_bound_queues() {
        let broker = InMemoryBroker::new();
        let mut shipping = broker.take_consumer(QUEUE_SHIPPING).unwrap();
        let mut inventory = broker.take_consumer(QUEUE_INVENTORY).unwrap();

        let routed = broker
            .publish(Outcome::Successful, b"{\"orderID\":\"o1\"}")
            .await
            .unwrap();
        assert!(routed);

        assert_eq!(shipping.recv().await.unwrap(), b"{\"orderID\":\"o1\"}");
        assert_eq!(inventory.recv().await.unwrap(), b"{\"orderID\":\"o1\"}");
    }

    #[tokio::test]
    async fn test_unroutable_publish_returns_false() {
        let broker = InMemoryBroker::default();
        let routed = broker
            .publish(Outcome::Successful, b"{}")
            .await
            .unwrap();
        assert!(!routed);
    }

    #[tokio::test]
    async fn test_consumer_can_only_be_taken_once() {
        let broker = InMemoryBroker::new();
        broker.take_consumer(QUEUE_SHIPPING).unwrap();
        let err = broker.take_consumer(QUEUE_SHIPPING).unwrap_err();
        assert!(matches!(err, BrokerError::ConsumerTaken(_)));
    }

    #[tokio::test]
    async fn test_rejected_message_is_parked() {
        let broker = InMemoryBroker::new();
        let mut parked = broker.take_consumer(QUEUE_PARKED).unwrap();
        let seen = Arc::new(AtomicUsize::new(0));

        let handler = CountingHandler {
            verdict: HandlerVerdict::Rejected("missing orderID".to_string()),
            seen: seen.clone(),
        };

        broker.publish(Outcome::Successful, b"{}").await.unwrap();

        let broker_for_loop = broker.clone();
        let task = tokio::spawn(async move {
            broker_for_loop
                .run_consumer(QUEUE_SHIPPING, handler)
                .await
                .unwrap();
        });

        let body = parked.recv().await.unwrap();
        let value: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(value["queue"], QUEUE_SHIPPING);
        assert_eq!(value["reason"], "missing orderID");
        assert_eq!(seen.load(Ordering::SeqCst), 1);

        task.abort();
    }

    #[tokio::test]
    async fn test_published_count_tracks_routing_keys() {
        let broker = InMemoryBroker::new();
        broker.publish(Outcome::Successful, b"{}").await.unwrap();
        broker.publish(Outcome::Unsuccessful, b"{}").await.unwrap();
        broker.publish(Outcome::Unsuccessful, b"{}").await.unwrap();

        assert_eq!(broker.published_count("transaction.successful"), 1);
        assert_eq!(broker.published_count("transaction.unsuccessful"), 2);
    }
}
