//! AMQP integration tests
//!
//! These tests use a shared RabbitMQ container for efficiency.
//! Run with:
//!
//! ```bash
//! cargo test -p broker --test amqp_integration -- --test-threads=1
//! ```

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use broker::topology::{QUEUE_INVENTORY, QUEUE_NOTIFICATION, QUEUE_PARKED, QUEUE_SHIPPING};
use broker::{AmqpBroker, EventPublisher, HandlerVerdict, MessageHandler, Outcome, RetryPolicy};
use testcontainers::{ContainerAsync, runners::AsyncRunner};
use testcontainers_modules::rabbitmq::RabbitMq;
use tokio::sync::OnceCell;
use tokio::sync::mpsc::{UnboundedSender, unbounded_channel};

/// Shared container info - container stays alive for all tests
struct ContainerInfo {
    #[allow(dead_code)] // Container must stay alive for tests
    container: ContainerAsync<RabbitMq>,
    amqp_url: String,
}

/// Global shared container
static CONTAINER: OnceCell<Arc<ContainerInfo>> = OnceCell::const_new();

async fn get_container_info() -> Arc<ContainerInfo> {
    CONTAINER
        .get_or_init(|| async {
            let container = RabbitMq::default().start().await.unwrap();

            let host = container.get_host().await.unwrap();
            let port = container.get_host_port_ipv4(5672).await.unwrap();
            let amqp_url = format!("amqp://guest:guest@{}:{}", host, port);

            Arc::new(ContainerInfo {
                container,
                amqp_url,
            })
        })
        .await
        .clone()
}

fn fast_policy() -> RetryPolicy {
    RetryPolicy {
        max_attempts: 20,
        initial_delay: Duration::from_millis(500),
    }
}

struct ForwardingHandler {
    sender: UnboundedSender<Vec<u8>>,
    verdict: HandlerVerdict,
}

#[async_trait]
impl MessageHandler for ForwardingHandler {
    async fn handle(&self, body: &[u8]) -> HandlerVerdict {
        let _ = self.sender.send(body.to_vec());
        self.verdict.clone()
    }
}

#[tokio::test]
async fn test_publish_reaches_bound_queue() {
    let info = get_container_info().await;
    let broker = Arc::new(
        AmqpBroker::connect(info.amqp_url.clone(), fast_policy())
            .await
            .unwrap(),
    );

    let (sender, mut receiver) = unbounded_channel();
    let consumer_broker = broker.clone();
    let task = tokio::spawn(async move {
        consumer_broker
            .run_consumer(
                QUEUE_SHIPPING,
                ForwardingHandler {
                    sender,
                    verdict: HandlerVerdict::Processed,
                },
            )
            .await
    });

    let routed = broker
        .publish(Outcome::Successful, br#"{"orderID":"amqp-1"}"#)
        .await
        .unwrap();
    assert!(routed);

    let body = tokio::time::timeout(Duration::from_secs(10), receiver.recv())
        .await
        .expect("no delivery within timeout")
        .unwrap();
    let value: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(value["orderID"], "amqp-1");

    task.abort();
}

#[tokio::test]
async fn test_fanout_to_second_queue() {
    let info = get_container_info().await;
    let broker = Arc::new(
        AmqpBroker::connect(info.amqp_url.clone(), fast_policy())
            .await
            .unwrap(),
    );

    let (sender, mut receiver) = unbounded_channel();
    let consumer_broker = broker.clone();
    let task = tokio::spawn(async move {
        consumer_broker
            .run_consumer(
                QUEUE_INVENTORY,
                ForwardingHandler {
                    sender,
                    verdict: HandlerVerdict::Processed,
                },
            )
            .await
    });

    broker
        .publish(Outcome::Successful, br#"{"orderID":"amqp-2"}"#)
        .await
        .unwrap();

    let body = tokio::time::timeout(Duration::from_secs(10), receiver.recv())
        .await
        .expect("no delivery within timeout")
        .unwrap();
    let value: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(value["orderID"], "amqp-2");

    task.abort();
}

#[tokio::test]
async fn test_unbound_routing_key_is_unroutable() {
    let info = get_container_info().await;
    let broker = AmqpBroker::connect(info.amqp_url.clone(), fast_policy())
        .await
        .unwrap();

    let routed = broker
        .publish_raw("transaction.nobody-listens", b"{}")
        .await
        .unwrap();
    assert!(!routed);
}

#[tokio::test]
async fn test_rejected_message_lands_on_parked_queue() {
    let info = get_container_info().await;
    let broker = Arc::new(
        AmqpBroker::connect(info.amqp_url.clone(), fast_policy())
            .await
            .unwrap(),
    );

    let (parked_sender, mut parked_receiver) = unbounded_channel();
    let parked_broker = broker.clone();
    let parked_task = tokio::spawn(async move {
        parked_broker
            .run_consumer(
                QUEUE_PARKED,
                ForwardingHandler {
                    sender: parked_sender,
                    verdict: HandlerVerdict::Processed,
                },
            )
            .await
    });

    let (sender, _receiver) = unbounded_channel();
    let rejecting_broker = broker.clone();
    let rejecting_task = tokio::spawn(async move {
        rejecting_broker
            .run_consumer(
                QUEUE_NOTIFICATION,
                ForwardingHandler {
                    sender,
                    verdict: HandlerVerdict::Rejected("missing fields".to_string()),
                },
            )
            .await
    });

    broker
        .publish(Outcome::Unsuccessful, br#"{"orderID":"amqp-3"}"#)
        .await
        .unwrap();

    let body = tokio::time::timeout(Duration::from_secs(10), parked_receiver.recv())
        .await
        .expect("no parked message within timeout")
        .unwrap();
    let value: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(value["reason"], "missing fields");
    assert_eq!(value["payload"]["orderID"], "amqp-3");

    parked_task.abort();
    rejecting_task.abort();
}
