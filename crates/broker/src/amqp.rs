//! AMQP broker backend.
//!
//! Owns its connection as an explicit resource: the channel is acquired
//! once at startup behind a guarded handle and re-acquired only through
//! [`AmqpBroker::reconnect`]. Topology declaration is idempotent and runs
//! on every (re)connect, so each service bootstraps its own bindings.

use async_trait::async_trait;
use futures_util::StreamExt;
use lapin::options::{
    BasicAckOptions, BasicConsumeOptions, BasicPublishOptions, BasicQosOptions,
    ConfirmSelectOptions, ExchangeDeclareOptions, QueueBindOptions, QueueDeclareOptions,
};
use lapin::publisher_confirm::Confirmation;
use lapin::types::FieldTable;
use lapin::{BasicProperties, Channel, Connection, ConnectionProperties, ExchangeKind};
use tokio::sync::Mutex;

use crate::consumer::{HandlerVerdict, MessageHandler, parked_payload};
use crate::error::BrokerError;
use crate::publisher::EventPublisher;
use crate::topology::{BINDINGS, EXCHANGE, ROUTING_KEY_PARKED, RetryPolicy};

/// Broker client backed by a real AMQP broker.
pub struct AmqpBroker {
    url: String,
    policy: RetryPolicy,
    channel: Mutex<Channel>,
}

impl AmqpBroker {
    /// Connects with bounded retry and declares the full topology.
    pub async fn connect(url: impl Into<String>, policy: RetryPolicy) -> Result<Self, BrokerError> {
        let url = url.into();
        let channel = Self::open_channel(&url, policy).await?;
        declare_topology(&channel).await?;

        Ok(Self {
            url,
            policy,
            channel: Mutex::new(channel),
        })
    }

    /// Drops the current channel and establishes a fresh one, re-running
    /// the topology declaration.
    pub async fn reconnect(&self) -> Result<(), BrokerError> {
        let channel = Self::open_channel(&self.url, self.policy).await?;
        declare_topology(&channel).await?;
        *self.channel.lock().await = channel;
        tracing::info!(url = %self.url, "broker channel re-established");
        Ok(())
    }

    async fn open_channel(url: &str, policy: RetryPolicy) -> Result<Channel, BrokerError> {
        for attempt in 1..=policy.max_attempts {
            match Connection::connect(url, ConnectionProperties::default()).await {
                Ok(connection) => {
                    let channel = connection.create_channel().await?;
                    channel
                        .confirm_select(ConfirmSelectOptions::default())
                        .await?;
                    tracing::info!(url, attempt, "connected to broker");
                    return Ok(channel);
                }
                Err(e) => {
                    tracing::warn!(
                        url,
                        attempt,
                        max_attempts = policy.max_attempts,
                        error = %e,
                        "broker connection failed"
                    );
                    if attempt < policy.max_attempts {
                        tokio::time::sleep(policy.delay_for(attempt)).await;
                    }
                }
            }
        }

        Err(BrokerError::ConnectExhausted {
            attempts: policy.max_attempts,
        })
    }

    /// Runs a consumer loop on one queue with a prefetch count of one.
    ///
    /// Every delivery is acknowledged after handling; rejected and failed
    /// messages are first republished to the parked queue.
    pub async fn run_consumer<H: MessageHandler>(
        &self,
        queue: &str,
        handler: H,
    ) -> Result<(), BrokerError> {
        let channel = self.channel.lock().await.clone();
        channel.basic_qos(1, BasicQosOptions::default()).await?;

        let tag = format!("{queue}-consumer");
        let mut consumer = channel
            .basic_consume(
                queue,
                &tag,
                BasicConsumeOptions::default(),
                FieldTable::default(),
            )
            .await?;

        tracing::info!(queue, "consumer loop started");

        while let Some(delivery) = consumer.next().await {
            let delivery = delivery?;
            metrics::counter!("consumer_messages_received", "queue" => queue.to_string())
                .increment(1);

            match handler.handle(&delivery.data).await {
                HandlerVerdict::Processed => {
                    metrics::counter!("consumer_messages_processed", "queue" => queue.to_string())
                        .increment(1);
                }
                HandlerVerdict::Rejected(reason) | HandlerVerdict::Failed(reason) => {
                    tracing::warn!(queue, %reason, "parking message");
                    metrics::counter!("consumer_messages_parked", "queue" => queue.to_string())
                        .increment(1);
                    let parked = parked_payload(queue, &reason, &delivery.data);
                    self.publish_raw(ROUTING_KEY_PARKED, &parked).await?;
                }
            }

            delivery.ack(BasicAckOptions::default()).await?;
        }

        tracing::info!(queue, "consumer loop stopped");
        Ok(())
    }
}

#[async_trait]
impl EventPublisher for AmqpBroker {
    async fn publish_raw(&self, routing_key: &str, body: &[u8]) -> Result<bool, BrokerError> {
        let channel = self.channel.lock().await.clone();

        let properties = BasicProperties::default()
            .with_content_type("application/json".into())
            .with_delivery_mode(2); // persistent

        let confirm = channel
            .basic_publish(
                EXCHANGE,
                routing_key,
                BasicPublishOptions {
                    mandatory: true,
                    ..Default::default()
                },
                body,
                properties,
            )
            .await?
            .await?;

        match confirm {
            // An ack carrying a returned message means no queue was
            // bound to the routing key.
            Confirmation::Ack(Some(_)) | Confirmation::Nack(_) => {
                tracing::warn!(routing_key, "message unroutable or not confirmed");
                Ok(false)
            }
            Confirmation::Ack(None) | Confirmation::NotRequested => Ok(true),
        }
    }
}

/// Declares the exchange, queues, and bindings. Safe to repeat.
pub async fn declare_topology(channel: &Channel) -> Result<(), BrokerError> {
    channel
        .exchange_declare(
            EXCHANGE,
            ExchangeKind::Topic,
            ExchangeDeclareOptions {
                durable: true,
                ..Default::default()
            },
            FieldTable::default(),
        )
        .await?;

    for (queue, routing_key) in BINDINGS {
        channel
            .queue_declare(
                queue,
                QueueDeclareOptions {
                    durable: true,
                    ..Default::default()
                },
                FieldTable::default(),
            )
            .await?;

        channel
            .queue_bind(
                queue,
                EXCHANGE,
                routing_key,
                QueueBindOptions::default(),
                FieldTable::default(),
            )
            .await?;

        tracing::debug!(queue, routing_key, "queue bound");
    }

    Ok(())
}
