//! Message broker topology and clients.
//!
//! A single topic exchange carries transaction events. Producers publish
//! with `transaction.successful` / `transaction.unsuccessful` routing
//! keys; each consumer group binds its own durable queue to the shared
//! key, so one published event fans out to every group independently.
//!
//! Two backends implement the same seams: [`InMemoryBroker`] for
//! standalone mode and tests, and [`AmqpBroker`] for a real AMQP broker.

pub mod amqp;
pub mod consumer;
pub mod error;
pub mod memory;
pub mod publisher;
pub mod topology;

pub use amqp::AmqpBroker;
pub use consumer::{HandlerVerdict, MessageHandler, parked_payload};
pub use error::BrokerError;
pub use memory::InMemoryBroker;
pub use publisher::EventPublisher;
pub use topology::{Outcome, RetryPolicy};
