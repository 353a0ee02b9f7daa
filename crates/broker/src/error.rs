//! Broker error types.

use thiserror::Error;

/// Errors that can occur during broker operations.
#[derive(Debug, Error)]
pub enum BrokerError {
    /// Connection bootstrap gave up after the bounded retry ceiling.
    #[error("Could not connect to broker after {attempts} attempts")]
    ConnectExhausted { attempts: u32 },

    /// Underlying AMQP protocol error.
    #[error("AMQP error: {0}")]
    Amqp(#[from] lapin::Error),

    /// The queue was never declared on this broker handle.
    #[error("Unknown queue: {0}")]
    UnknownQueue(String),

    /// The queue's consumer side has already been taken.
    #[error("Queue {0} already has a consumer attached")]
    ConsumerTaken(String),
}

/// Convenience type alias for broker results.
pub type Result<T> = std::result::Result<T, BrokerError>;
