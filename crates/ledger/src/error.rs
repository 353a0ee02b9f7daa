//! Ledger error types.

use chrono::{DateTime, Utc};
use common::OrderId;
use thiserror::Error;

use crate::status::OrderStatus;

/// Errors that can occur during ledger operations.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// No order document exists for the given ID.
    #[error("Order not found: {0}")]
    NotFound(OrderId),

    /// An order document already exists for the given ID.
    #[error("Order already exists: {0}")]
    AlreadyExists(OrderId),

    /// The requested status transition is not allowed by the state machine.
    #[error("Invalid status transition: {from} -> {to}")]
    InvalidTransition { from: OrderStatus, to: OrderStatus },

    /// The rental period does not span at least one whole day.
    #[error("Invalid rental period: {start} -> {end}")]
    InvalidRentalPeriod {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },
}

/// Convenience type alias for ledger results.
pub type Result<T> = std::result::Result<T, LedgerError>;
