//! Payment error types.

use common::{OrderId, UserId};
use thiserror::Error;

/// Errors from the payment path.
#[derive(Debug, Error)]
pub enum PaymentError {
    /// The processor refused the charge. This is a business outcome,
    /// not a transport failure: the caller records the order as failed
    /// and publishes an unsuccessful transaction event.
    #[error("Charge declined ({code}): {message}")]
    Declined { code: String, message: String },

    /// The processor was unreachable or answered outside its contract.
    #[error("Payment processor unavailable: {0}")]
    Unavailable(String),

    /// The user has no payment profile in the vault.
    #[error("No payment customer registered for user {0}")]
    NoCustomer(UserId),

    /// A payment profile already exists for the user.
    #[error("Payment customer already registered for user {0}")]
    CustomerExists(UserId),

    /// No charge has been recorded against the order.
    #[error("No transaction recorded for order {0}")]
    TransactionNotFound(OrderId),

    /// The order's charge was already refunded.
    #[error("Transaction for order {0} already refunded")]
    AlreadyRefunded(OrderId),
}

impl From<reqwest::Error> for PaymentError {
    fn from(err: reqwest::Error) -> Self {
        PaymentError::Unavailable(err.to_string())
    }
}
