//! Orchestrator error types.

use common::OrderId;
use directory::DirectoryError;
use ledger::LedgerError;
use payments::PaymentError;
use thiserror::Error;

/// Errors from the confirmation pipeline.
#[derive(Debug, Error)]
pub enum OrchestratorError {
    /// The order does not exist. Surfaced before any charge is placed.
    #[error("Order not found: {0}")]
    OrderNotFound(OrderId),

    /// A ledger operation failed, most notably a rejected status
    /// transition when two confirm calls race the same order.
    #[error(transparent)]
    Ledger(LedgerError),

    /// The payment path failed. A decline here means the failure event
    /// has already been published.
    #[error(transparent)]
    Payment(#[from] PaymentError),

    /// An enrichment lookup failed; the order stays `paid` and no event
    /// is emitted.
    #[error(transparent)]
    Directory(#[from] DirectoryError),

    /// The assembled event was missing required fields, so the publish
    /// was blocked before reaching the broker.
    #[error("Transaction event missing required fields: {}", missing.join(", "))]
    IncompleteEvent { missing: Vec<&'static str> },
}

impl From<LedgerError> for OrchestratorError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::NotFound(order_id) => OrchestratorError::OrderNotFound(order_id),
            other => OrchestratorError::Ledger(other),
        }
    }
}
