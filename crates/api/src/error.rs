//! API error types with HTTP response mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use directory::DirectoryError;
use ledger::LedgerError;
use orchestrator::OrchestratorError;
use payments::PaymentError;

/// API-level error type that maps to HTTP responses.
#[derive(Debug)]
pub enum ApiError {
    /// Resource not found.
    NotFound(String),
    /// Bad request from the client.
    BadRequest(String),
    /// Request conflicts with the resource's current state.
    Conflict(String),
    /// Confirmation pipeline error.
    Orchestrator(OrchestratorError),
    /// Ledger operation error.
    Ledger(LedgerError),
    /// Payment path error.
    Payment(PaymentError),
    /// Internal server error.
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, msg),
            ApiError::Orchestrator(err) => orchestrator_error_to_response(err),
            ApiError::Ledger(err) => ledger_error_to_response(err),
            ApiError::Payment(err) => payment_error_to_response(err),
            ApiError::Internal(msg) => {
                tracing::error!(error = %msg, "internal server error");
                (StatusCode::INTERNAL_SERVER_ERROR, msg)
            }
        };

        let body = serde_json::json!({ "error": message });
        (status, axum::Json(body)).into_response()
    }
}

fn orchestrator_error_to_response(err: OrchestratorError) -> (StatusCode, String) {
    match err {
        OrchestratorError::OrderNotFound(_) => (StatusCode::NOT_FOUND, err.to_string()),
        OrchestratorError::Ledger(inner) => ledger_error_to_response(inner),
        OrchestratorError::Payment(inner) => payment_error_to_response(inner),
        OrchestratorError::Directory(DirectoryError::Unavailable(_)) => {
            (StatusCode::BAD_GATEWAY, err.to_string())
        }
        // A missing product or user behind a stored order is a data
        // inconsistency, not a client mistake.
        OrchestratorError::Directory(_) => (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()),
        OrchestratorError::IncompleteEvent { .. } => {
            (StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
        }
    }
}

fn ledger_error_to_response(err: LedgerError) -> (StatusCode, String) {
    match &err {
        LedgerError::NotFound(_) => (StatusCode::NOT_FOUND, err.to_string()),
        LedgerError::AlreadyExists(_) | LedgerError::InvalidTransition { .. } => {
            (StatusCode::CONFLICT, err.to_string())
        }
        LedgerError::InvalidRentalPeriod { .. } => (StatusCode::BAD_REQUEST, err.to_string()),
    }
}

fn payment_error_to_response(err: PaymentError) -> (StatusCode, String) {
    match &err {
        PaymentError::Declined { .. } => (StatusCode::PAYMENT_REQUIRED, err.to_string()),
        PaymentError::NoCustomer(_) | PaymentError::TransactionNotFound(_) => {
            (StatusCode::NOT_FOUND, err.to_string())
        }
        PaymentError::CustomerExists(_) | PaymentError::AlreadyRefunded(_) => {
            (StatusCode::CONFLICT, err.to_string())
        }
        PaymentError::Unavailable(_) => (StatusCode::BAD_GATEWAY, err.to_string()),
    }
}

impl From<OrchestratorError> for ApiError {
    fn from(err: OrchestratorError) -> Self {
        ApiError::Orchestrator(err)
    }
}

impl From<LedgerError> for ApiError {
    fn from(err: LedgerError) -> Self {
        ApiError::Ledger(err)
    }
}

impl From<PaymentError> for ApiError {
    fn from(err: PaymentError) -> Self {
        ApiError::Payment(err)
    }
}
