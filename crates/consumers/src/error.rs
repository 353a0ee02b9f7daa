//! Consumer-side error types.

use thiserror::Error;

/// Errors from the shipping-label provider.
#[derive(Debug, Error)]
pub enum LabelError {
    /// The provider was unreachable or answered outside its contract.
    #[error("Label provider unavailable: {0}")]
    Unavailable(String),

    /// The provider rejected the shipment or label request.
    #[error("Label request failed: {0}")]
    Failed(String),
}

impl From<reqwest::Error> for LabelError {
    fn from(err: reqwest::Error) -> Self {
        LabelError::Unavailable(err.to_string())
    }
}
