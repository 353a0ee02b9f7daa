//! Directory error types.

use common::{ProductId, UserId};
use thiserror::Error;

/// Errors from collaborator lookups.
#[derive(Debug, Error)]
pub enum DirectoryError {
    /// No product listed under the given ID.
    #[error("Product not found: {0}")]
    ProductNotFound(ProductId),

    /// No user registered under the given ID.
    #[error("User not found: {0}")]
    UserNotFound(UserId),

    /// The collaborator service was unreachable or answered outside its
    /// contract.
    #[error("Upstream service unavailable: {0}")]
    Unavailable(String),
}

impl From<reqwest::Error> for DirectoryError {
    fn from(err: reqwest::Error) -> Self {
        DirectoryError::Unavailable(err.to_string())
    }
}

/// Convenience type alias for directory results.
pub type Result<T> = std::result::Result<T, DirectoryError>;
