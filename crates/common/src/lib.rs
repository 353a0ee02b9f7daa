//! Shared types for the rental marketplace services.

pub mod types;

pub use types::{Money, MoneyError, OrderId, ProductId, UserId};
