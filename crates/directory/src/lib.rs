//! Collaborator contracts for cross-service lookups.
//!
//! The orchestrator enriches transaction events from three upstream
//! sources: the product directory, the user directory, and (for emails)
//! the notification service. Each is a trait with an in-memory
//! implementation for standalone mode and tests; the genuinely external
//! ones also ship an HTTP client.

pub mod error;
pub mod http;
pub mod notify;
pub mod product;
pub mod user;

pub use error::DirectoryError;
pub use http::{HttpNotifier, HttpUserDirectory};
pub use notify::{InMemoryNotifier, Notice, Notifier};
pub use product::{Dimensions, InMemoryProductDirectory, Product, ProductDirectory};
pub use user::{InMemoryUserDirectory, UserDetails, UserDirectory};
