//! Order ledger service.
//!
//! The ledger owns order documents: it creates them, answers reads, and
//! is the single place where status transitions are validated. Every
//! transition is checked against the state machine while the document is
//! locked, so a conditional step like `accepted -> paid` can only succeed
//! for one caller.

pub mod error;
pub mod memory;
pub mod order;
pub mod service;
pub mod status;
pub mod store;

pub use error::LedgerError;
pub use memory::InMemoryOrderStore;
pub use order::{NewOrder, OrderRecord};
pub use service::LedgerService;
pub use status::OrderStatus;
pub use store::OrderStore;
