//! Payment path: processor clients, the customer vault, and the
//! transaction log, fronted by the charge gateway.
//!
//! The gateway is the only payment surface the rest of the workspace
//! sees. It resolves users to processor customer handles, converts
//! amounts to minor units at the processor boundary, and keeps the
//! order-to-charge mapping that refunds navigate by.

pub mod error;
pub mod gateway;
pub mod log;
pub mod processor;
pub mod vault;

pub use error::PaymentError;
pub use gateway::{PaymentGateway, ProcessorGateway};
pub use log::{InMemoryTransactionLog, TransactionLog, TransactionRecord};
pub use processor::{ChargeResult, HttpProcessor, InMemoryProcessor, PaymentProcessor};
pub use vault::{CustomerRecord, CustomerVault, InMemoryCustomerVault};
