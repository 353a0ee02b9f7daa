//! Order confirmation orchestration.
//!
//! The confirm pipeline is the one place where the ledger, the payment
//! gateway, the directories, and the broker must agree on an outcome
//! with no transaction coordinator. The orchestrator sequences them:
//! conditional status transitions guard against double charges, the
//! failure event is published even when the charge is declined, and an
//! event only reaches the broker once every required field is present.

pub mod confirm;
pub mod error;
pub mod event;

pub use confirm::{ConfirmationOrchestrator, ConfirmationResult};
pub use error::OrchestratorError;
pub use event::TransactionEvent;
