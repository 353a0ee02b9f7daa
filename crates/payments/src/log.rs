//! Transaction log: which charge paid for which order.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{Money, OrderId, UserId};
use serde::{Deserialize, Serialize};

use crate::error::PaymentError;

/// One recorded charge against an order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionRecord {
    pub order_id: OrderId,
    pub user_id: UserId,
    /// The processor charge ID, the handle a refund needs.
    pub transaction_id: String,
    pub amount: Money,
    pub created_at: DateTime<Utc>,
    pub refunded: bool,
}

/// Trait for the transaction log.
#[async_trait]
pub trait TransactionLog: Send + Sync {
    /// Records a charge against an order.
    async fn record(&self, record: TransactionRecord) -> Result<(), PaymentError>;

    /// Fetches the charge recorded against an order.
    async fn get(&self, order_id: &OrderId) -> Result<TransactionRecord, PaymentError>;

    /// Marks an order's charge refunded and returns the updated record.
    ///
    /// A second refund attempt for the same order is rejected.
    async fn mark_refunded(&self, order_id: &OrderId) -> Result<TransactionRecord, PaymentError>;
}

/// In-memory transaction log for standalone mode and tests.
#[derive(Debug, Clone, Default)]
pub struct InMemoryTransactionLog {
    state: Arc<RwLock<HashMap<OrderId, TransactionRecord>>>,
}

impl InMemoryTransactionLog {
    /// Creates a new empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of recorded transactions.
    pub fn transaction_count(&self) -> usize {
        self.state.read().unwrap().len()
    }
}

#[async_trait]
impl TransactionLog for InMemoryTransactionLog {
    async fn record(&self, record: TransactionRecord) -> Result<(), PaymentError> {
        self.state
            .write()
            .unwrap()
            .insert(record.order_id.clone(), record);
        Ok(())
    }

    async fn get(&self, order_id: &OrderId) -> Result<TransactionRecord, PaymentError> {
        self.state
            .read()
            .unwrap()
            .get(order_id)
            .cloned()
            .ok_or_else(|| PaymentError::TransactionNotFound(order_id.clone()))
    }

    async fn mark_refunded(&self, order_id: &OrderId) -> Result<TransactionRecord, PaymentError> {
        let mut state = self.state.write().unwrap();
        let record = state
            .get_mut(order_id)
            .ok_or_else(|| PaymentError::TransactionNotFound(order_id.clone()))?;
        if record.refunded {
            return Err(PaymentError::AlreadyRefunded(order_id.clone()));
        }
        record.refunded = true;
        Ok(record.clone())
    }
}
