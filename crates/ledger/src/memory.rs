//! In-memory order store.
//!
//! The document store itself is delegated infrastructure; this in-memory
//! implementation provides the per-document consistency the ledger
//! relies on and doubles as the test backend.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::OrderId;

use crate::error::LedgerError;
use crate::order::OrderRecord;
use crate::status::OrderStatus;
use crate::store::OrderStore;

/// Thread-safe in-memory order store.
#[derive(Debug, Clone, Default)]
pub struct InMemoryOrderStore {
    orders: Arc<RwLock<HashMap<OrderId, OrderRecord>>>,
}

impl InMemoryOrderStore {
    /// Creates a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of stored orders.
    pub fn order_count(&self) -> usize {
        self.orders.read().unwrap().len()
    }
}

#[async_trait]
impl OrderStore for InMemoryOrderStore {
    async fn insert(&self, record: OrderRecord) -> Result<(), LedgerError> {
        let mut orders = self.orders.write().unwrap();
        if orders.contains_key(&record.order_id) {
            return Err(LedgerError::AlreadyExists(record.order_id));
        }
        orders.insert(record.order_id.clone(), record);
        Ok(())
    }

    async fn get(&self, order_id: &OrderId) -> Result<Option<OrderRecord>, LedgerError> {
        Ok(self.orders.read().unwrap().get(order_id).cloned())
    }

    async fn update_status(
        &self,
        order_id: &OrderId,
        status: OrderStatus,
    ) -> Result<OrderRecord, LedgerError> {
        let mut orders = self.orders.write().unwrap();
        let record = orders
            .get_mut(order_id)
            .ok_or_else(|| LedgerError::NotFound(order_id.clone()))?;

        if !record.status.can_transition_to(status) {
            return Err(LedgerError::InvalidTransition {
                from: record.status,
                to: status,
            });
        }

        record.status = status;
        Ok(record.clone())
    }

    async fn overdue(&self, now: DateTime<Utc>) -> Result<Vec<OrderRecord>, LedgerError> {
        let orders = self.orders.read().unwrap();
        Ok(orders
            .values()
            .filter(|o| {
                o.status == OrderStatus::Late
                    || (o.status == OrderStatus::Paid && o.end_date < now)
            })
            .cloned()
            .collect())
    }
}
