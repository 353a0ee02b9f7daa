//! Ledger service providing the order-record API.

use chrono::{DateTime, Utc};
use common::OrderId;

use crate::error::LedgerError;
use crate::order::{NewOrder, OrderRecord};
use crate::status::OrderStatus;
use crate::store::OrderStore;

/// Service of record for order documents.
pub struct LedgerService<S: OrderStore> {
    store: S,
}

impl<S: OrderStore> LedgerService<S> {
    /// Creates a new ledger service backed by the given store.
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Creates a new order document in `pending` status and returns it.
    #[tracing::instrument(skip(self, order))]
    pub async fn create_order(&self, order: NewOrder) -> Result<OrderRecord, LedgerError> {
        let order_id = OrderId::new();
        let record = order.into_record(order_id)?;
        self.store.insert(record.clone()).await?;

        metrics::counter!("ledger_orders_created").increment(1);
        tracing::info!(order_id = %record.order_id, "order created");
        Ok(record)
    }

    /// Fetches an order document by ID.
    pub async fn get_order(&self, order_id: &OrderId) -> Result<Option<OrderRecord>, LedgerError> {
        self.store.get(order_id).await
    }

    /// Transitions an order to a new status.
    ///
    /// The transition is validated atomically against the current status;
    /// a concurrent caller racing the same transition gets
    /// [`LedgerError::InvalidTransition`].
    #[tracing::instrument(skip(self))]
    pub async fn update_status(
        &self,
        order_id: &OrderId,
        status: OrderStatus,
    ) -> Result<OrderRecord, LedgerError> {
        let record = self.store.update_status(order_id, status).await?;
        tracing::info!(%order_id, status = %status, "order status updated");
        Ok(record)
    }

    /// Returns orders needing action, for the external expiry scanner.
    pub async fn overdue_orders(
        &self,
        now: DateTime<Utc>,
    ) -> Result<Vec<OrderRecord>, LedgerError> {
        self.store.overdue(now).await
    }
}
