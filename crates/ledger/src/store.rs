//! Order document store abstraction.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::OrderId;

use crate::error::LedgerError;
use crate::order::OrderRecord;
use crate::status::OrderStatus;

/// Backing store for order documents.
///
/// `update_status` must validate the transition against the current
/// status while holding the document lock, so concurrent callers cannot
/// both win the same transition.
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Inserts a new order document.
    async fn insert(&self, record: OrderRecord) -> Result<(), LedgerError>;

    /// Fetches an order document by ID.
    async fn get(&self, order_id: &OrderId) -> Result<Option<OrderRecord>, LedgerError>;

    /// Atomically transitions an order to a new status, returning the
    /// updated document.
    async fn update_status(
        &self,
        order_id: &OrderId,
        status: OrderStatus,
    ) -> Result<OrderRecord, LedgerError>;

    /// Returns orders needing action: those already `late`, plus `paid`
    /// orders whose rental period ended before `now`.
    async fn overdue(&self, now: DateTime<Utc>) -> Result<Vec<OrderRecord>, LedgerError>;
}
