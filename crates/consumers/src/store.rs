//! Shipping record storage, keyed by order ID.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Where label processing stands for one order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShippingStatus {
    /// A purchase is in flight; the provider still reports it queued.
    Processing,
    /// The label exists; tracking and label URL are final.
    LabelCreated,
}

/// Shipping state for one order. Written once per order and updated in
/// place across retries; never created twice for the same order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShippingRecord {
    pub order_id: String,
    pub status: ShippingStatus,
    pub label_url: String,
    pub tracking_number: String,
    pub carrier: String,
    pub service: String,
    pub created_at: DateTime<Utc>,
    pub retry_count: u32,
    pub renter_id: i64,
    pub user_id: i64,
    pub product_id: i64,
}

/// Trait for the shipping consumer's own storage.
#[async_trait]
pub trait ShippingStore: Send + Sync {
    /// Writes (or overwrites) the record for an order.
    async fn save(&self, record: ShippingRecord);

    /// Reads the record for an order, if any.
    async fn get(&self, order_id: &str) -> Option<ShippingRecord>;
}

/// In-memory shipping store for standalone mode and tests.
#[derive(Debug, Clone, Default)]
pub struct InMemoryShippingStore {
    state: Arc<RwLock<HashMap<String, ShippingRecord>>>,
}

impl InMemoryShippingStore {
    /// Creates a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of stored records.
    pub fn record_count(&self) -> usize {
        self.state.read().unwrap().len()
    }
}

#[async_trait]
impl ShippingStore for InMemoryShippingStore {
    async fn save(&self, record: ShippingRecord) {
        self.state
            .write()
            .unwrap()
            .insert(record.order_id.clone(), record);
    }

    async fn get(&self, order_id: &str) -> Option<ShippingRecord> {
        self.state.read().unwrap().get(order_id).cloned()
    }
}
