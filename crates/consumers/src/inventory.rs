//! The inventory availability updater, consuming successful
//! transactions.

use async_trait::async_trait;
use broker::{HandlerVerdict, MessageHandler};
use common::ProductId;
use directory::{DirectoryError, ProductDirectory};
use orchestrator::TransactionEvent;

/// Marks the rented product unavailable once its payment clears.
pub struct InventoryConsumer<P: ProductDirectory> {
    products: P,
}

impl<P: ProductDirectory> InventoryConsumer<P> {
    /// Creates a consumer over the given product directory.
    pub fn new(products: P) -> Self {
        Self { products }
    }
}

#[async_trait]
impl<P: ProductDirectory> MessageHandler for InventoryConsumer<P> {
    async fn handle(&self, body: &[u8]) -> HandlerVerdict {
        let event: TransactionEvent = match serde_json::from_slice(body) {
            Ok(event) => event,
            Err(err) => return HandlerVerdict::Rejected(format!("malformed event: {err}")),
        };

        if event.product_id <= 0 {
            return HandlerVerdict::Rejected("missing productID".to_string());
        }

        let product_id = ProductId::new(event.product_id);
        match self.products.mark_unavailable(product_id).await {
            Ok(()) => {
                metrics::counter!("inventory_marked_unavailable").increment(1);
                tracing::info!(
                    order_id = %event.order_id,
                    product_id = event.product_id,
                    "product marked unavailable"
                );
                HandlerVerdict::Processed
            }
            Err(DirectoryError::ProductNotFound(_)) => {
                HandlerVerdict::Rejected(format!("unknown product: {}", event.product_id))
            }
            Err(err) => HandlerVerdict::Failed(err.to_string()),
        }
    }
}
