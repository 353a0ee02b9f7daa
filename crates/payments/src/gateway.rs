//! The charge gateway: vault lookup, processor charge, transaction log.

use async_trait::async_trait;
use chrono::Utc;
use common::{Money, OrderId, UserId};
use tracing::instrument;

use crate::error::PaymentError;
use crate::log::{TransactionLog, TransactionRecord};
use crate::processor::PaymentProcessor;
use crate::vault::{CustomerRecord, CustomerVault};

/// The order-facing payment seam.
///
/// Callers hand over an order and a buyer; the gateway resolves the
/// processor customer, places the charge in minor units, and records
/// the resulting transaction so a later refund can find it.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Charges the buyer for an order and records the transaction.
    async fn charge_order(
        &self,
        order_id: &OrderId,
        user_id: UserId,
        amount: Money,
    ) -> Result<TransactionRecord, PaymentError>;

    /// Refunds the charge recorded against an order, in full.
    async fn refund_order(&self, order_id: &OrderId) -> Result<TransactionRecord, PaymentError>;

    /// Registers a payment customer for a user.
    async fn register_customer(
        &self,
        user_id: UserId,
        email: &str,
    ) -> Result<CustomerRecord, PaymentError>;

    /// Fetches the payment customer registered for a user.
    async fn get_customer(&self, user_id: UserId) -> Result<CustomerRecord, PaymentError>;

    /// Fetches the transaction recorded against an order.
    async fn get_transaction(&self, order_id: &OrderId)
    -> Result<TransactionRecord, PaymentError>;
}

/// Gateway that routes charges through a [`PaymentProcessor`].
pub struct ProcessorGateway<P, V, L>
where
    P: PaymentProcessor,
    V: CustomerVault,
    L: TransactionLog,
{
    processor: P,
    vault: V,
    log: L,
    next_customer: std::sync::atomic::AtomicU32,
}

impl<P, V, L> ProcessorGateway<P, V, L>
where
    P: PaymentProcessor,
    V: CustomerVault,
    L: TransactionLog,
{
    /// Creates a gateway over the given processor, vault, and log.
    pub fn new(processor: P, vault: V, log: L) -> Self {
        Self {
            processor,
            vault,
            log,
            next_customer: std::sync::atomic::AtomicU32::new(0),
        }
    }
}

#[async_trait]
impl<P, V, L> PaymentGateway for ProcessorGateway<P, V, L>
where
    P: PaymentProcessor,
    V: CustomerVault,
    L: TransactionLog,
{
    #[instrument(skip(self))]
    async fn charge_order(
        &self,
        order_id: &OrderId,
        user_id: UserId,
        amount: Money,
    ) -> Result<TransactionRecord, PaymentError> {
        let customer = self.vault.get(user_id).await?;

        let result = match self.processor.charge(&customer.customer_ref, amount.cents()).await {
            Ok(result) => result,
            Err(err) => {
                if matches!(err, PaymentError::Declined { .. }) {
                    metrics::counter!("payments_charges_declined").increment(1);
                    tracing::warn!(%order_id, %err, "charge declined");
                }
                return Err(err);
            }
        };

        let record = TransactionRecord {
            order_id: order_id.clone(),
            user_id,
            transaction_id: result.transaction_id,
            amount,
            created_at: Utc::now(),
            refunded: false,
        };
        self.log.record(record.clone()).await?;

        metrics::counter!("payments_charges_succeeded").increment(1);
        tracing::info!(%order_id, transaction_id = %record.transaction_id, "charge succeeded");
        Ok(record)
    }

    #[instrument(skip(self))]
    async fn refund_order(&self, order_id: &OrderId) -> Result<TransactionRecord, PaymentError> {
        let record = self.log.get(order_id).await?;
        if record.refunded {
            return Err(PaymentError::AlreadyRefunded(order_id.clone()));
        }

        self.processor.refund(&record.transaction_id).await?;
        let record = self.log.mark_refunded(order_id).await?;

        metrics::counter!("payments_refunds").increment(1);
        tracing::info!(%order_id, transaction_id = %record.transaction_id, "charge refunded");
        Ok(record)
    }

    async fn register_customer(
        &self,
        user_id: UserId,
        email: &str,
    ) -> Result<CustomerRecord, PaymentError> {
        let seq = self
            .next_customer
            .fetch_add(1, std::sync::atomic::Ordering::Relaxed)
            + 1;
        let customer_ref = format!("cus_{seq:04}");
        self.vault.register(user_id, email, &customer_ref).await
    }

    async fn get_customer(&self, user_id: UserId) -> Result<CustomerRecord, PaymentError> {
        self.vault.get(user_id).await
    }

    async fn get_transaction(
        &self,
        order_id: &OrderId,
    ) -> Result<TransactionRecord, PaymentError> {
        self.log.get(order_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::log::InMemoryTransactionLog;
    use crate::processor::InMemoryProcessor;
    use crate::vault::InMemoryCustomerVault;

    fn gateway() -> ProcessorGateway<InMemoryProcessor, InMemoryCustomerVault, InMemoryTransactionLog>
    {
        ProcessorGateway::new(
            InMemoryProcessor::new(),
            InMemoryCustomerVault::new(),
            InMemoryTransactionLog::new(),
        )
    }

    #[tokio::test]
    async fn test_charge_records_transaction() {
        let gateway = gateway();
        gateway
            .register_customer(UserId::new(42), "ada@example.com")
            .await
            .unwrap();

        let order_id = OrderId::new();
        let record = gateway
            .charge_order(&order_id, UserId::new(42), Money::from_cents(12000))
            .await
            .unwrap();

        assert_eq!(record.transaction_id, "pi_0001");
        let logged = gateway.get_transaction(&order_id).await.unwrap();
        assert_eq!(logged, record);
    }

    #[tokio::test]
    async fn test_charge_without_customer() {
        let gateway = gateway();
        let err = gateway
            .charge_order(&OrderId::new(), UserId::new(42), Money::from_cents(100))
            .await
            .unwrap_err();
        assert!(matches!(err, PaymentError::NoCustomer(_)));
    }

    #[tokio::test]
    async fn test_declined_charge_is_not_logged() {
        let processor = InMemoryProcessor::new();
        processor.set_decline_charges(true);
        let gateway = ProcessorGateway::new(
            processor,
            InMemoryCustomerVault::new(),
            InMemoryTransactionLog::new(),
        );
        gateway
            .register_customer(UserId::new(42), "ada@example.com")
            .await
            .unwrap();

        let order_id = OrderId::new();
        let err = gateway
            .charge_order(&order_id, UserId::new(42), Money::from_cents(12000))
            .await
            .unwrap_err();

        assert!(matches!(err, PaymentError::Declined { .. }));
        assert!(matches!(
            gateway.get_transaction(&order_id).await.unwrap_err(),
            PaymentError::TransactionNotFound(_)
        ));
    }

    #[tokio::test]
    async fn test_refund_by_order() {
        let gateway = gateway();
        gateway
            .register_customer(UserId::new(42), "ada@example.com")
            .await
            .unwrap();

        let order_id = OrderId::new();
        gateway
            .charge_order(&order_id, UserId::new(42), Money::from_cents(12000))
            .await
            .unwrap();

        let refunded = gateway.refund_order(&order_id).await.unwrap();
        assert!(refunded.refunded);

        let err = gateway.refund_order(&order_id).await.unwrap_err();
        assert!(matches!(err, PaymentError::AlreadyRefunded(_)));
    }

    #[tokio::test]
    async fn test_register_twice_is_conflict() {
        let gateway = gateway();
        gateway
            .register_customer(UserId::new(42), "ada@example.com")
            .await
            .unwrap();

        let err = gateway
            .register_customer(UserId::new(42), "ada@example.com")
            .await
            .unwrap_err();
        assert!(matches!(err, PaymentError::CustomerExists(_)));
    }
}
