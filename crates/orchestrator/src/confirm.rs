//! The order confirmation orchestrator.
//!
//! Drives the confirm pipeline: accept the order, charge the buyer,
//! record the outcome, enrich, and publish the transaction event. Every
//! outbound call is sequential; later steps depend on IDs resolved by
//! earlier ones (the product lookup resolves the sender's user ID).

use broker::{EventPublisher, Outcome};
use common::OrderId;
use directory::{DirectoryError, Notice, Notifier, ProductDirectory, UserDirectory};
use ledger::{LedgerService, NewOrder, OrderRecord, OrderStatus, OrderStore};
use payments::{PaymentError, PaymentGateway, TransactionRecord};
use serde::Serialize;

use crate::error::OrchestratorError;
use crate::event::TransactionEvent;

/// Outcome of a successful confirm call.
#[derive(Debug, Clone, Serialize)]
pub struct ConfirmationResult {
    #[serde(rename = "orderID")]
    pub order_id: OrderId,
    pub status: OrderStatus,
    /// Major units on the wire, matching the bus event.
    #[serde(rename = "paymentAmount")]
    pub payment_amount: f64,
    #[serde(rename = "transactionID")]
    pub transaction_id: String,
    /// False when the broker reported the event unroutable. The charge
    /// stands either way; operators learn through logs and metrics.
    pub published: bool,
}

/// Coordinates confirmation, payment, enrichment, and event publication.
pub struct ConfirmationOrchestrator<S, G, P, U, N, B>
where
    S: OrderStore,
    G: PaymentGateway,
    P: ProductDirectory,
    U: UserDirectory,
    N: Notifier,
    B: EventPublisher,
{
    ledger: LedgerService<S>,
    gateway: G,
    products: P,
    users: U,
    notifier: N,
    publisher: B,
}

impl<S, G, P, U, N, B> ConfirmationOrchestrator<S, G, P, U, N, B>
where
    S: OrderStore,
    G: PaymentGateway,
    P: ProductDirectory,
    U: UserDirectory,
    N: Notifier,
    B: EventPublisher,
{
    /// Creates an orchestrator over the given collaborators.
    pub fn new(
        ledger: LedgerService<S>,
        gateway: G,
        products: P,
        users: U,
        notifier: N,
        publisher: B,
    ) -> Self {
        Self {
            ledger,
            gateway,
            products,
            users,
            notifier,
            publisher,
        }
    }

    /// The ledger behind this orchestrator, for read paths.
    pub fn ledger(&self) -> &LedgerService<S> {
        &self.ledger
    }

    /// The payment gateway behind this orchestrator.
    pub fn gateway(&self) -> &G {
        &self.gateway
    }

    /// Confirms a pending order end to end.
    ///
    /// On gateway success the order ends `paid` and one event goes out
    /// with routing key `transaction.successful`. On a decline the
    /// order ends `payment_failed`, one `transaction.unsuccessful`
    /// event goes out, and the decline is returned to the caller.
    #[tracing::instrument(skip(self))]
    pub async fn confirm(
        &self,
        order_id: &OrderId,
    ) -> Result<ConfirmationResult, OrchestratorError> {
        // Accept first. The transition is validated atomically by the
        // ledger, so a concurrent confirm for the same order loses here
        // and never reaches the gateway.
        self.ledger
            .update_status(order_id, OrderStatus::Accepted)
            .await?;

        // Re-fetch for the authoritative amount and participant IDs;
        // client-supplied copies may be stale.
        let order = self
            .ledger
            .get_order(order_id)
            .await?
            .ok_or_else(|| OrchestratorError::OrderNotFound(order_id.clone()))?;

        let customer = self.gateway.get_customer(order.user_id).await?;

        let charge = match self
            .gateway
            .charge_order(order_id, order.user_id, order.payment_amount)
            .await
        {
            Ok(charge) => charge,
            Err(PaymentError::Declined { code, message }) => {
                self.record_decline(&order, &customer.customer_ref, &message)
                    .await;
                return Err(OrchestratorError::Payment(PaymentError::Declined {
                    code,
                    message,
                }));
            }
            Err(err) => return Err(err.into()),
        };

        if let Err(err) = self.ledger.update_status(order_id, OrderStatus::Paid).await {
            // The charge already happened; a stale status is the lesser
            // problem and shows up in the ledger audit.
            tracing::error!(%order_id, %err, "failed to record paid status");
        }

        let event = match self
            .enrich(
                &order,
                OrderStatus::Accepted.as_str(),
                &customer.customer_ref,
                &charge.transaction_id,
                "",
            )
            .await
        {
            Ok(event) => event,
            Err(err) => {
                metrics::counter!("confirm_enrichment_failures").increment(1);
                tracing::error!(%order_id, %err, "enrichment failed, event not published");
                return Err(err.into());
            }
        };

        let missing = event.missing_required_fields();
        if !missing.is_empty() {
            metrics::counter!("confirm_incomplete_events").increment(1);
            return Err(OrchestratorError::IncompleteEvent { missing });
        }

        let published = self.publish(Outcome::Successful, &event).await;
        metrics::counter!("confirm_orders_paid").increment(1);

        Ok(ConfirmationResult {
            order_id: order_id.clone(),
            status: OrderStatus::Paid,
            payment_amount: order.payment_amount.as_major_f64(),
            transaction_id: charge.transaction_id,
            published,
        })
    }

    /// Creates a new order and notifies the product owner.
    ///
    /// The notification is best-effort: the order stands even when the
    /// owner cannot be reached.
    #[tracing::instrument(skip(self, order))]
    pub async fn create_order(&self, order: NewOrder) -> Result<OrderRecord, OrchestratorError> {
        let record = self.ledger.create_order(order).await?;

        if let Err(err) = self.notify_rental_request(&record).await {
            tracing::warn!(
                order_id = %record.order_id,
                %err,
                "rental-request notification failed"
            );
        }

        Ok(record)
    }

    /// Emails both parties once a shipping label exists and moves the
    /// order to `shipping`.
    #[tracing::instrument(skip(self, tracking_number, label_url))]
    pub async fn notify_shipping(
        &self,
        order_id: &OrderId,
        tracking_number: &str,
        label_url: &str,
    ) -> Result<(), OrchestratorError> {
        let order = self
            .ledger
            .get_order(order_id)
            .await?
            .ok_or_else(|| OrchestratorError::OrderNotFound(order_id.clone()))?;

        let product = self.products.get_product(order.product_id).await?;
        let user = self.users.get_user(order.user_id).await?;
        let renter = self.users.get_user(product.owner_id).await?;

        if let Err(err) = self
            .ledger
            .update_status(order_id, OrderStatus::Shipping)
            .await
        {
            // The label already exists; proceed with the notification.
            tracing::warn!(%order_id, %err, "shipping status update failed");
        }

        self.notifier
            .send(Notice::Shipped {
                user_email: user.email,
                renter_email: renter.email,
                order_id: order_id.to_string(),
                product_name: product.name,
                tracking_number: tracking_number.to_string(),
                label_url: label_url.to_string(),
            })
            .await?;

        Ok(())
    }

    /// Refunds the charge behind an order and moves it to `refund`.
    #[tracing::instrument(skip(self))]
    pub async fn refund(
        &self,
        order_id: &OrderId,
    ) -> Result<TransactionRecord, OrchestratorError> {
        let record = self.gateway.refund_order(order_id).await?;

        if let Err(err) = self
            .ledger
            .update_status(order_id, OrderStatus::Refund)
            .await
        {
            tracing::error!(%order_id, %err, "failed to record refund status");
        }

        Ok(record)
    }

    /// Records a decline and publishes the failure event. Both halves
    /// are best-effort; the decline itself is what the caller gets.
    ///
    /// Unlike the success path, the failure event is published even when
    /// enrichment leaves required fields empty. Its only consumer is the
    /// notification dispatcher, which needs just the payer email and
    /// validates that itself; holding the event to the full shipping
    /// schema would suppress the buyer's one signal that payment failed.
    async fn record_decline(&self, order: &OrderRecord, customer_ref: &str, message: &str) {
        metrics::counter!("confirm_payments_declined").increment(1);

        if let Err(err) = self
            .ledger
            .update_status(&order.order_id, OrderStatus::PaymentFailed)
            .await
        {
            tracing::error!(order_id = %order.order_id, %err, "failed to record payment_failed status");
        }

        match self
            .enrich(
                order,
                OrderStatus::PaymentFailed.as_str(),
                customer_ref,
                "",
                message,
            )
            .await
        {
            Ok(event) => {
                self.publish(Outcome::Unsuccessful, &event).await;
            }
            Err(err) => {
                tracing::error!(
                    order_id = %order.order_id,
                    %err,
                    "failure event enrichment failed, nothing published"
                );
            }
        }
    }

    /// Runs the sequential enrichment chain and assembles the event:
    /// product, then the owner resolved from the product, then both
    /// parties' contact details.
    async fn enrich(
        &self,
        order: &OrderRecord,
        status: &str,
        stripe_cus_id: &str,
        transaction_id: &str,
        error: &str,
    ) -> Result<TransactionEvent, DirectoryError> {
        let product = self.products.get_product(order.product_id).await?;
        let renter = self.users.get_user(product.owner_id).await?;
        let user = self.users.get_user(order.user_id).await?;

        Ok(TransactionEvent::assemble(
            order,
            status,
            stripe_cus_id,
            transaction_id,
            error,
            &product,
            &renter,
            &user,
        ))
    }

    /// Publishes an event, reporting (but not failing on) an unroutable
    /// or unconfirmed delivery.
    async fn publish(&self, outcome: Outcome, event: &TransactionEvent) -> bool {
        let body = match serde_json::to_vec(event) {
            Ok(body) => body,
            Err(err) => {
                tracing::error!(%err, "event serialization failed");
                return false;
            }
        };

        match self.publisher.publish(outcome, &body).await {
            Ok(true) => {
                tracing::info!(
                    order_id = %event.order_id,
                    routing_key = outcome.routing_key(),
                    "transaction event published"
                );
                true
            }
            Ok(false) => {
                metrics::counter!("publish_unroutable").increment(1);
                tracing::warn!(
                    order_id = %event.order_id,
                    routing_key = outcome.routing_key(),
                    "transaction event unroutable, no consumer will see it"
                );
                false
            }
            Err(err) => {
                metrics::counter!("publish_unroutable").increment(1);
                tracing::error!(order_id = %event.order_id, %err, "transaction event publish failed");
                false
            }
        }
    }

    async fn notify_rental_request(&self, order: &OrderRecord) -> Result<(), DirectoryError> {
        let product = self.products.get_product(order.product_id).await?;
        let owner = self.users.get_user(product.owner_id).await?;

        self.notifier
            .send(Notice::RentalRequested {
                renter_email: owner.email,
                product_name: product.name,
                product_description: product.description,
                image_url: product.image_url,
            })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use broker::InMemoryBroker;
    use chrono::{TimeZone, Utc};
    use common::{Money, ProductId, UserId};
    use directory::user::sample_user;
    use directory::{
        Dimensions, InMemoryNotifier, InMemoryProductDirectory, InMemoryUserDirectory, Product,
    };
    use ledger::{InMemoryOrderStore, LedgerError};
    use payments::{
        InMemoryCustomerVault, InMemoryProcessor, InMemoryTransactionLog, ProcessorGateway,
    };

    type TestOrchestrator = ConfirmationOrchestrator<
        InMemoryOrderStore,
        ProcessorGateway<InMemoryProcessor, InMemoryCustomerVault, InMemoryTransactionLog>,
        InMemoryProductDirectory,
        InMemoryUserDirectory,
        InMemoryNotifier,
        InMemoryBroker,
    >;

    struct Fixture {
        orchestrator: TestOrchestrator,
        processor: InMemoryProcessor,
        products: InMemoryProductDirectory,
        users: InMemoryUserDirectory,
        notifier: InMemoryNotifier,
        broker: InMemoryBroker,
    }

    fn fixture() -> Fixture {
        let processor = InMemoryProcessor::new();
        let products = InMemoryProductDirectory::new();
        let users = InMemoryUserDirectory::new();
        let notifier = InMemoryNotifier::new();
        let broker = InMemoryBroker::new();

        products.insert(Product {
            product_id: ProductId::new(7),
            name: "Camera".to_string(),
            description: "A mirrorless camera".to_string(),
            owner_id: UserId::new(1),
            price: Money::from_cents(45000),
            image_url: "https://img.example/camera.jpg".to_string(),
            available: true,
            dimensions: Dimensions {
                length: 10.0,
                width: 6.0,
                height: 4.0,
                weight: 2.5,
                ..Dimensions::default()
            },
        });
        users.insert(sample_user(UserId::new(1), "Owen", "owner@example.com"));
        users.insert(sample_user(UserId::new(42), "Ada", "ada@example.com"));

        let orchestrator = ConfirmationOrchestrator::new(
            LedgerService::new(InMemoryOrderStore::new()),
            ProcessorGateway::new(
                processor.clone(),
                InMemoryCustomerVault::new(),
                InMemoryTransactionLog::new(),
            ),
            products.clone(),
            users.clone(),
            notifier.clone(),
            broker.clone(),
        );

        Fixture {
            orchestrator,
            processor,
            products,
            users,
            notifier,
            broker,
        }
    }

    fn new_order() -> NewOrder {
        NewOrder {
            payment_amount: Money::from_cents(12000),
            product_id: ProductId::new(7),
            renter_id: UserId::new(1),
            user_id: UserId::new(42),
            start_date: Utc.with_ymd_and_hms(2025, 3, 1, 10, 0, 0).unwrap(),
            end_date: Utc.with_ymd_and_hms(2025, 3, 4, 10, 0, 0).unwrap(),
        }
    }

    async fn pending_order(fixture: &Fixture) -> OrderRecord {
        fixture
            .orchestrator
            .gateway()
            .register_customer(UserId::new(42), "ada@example.com")
            .await
            .unwrap();
        fixture
            .orchestrator
            .ledger()
            .create_order(new_order())
            .await
            .unwrap()
    }

    fn published_event(fixture: &Fixture, routing_key: &str) -> TransactionEvent {
        let published = fixture.broker.published();
        let (_, body) = published
            .iter()
            .find(|(key, _)| key == routing_key)
            .expect("no message with routing key");
        serde_json::from_slice(body).unwrap()
    }

    #[tokio::test]
    async fn test_confirm_success() {
        let fixture = fixture();
        let order = pending_order(&fixture).await;

        let result = fixture.orchestrator.confirm(&order.order_id).await.unwrap();
        assert_eq!(result.status, OrderStatus::Paid);
        assert_eq!(result.transaction_id, "pi_0001");
        assert!(result.published);

        let stored = fixture
            .orchestrator
            .ledger()
            .get_order(&order.order_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.status, OrderStatus::Paid);

        assert_eq!(fixture.broker.published_count("transaction.successful"), 1);
        assert_eq!(fixture.broker.published_count("transaction.unsuccessful"), 0);

        let event = published_event(&fixture, "transaction.successful");
        assert_eq!(event.order_id, order.order_id.to_string());
        assert_eq!(event.status, "accepted");
        assert_eq!(event.transaction_id, "pi_0001");
        assert_eq!(event.payment_amount, 120.0);
        assert_eq!(event.user_id, 42);
        assert_eq!(event.renter_id, 1);
        assert!(event.missing_required_fields().is_empty());
    }

    #[tokio::test]
    async fn test_confirm_unknown_order_never_charges() {
        let fixture = fixture();

        let err = fixture.orchestrator.confirm(&OrderId::new()).await.unwrap_err();
        assert!(matches!(err, OrchestratorError::OrderNotFound(_)));
        assert_eq!(fixture.processor.charge_count(), 0);
        assert!(fixture.broker.published().is_empty());
    }

    #[tokio::test]
    async fn test_confirm_decline_publishes_failure_event() {
        let fixture = fixture();
        let order = pending_order(&fixture).await;
        fixture.processor.set_decline_charges(true);

        let err = fixture.orchestrator.confirm(&order.order_id).await.unwrap_err();
        assert!(matches!(
            err,
            OrchestratorError::Payment(PaymentError::Declined { .. })
        ));

        let stored = fixture
            .orchestrator
            .ledger()
            .get_order(&order.order_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.status, OrderStatus::PaymentFailed);

        assert_eq!(fixture.broker.published_count("transaction.unsuccessful"), 1);
        assert_eq!(fixture.broker.published_count("transaction.successful"), 0);

        let event = published_event(&fixture, "transaction.unsuccessful");
        assert_eq!(event.status, "payment_failed");
        assert_eq!(event.error, "Your card was declined");
        assert!(event.transaction_id.is_empty());
    }

    #[tokio::test]
    async fn test_decline_publishes_even_with_incomplete_event() {
        // The failure event skips the completeness gate the success path
        // enforces; the payment-failed email must go out even when the
        // sender address block cannot be filled in.
        let fixture = fixture();
        let order = pending_order(&fixture).await;

        let mut owner = sample_user(UserId::new(1), "Owen", "owner@example.com");
        owner.street1 = String::new();
        fixture.users.insert(owner);
        fixture.processor.set_decline_charges(true);

        let err = fixture.orchestrator.confirm(&order.order_id).await.unwrap_err();
        assert!(matches!(
            err,
            OrchestratorError::Payment(PaymentError::Declined { .. })
        ));

        assert_eq!(fixture.broker.published_count("transaction.unsuccessful"), 1);
        let event = published_event(&fixture, "transaction.unsuccessful");
        assert!(!event.missing_required_fields().is_empty());
        assert_eq!(event.status, "payment_failed");
    }

    #[tokio::test]
    async fn test_second_confirm_is_rejected_before_charging() {
        let fixture = fixture();
        let order = pending_order(&fixture).await;

        fixture.orchestrator.confirm(&order.order_id).await.unwrap();
        let err = fixture.orchestrator.confirm(&order.order_id).await.unwrap_err();

        assert!(matches!(
            err,
            OrchestratorError::Ledger(LedgerError::InvalidTransition { .. })
        ));
        assert_eq!(fixture.processor.charge_count(), 1);
        assert_eq!(fixture.broker.published_count("transaction.successful"), 1);
    }

    #[tokio::test]
    async fn test_enrichment_failure_leaves_order_paid_without_event() {
        let fixture = fixture();
        let order = pending_order(&fixture).await;
        fixture.products.set_fail_on_get(true);

        let err = fixture.orchestrator.confirm(&order.order_id).await.unwrap_err();
        assert!(matches!(err, OrchestratorError::Directory(_)));

        let stored = fixture
            .orchestrator
            .ledger()
            .get_order(&order.order_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.status, OrderStatus::Paid);
        assert!(fixture.broker.published().is_empty());
    }

    #[tokio::test]
    async fn test_incomplete_event_blocks_publish() {
        let fixture = fixture();
        let order = pending_order(&fixture).await;

        // Owner details with no street: the event fails pre-publish
        // validation even though every lookup succeeded.
        let mut owner = sample_user(UserId::new(1), "Owen", "owner@example.com");
        owner.street1.clear();
        fixture.users.insert(owner);

        let err = fixture.orchestrator.confirm(&order.order_id).await.unwrap_err();
        assert!(matches!(
            err,
            OrchestratorError::IncompleteEvent { ref missing } if missing == &vec!["senderStreet"]
        ));
        assert!(fixture.broker.published().is_empty());
    }

    #[tokio::test]
    async fn test_create_order_notifies_owner() {
        let fixture = fixture();

        let record = fixture.orchestrator.create_order(new_order()).await.unwrap();
        assert_eq!(record.status, OrderStatus::Pending);

        let sent = fixture.notifier.sent();
        assert_eq!(sent.len(), 1);
        assert!(matches!(
            sent[0],
            Notice::RentalRequested { ref renter_email, .. } if renter_email == "owner@example.com"
        ));
    }

    #[tokio::test]
    async fn test_create_order_survives_notification_failure() {
        let fixture = fixture();
        fixture.notifier.set_fail_on_send(true);

        let record = fixture.orchestrator.create_order(new_order()).await.unwrap();
        assert_eq!(record.status, OrderStatus::Pending);
        assert_eq!(fixture.notifier.sent_count(), 0);
    }

    #[tokio::test]
    async fn test_notify_shipping_sends_dual_email_and_updates_status() {
        let fixture = fixture();
        let order = pending_order(&fixture).await;
        fixture.orchestrator.confirm(&order.order_id).await.unwrap();

        fixture
            .orchestrator
            .notify_shipping(
                &order.order_id,
                "9205590164917312751089",
                "https://labels.example/o1.pdf",
            )
            .await
            .unwrap();

        let stored = fixture
            .orchestrator
            .ledger()
            .get_order(&order.order_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.status, OrderStatus::Shipping);

        let shipped = fixture
            .notifier
            .sent()
            .into_iter()
            .find_map(|notice| match notice {
                Notice::Shipped {
                    user_email,
                    renter_email,
                    tracking_number,
                    ..
                } => Some((user_email, renter_email, tracking_number)),
                _ => None,
            })
            .expect("no shipped notice");
        assert_eq!(shipped.0, "ada@example.com");
        assert_eq!(shipped.1, "owner@example.com");
        assert_eq!(shipped.2, "9205590164917312751089");
    }

    #[tokio::test]
    async fn test_refund_marks_order_refunded() {
        let fixture = fixture();
        let order = pending_order(&fixture).await;
        fixture.orchestrator.confirm(&order.order_id).await.unwrap();

        let record = fixture.orchestrator.refund(&order.order_id).await.unwrap();
        assert!(record.refunded);
        assert!(fixture.processor.is_refunded(&record.transaction_id));

        let stored = fixture
            .orchestrator
            .ledger()
            .get_order(&order.order_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.status, OrderStatus::Refund);

        let err = fixture.orchestrator.refund(&order.order_id).await.unwrap_err();
        assert!(matches!(
            err,
            OrchestratorError::Payment(PaymentError::AlreadyRefunded(_))
        ));
    }

    #[tokio::test]
    async fn test_missing_payment_customer_never_charges() {
        let fixture = fixture();
        let order = fixture
            .orchestrator
            .ledger()
            .create_order(new_order())
            .await
            .unwrap();

        let err = fixture.orchestrator.confirm(&order.order_id).await.unwrap_err();
        assert!(matches!(
            err,
            OrchestratorError::Payment(PaymentError::NoCustomer(_))
        ));
        assert_eq!(fixture.processor.charge_count(), 0);
        assert!(fixture.broker.published().is_empty());
    }

    #[tokio::test]
    async fn test_unroutable_publish_is_reported_not_fatal() {
        let fixture = fixture();

        // Rebuild the orchestrator over a broker with no bindings at
        // all, so the success publish has nowhere to go.
        let bare_broker = InMemoryBroker::default();
        let orchestrator = ConfirmationOrchestrator::new(
            LedgerService::new(InMemoryOrderStore::new()),
            ProcessorGateway::new(
                fixture.processor.clone(),
                InMemoryCustomerVault::new(),
                InMemoryTransactionLog::new(),
            ),
            fixture.products.clone(),
            fixture.users.clone(),
            fixture.notifier.clone(),
            bare_broker.clone(),
        );
        orchestrator
            .gateway()
            .register_customer(UserId::new(42), "ada@example.com")
            .await
            .unwrap();
        let order = orchestrator.ledger().create_order(new_order()).await.unwrap();

        let result = orchestrator.confirm(&order.order_id).await.unwrap();
        assert_eq!(result.status, OrderStatus::Paid);
        assert!(!result.published);
    }
}
