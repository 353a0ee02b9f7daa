//! The shipping label generator, consuming successful transactions.

use std::time::Duration;

use async_trait::async_trait;
use broker::{HandlerVerdict, MessageHandler};
use chrono::Utc;
use orchestrator::TransactionEvent;

use crate::error::LabelError;
use crate::label::{Address, LabelProvider, Parcel, PurchaseStatus, Rate, ShipmentRequest};
use crate::store::{ShippingRecord, ShippingStatus, ShippingStore};

const FALLBACK_SENDER_PHONE: &str = "+1 555 123 4567";
const FALLBACK_RECIPIENT_PHONE: &str = "+1 555 987 6543";

/// Consumes successful-transaction events and turns them into purchased
/// shipping labels.
///
/// One message is in flight at a time; a purchase that the provider
/// reports queued is polled a bounded number of times, with a
/// `processing` checkpoint persisted before each wait so a crash leaves
/// an inspectable record.
pub struct ShippingConsumer<L, S>
where
    L: LabelProvider,
    S: ShippingStore,
{
    provider: L,
    store: S,
    max_retries: u32,
    poll_delay: Duration,
}

impl<L, S> ShippingConsumer<L, S>
where
    L: LabelProvider,
    S: ShippingStore,
{
    /// Creates a consumer with the production retry schedule.
    pub fn new(provider: L, store: S) -> Self {
        Self::with_poll_schedule(provider, store, 5, Duration::from_secs(5))
    }

    /// Creates a consumer with an explicit retry ceiling and poll delay.
    pub fn with_poll_schedule(
        provider: L,
        store: S,
        max_retries: u32,
        poll_delay: Duration,
    ) -> Self {
        Self {
            provider,
            store,
            max_retries,
            poll_delay,
        }
    }

    /// Builds the carrier-ready request from a validated event.
    ///
    /// The recipient name falls back to the email local part, and both
    /// phone numbers get placeholders when absent; carriers reject
    /// requests with those fields empty.
    fn build_request(event: &TransactionEvent) -> ShipmentRequest {
        let recipient_name = if event.recipient_name.is_empty() {
            event
                .user_email
                .split('@')
                .next()
                .unwrap_or_default()
                .to_string()
        } else {
            event.recipient_name.clone()
        };
        let sender_phone = if event.sender_phone.is_empty() {
            FALLBACK_SENDER_PHONE.to_string()
        } else {
            event.sender_phone.clone()
        };
        let recipient_phone = if event.recipient_phone.is_empty() {
            FALLBACK_RECIPIENT_PHONE.to_string()
        } else {
            event.recipient_phone.clone()
        };

        ShipmentRequest {
            sender: Address {
                name: event.sender_name.clone(),
                street1: event.sender_street.clone(),
                city: event.sender_city.clone(),
                state: event.sender_state.clone(),
                zip: event.sender_zip.clone(),
                country: event.sender_country.clone(),
                phone: sender_phone,
                email: event.sender_email.clone(),
            },
            recipient: Address {
                name: recipient_name,
                street1: event.recipient_street.clone(),
                city: event.recipient_city.clone(),
                state: event.recipient_state.clone(),
                zip: event.recipient_zip.clone(),
                country: event.recipient_country.clone(),
                phone: recipient_phone,
                email: event.user_email.clone(),
            },
            parcel: Parcel {
                length: event.length.to_string(),
                width: event.width.to_string(),
                height: event.height.to_string(),
                weight: event.weight.to_string(),
                distance_unit: event.distance_unit.clone(),
                mass_unit: event.mass_unit.clone(),
            },
        }
    }

    async fn checkpoint(&self, event: &TransactionEvent, retry_count: u32) {
        self.store
            .save(ShippingRecord {
                order_id: event.order_id.clone(),
                status: ShippingStatus::Processing,
                label_url: String::new(),
                tracking_number: String::new(),
                carrier: String::new(),
                service: String::new(),
                created_at: Utc::now(),
                retry_count,
                renter_id: event.renter_id,
                user_id: event.user_id,
                product_id: event.product_id,
            })
            .await;
    }

    /// Creates the shipment, purchases a USPS label, and polls through
    /// queued states up to the retry ceiling.
    async fn create_label(&self, event: &TransactionEvent) -> Result<ShippingRecord, LabelError> {
        let request = Self::build_request(event);
        let rates = self.provider.create_shipment(&request).await?;

        let rate: &Rate = rates
            .iter()
            .find(|rate| rate.provider.eq_ignore_ascii_case("usps"))
            .ok_or_else(|| LabelError::Failed("no USPS rates for shipment".to_string()))?;

        let mut purchase = self.provider.purchase_label(&rate.rate_id).await?;
        let mut retry_count = 0;

        while purchase.status == PurchaseStatus::Queued {
            if retry_count >= self.max_retries {
                return Err(LabelError::Failed(format!(
                    "label still queued after {retry_count} retries"
                )));
            }
            retry_count += 1;
            tracing::info!(
                order_id = %event.order_id,
                retry_count,
                "label purchase queued, polling"
            );
            self.checkpoint(event, retry_count).await;

            tokio::time::sleep(self.poll_delay).await;
            purchase = self.provider.get_purchase(&purchase.purchase_id).await?;
        }

        if purchase.status != PurchaseStatus::Success {
            return Err(LabelError::Failed(format!(
                "label purchase ended in {:?}",
                purchase.status
            )));
        }

        let record = ShippingRecord {
            order_id: event.order_id.clone(),
            status: ShippingStatus::LabelCreated,
            label_url: purchase.label_url,
            tracking_number: purchase.tracking_number,
            carrier: rate.provider.clone(),
            service: rate.service.clone(),
            created_at: Utc::now(),
            retry_count,
            renter_id: event.renter_id,
            user_id: event.user_id,
            product_id: event.product_id,
        };
        self.store.save(record.clone()).await;

        metrics::counter!("shipping_labels_created").increment(1);
        tracing::info!(
            order_id = %event.order_id,
            tracking_number = %record.tracking_number,
            "shipping label created"
        );
        Ok(record)
    }
}

#[async_trait]
impl<L, S> MessageHandler for ShippingConsumer<L, S>
where
    L: LabelProvider,
    S: ShippingStore,
{
    async fn handle(&self, body: &[u8]) -> HandlerVerdict {
        let event: TransactionEvent = match serde_json::from_slice(body) {
            Ok(event) => event,
            Err(err) => return HandlerVerdict::Rejected(format!("malformed event: {err}")),
        };

        if event.order_id.is_empty() {
            return HandlerVerdict::Rejected("missing orderID".to_string());
        }
        let missing = event.missing_required_fields();
        if !missing.is_empty() {
            return HandlerVerdict::Rejected(format!(
                "missing required fields: {}",
                missing.join(", ")
            ));
        }

        // Redelivery of an already-labeled order short-circuits; the
        // existing record stands and no second purchase happens.
        if let Some(existing) = self.store.get(&event.order_id).await {
            if existing.status == ShippingStatus::LabelCreated {
                tracing::info!(order_id = %event.order_id, "label already exists, skipping");
                return HandlerVerdict::Processed;
            }
        }

        match self.create_label(&event).await {
            Ok(_) => HandlerVerdict::Processed,
            Err(err) => HandlerVerdict::Failed(err.to_string()),
        }
    }
}
