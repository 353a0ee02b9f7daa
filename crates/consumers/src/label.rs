//! Shipping-label provider trait with in-memory and HTTP
//! implementations.
//!
//! The provider exposes the two-step carrier flow: create a shipment to
//! get rate options, then purchase a label against a chosen rate. Label
//! purchases can sit queued at the provider; callers poll until the
//! label materializes or give up.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::error::LabelError;

/// Carrier-ready postal address.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Address {
    pub name: String,
    pub street1: String,
    pub city: String,
    pub state: String,
    pub zip: String,
    pub country: String,
    pub phone: String,
    pub email: String,
}

/// Parcel dimensions, stringly typed the way carrier APIs want them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parcel {
    pub length: String,
    pub width: String,
    pub height: String,
    pub weight: String,
    pub distance_unit: String,
    pub mass_unit: String,
}

/// A shipment quote request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShipmentRequest {
    pub sender: Address,
    pub recipient: Address,
    pub parcel: Parcel,
}

/// One rate option returned for a shipment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rate {
    pub rate_id: String,
    pub provider: String,
    pub service: String,
    pub amount: String,
}

/// Where a label purchase stands at the provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PurchaseStatus {
    Queued,
    Success,
    Error,
}

/// State of one label purchase.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelPurchase {
    pub purchase_id: String,
    pub status: PurchaseStatus,
    pub tracking_number: String,
    pub label_url: String,
}

/// Trait for the shipping-label provider.
#[async_trait]
pub trait LabelProvider: Send + Sync {
    /// Creates a shipment and returns the available rate options.
    async fn create_shipment(&self, request: &ShipmentRequest) -> Result<Vec<Rate>, LabelError>;

    /// Purchases a label against a rate. The result may be queued.
    async fn purchase_label(&self, rate_id: &str) -> Result<LabelPurchase, LabelError>;

    /// Re-reads the state of a previously started purchase.
    async fn get_purchase(&self, purchase_id: &str) -> Result<LabelPurchase, LabelError>;
}

#[derive(Debug, Default)]
struct InMemoryLabelState {
    /// Remaining polls a purchase reports `QUEUED` before succeeding.
    pending: HashMap<String, u32>,
    queued_polls: u32,
    purchase_count: usize,
    next_id: u32,
    fail_on_create: bool,
    usps_available: bool,
}

/// In-memory label provider for standalone mode and tests.
#[derive(Debug, Clone)]
pub struct InMemoryLabelProvider {
    state: Arc<RwLock<InMemoryLabelState>>,
}

impl Default for InMemoryLabelProvider {
    fn default() -> Self {
        Self {
            state: Arc::new(RwLock::new(InMemoryLabelState {
                usps_available: true,
                ..InMemoryLabelState::default()
            })),
        }
    }
}

impl InMemoryLabelProvider {
    /// Creates a provider that issues labels immediately.
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes each purchase report `QUEUED` for the given number of
    /// polls before succeeding.
    pub fn set_queued_polls(&self, polls: u32) {
        self.state.write().unwrap().queued_polls = polls;
    }

    /// Configures the provider to fail shipment creation.
    pub fn set_fail_on_create(&self, fail: bool) {
        self.state.write().unwrap().fail_on_create = fail;
    }

    /// Removes USPS from the returned rate options.
    pub fn set_usps_available(&self, available: bool) {
        self.state.write().unwrap().usps_available = available;
    }

    /// Returns the number of label purchases started.
    pub fn purchase_count(&self) -> usize {
        self.state.read().unwrap().purchase_count
    }

    fn purchase_state(&self, purchase_id: &str) -> LabelPurchase {
        let state = self.state.read().unwrap();
        if state.pending.get(purchase_id).copied().unwrap_or(0) > 0 {
            LabelPurchase {
                purchase_id: purchase_id.to_string(),
                status: PurchaseStatus::Queued,
                tracking_number: String::new(),
                label_url: String::new(),
            }
        } else {
            LabelPurchase {
                purchase_id: purchase_id.to_string(),
                status: PurchaseStatus::Success,
                tracking_number: format!("92055901649173{purchase_id}"),
                label_url: format!("https://labels.example/{purchase_id}.pdf"),
            }
        }
    }
}

#[async_trait]
impl LabelProvider for InMemoryLabelProvider {
    async fn create_shipment(&self, _request: &ShipmentRequest) -> Result<Vec<Rate>, LabelError> {
        let state = self.state.read().unwrap();
        if state.fail_on_create {
            return Err(LabelError::Unavailable(
                "label provider offline".to_string(),
            ));
        }

        let mut rates = vec![Rate {
            rate_id: "rate_ups_ground".to_string(),
            provider: "UPS".to_string(),
            service: "Ground".to_string(),
            amount: "11.22".to_string(),
        }];
        if state.usps_available {
            rates.push(Rate {
                rate_id: "rate_usps_priority".to_string(),
                provider: "USPS".to_string(),
                service: "Priority Mail".to_string(),
                amount: "8.36".to_string(),
            });
        }
        Ok(rates)
    }

    async fn purchase_label(&self, _rate_id: &str) -> Result<LabelPurchase, LabelError> {
        let purchase_id = {
            let mut state = self.state.write().unwrap();
            state.next_id += 1;
            state.purchase_count += 1;
            let purchase_id = format!("txn_{:04}", state.next_id);
            let queued_polls = state.queued_polls;
            state.pending.insert(purchase_id.clone(), queued_polls);
            purchase_id
        };
        Ok(self.purchase_state(&purchase_id))
    }

    async fn get_purchase(&self, purchase_id: &str) -> Result<LabelPurchase, LabelError> {
        {
            let mut state = self.state.write().unwrap();
            if let Some(remaining) = state.pending.get_mut(purchase_id) {
                *remaining = remaining.saturating_sub(1);
            } else {
                return Err(LabelError::Failed(format!(
                    "unknown purchase: {purchase_id}"
                )));
            }
        }
        Ok(self.purchase_state(purchase_id))
    }
}

#[derive(Debug, Serialize)]
struct ShipmentApiRequest<'a> {
    address_from: &'a Address,
    address_to: &'a Address,
    parcels: [&'a Parcel; 1],
}

#[derive(Debug, Deserialize)]
struct ShipmentApiResponse {
    rates: Vec<RateApi>,
}

#[derive(Debug, Deserialize)]
struct RateApi {
    object_id: String,
    provider: String,
    servicelevel: String,
    amount: String,
}

#[derive(Debug, Serialize)]
struct PurchaseApiRequest<'a> {
    rate: &'a str,
    label_file_type: &'static str,
}

#[derive(Debug, Deserialize)]
struct PurchaseApiResponse {
    object_id: String,
    status: PurchaseStatus,
    #[serde(default)]
    tracking_number: String,
    #[serde(default)]
    label_url: String,
}

/// Label provider backed by the carrier aggregator's HTTP API.
#[derive(Debug, Clone)]
pub struct HttpLabelProvider {
    client: reqwest::Client,
    base_url: String,
}

impl HttpLabelProvider {
    /// Creates a client against the given base URL.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_timeout(base_url, Duration::from_secs(30))
    }

    /// Creates a client with an explicit per-request timeout.
    pub fn with_timeout(base_url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(timeout)
                .build()
                .unwrap_or_default(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn purchase_from(&self, body: PurchaseApiResponse) -> LabelPurchase {
        LabelPurchase {
            purchase_id: body.object_id,
            status: body.status,
            tracking_number: body.tracking_number,
            label_url: body.label_url,
        }
    }
}

#[async_trait]
impl LabelProvider for HttpLabelProvider {
    #[instrument(skip(self, request))]
    async fn create_shipment(&self, request: &ShipmentRequest) -> Result<Vec<Rate>, LabelError> {
        let url = format!("{}/shipments", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(&ShipmentApiRequest {
                address_from: &request.sender,
                address_to: &request.recipient,
                parcels: [&request.parcel],
            })
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(LabelError::Unavailable(format!(
                "shipment creation returned {}",
                response.status()
            )));
        }

        let body: ShipmentApiResponse = response.json().await?;
        Ok(body
            .rates
            .into_iter()
            .map(|rate| Rate {
                rate_id: rate.object_id,
                provider: rate.provider,
                service: rate.servicelevel,
                amount: rate.amount,
            })
            .collect())
    }

    #[instrument(skip(self))]
    async fn purchase_label(&self, rate_id: &str) -> Result<LabelPurchase, LabelError> {
        let url = format!("{}/transactions", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(&PurchaseApiRequest {
                rate: rate_id,
                label_file_type: "PDF",
            })
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(LabelError::Unavailable(format!(
                "label purchase returned {}",
                response.status()
            )));
        }
        Ok(self.purchase_from(response.json().await?))
    }

    #[instrument(skip(self))]
    async fn get_purchase(&self, purchase_id: &str) -> Result<LabelPurchase, LabelError> {
        let url = format!("{}/transactions/{purchase_id}", self.base_url);
        let response = self.client.get(&url).send().await?;

        if !response.status().is_success() {
            return Err(LabelError::Unavailable(format!(
                "purchase lookup returned {}",
                response.status()
            )));
        }
        Ok(self.purchase_from(response.json().await?))
    }
}
