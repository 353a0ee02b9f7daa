//! Payment processor trait with in-memory and HTTP implementations.
//!
//! The processor is the card network boundary: it knows customer
//! references and charge IDs, nothing about orders. Amounts cross this
//! boundary in minor units (cents).

use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::error::PaymentError;

/// Result of a successful charge.
#[derive(Debug, Clone, PartialEq)]
pub struct ChargeResult {
    /// The charge ID assigned by the processor, e.g. `pi_0001`.
    pub transaction_id: String,
}

/// Trait for charging and refunding against the payment processor.
#[async_trait]
pub trait PaymentProcessor: Send + Sync {
    /// Charges the given customer for `amount_cents` off-session.
    async fn charge(
        &self,
        customer_ref: &str,
        amount_cents: i64,
    ) -> Result<ChargeResult, PaymentError>;

    /// Refunds a previously made charge in full.
    async fn refund(&self, transaction_id: &str) -> Result<(), PaymentError>;
}

#[derive(Debug, Default)]
struct InMemoryProcessorState {
    charges: HashMap<String, (String, i64)>,
    refunds: Vec<String>,
    next_id: u32,
    decline_charges: bool,
    fail_on_charge: bool,
}

/// In-memory processor for standalone mode and tests.
#[derive(Debug, Clone, Default)]
pub struct InMemoryProcessor {
    state: Arc<RwLock<InMemoryProcessorState>>,
}

impl InMemoryProcessor {
    /// Creates a new processor with no charges.
    pub fn new() -> Self {
        Self::default()
    }

    /// Configures the processor to decline charges.
    pub fn set_decline_charges(&self, decline: bool) {
        self.state.write().unwrap().decline_charges = decline;
    }

    /// Configures the processor to fail charges as unreachable.
    pub fn set_fail_on_charge(&self, fail: bool) {
        self.state.write().unwrap().fail_on_charge = fail;
    }

    /// Returns the number of successful charges.
    pub fn charge_count(&self) -> usize {
        self.state.read().unwrap().charges.len()
    }

    /// Returns true if the charge has been refunded.
    pub fn is_refunded(&self, transaction_id: &str) -> bool {
        self.state
            .read()
            .unwrap()
            .refunds
            .iter()
            .any(|id| id == transaction_id)
    }
}

#[async_trait]
impl PaymentProcessor for InMemoryProcessor {
    async fn charge(
        &self,
        customer_ref: &str,
        amount_cents: i64,
    ) -> Result<ChargeResult, PaymentError> {
        let mut state = self.state.write().unwrap();

        if state.fail_on_charge {
            return Err(PaymentError::Unavailable(
                "payment processor offline".to_string(),
            ));
        }
        if state.decline_charges {
            return Err(PaymentError::Declined {
                code: "card_declined".to_string(),
                message: "Your card was declined".to_string(),
            });
        }

        state.next_id += 1;
        let transaction_id = format!("pi_{:04}", state.next_id);
        state
            .charges
            .insert(transaction_id.clone(), (customer_ref.to_string(), amount_cents));

        Ok(ChargeResult { transaction_id })
    }

    async fn refund(&self, transaction_id: &str) -> Result<(), PaymentError> {
        let mut state = self.state.write().unwrap();
        if !state.charges.contains_key(transaction_id) {
            return Err(PaymentError::Unavailable(format!(
                "no such charge: {transaction_id}"
            )));
        }
        state.refunds.push(transaction_id.to_string());
        Ok(())
    }
}

#[derive(Debug, Serialize)]
struct ChargeRequest<'a> {
    customer: &'a str,
    amount: i64,
    currency: &'static str,
    off_session: bool,
    confirm: bool,
}

#[derive(Debug, Deserialize)]
struct ChargeResponse {
    id: String,
}

#[derive(Debug, Deserialize)]
struct ProcessorErrorBody {
    error: ProcessorErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ProcessorErrorDetail {
    code: String,
    message: String,
}

#[derive(Debug, Serialize)]
struct RefundRequest<'a> {
    payment_intent: &'a str,
}

/// Processor backed by the card processor's HTTP API.
#[derive(Debug, Clone)]
pub struct HttpProcessor {
    client: reqwest::Client,
    base_url: String,
}

impl HttpProcessor {
    /// Creates a client against the given base URL.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_timeout(base_url, Duration::from_secs(10))
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
}

#[async_trait]
impl PaymentProcessor for HttpProcessor {
    #[instrument(skip(self, customer_ref))]
    async fn charge(
        &self,
        customer_ref: &str,
        amount_cents: i64,
    ) -> Result<ChargeResult, PaymentError> {
        let url = format!("{}/charges", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(&ChargeRequest {
                customer: customer_ref,
                amount: amount_cents,
                currency: "usd",
                off_session: true,
                confirm: true,
            })
            .send()
            .await?;

        if response.status() == reqwest::StatusCode::PAYMENT_REQUIRED {
            let body: ProcessorErrorBody = response.json().await?;
            return Err(PaymentError::Declined {
                code: body.error.code,
                message: body.error.message,
            });
        }
        if !response.status().is_success() {
            return Err(PaymentError::Unavailable(format!(
                "processor returned {}",
                response.status()
            )));
        }

        let body: ChargeResponse = response.json().await?;
        Ok(ChargeResult {
            transaction_id: body.id,
        })
    }

    #[instrument(skip(self))]
    async fn refund(&self, transaction_id: &str) -> Result<(), PaymentError> {
        let url = format!("{}/refunds", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(&RefundRequest {
                payment_intent: transaction_id,
            })
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(PaymentError::Unavailable(format!(
                "processor returned {}",
                response.status()
            )));
        }
        Ok(())
    }
}
