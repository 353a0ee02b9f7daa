//! Notification service contract.
//!
//! The marketplace emails users at three points in an order's life:
//! when a rental is requested, when a payment fails, and when a label
//! has been purchased and the item is on its way.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::DirectoryError;

/// One outbound email request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Notice {
    /// Sent to the product owner when someone requests a rental.
    RentalRequested {
        #[serde(rename = "renterEmail")]
        renter_email: String,
        #[serde(rename = "productName")]
        product_name: String,
        #[serde(rename = "prodDesc")]
        product_description: String,
        #[serde(rename = "originalImage")]
        image_url: String,
    },
    /// Sent to the buyer when a charge is declined.
    PaymentFailed {
        #[serde(rename = "userEmail")]
        user_email: String,
        #[serde(rename = "orderID")]
        order_id: String,
        #[serde(rename = "productName")]
        product_name: String,
    },
    /// Sent to both parties once a shipping label exists.
    Shipped {
        #[serde(rename = "userEmail")]
        user_email: String,
        #[serde(rename = "renterEmail")]
        renter_email: String,
        #[serde(rename = "orderID")]
        order_id: String,
        #[serde(rename = "productName")]
        product_name: String,
        #[serde(rename = "trackingNumber")]
        tracking_number: String,
        #[serde(rename = "labelURL")]
        label_url: String,
    },
}

/// Trait for sending marketplace emails.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Delivers one notice.
    async fn send(&self, notice: Notice) -> Result<(), DirectoryError>;
}

#[derive(Debug, Default)]
struct InMemoryNotifierState {
    sent: Vec<Notice>,
    fail_on_send: bool,
}

/// In-memory notifier that records every notice for assertions.
#[derive(Debug, Clone, Default)]
pub struct InMemoryNotifier {
    state: Arc<Mutex<InMemoryNotifierState>>,
}

impl InMemoryNotifier {
    /// Creates a new notifier with nothing sent.
    pub fn new() -> Self {
        Self::default()
    }

    /// Configures the notifier to fail sends.
    pub fn set_fail_on_send(&self, fail: bool) {
        self.state.lock().unwrap().fail_on_send = fail;
    }

    /// Returns every notice sent so far, in order.
    pub fn sent(&self) -> Vec<Notice> {
        self.state.lock().unwrap().sent.clone()
    }

    /// Returns how many notices have been sent.
    pub fn sent_count(&self) -> usize {
        self.state.lock().unwrap().sent.len()
    }
}

#[async_trait]
impl Notifier for InMemoryNotifier {
    async fn send(&self, notice: Notice) -> Result<(), DirectoryError> {
        let mut state = self.state.lock().unwrap();
        if state.fail_on_send {
            return Err(DirectoryError::Unavailable(
                "notification service offline".to_string(),
            ));
        }
        state.sent.push(notice);
        Ok(())
    }
}
