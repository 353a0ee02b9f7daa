//! HTTP clients for the user directory and notification services.

use std::time::Duration;

use async_trait::async_trait;
use common::UserId;
use serde::Deserialize;
use tracing::instrument;

use crate::error::DirectoryError;
use crate::notify::{Notice, Notifier};
use crate::user::{UserDetails, UserDirectory};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

fn build_client(timeout: Duration) -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .unwrap_or_default()
}

/// Envelope around the user service's response body.
#[derive(Debug, Deserialize)]
struct UserInfoResponse {
    details: UserInfoDetails,
}

#[derive(Debug, Deserialize)]
struct UserInfoDetails {
    name: String,
    email: String,
    street1: String,
    city: String,
    state: String,
    zip: String,
    country: String,
    phone: String,
}

/// User directory backed by the user service's HTTP API.
#[derive(Debug, Clone)]
pub struct HttpUserDirectory {
    client: reqwest::Client,
    base_url: String,
}

impl HttpUserDirectory {
    /// Creates a client against the given base URL, e.g.
    /// `http://users.internal:5000`.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_timeout(base_url, DEFAULT_TIMEOUT)
    }

    /// Creates a client with an explicit per-request timeout.
    pub fn with_timeout(base_url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            client: build_client(timeout),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl UserDirectory for HttpUserDirectory {
    #[instrument(skip(self))]
    async fn get_user(&self, user_id: UserId) -> Result<UserDetails, DirectoryError> {
        let url = format!("{}/getUserInfo", self.base_url);
        let response = self
            .client
            .get(&url)
            .query(&[("id", user_id.value())])
            .send()
            .await?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(DirectoryError::UserNotFound(user_id));
        }
        if !response.status().is_success() {
            return Err(DirectoryError::Unavailable(format!(
                "user service returned {}",
                response.status()
            )));
        }

        let body: UserInfoResponse = response.json().await?;
        Ok(UserDetails {
            user_id,
            name: body.details.name,
            email: body.details.email,
            street1: body.details.street1,
            city: body.details.city,
            state: body.details.state,
            zip: body.details.zip,
            country: body.details.country,
            phone: body.details.phone,
        })
    }
}

/// Notifier backed by the notification service's HTTP API.
#[derive(Debug, Clone)]
pub struct HttpNotifier {
    client: reqwest::Client,
    base_url: String,
}

impl HttpNotifier {
    /// Creates a client against the given base URL.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_timeout(base_url, DEFAULT_TIMEOUT)
    }

    /// Creates a client with an explicit per-request timeout.
    pub fn with_timeout(base_url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            client: build_client(timeout),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn endpoint(notice: &Notice) -> &'static str {
        match notice {
            Notice::RentalRequested { .. } => "/notifyRentalRequest",
            Notice::PaymentFailed { .. } => "/notifyPaymentFailed",
            Notice::Shipped { .. } => "/notifyShipped",
        }
    }
}

#[async_trait]
impl Notifier for HttpNotifier {
    #[instrument(skip(self, notice))]
    async fn send(&self, notice: Notice) -> Result<(), DirectoryError> {
        let url = format!("{}{}", self.base_url, Self::endpoint(&notice));
        let response = self.client.post(&url).json(&notice).send().await?;

        if !response.status().is_success() {
            return Err(DirectoryError::Unavailable(format!(
                "notification service returned {}",
                response.status()
            )));
        }
        Ok(())
    }
}
