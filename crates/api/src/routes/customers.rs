//! Payment customer registration endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use broker::EventPublisher;
use common::UserId;
use consumers::ShippingStore;
use directory::{Notifier, ProductDirectory, UserDirectory};
use ledger::OrderStore;
use payments::{CustomerRecord, PaymentGateway};
use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::routes::orders::AppState;

#[derive(Deserialize)]
pub struct RegisterCustomerRequest {
    #[serde(rename = "userID")]
    pub user_id: i64,
    pub email: String,
}

#[derive(Serialize)]
pub struct CustomerResponse {
    #[serde(rename = "userID")]
    pub user_id: i64,
    pub email: String,
    #[serde(rename = "stripeCusID")]
    pub customer_ref: String,
}

impl From<CustomerRecord> for CustomerResponse {
    fn from(record: CustomerRecord) -> Self {
        Self {
            user_id: record.user_id.value(),
            email: record.email,
            customer_ref: record.customer_ref,
        }
    }
}

/// POST /customers — register a payment customer for a user.
#[tracing::instrument(skip(state, req))]
pub async fn register<S, G, P, U, N, B, H>(
    State(state): State<Arc<AppState<S, G, P, U, N, B, H>>>,
    Json(req): Json<RegisterCustomerRequest>,
) -> Result<(StatusCode, Json<CustomerResponse>), ApiError>
where
    S: OrderStore + 'static,
    G: PaymentGateway + 'static,
    P: ProductDirectory + 'static,
    U: UserDirectory + 'static,
    N: Notifier + 'static,
    B: EventPublisher + 'static,
    H: ShippingStore + 'static,
{
    if req.email.is_empty() {
        return Err(ApiError::BadRequest("email must not be empty".to_string()));
    }

    let record = state
        .orchestrator
        .gateway()
        .register_customer(UserId::new(req.user_id), &req.email)
        .await?;

    Ok((StatusCode::CREATED, Json(record.into())))
}

/// GET /customers/:id — the payment customer registered for a user.
#[tracing::instrument(skip(state))]
pub async fn get<S, G, P, U, N, B, H>(
    State(state): State<Arc<AppState<S, G, P, U, N, B, H>>>,
    Path(id): Path<i64>,
) -> Result<Json<CustomerResponse>, ApiError>
where
    S: OrderStore + 'static,
    G: PaymentGateway + 'static,
    P: ProductDirectory + 'static,
    U: UserDirectory + 'static,
    N: Notifier + 'static,
    B: EventPublisher + 'static,
    H: ShippingStore + 'static,
{
    let record = state
        .orchestrator
        .gateway()
        .get_customer(UserId::new(id))
        .await?;

    Ok(Json(record.into()))
}
