//! Shipping record lookups and the shipped-notification composite.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use broker::EventPublisher;
use common::OrderId;
use consumers::{ShippingRecord, ShippingStatus, ShippingStore};
use directory::{Notifier, ProductDirectory, UserDirectory};
use ledger::OrderStore;
use payments::PaymentGateway;
use serde::Serialize;

use crate::error::ApiError;
use crate::routes::orders::AppState;

#[derive(Serialize)]
pub struct ShippingResponse {
    #[serde(rename = "orderID")]
    pub order_id: String,
    pub status: ShippingStatus,
    #[serde(rename = "trackingNumber")]
    pub tracking_number: String,
    #[serde(rename = "labelURL")]
    pub label_url: String,
    pub carrier: String,
    pub service: String,
    #[serde(rename = "retryCount")]
    pub retry_count: u32,
}

impl From<ShippingRecord> for ShippingResponse {
    fn from(record: ShippingRecord) -> Self {
        Self {
            order_id: record.order_id,
            status: record.status,
            tracking_number: record.tracking_number,
            label_url: record.label_url,
            carrier: record.carrier,
            service: record.service,
            retry_count: record.retry_count,
        }
    }
}

#[derive(Serialize)]
pub struct NotifiedResponse {
    #[serde(rename = "orderID")]
    pub order_id: String,
    #[serde(rename = "trackingNumber")]
    pub tracking_number: String,
}

/// GET /shipping/:order_id — the shipping record for an order.
#[tracing::instrument(skip(state))]
pub async fn get<S, G, P, U, N, B, H>(
    State(state): State<Arc<AppState<S, G, P, U, N, B, H>>>,
    Path(id): Path<String>,
) -> Result<Json<ShippingResponse>, ApiError>
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
        .shipping
        .get(&id)
        .await
        .ok_or_else(|| ApiError::NotFound(format!("No shipping record for order {id}")))?;

    Ok(Json(record.into()))
}

/// POST /orders/:id/notify-shipping — email both parties the label and
/// move the order to `shipping`.
///
/// The label must already exist; a record still in `processing` means
/// the shipping consumer has not finished with the order yet.
#[tracing::instrument(skip(state))]
pub async fn notify<S, G, P, U, N, B, H>(
    State(state): State<Arc<AppState<S, G, P, U, N, B, H>>>,
    Path(id): Path<String>,
) -> Result<Json<NotifiedResponse>, ApiError>
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
        .shipping
        .get(&id)
        .await
        .ok_or_else(|| ApiError::NotFound(format!("No shipping record for order {id}")))?;

    if record.status != ShippingStatus::LabelCreated {
        return Err(ApiError::Conflict(format!(
            "Shipping label for order {id} is not ready"
        )));
    }

    let order_id = OrderId::from(id.as_str());
    state
        .orchestrator
        .notify_shipping(&order_id, &record.tracking_number, &record.label_url)
        .await?;

    Ok(Json(NotifiedResponse {
        order_id: record.order_id,
        tracking_number: record.tracking_number,
    }))
}
