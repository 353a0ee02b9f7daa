//! Order CRUD, confirmation, and refund endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use broker::EventPublisher;
use chrono::{DateTime, Utc};
use common::{Money, OrderId, ProductId, UserId};
use consumers::ShippingStore;
use directory::{Notifier, ProductDirectory, UserDirectory};
use ledger::{NewOrder, OrderRecord, OrderStatus, OrderStore};
use orchestrator::{ConfirmationOrchestrator, ConfirmationResult};
use payments::{PaymentGateway, TransactionRecord};
use serde::{Deserialize, Serialize};

use crate::error::ApiError;

/// Shared application state accessible from all handlers.
pub struct AppState<S, G, P, U, N, B, H>
where
    S: OrderStore,
    G: PaymentGateway,
    P: ProductDirectory,
    U: UserDirectory,
    N: Notifier,
    B: EventPublisher,
    H: ShippingStore,
{
    pub orchestrator: ConfirmationOrchestrator<S, G, P, U, N, B>,
    pub shipping: H,
}

// -- Request types --

#[derive(Deserialize)]
pub struct CreateOrderRequest {
    /// Total rental price in major units, e.g. `120.0`.
    #[serde(rename = "paymentAmount")]
    pub payment_amount: f64,
    #[serde(rename = "productID")]
    pub product_id: i64,
    #[serde(rename = "renterID")]
    pub renter_id: i64,
    #[serde(rename = "userID")]
    pub user_id: i64,
    #[serde(rename = "startDate")]
    pub start_date: DateTime<Utc>,
    #[serde(rename = "endDate")]
    pub end_date: DateTime<Utc>,
}

#[derive(Deserialize)]
pub struct UpdateStatusRequest {
    pub status: OrderStatus,
}

// -- Response types --

#[derive(Serialize)]
pub struct OrderResponse {
    #[serde(rename = "orderID")]
    pub order_id: String,
    pub status: OrderStatus,
    #[serde(rename = "paymentAmount")]
    pub payment_amount: f64,
    #[serde(rename = "dailyRate")]
    pub daily_rate: f64,
    #[serde(rename = "productID")]
    pub product_id: i64,
    #[serde(rename = "renterID")]
    pub renter_id: i64,
    #[serde(rename = "userID")]
    pub user_id: i64,
    #[serde(rename = "startDate")]
    pub start_date: DateTime<Utc>,
    #[serde(rename = "endDate")]
    pub end_date: DateTime<Utc>,
}

impl From<OrderRecord> for OrderResponse {
    fn from(record: OrderRecord) -> Self {
        Self {
            order_id: record.order_id.to_string(),
            status: record.status,
            payment_amount: record.payment_amount.as_major_f64(),
            daily_rate: record.daily_rate.as_major_f64(),
            product_id: record.product_id.value(),
            renter_id: record.renter_id.value(),
            user_id: record.user_id.value(),
            start_date: record.start_date,
            end_date: record.end_date,
        }
    }
}

#[derive(Serialize)]
pub struct TransactionResponse {
    #[serde(rename = "orderID")]
    pub order_id: String,
    #[serde(rename = "transactionID")]
    pub transaction_id: String,
    /// Major units, matching the transaction-event wire format.
    pub amount: f64,
    pub refunded: bool,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
}

impl From<TransactionRecord> for TransactionResponse {
    fn from(record: TransactionRecord) -> Self {
        Self {
            order_id: record.order_id.to_string(),
            transaction_id: record.transaction_id,
            amount: record.amount.as_major_f64(),
            refunded: record.refunded,
            created_at: record.created_at,
        }
    }
}

// -- Handlers --

/// POST /orders — create a new rental order in `pending` status.
#[tracing::instrument(skip(state, req))]
pub async fn create<S, G, P, U, N, B, H>(
    State(state): State<Arc<AppState<S, G, P, U, N, B, H>>>,
    Json(req): Json<CreateOrderRequest>,
) -> Result<(StatusCode, Json<OrderResponse>), ApiError>
where
    S: OrderStore + 'static,
    G: PaymentGateway + 'static,
    P: ProductDirectory + 'static,
    U: UserDirectory + 'static,
    N: Notifier + 'static,
    B: EventPublisher + 'static,
    H: ShippingStore + 'static,
{
    let payment_amount = Money::try_from_major_f64(req.payment_amount)
        .map_err(|e| ApiError::BadRequest(format!("Invalid paymentAmount: {}", e.0)))?;

    let record = state
        .orchestrator
        .create_order(NewOrder {
            payment_amount,
            product_id: ProductId::new(req.product_id),
            renter_id: UserId::new(req.renter_id),
            user_id: UserId::new(req.user_id),
            start_date: req.start_date,
            end_date: req.end_date,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(record.into())))
}

/// GET /orders/:id — load an order document by ID.
#[tracing::instrument(skip(state))]
pub async fn get<S, G, P, U, N, B, H>(
    State(state): State<Arc<AppState<S, G, P, U, N, B, H>>>,
    Path(id): Path<String>,
) -> Result<Json<OrderResponse>, ApiError>
where
    S: OrderStore + 'static,
    G: PaymentGateway + 'static,
    P: ProductDirectory + 'static,
    U: UserDirectory + 'static,
    N: Notifier + 'static,
    B: EventPublisher + 'static,
    H: ShippingStore + 'static,
{
    let order_id = OrderId::from(id.as_str());
    let record = state
        .orchestrator
        .ledger()
        .get_order(&order_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Order {id} not found")))?;

    Ok(Json(record.into()))
}

/// PATCH /orders/:id — transition an order to a new status.
///
/// The external expiry scanner drives the off-path transitions through
/// here, marking overdue rentals `late` and returned ones `completed`.
/// The ledger validates the transition; an invalid one is a 409.
#[tracing::instrument(skip(state, req))]
pub async fn update_status<S, G, P, U, N, B, H>(
    State(state): State<Arc<AppState<S, G, P, U, N, B, H>>>,
    Path(id): Path<String>,
    Json(req): Json<UpdateStatusRequest>,
) -> Result<Json<OrderResponse>, ApiError>
where
    S: OrderStore + 'static,
    G: PaymentGateway + 'static,
    P: ProductDirectory + 'static,
    U: UserDirectory + 'static,
    N: Notifier + 'static,
    B: EventPublisher + 'static,
    H: ShippingStore + 'static,
{
    let order_id = OrderId::from(id.as_str());
    let record = state
        .orchestrator
        .ledger()
        .update_status(&order_id, req.status)
        .await?;

    Ok(Json(record.into()))
}

/// GET /orders/overdue — orders whose rental period has lapsed.
#[tracing::instrument(skip(state))]
pub async fn overdue<S, G, P, U, N, B, H>(
    State(state): State<Arc<AppState<S, G, P, U, N, B, H>>>,
) -> Result<Json<Vec<OrderResponse>>, ApiError>
where
    S: OrderStore + 'static,
    G: PaymentGateway + 'static,
    P: ProductDirectory + 'static,
    U: UserDirectory + 'static,
    N: Notifier + 'static,
    B: EventPublisher + 'static,
    H: ShippingStore + 'static,
{
    let records = state
        .orchestrator
        .ledger()
        .overdue_orders(Utc::now())
        .await?;

    Ok(Json(records.into_iter().map(Into::into).collect()))
}

/// POST /orders/:id/confirm — run the confirmation pipeline.
#[tracing::instrument(skip(state))]
pub async fn confirm<S, G, P, U, N, B, H>(
    State(state): State<Arc<AppState<S, G, P, U, N, B, H>>>,
    Path(id): Path<String>,
) -> Result<Json<ConfirmationResult>, ApiError>
where
    S: OrderStore + 'static,
    G: PaymentGateway + 'static,
    P: ProductDirectory + 'static,
    U: UserDirectory + 'static,
    N: Notifier + 'static,
    B: EventPublisher + 'static,
    H: ShippingStore + 'static,
{
    let order_id = OrderId::from(id.as_str());
    let result = state.orchestrator.confirm(&order_id).await?;
    Ok(Json(result))
}

/// POST /orders/:id/refund — refund the charge behind an order.
#[tracing::instrument(skip(state))]
pub async fn refund<S, G, P, U, N, B, H>(
    State(state): State<Arc<AppState<S, G, P, U, N, B, H>>>,
    Path(id): Path<String>,
) -> Result<Json<TransactionResponse>, ApiError>
where
    S: OrderStore + 'static,
    G: PaymentGateway + 'static,
    P: ProductDirectory + 'static,
    U: UserDirectory + 'static,
    N: Notifier + 'static,
    B: EventPublisher + 'static,
    H: ShippingStore + 'static,
{
    let order_id = OrderId::from(id.as_str());
    let record = state.orchestrator.refund(&order_id).await?;
    Ok(Json(record.into()))
}

/// GET /orders/:id/transaction — the charge recorded against an order.
#[tracing::instrument(skip(state))]
pub async fn transaction<S, G, P, U, N, B, H>(
    State(state): State<Arc<AppState<S, G, P, U, N, B, H>>>,
    Path(id): Path<String>,
) -> Result<Json<TransactionResponse>, ApiError>
where
    S: OrderStore + 'static,
    G: PaymentGateway + 'static,
    P: ProductDirectory + 'static,
    U: UserDirectory + 'static,
    N: Notifier + 'static,
    B: EventPublisher + 'static,
    H: ShippingStore + 'static,
{
    let order_id = OrderId::from(id.as_str());
    let record = state.orchestrator.gateway().get_transaction(&order_id).await?;
    Ok(Json(record.into()))
}
