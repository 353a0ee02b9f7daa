//! Prometheus metrics endpoint.
//!
//! Renders every counter the pipeline records, including
//! `ledger_orders_created`, `confirm_orders_paid`,
//! `confirm_payments_declined`, `publish_unroutable`, and the per-queue
//! `consumer_messages_{received,processed,parked}` family.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use metrics_exporter_prometheus::PrometheusHandle;

/// GET /metrics — returns the Prometheus exposition-format snapshot.
pub async fn get(State(handle): State<PrometheusHandle>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(
            axum::http::header::CONTENT_TYPE,
            "text/plain; version=0.0.4; charset=utf-8",
        )],
        handle.render(),
    )
}
