//! Integration tests for the API server.

use std::sync::OnceLock;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use common::{Money, ProductId, UserId};
use consumers::ShippingStore;
use directory::user::sample_user;
use directory::{Dimensions, Notice, Product};
use metrics_exporter_prometheus::PrometheusHandle;
use tower::ServiceExt;

static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

fn get_metrics_handle() -> PrometheusHandle {
    METRICS_HANDLE
        .get_or_init(|| {
            let builder = metrics_exporter_prometheus::PrometheusBuilder::new();
            builder
                .install_recorder()
                .expect("failed to install Prometheus recorder")
        })
        .clone()
}

fn setup() -> (axum::Router, api::StandaloneHandles) {
    let config = api::config::Config {
        shipping_poll_delay: Duration::from_millis(1),
        ..api::config::Config::default()
    };
    let (state, handles) = api::create_default_state(&config);
    let app = api::create_app(state, get_metrics_handle());

    handles.products.insert(Product {
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
    handles.users.insert(sample_user(UserId::new(1), "Owen", "owner@example.com"));
    handles.users.insert(sample_user(UserId::new(42), "Ada", "ada@example.com"));

    (app, handles)
}

async fn get_json(app: &axum::Router, uri: &str) -> (StatusCode, serde_json::Value) {
    let response = app
        .clone()
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = serde_json::from_slice(&body).unwrap_or(serde_json::Value::Null);
    (status, json)
}

async fn post_json(
    app: &axum::Router,
    uri: &str,
    body: Option<serde_json::Value>,
) -> (StatusCode, serde_json::Value) {
    let request = match body {
        Some(value) => Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_string(&value).unwrap()))
            .unwrap(),
        None => Request::builder()
            .method("POST")
            .uri(uri)
            .body(Body::empty())
            .unwrap(),
    };
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = serde_json::from_slice(&body).unwrap_or(serde_json::Value::Null);
    (status, json)
}

async fn patch_json(
    app: &axum::Router,
    uri: &str,
    body: serde_json::Value,
) -> (StatusCode, serde_json::Value) {
    let request = Request::builder()
        .method("PATCH")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_string(&body).unwrap()))
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = serde_json::from_slice(&body).unwrap_or(serde_json::Value::Null);
    (status, json)
}

fn order_body() -> serde_json::Value {
    serde_json::json!({
        "paymentAmount": 120.0,
        "productID": 7,
        "renterID": 1,
        "userID": 42,
        "startDate": "2025-03-01T10:00:00Z",
        "endDate": "2025-03-04T10:00:00Z"
    })
}

async fn register_customer(app: &axum::Router) {
    let (status, _) = post_json(
        app,
        "/customers",
        Some(serde_json::json!({ "userID": 42, "email": "ada@example.com" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
}

async fn create_order(app: &axum::Router) -> String {
    let (status, json) = post_json(app, "/orders", Some(order_body())).await;
    assert_eq!(status, StatusCode::CREATED);
    json["orderID"].as_str().unwrap().to_string()
}

async fn wait_until(mut condition: impl FnMut() -> bool) {
    for _ in 0..200 {
        if condition() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("condition not reached in time");
}

#[tokio::test]
async fn test_health_check() {
    let (app, _) = setup();
    let (status, json) = get_json(&app, "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "ok");
    assert_eq!(json["service"], "rently-api");
}

#[tokio::test]
async fn test_metrics_endpoint() {
    let (app, _) = setup();
    let response = app
        .oneshot(
            Request::builder()
                .uri("/metrics")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let content_type = response.headers()["content-type"].to_str().unwrap();
    assert!(content_type.starts_with("text/plain"));
}

#[tokio::test]
async fn test_create_order() {
    let (app, _) = setup();

    let (status, json) = post_json(&app, "/orders", Some(order_body())).await;
    assert_eq!(status, StatusCode::CREATED);
    assert!(json["orderID"].as_str().is_some());
    assert_eq!(json["status"], "pending");
    assert_eq!(json["paymentAmount"], 120.0);
    assert_eq!(json["dailyRate"], 40.0);
}

#[tokio::test]
async fn test_create_order_with_invalid_period() {
    let (app, _) = setup();

    let mut body = order_body();
    body["endDate"] = body["startDate"].clone();
    let (status, json) = post_json(&app, "/orders", Some(body)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json["error"].as_str().unwrap().contains("rental period"));
}

#[tokio::test]
async fn test_get_unknown_order() {
    let (app, _) = setup();
    let (status, json) = get_json(&app, "/orders/missing").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(json["error"].as_str().is_some());
}

#[tokio::test]
async fn test_confirm_flow_end_to_end() {
    let (app, handles) = setup();
    register_customer(&app).await;
    let order_id = create_order(&app).await;

    let (status, json) = post_json(&app, &format!("/orders/{order_id}/confirm"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "paid");
    assert_eq!(json["transactionID"], "pi_0001");
    assert_eq!(json["published"], true);

    // The shipping consumer picks the event up asynchronously.
    let store = handles.shipping_store.clone();
    let mut ready = false;
    for _ in 0..200 {
        if let Some(record) = store.get(&order_id).await {
            if record.status == consumers::ShippingStatus::LabelCreated {
                ready = true;
                break;
            }
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert!(ready, "label never created");

    let (status, json) = get_json(&app, &format!("/shipping/{order_id}")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "label_created");
    assert!(!json["trackingNumber"].as_str().unwrap().is_empty());
    assert!(!json["labelURL"].as_str().unwrap().is_empty());

    // The inventory consumer marks the product unavailable.
    wait_until(|| handles.products.is_available(ProductId::new(7)) == Some(false)).await;

    let (status, json) =
        post_json(&app, &format!("/orders/{order_id}/notify-shipping"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["orderID"], order_id);

    let (status, json) = get_json(&app, &format!("/orders/{order_id}")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "shipping");

    let shipped = handles
        .notifier
        .sent()
        .into_iter()
        .any(|notice| matches!(notice, Notice::Shipped { .. }));
    assert!(shipped, "no shipped notice sent");
}

#[tokio::test]
async fn test_confirm_declined_payment() {
    let (app, handles) = setup();
    register_customer(&app).await;
    let order_id = create_order(&app).await;
    handles.processor.set_decline_charges(true);

    let (status, json) = post_json(&app, &format!("/orders/{order_id}/confirm"), None).await;
    assert_eq!(status, StatusCode::PAYMENT_REQUIRED);
    assert!(json["error"].as_str().unwrap().contains("declined"));

    let (status, json) = get_json(&app, &format!("/orders/{order_id}")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "payment_failed");

    // The notification consumer emails the buyer.
    let notifier = handles.notifier.clone();
    wait_until(move || {
        notifier
            .sent()
            .into_iter()
            .any(|notice| matches!(notice, Notice::PaymentFailed { .. }))
    })
    .await;
}

#[tokio::test]
async fn test_confirm_unknown_order_never_charges() {
    let (app, handles) = setup();

    let (status, _) = post_json(&app, "/orders/missing/confirm", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(handles.processor.charge_count(), 0);
}

#[tokio::test]
async fn test_refund_after_confirm() {
    let (app, _) = setup();
    register_customer(&app).await;
    let order_id = create_order(&app).await;
    post_json(&app, &format!("/orders/{order_id}/confirm"), None).await;

    let (status, json) = post_json(&app, &format!("/orders/{order_id}/refund"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["refunded"], true);
    assert_eq!(json["transactionID"], "pi_0001");

    let (status, _) = post_json(&app, &format!("/orders/{order_id}/refund"), None).await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_mark_order_late_then_refund() {
    // The expiry scanner path: a paid order past its end date is marked
    // late over PATCH, shows up in the overdue listing, and its charge
    // can still be refunded.
    let (app, _) = setup();
    register_customer(&app).await;
    let order_id = create_order(&app).await;
    post_json(&app, &format!("/orders/{order_id}/confirm"), None).await;

    let (status, json) = patch_json(
        &app,
        &format!("/orders/{order_id}"),
        serde_json::json!({ "status": "late" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "late");

    let (status, json) = get_json(&app, "/orders/overdue").await;
    assert_eq!(status, StatusCode::OK);
    let listed = json
        .as_array()
        .unwrap()
        .iter()
        .any(|order| order["orderID"] == order_id.as_str());
    assert!(listed, "late order missing from overdue listing");

    let (status, json) = post_json(&app, &format!("/orders/{order_id}/refund"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["refunded"], true);
}

#[tokio::test]
async fn test_update_status_rejects_invalid_transition() {
    let (app, _) = setup();
    let order_id = create_order(&app).await;

    // pending -> paid skips the payment step.
    let (status, json) = patch_json(
        &app,
        &format!("/orders/{order_id}"),
        serde_json::json!({ "status": "paid" }),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(json["error"].as_str().is_some());

    let (status, _) = patch_json(
        &app,
        "/orders/missing",
        serde_json::json!({ "status": "late" }),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_transaction_lookup() {
    let (app, _) = setup();
    register_customer(&app).await;
    let order_id = create_order(&app).await;

    let (status, _) = get_json(&app, &format!("/orders/{order_id}/transaction")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    post_json(&app, &format!("/orders/{order_id}/confirm"), None).await;

    let (status, json) = get_json(&app, &format!("/orders/{order_id}/transaction")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["transactionID"], "pi_0001");
    assert_eq!(json["amount"], 120.0);
    assert_eq!(json["refunded"], false);
}

#[tokio::test]
async fn test_register_customer_twice_is_conflict() {
    let (app, _) = setup();
    register_customer(&app).await;

    let (status, _) = post_json(
        &app,
        "/customers",
        Some(serde_json::json!({ "userID": 42, "email": "other@example.com" })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    // The original registration survives.
    let (status, json) = get_json(&app, "/customers/42").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["email"], "ada@example.com");
}

#[tokio::test]
async fn test_notify_shipping_without_record() {
    let (app, _) = setup();
    register_customer(&app).await;
    let order_id = create_order(&app).await;

    let (status, _) =
        post_json(&app, &format!("/orders/{order_id}/notify-shipping"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
