//! HTTP API server with observability for the rental order pipeline.
//!
//! Exposes the orchestrator over REST: order creation and confirmation,
//! refunds, payment customer registration, and the shipped-notification
//! composite, with structured logging (tracing) and Prometheus metrics.

pub mod config;
pub mod error;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use broker::EventPublisher;
use consumers::ShippingStore;
use directory::{Notifier, ProductDirectory, UserDirectory};
use ledger::OrderStore;
use metrics_exporter_prometheus::PrometheusHandle;
use payments::PaymentGateway;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use routes::orders::AppState;

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<S, G, P, U, N, B, H>(
    state: Arc<AppState<S, G, P, U, N, B, H>>,
    metrics_handle: PrometheusHandle,
) -> Router
where
    S: OrderStore + 'static,
    G: PaymentGateway + 'static,
    P: ProductDirectory + 'static,
    U: UserDirectory + 'static,
    N: Notifier + 'static,
    B: EventPublisher + 'static,
    H: ShippingStore + 'static,
{
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::get))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check))
        .route("/orders", post(routes::orders::create::<S, G, P, U, N, B, H>))
        .route(
            "/orders/overdue",
            get(routes::orders::overdue::<S, G, P, U, N, B, H>),
        )
        .route(
            "/orders/{id}",
            get(routes::orders::get::<S, G, P, U, N, B, H>)
                .patch(routes::orders::update_status::<S, G, P, U, N, B, H>),
        )
        .route(
            "/orders/{id}/confirm",
            post(routes::orders::confirm::<S, G, P, U, N, B, H>),
        )
        .route(
            "/orders/{id}/refund",
            post(routes::orders::refund::<S, G, P, U, N, B, H>),
        )
        .route(
            "/orders/{id}/transaction",
            get(routes::orders::transaction::<S, G, P, U, N, B, H>),
        )
        .route(
            "/orders/{id}/notify-shipping",
            post(routes::shipping::notify::<S, G, P, U, N, B, H>),
        )
        .route(
            "/shipping/{id}",
            get(routes::shipping::get::<S, G, P, U, N, B, H>),
        )
        .route(
            "/customers",
            post(routes::customers::register::<S, G, P, U, N, B, H>),
        )
        .route(
            "/customers/{id}",
            get(routes::customers::get::<S, G, P, U, N, B, H>),
        )
        .with_state(state)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}

/// The all-in-memory assembly used in standalone mode and tests.
pub type DefaultState = AppState<
    ledger::InMemoryOrderStore,
    payments::ProcessorGateway<
        payments::InMemoryProcessor,
        payments::InMemoryCustomerVault,
        payments::InMemoryTransactionLog,
    >,
    directory::InMemoryProductDirectory,
    directory::InMemoryUserDirectory,
    directory::InMemoryNotifier,
    broker::InMemoryBroker,
    consumers::InMemoryShippingStore,
>;

/// Handles onto the in-memory services behind a [`DefaultState`], for
/// seeding data and observing side effects.
pub struct StandaloneHandles {
    pub broker: broker::InMemoryBroker,
    pub processor: payments::InMemoryProcessor,
    pub products: directory::InMemoryProductDirectory,
    pub users: directory::InMemoryUserDirectory,
    pub notifier: directory::InMemoryNotifier,
    pub shipping_store: consumers::InMemoryShippingStore,
    pub label_provider: consumers::InMemoryLabelProvider,
    /// The consumer loops, one per queue; dropping the handles leaves
    /// the loops running, aborting them stops consumption.
    pub consumer_tasks: Vec<tokio::task::JoinHandle<()>>,
}

/// Creates the default application state with in-memory services and
/// spawns one consumer loop per queue. The shipping consumer takes its
/// retry schedule from `config`.
///
/// Must be called from within a Tokio runtime.
pub fn create_default_state(config: &config::Config) -> (Arc<DefaultState>, StandaloneHandles) {
    use broker::topology::{QUEUE_INVENTORY, QUEUE_NOTIFICATION, QUEUE_SHIPPING};
    use consumers::{InventoryConsumer, NotificationConsumer, ShippingConsumer};

    let broker = broker::InMemoryBroker::new();
    let processor = payments::InMemoryProcessor::new();
    let products = directory::InMemoryProductDirectory::new();
    let users = directory::InMemoryUserDirectory::new();
    let notifier = directory::InMemoryNotifier::new();
    let shipping_store = consumers::InMemoryShippingStore::new();
    let label_provider = consumers::InMemoryLabelProvider::new();

    let orchestrator = orchestrator::ConfirmationOrchestrator::new(
        ledger::LedgerService::new(ledger::InMemoryOrderStore::new()),
        payments::ProcessorGateway::new(
            processor.clone(),
            payments::InMemoryCustomerVault::new(),
            payments::InMemoryTransactionLog::new(),
        ),
        products.clone(),
        users.clone(),
        notifier.clone(),
        broker.clone(),
    );

    let shipping = ShippingConsumer::with_poll_schedule(
        label_provider.clone(),
        shipping_store.clone(),
        config.shipping_max_retries,
        config.shipping_poll_delay,
    );
    let inventory = InventoryConsumer::new(products.clone());
    let notification = NotificationConsumer::new(notifier.clone());

    let broker_for_shipping = broker.clone();
    let shipping_task = tokio::spawn(async move {
        if let Err(err) = broker_for_shipping.run_consumer(QUEUE_SHIPPING, shipping).await {
            tracing::error!(%err, "shipping consumer loop exited");
        }
    });
    let broker_for_inventory = broker.clone();
    let inventory_task = tokio::spawn(async move {
        if let Err(err) = broker_for_inventory.run_consumer(QUEUE_INVENTORY, inventory).await {
            tracing::error!(%err, "inventory consumer loop exited");
        }
    });
    let broker_for_notification = broker.clone();
    let notification_task = tokio::spawn(async move {
        if let Err(err) = broker_for_notification
            .run_consumer(QUEUE_NOTIFICATION, notification)
            .await
        {
            tracing::error!(%err, "notification consumer loop exited");
        }
    });

    let state = Arc::new(AppState {
        orchestrator,
        shipping: shipping_store.clone(),
    });

    let handles = StandaloneHandles {
        broker,
        processor,
        products,
        users,
        notifier,
        shipping_store,
        label_provider,
        consumer_tasks: vec![shipping_task, inventory_task, notification_task],
    };

    (state, handles)
}
