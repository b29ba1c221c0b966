//! HTTP admin surface for the order status engine.
//!
//! Exposes order intake, status transitions (single and bulk), payment
//! status updates, and the payment-gateway webhook, with structured
//! logging (tracing) and Prometheus metrics.

pub mod config;
pub mod error;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use engine::{
    EngineConfig, PaymentConfig, PaymentConfigCache, StaticConfigSource, TransitionController,
};
use metrics_exporter_prometheus::PrometheusHandle;
use order_store::{InMemoryStore, LedgerStore, OrderStore};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use routes::orders::AppState;

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<S: OrderStore + LedgerStore + 'static>(
    state: Arc<AppState<S>>,
    metrics_handle: PrometheusHandle,
) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::get))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check))
        .route("/orders", post(routes::orders::create::<S>))
        .route("/orders/status", post(routes::orders::update_status_bulk::<S>))
        .route("/orders/{key}", get(routes::orders::get::<S>))
        .route("/orders/{key}/status", post(routes::orders::update_status::<S>))
        .route(
            "/orders/{key}/payment-status",
            post(routes::orders::update_payment_status::<S>),
        )
        .route("/payments/callback", post(routes::payments::callback::<S>))
        .route(
            "/payments/config/refresh",
            post(routes::payments::refresh_config::<S>),
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

/// Creates application state over the given store.
pub fn create_state<S: OrderStore + LedgerStore + 'static>(
    store: S,
    engine_config: EngineConfig,
    payment_config: PaymentConfig,
) -> Arc<AppState<S>> {
    Arc::new(AppState {
        controller: TransitionController::new(store, engine_config),
        payment_config: PaymentConfigCache::new(
            StaticConfigSource(payment_config.clone()),
            payment_config,
        ),
    })
}

/// Creates application state backed by the in-memory store.
pub fn create_default_state() -> Arc<AppState<InMemoryStore>> {
    create_state(
        InMemoryStore::new(),
        EngineConfig::default(),
        config::Config::default().payment,
    )
}
