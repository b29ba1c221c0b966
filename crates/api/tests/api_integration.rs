//! Integration tests for the API server.

use axum::body::Body;
use axum::http::{Request, StatusCode};
use chrono::Utc;
use common::{ProductKey, PublicOrderId};
use domain::{ColorStock, NewOrder, Order, OrderStatus, StockLedger};
use engine::{EngineConfig, PaymentConfig};
use metrics_exporter_prometheus::PrometheusHandle;
use order_store::{InMemoryStore, LedgerStore, OrderStore};
use tower::ServiceExt;

use std::sync::OnceLock;

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

fn payment_config(enabled: bool) -> PaymentConfig {
    PaymentConfig {
        merchant_id: "M-STORE".to_string(),
        api_key: "test-key".to_string(),
        callback_url: "https://shop.example/payments/callback".to_string(),
        enabled,
    }
}

fn setup() -> (axum::Router, InMemoryStore) {
    setup_with_payment(payment_config(true))
}

fn setup_with_payment(payment: PaymentConfig) -> (axum::Router, InMemoryStore) {
    let store = InMemoryStore::new();
    let state = api::create_state(store.clone(), EngineConfig::fast(), payment);
    let app = api::create_app(state, get_metrics_handle());
    (app, store)
}

async fn seed_order(store: &InMemoryStore, public_id: &str, product: Option<ProductKey>) -> Order {
    let order = NewOrder {
        product,
        product_name: "Kota Doria".to_string(),
        quantity: 1,
        colors: vec!["red".to_string()],
        amount: 75_000,
        vendor_initial: None,
    }
    .into_order(PublicOrderId::new(public_id), Utc::now());
    store.insert_order(order).await.unwrap()
}

async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

#[tokio::test]
async fn test_health_check() {
    let (app, _) = setup();

    let response = app
        .oneshot(
            Request::builder()
                .uri("/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["status"], "ok");
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
}

#[tokio::test]
async fn test_place_order() {
    let (app, store) = setup();

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/orders")
                .header("content-type", "application/json")
                .body(Body::from(
                    serde_json::to_string(&serde_json::json!({
                        "product": ProductKey::new(),
                        "product_name": "Kota Doria",
                        "quantity": 2,
                        "colors": ["red"],
                        "amount": 150000,
                        "vendor_initial": "k"
                    }))
                    .unwrap(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CREATED);
    let json = body_json(response).await;
    assert_eq!(json["status"], "pending");
    assert_eq!(json["payment_status"], "pending");
    assert!(json["public_id"].as_str().unwrap().contains("_K"));
    assert_eq!(store.order_count().await, 1);
}

#[tokio::test]
async fn test_place_order_requires_product_name() {
    let (app, _) = setup();

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/orders")
                .header("content-type", "application/json")
                .body(Body::from(
                    serde_json::to_string(&serde_json::json!({
                        "product_name": "",
                        "quantity": 1,
                        "amount": 100
                    }))
                    .unwrap(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_get_order() {
    let (app, store) = setup();
    let order = seed_order(&store, "OCT_K01", None).await;

    let response = app
        .oneshot(
            Request::builder()
                .uri(format!("/orders/{}", order.key))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["public_id"], "OCT_K01");
    assert_eq!(json["status"], "pending");
}

#[tokio::test]
async fn test_get_nonexistent_order() {
    let (app, _) = setup();
    let fake_key = uuid::Uuid::new_v4();

    let response = app
        .oneshot(
            Request::builder()
                .uri(format!("/orders/{fake_key}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_invalid_order_key_format() {
    let (app, _) = setup();

    let response = app
        .oneshot(
            Request::builder()
                .uri("/orders/not-a-uuid")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_status_transition_adjusts_inventory() {
    let (app, store) = setup();

    let product = ProductKey::new();
    store
        .insert_ledger(
            product,
            StockLedger::with_colors(vec![ColorStock::new("red", 5)]),
        )
        .await
        .unwrap();
    let order = seed_order(&store, "OCT_K01", Some(product)).await;

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(format!("/orders/{}/status", order.key))
                .header("content-type", "application/json")
                .body(Body::from(r#"{"status":"confirmed"}"#))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["status"], "confirmed");

    assert_eq!(
        store.read_status(order.key).await.unwrap().status,
        OrderStatus::Confirmed
    );
    let ledger = store.get_ledger(product).await.unwrap().unwrap();
    assert_eq!(ledger.total_stock, 4);
}

#[tokio::test]
async fn test_status_transition_missing_order_is_404() {
    let (app, _) = setup();
    let fake_key = uuid::Uuid::new_v4();

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(format!("/orders/{fake_key}/status"))
                .header("content-type", "application/json")
                .body(Body::from(r#"{"status":"shipped"}"#))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_hostile_store_maps_to_bad_gateway() {
    let (app, store) = setup();
    let order = seed_order(&store, "OCT_K01", None).await;
    store.set_revert_status_writes(usize::MAX).await;

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(format!("/orders/{}/status", order.key))
                .header("content-type", "application/json")
                .body(Body::from(r#"{"status":"shipped"}"#))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
}

#[tokio::test]
async fn test_bulk_status_transition() {
    let (app, store) = setup();
    let a = seed_order(&store, "OCT_K01", None).await;
    let b = seed_order(&store, "OCT_K02", None).await;

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/orders/status")
                .header("content-type", "application/json")
                .body(Body::from(
                    serde_json::to_string(&serde_json::json!({
                        "order_keys": [a.key, b.key],
                        "status": "processing"
                    }))
                    .unwrap(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["updated"], 2);

    for key in [a.key, b.key] {
        assert_eq!(
            store.read_status(key).await.unwrap().status,
            OrderStatus::Processing
        );
    }
}

#[tokio::test]
async fn test_bulk_with_missing_order_is_bad_gateway() {
    let (app, store) = setup();
    let a = seed_order(&store, "OCT_K01", None).await;
    let ghost = uuid::Uuid::new_v4();

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/orders/status")
                .header("content-type", "application/json")
                .body(Body::from(
                    serde_json::to_string(&serde_json::json!({
                        "order_keys": [a.key, ghost],
                        "status": "shipped"
                    }))
                    .unwrap(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
}

#[tokio::test]
async fn test_payment_status_update() {
    let (app, store) = setup();
    let order = seed_order(&store, "OCT_K01", None).await;

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(format!("/orders/{}/payment-status", order.key))
                .header("content-type", "application/json")
                .body(Body::from(r#"{"payment_status":"refunded"}"#))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let read = store.get_order(order.key).await.unwrap().unwrap();
    assert_eq!(read.payment_status, domain::PaymentStatus::Refunded);
}

#[tokio::test]
async fn test_gateway_callback_confirms_order() {
    let (app, store) = setup();
    let order = seed_order(&store, "OCT_K01", None).await;

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/payments/callback")
                .header("content-type", "application/json")
                .body(Body::from(
                    serde_json::to_string(&serde_json::json!({
                        "order_id": "OCT_K01",
                        "status": "paid",
                        "transaction_id": "TXN-9"
                    }))
                    .unwrap(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let read = store.get_order(order.key).await.unwrap().unwrap();
    assert_eq!(read.payment_status, domain::PaymentStatus::Paid);
    assert_eq!(read.status, OrderStatus::Confirmed);
}

#[tokio::test]
async fn test_disabled_gateway_acknowledges_without_processing() {
    let (app, store) = setup_with_payment(payment_config(false));
    let order = seed_order(&store, "OCT_K01", None).await;

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/payments/callback")
                .header("content-type", "application/json")
                .body(Body::from(
                    serde_json::to_string(&serde_json::json!({
                        "order_id": "OCT_K01",
                        "status": "paid"
                    }))
                    .unwrap(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();

    // Acknowledged, but the order is untouched.
    assert_eq!(response.status(), StatusCode::OK);
    let read = store.get_order(order.key).await.unwrap().unwrap();
    assert_eq!(read.payment_status, domain::PaymentStatus::Pending);
    assert_eq!(read.status, OrderStatus::Pending);
}

#[tokio::test]
async fn test_payment_config_refresh() {
    let (app, _) = setup();

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/payments/config/refresh")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["refreshed"], true);
    assert_eq!(json["enabled"], true);
}

#[tokio::test]
async fn test_gateway_callback_unknown_order_still_acknowledged() {
    let (app, _) = setup();

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/payments/callback")
                .header("content-type", "application/json")
                .body(Body::from(
                    serde_json::to_string(&serde_json::json!({
                        "order_id": "OCT_Z99",
                        "status": "paid"
                    }))
                    .unwrap(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();

    // The gateway always gets its acknowledgment.
    assert_eq!(response.status(), StatusCode::OK);
}
