//! Order intake, lookup, and status transition endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use common::OrderKey;
use domain::{NewOrder, Order, OrderStatus, PaymentStatus};
use engine::{PaymentConfigCache, StaticConfigSource, TransitionController};
use order_store::{LedgerStore, OrderStore};
use serde::{Deserialize, Serialize};

use crate::error::ApiError;

/// Shared application state accessible from all handlers.
pub struct AppState<S> {
    pub controller: TransitionController<S>,
    pub payment_config: PaymentConfigCache<StaticConfigSource>,
}

// -- Request types --

#[derive(Deserialize)]
pub struct StatusUpdateRequest {
    pub status: OrderStatus,
}

#[derive(Deserialize)]
pub struct BulkStatusUpdateRequest {
    pub order_keys: Vec<OrderKey>,
    pub status: OrderStatus,
}

#[derive(Deserialize)]
pub struct PaymentStatusRequest {
    pub payment_status: PaymentStatus,
}

// -- Response types --

#[derive(Serialize)]
pub struct OrderResponse {
    pub key: String,
    pub public_id: String,
    pub status: OrderStatus,
    pub payment_status: PaymentStatus,
    pub product_name: String,
    pub quantity: u32,
    pub colors: Vec<String>,
    pub amount: i64,
    pub created_at: String,
    pub updated_at: String,
}

impl From<Order> for OrderResponse {
    fn from(order: Order) -> Self {
        Self {
            key: order.key.to_string(),
            public_id: order.public_id.to_string(),
            status: order.status,
            payment_status: order.payment_status,
            product_name: order.product_name,
            quantity: order.quantity,
            colors: order.colors,
            amount: order.amount,
            created_at: order.created_at.to_rfc3339(),
            updated_at: order.updated_at.to_rfc3339(),
        }
    }
}

#[derive(Serialize)]
pub struct StatusUpdateResponse {
    pub key: String,
    pub status: OrderStatus,
}

#[derive(Serialize)]
pub struct BulkStatusUpdateResponse {
    pub updated: usize,
    pub status: OrderStatus,
}

// -- Handlers --

/// POST /orders — place a new order.
#[tracing::instrument(skip(state, req))]
pub async fn create<S: OrderStore + LedgerStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Json(req): Json<NewOrder>,
) -> Result<(axum::http::StatusCode, Json<OrderResponse>), ApiError> {
    if req.product_name.is_empty() {
        return Err(ApiError::BadRequest("product_name is required".to_string()));
    }

    let order = state.controller.place_order(req).await?;
    Ok((axum::http::StatusCode::CREATED, Json(order.into())))
}

/// GET /orders/:key — load an order by internal key.
#[tracing::instrument(skip(state))]
pub async fn get<S: OrderStore + LedgerStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(key): Path<String>,
) -> Result<Json<OrderResponse>, ApiError> {
    let key = parse_order_key(&key)?;
    let order = state
        .controller
        .store()
        .get_order(key)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Order {key} not found")))?;

    Ok(Json(order.into()))
}

/// POST /orders/:key/status — transition one order.
#[tracing::instrument(skip(state, req))]
pub async fn update_status<S: OrderStore + LedgerStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(key): Path<String>,
    Json(req): Json<StatusUpdateRequest>,
) -> Result<Json<StatusUpdateResponse>, ApiError> {
    let key = parse_order_key(&key)?;
    state.controller.update_order_status(key, req.status).await?;

    Ok(Json(StatusUpdateResponse {
        key: key.to_string(),
        status: req.status,
    }))
}

/// POST /orders/status — transition a batch of orders.
#[tracing::instrument(skip(state, req), fields(orders = req.order_keys.len()))]
pub async fn update_status_bulk<S: OrderStore + LedgerStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Json(req): Json<BulkStatusUpdateRequest>,
) -> Result<Json<BulkStatusUpdateResponse>, ApiError> {
    state
        .controller
        .update_orders_status(&req.order_keys, req.status)
        .await?;

    Ok(Json(BulkStatusUpdateResponse {
        updated: req.order_keys.len(),
        status: req.status,
    }))
}

/// POST /orders/:key/payment-status — admin payment status update.
#[tracing::instrument(skip(state, req))]
pub async fn update_payment_status<S: OrderStore + LedgerStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(key): Path<String>,
    Json(req): Json<PaymentStatusRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let key = parse_order_key(&key)?;
    state
        .controller
        .update_order_payment_status(key, req.payment_status)
        .await?;

    Ok(Json(serde_json::json!({
        "key": key.to_string(),
        "payment_status": req.payment_status,
    })))
}

fn parse_order_key(key: &str) -> Result<OrderKey, ApiError> {
    let uuid = uuid::Uuid::parse_str(key)
        .map_err(|e| ApiError::BadRequest(format!("Invalid order key: {e}")))?;
    Ok(OrderKey::from_uuid(uuid))
}
