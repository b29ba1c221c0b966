//! Payment gateway webhook and gateway configuration.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use engine::GatewayCallback;
use order_store::{LedgerStore, OrderStore};

use crate::error::ApiError;
use crate::routes::orders::AppState;

/// POST /payments/callback — gateway notification after a redirect.
///
/// Always answers 200 for a well-formed body: the customer has already
/// been redirected and the gateway only needs an acknowledgment. All
/// processing failures are handled (and logged) inside the engine. When
/// the gateway is disabled in configuration the callback is acknowledged
/// without being processed.
#[tracing::instrument(skip(state, callback), fields(order_id = %callback.order_id))]
pub async fn callback<S: OrderStore + LedgerStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Json(callback): Json<GatewayCallback>,
) -> Json<serde_json::Value> {
    if !state.payment_config.get().await.enabled {
        tracing::warn!(order_id = %callback.order_id, "payment gateway disabled, ignoring callback");
        return Json(serde_json::json!({ "received": true }));
    }

    state.controller.handle_gateway_callback(callback).await;
    Json(serde_json::json!({ "received": true }))
}

/// POST /payments/config/refresh — re-read the gateway configuration from
/// its source. Credentials are never echoed back.
#[tracing::instrument(skip(state))]
pub async fn refresh_config<S: OrderStore + LedgerStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
) -> Result<Json<serde_json::Value>, ApiError> {
    state.payment_config.refresh().await?;
    let config = state.payment_config.get().await;
    Ok(Json(serde_json::json!({
        "refreshed": true,
        "enabled": config.enabled,
    })))
}
