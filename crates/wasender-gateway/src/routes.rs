//! Service-level route handlers.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;

use crate::server::AppState;

/// Banner.
pub async fn root() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "message": "WhatsApp Sender API funcionando!",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// Health check endpoint.
pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "service": "wasender-gateway",
        "version": env!("CARGO_PKG_VERSION"),
        "uptime_secs": state.start_time.elapsed().as_secs(),
    }))
}
