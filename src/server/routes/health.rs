//! Health / heartbeat endpoint.

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use serde_json::{json, Value};
use std::sync::Arc;

use crate::server::state::AppState;

/// Register health-check routes.
pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/health", get(get_health))
}

/// Heartbeat endpoint.
///
/// Returns `{"status": "ok", "version": "...", "provider": "...", "uploads": bool}`
/// with HTTP 200.
pub async fn get_health(State(state): State<Arc<AppState>>) -> Json<Value> {
    Json(json!({
        "status":   "ok",
        "version":  env!("CARGO_PKG_VERSION"),
        "provider": state.provider.kind().to_string(),
        "uploads":  state.blob_store.is_some(),
    }))
}
