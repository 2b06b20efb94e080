//! Health check handler

use axum::{extract::State, Json};
use paramlab_core::types::ApiResponse;
use serde_json::{json, Value};

use crate::{relay::envelope, server::ServerState};

/// Liveness of the proxy itself; the backend is not contacted
pub async fn health_check(State(state): State<ServerState>) -> Json<ApiResponse<Value>> {
    envelope(json!({
        "status": "ok",
        "service": "paramlab-server",
        "version": crate::VERSION,
        "backend": state.relay.base_url().as_str(),
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}
