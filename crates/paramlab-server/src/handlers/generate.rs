//! Generation requests

use axum::{
    body::Bytes,
    extract::State,
    response::{IntoResponse, Response},
};
use paramlab_core::{types::GenerationRequest, validation::Validator};
use serde_json::Value;
use tracing::info;

use crate::{
    error::{ServerError, ServerResult},
    relay::{respond, RelayRoute},
    server::ServerState,
};

pub const GENERATE_PATH: &str = "/api/generate";

/// Parse the body and check it describes a well-formed sweep. The JSON value
/// is returned as received so unknown fields are forwarded untouched.
pub fn validate_generation_body(body: &[u8]) -> ServerResult<(Value, GenerationRequest)> {
    let value: Value = serde_json::from_slice(body)?;
    let request: GenerationRequest = serde_json::from_value(value.clone())
        .map_err(|e| ServerError::InvalidRequest(format!("Malformed generation request: {}", e)))?;
    Validator::validate_request(&request)
        .map_err(|e| ServerError::InvalidRequest(e.user_message().to_string()))?;
    Ok((value, request))
}

/// `POST /api/generate`
pub async fn generate(State(state): State<ServerState>, body: Bytes) -> Response {
    let (value, request) = match validate_generation_body(&body) {
        Ok(parsed) => parsed,
        Err(err) => return err.into_response(),
    };

    info!(
        runs = request.number_of_runs,
        grid_size = request.parameter_range.grid_size(),
        named = request.experiment_name.is_some(),
        "forwarding generation request"
    );
    let route = RelayRoute::post_json(GENERATE_PATH);
    respond(state.relay.forward(&route, Some(&value)).await)
}
