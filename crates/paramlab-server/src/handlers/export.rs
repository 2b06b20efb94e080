//! Experiment export

use axum::{
    body::Bytes,
    extract::State,
    response::{IntoResponse, Response},
};
use paramlab_core::types::ExportRequest;
use serde_json::Value;
use tracing::info;

use crate::{
    error::{ServerError, ServerResult},
    relay::{respond, RelayRoute},
    server::ServerState,
};

pub const EXPORT_PATH: &str = "/api/export";

fn parse_export_body(body: &[u8]) -> ServerResult<(Value, ExportRequest)> {
    let value: Value = serde_json::from_slice(body)?;
    let request = serde_json::from_value(value.clone())
        .map_err(|e| ServerError::InvalidRequest(format!("Malformed export request: {}", e)))?;
    Ok((value, request))
}

/// `POST /api/export`; success relays the file bytes, failure the JSON envelope
pub async fn export(State(state): State<ServerState>, body: Bytes) -> Response {
    let (value, request) = match parse_export_body(&body) {
        Ok(parsed) => parsed,
        Err(err) => return err.into_response(),
    };

    info!(experiment_id = %request.experiment_id, format = %request.format, "exporting experiment");
    let route = RelayRoute::post_binary(EXPORT_PATH);
    respond(state.relay.forward(&route, Some(&value)).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use paramlab_core::types::ExportFormat;

    #[test]
    fn test_parse_export_body() {
        let (_, request) =
            parse_export_body(br#"{"experimentId":"e1","format":"csv","includeMetrics":true,"includeDetails":false}"#)
                .unwrap();
        assert_eq!(request.format, ExportFormat::Csv);

        assert!(matches!(
            parse_export_body(br#"{"experimentId":"e1","format":"xlsx"}"#),
            Err(ServerError::InvalidRequest(_))
        ));
        assert!(matches!(parse_export_body(b"nope"), Err(ServerError::Json(_))));
    }
}
