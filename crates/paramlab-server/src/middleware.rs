//! Middleware components for the server

use axum::{
    extract::Request,
    http::{header, HeaderValue, Method, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::time::{Duration, Instant};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tracing::{info, warn};

use crate::{config::CorsConfig, error::ServerError};

/// Logging middleware
pub async fn logging_middleware(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();
    let start = Instant::now();

    info!(method = %method, uri = %uri, "Request started");

    let response = next.run(request).await;

    info!(
        method = %method,
        uri = %uri,
        status = %response.status(),
        elapsed_ms = %start.elapsed().as_millis(),
        "Request completed"
    );

    response
}

/// Re-wrap the body limit's plain-text 413 in the error envelope. Relayed
/// upstream 413s are already JSON and pass through untouched.
pub async fn body_limit_middleware(request: Request, next: Next) -> Response {
    let response = next.run(request).await;
    if response.status() != StatusCode::PAYLOAD_TOO_LARGE {
        return response;
    }

    let is_json = response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.starts_with("application/json"));
    if is_json {
        response
    } else {
        ServerError::PayloadTooLarge.into_response()
    }
}

/// CORS layer for the proxy routes, or `None` when CORS is disabled
pub fn cors_layer(config: &CorsConfig) -> Option<CorsLayer> {
    if !config.enabled {
        return None;
    }

    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE])
        .expose_headers([header::CONTENT_DISPOSITION])
        .max_age(Duration::from_secs(config.max_age));

    let any_origin = config.allowed_origins.is_empty() || config.allowed_origins.iter().any(|o| o == "*");
    if any_origin {
        return Some(layer.allow_origin(Any));
    }

    let origins: Vec<HeaderValue> = config
        .allowed_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin = %origin, "ignoring unparseable CORS origin");
                None
            }
        })
        .collect();
    Some(layer.allow_origin(AllowOrigin::list(origins)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cors_disabled() {
        let config = CorsConfig {
            enabled: false,
            ..CorsConfig::default()
        };
        assert!(cors_layer(&config).is_none());
    }

    #[test]
    fn test_cors_origin_list() {
        let config = CorsConfig {
            allowed_origins: vec!["https://lab.example.com".to_string(), "bad\norigin".to_string()],
            ..CorsConfig::default()
        };
        assert!(cors_layer(&config).is_some());
        assert!(cors_layer(&CorsConfig::default()).is_some());
    }
}
