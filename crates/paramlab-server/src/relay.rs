//! Upstream relay
//!
//! One forwarding path serves every proxy route. A [`RelayRoute`] names the
//! upstream method, path and query, and whether the successful response is
//! a JSON envelope or a file to be passed through byte for byte.

use axum::{
    body::Bytes,
    http::{header, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use paramlab_core::types::ApiResponse;
use serde_json::Value;
use std::time::Instant;
use tracing::{debug, info, warn};
use url::Url;

use crate::{
    config::BackendConfig,
    error::{ServerError, ServerResult, BACKEND_ERROR},
    retry::RetryPolicy,
};

pub const DEFAULT_FILE_CONTENT_TYPE: &str = "application/octet-stream";
pub const DEFAULT_CONTENT_DISPOSITION: &str = "attachment";

/// How a successful upstream response is handed back
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayMode {
    /// Decode as JSON and relay body and status
    Json,
    /// Relay raw bytes with the upstream file headers
    Binary,
}

/// An upstream call: method, path segments under the base URL, query, mode
#[derive(Debug, Clone, PartialEq)]
pub struct RelayRoute {
    method: Method,
    segments: Vec<String>,
    query: Vec<(String, String)>,
    mode: RelayMode,
}

impl RelayRoute {
    fn new(method: Method, path: &str, mode: RelayMode) -> Self {
        Self {
            method,
            segments: path
                .split('/')
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect(),
            query: Vec::new(),
            mode,
        }
    }

    pub fn get(path: &str) -> Self {
        Self::new(Method::GET, path, RelayMode::Json)
    }

    pub fn delete(path: &str) -> Self {
        Self::new(Method::DELETE, path, RelayMode::Json)
    }

    pub fn post_json(path: &str) -> Self {
        Self::new(Method::POST, path, RelayMode::Json)
    }

    pub fn post_binary(path: &str) -> Self {
        Self::new(Method::POST, path, RelayMode::Binary)
    }

    /// Append one path segment, percent-encoded as needed
    pub fn segment(mut self, segment: impl Into<String>) -> Self {
        self.segments.push(segment.into());
        self
    }

    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn mode(&self) -> RelayMode {
        self.mode
    }

    /// Full upstream URL under `base`
    pub fn url(&self, base: &Url) -> ServerResult<Url> {
        let mut url = base.clone();
        url.set_query(None);
        {
            let mut path = url
                .path_segments_mut()
                .map_err(|_| ServerError::Config(format!("Backend URL cannot be a base: {}", base)))?;
            path.pop_if_empty();
            path.extend(&self.segments);
        }
        if !self.query.is_empty() {
            url.query_pairs_mut().extend_pairs(self.query.iter());
        }
        Ok(url)
    }
}

/// What came back from upstream, ready to be turned into a response
#[derive(Debug, Clone, PartialEq)]
pub enum Relayed {
    Json {
        status: StatusCode,
        body: Value,
    },
    /// Upstream header values are kept as received, byte for byte
    File {
        content_type: HeaderValue,
        content_disposition: HeaderValue,
        bytes: Bytes,
    },
}

impl IntoResponse for Relayed {
    fn into_response(self) -> Response {
        match self {
            Relayed::Json { status, body } => (status, Json(body)).into_response(),
            Relayed::File {
                content_type,
                content_disposition,
                bytes,
            } => (
                StatusCode::OK,
                [
                    (header::CONTENT_TYPE, content_type),
                    (header::CONTENT_DISPOSITION, content_disposition),
                ],
                bytes,
            )
                .into_response(),
        }
    }
}

/// Stateless forwarder to the backend. Cheap to clone; the underlying
/// client shares its connection pool.
#[derive(Debug, Clone)]
pub struct Relay {
    client: reqwest::Client,
    base_url: Url,
    retry: RetryPolicy,
}

impl Relay {
    pub fn new(config: &BackendConfig) -> ServerResult<Self> {
        let base_url = config.base_url().map_err(ServerError::Config)?;

        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = config.timeout() {
            builder = builder.timeout(timeout);
        }
        if let Some(timeout) = config.connect_timeout() {
            builder = builder.connect_timeout(timeout);
        }
        let client = builder.build()?;

        Ok(Self {
            client,
            base_url,
            retry: RetryPolicy::from(&config.retry),
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Forward `route` with an optional JSON body and relay the outcome
    pub async fn forward(&self, route: &RelayRoute, body: Option<&Value>) -> ServerResult<Relayed> {
        let url = route.url(&self.base_url)?;
        let response = self.send_with_retry(route, &url, body).await?;
        let status = response.status();

        if !status.is_success() {
            let payload: Value = response
                .json()
                .await
                .map_err(|e| ServerError::UpstreamPayload(format!("{} {}: {}", route.method, url, e)))?;
            let message = payload
                .get("error")
                .and_then(Value::as_str)
                .filter(|m| !m.is_empty())
                .unwrap_or(BACKEND_ERROR)
                .to_string();
            warn!(method = %route.method, url = %url, status = %status, "backend reported failure");
            return Err(ServerError::Upstream { status, message });
        }

        match route.mode {
            RelayMode::Json => {
                let body: Value = response
                    .json()
                    .await
                    .map_err(|e| ServerError::UpstreamPayload(format!("{} {}: {}", route.method, url, e)))?;
                Ok(Relayed::Json { status, body })
            }
            RelayMode::Binary => {
                let content_type = header_or(&response, header::CONTENT_TYPE, DEFAULT_FILE_CONTENT_TYPE);
                let content_disposition =
                    header_or(&response, header::CONTENT_DISPOSITION, DEFAULT_CONTENT_DISPOSITION);
                let bytes = response.bytes().await?;
                debug!(url = %url, bytes = bytes.len(), content_type = ?content_type, "relaying file");
                Ok(Relayed::File {
                    content_type,
                    content_disposition,
                    bytes,
                })
            }
        }
    }

    async fn send_with_retry(
        &self,
        route: &RelayRoute,
        url: &Url,
        body: Option<&Value>,
    ) -> ServerResult<reqwest::Response> {
        let mut retry = 0;
        loop {
            let start = Instant::now();
            let mut request = self.client.request(route.method.clone(), url.clone());
            if let Some(body) = body {
                request = request.json(body);
            }

            let outcome = request.send().await;
            let elapsed_ms = start.elapsed().as_millis();
            let can_retry = retry < self.retry.max_retries();

            match outcome {
                Ok(response) => {
                    let status = response.status();
                    info!(
                        method = %route.method,
                        url = %url,
                        status = %status,
                        elapsed_ms = %elapsed_ms,
                        attempt = retry + 1,
                        "upstream responded"
                    );
                    if !(can_retry && RetryPolicy::should_retry_status(&route.method, status)) {
                        return Ok(response);
                    }
                }
                Err(err) => {
                    warn!(
                        method = %route.method,
                        url = %url,
                        elapsed_ms = %elapsed_ms,
                        attempt = retry + 1,
                        "upstream request failed: {}",
                        err
                    );
                    if !(can_retry && RetryPolicy::should_retry_error(&route.method, &err)) {
                        return Err(ServerError::Transport(err));
                    }
                }
            }

            let delay = self.retry.delay_for(retry, &mut rand::thread_rng());
            debug!(delay_ms = delay.as_millis() as u64, "retrying upstream call");
            tokio::time::sleep(delay).await;
            retry += 1;
        }
    }
}

fn header_or(response: &reqwest::Response, name: header::HeaderName, default: &'static str) -> HeaderValue {
    response
        .headers()
        .get(name)
        .cloned()
        .unwrap_or_else(|| HeaderValue::from_static(default))
}

/// Turn a relay failure into the error envelope, or the outcome into a response
pub fn respond(outcome: ServerResult<Relayed>) -> Response {
    match outcome {
        Ok(relayed) => relayed.into_response(),
        Err(err) => err.into_response(),
    }
}

/// Wrap a payload the proxy produced itself in a success envelope
pub fn envelope<T: serde::Serialize>(data: T) -> Json<ApiResponse<T>> {
    Json(ApiResponse::ok(data))
}
