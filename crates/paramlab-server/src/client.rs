//! HTTP client for the proxy routes
//!
//! [`ProxyClient`] implements [`ExperimentApi`] against a running
//! paramlab-server, so the workbench and history views can drive the real
//! proxy the same way they drive any other implementation.

use async_trait::async_trait;
use paramlab_core::{
    api::{ExperimentApi, ExportedFile},
    types::{ApiResponse, ExperimentData, ExperimentList, ExportRequest, GenerationRequest},
    view::export_filename,
    CoreError, Result,
};
use reqwest::{header, Response};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;
use url::Url;

use crate::relay::{RelayRoute, DEFAULT_CONTENT_DISPOSITION, DEFAULT_FILE_CONTENT_TYPE};

const FETCH_FAILED: &str = "Failed to fetch experiments";
const GENERATE_FAILED: &str = "Failed to generate responses";
const DELETE_FAILED: &str = "Failed to delete experiment";
const EXPORT_FAILED: &str = "Failed to export experiment";

#[derive(Debug, Clone)]
pub struct ProxyClient {
    client: reqwest::Client,
    base_url: Url,
}

impl ProxyClient {
    /// Client for the proxy at `base_url`, e.g. `http://127.0.0.1:3000`
    pub fn new(base_url: &str) -> Result<Self> {
        let base_url = Url::parse(base_url).map_err(|e| {
            CoreError::invalid_input(
                "INVALID_PROXY_URL",
                format!("Invalid proxy URL '{}': {}", base_url, e),
                "Creating proxy client",
                "Use an absolute http(s) URL such as http://127.0.0.1:3000",
            )
        })?;
        Ok(Self {
            client: reqwest::Client::new(),
            base_url,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, route: &RelayRoute) -> Result<Url> {
        route
            .url(&self.base_url)
            .map_err(|e| CoreError::state("INVALID_PROXY_URL", e.to_string()))
    }

    async fn send(&self, route: &RelayRoute, body: Option<&impl serde::Serialize>) -> Result<Response> {
        let url = self.endpoint(route)?;
        debug!(method = %route.method(), url = %url, "calling proxy");
        let mut request = self.client.request(route.method().clone(), url);
        if let Some(body) = body {
            request = request.json(body);
        }
        request.send().await.map_err(transport)
    }
}

fn transport(err: reqwest::Error) -> CoreError {
    CoreError::backend("BACKEND_TRANSPORT", err.to_string(), None)
}

/// Turn a non-success response into a backend error carrying the envelope's
/// message, or `fallback` when the body has none.
async fn status_error(response: Response, fallback: &str) -> CoreError {
    let status = response.status().as_u16();
    let message = response
        .json::<ApiResponse<Value>>()
        .await
        .ok()
        .and_then(|envelope| envelope.error)
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| fallback.to_string());
    CoreError::backend("BACKEND_STATUS", message, Some(status))
}

async fn decode_envelope<T: DeserializeOwned>(response: Response, fallback: &str) -> Result<T> {
    if !response.status().is_success() {
        return Err(status_error(response, fallback).await);
    }
    let bytes = response.bytes().await.map_err(transport)?;
    let envelope: ApiResponse<T> = serde_json::from_slice(&bytes)?;
    envelope.into_result(fallback)
}

#[async_trait]
impl ExperimentApi for ProxyClient {
    async fn list_experiments(&self, page: u32, limit: u32) -> Result<ExperimentList> {
        let route = RelayRoute::get("/api/experiments")
            .query("page", page.to_string())
            .query("limit", limit.to_string());
        let response = self.send(&route, None::<&()>).await?;
        decode_envelope(response, FETCH_FAILED).await
    }

    async fn generate(&self, request: &GenerationRequest) -> Result<ExperimentData> {
        let route = RelayRoute::post_json("/api/generate");
        let response = self.send(&route, Some(request)).await?;
        decode_envelope(response, GENERATE_FAILED).await
    }

    async fn delete_experiment(&self, id: &str) -> Result<()> {
        let route = RelayRoute::delete("/api/experiments").query("id", id);
        let response = self.send(&route, None::<&()>).await?;
        if !response.status().is_success() {
            return Err(status_error(response, DELETE_FAILED).await);
        }

        // Success envelopes for deletes may carry no data; only the flag matters
        let bytes = response.bytes().await.map_err(transport)?;
        if let Ok(envelope) = serde_json::from_slice::<ApiResponse<Value>>(&bytes) {
            if !envelope.success {
                return Err(CoreError::backend(
                    "BACKEND_REPORTED_FAILURE",
                    envelope.error.unwrap_or_else(|| DELETE_FAILED.to_string()),
                    None,
                ));
            }
        }
        Ok(())
    }

    async fn export(&self, request: &ExportRequest) -> Result<ExportedFile> {
        let route = RelayRoute::post_binary("/api/export");
        let response = self.send(&route, Some(request)).await?;
        if !response.status().is_success() {
            return Err(status_error(response, EXPORT_FAILED).await);
        }

        let header_or = |name: header::HeaderName, default: &str| {
            response
                .headers()
                .get(name)
                .and_then(|v| v.to_str().ok())
                .unwrap_or(default)
                .to_string()
        };
        let content_type = header_or(header::CONTENT_TYPE, DEFAULT_FILE_CONTENT_TYPE);
        let content_disposition = header_or(header::CONTENT_DISPOSITION, DEFAULT_CONTENT_DISPOSITION);
        let bytes = response.bytes().await.map_err(transport)?;

        Ok(ExportedFile {
            filename: export_filename(&request.experiment_id, request.format),
            content_type,
            content_disposition,
            bytes: bytes.to_vec(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_relative_url() {
        let err = ProxyClient::new("localhost").unwrap_err();
        assert_eq!(err.code(), "INVALID_PROXY_URL");
    }

    #[test]
    fn test_endpoints() {
        let client = ProxyClient::new("http://127.0.0.1:3000").unwrap();
        let url = client
            .endpoint(&RelayRoute::delete("/api/experiments").query("id", "exp 1"))
            .unwrap();
        assert_eq!(url.as_str(), "http://127.0.0.1:3000/api/experiments?id=exp+1");
    }
}
