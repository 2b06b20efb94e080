//! Boundary to the experiment API
//!
//! Views talk to the backend only through this trait. The server crate
//! provides an HTTP implementation against the proxy routes.

use async_trait::async_trait;

use crate::types::{ExperimentData, ExperimentList, ExportRequest, GenerationRequest};
use crate::Result;

/// Raw exported file as relayed from the backend. `filename` is the
/// deterministic download name, `experiment_<id>.<ext>`.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportedFile {
    pub filename: String,
    pub content_type: String,
    pub content_disposition: String,
    pub bytes: Vec<u8>,
}

#[async_trait]
pub trait ExperimentApi: Send + Sync {
    async fn list_experiments(&self, page: u32, limit: u32) -> Result<ExperimentList>;

    async fn generate(&self, request: &GenerationRequest) -> Result<ExperimentData>;

    async fn delete_experiment(&self, id: &str) -> Result<()>;

    async fn export(&self, request: &ExportRequest) -> Result<ExportedFile>;
}
