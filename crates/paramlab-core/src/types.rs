//! Wire types exchanged with the generation backend
//!
//! Field names follow the backend's JSON contract exactly, which mixes
//! camelCase envelope fields (`parameterRange`, `overallScore`) with
//! snake_case sampling parameters (`top_p`, `max_tokens`).

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::CoreError;

/// Inclusive bounds and step for one tunable parameter
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds<T> {
    pub min: T,
    pub max: T,
    pub step: T,
}

impl<T> Bounds<T> {
    pub const fn new(min: T, max: T, step: T) -> Self {
        Self { min, max, step }
    }
}

/// Ranges swept for each sampling parameter
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ParameterRange {
    pub temperature: Bounds<f64>,
    pub top_p: Bounds<f64>,
    pub max_tokens: Bounds<u32>,
}

impl ParameterRange {
    pub const DEFAULT_TEMPERATURE: Bounds<f64> = Bounds::new(0.1, 1.0, 0.1);
    pub const DEFAULT_TOP_P: Bounds<f64> = Bounds::new(0.1, 1.0, 0.1);
    pub const DEFAULT_MAX_TOKENS: Bounds<u32> = Bounds::new(100, 1000, 100);
}

impl Default for ParameterRange {
    fn default() -> Self {
        Self {
            temperature: Self::DEFAULT_TEMPERATURE,
            top_p: Self::DEFAULT_TOP_P,
            max_tokens: Self::DEFAULT_MAX_TOKENS,
        }
    }
}

/// One concrete point of a sweep
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationParameters {
    pub temperature: f64,
    pub top_p: f64,
    pub max_tokens: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QualityMetrics {
    pub coherence: f64,
    pub completeness: f64,
    pub readability: f64,
    pub relevance: f64,
    pub overall_score: f64,
}

/// Explanation of how a single metric was scored
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricDetails {
    pub score: f64,
    pub explanation: String,
    pub calculation: String,
    #[serde(default)]
    pub factors: BTreeMap<String, f64>,
}

/// One generated candidate with its parameters and scores
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseData {
    pub id: String,
    pub content: String,
    pub parameters: GenerationParameters,
    pub metrics: QualityMetrics,
    #[serde(default)]
    pub metric_details: BTreeMap<String, MetricDetails>,
    pub generated_at: String,
    pub model: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tokens_used: Option<u32>,
    /// Wall-clock generation time in milliseconds, as reported by the backend
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generation_time: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExperimentData {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub prompt: String,
    pub parameter_range: ParameterRange,
    #[serde(default)]
    pub responses: Vec<ResponseData>,
    pub created_at: String,
    pub updated_at: String,
    pub total_runs: u32,
}

impl ExperimentData {
    /// The backend is expected to report one run per stored response.
    pub fn runs_consistent(&self) -> bool {
        self.total_runs as usize == self.responses.len()
    }

    /// Name to show in listings, falling back to the id.
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.id)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationRequest {
    pub prompt: String,
    pub parameter_range: ParameterRange,
    pub number_of_runs: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub experiment_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub experiment_description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationResponse {
    pub experiment_id: String,
    pub responses: Vec<ResponseData>,
    pub total_runs: u32,
    pub average_metrics: QualityMetrics,
}

/// File formats the backend can render an experiment into
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Json,
    Csv,
    Pdf,
}

impl ExportFormat {
    pub const ALL: [ExportFormat; 3] = [ExportFormat::Json, ExportFormat::Csv, ExportFormat::Pdf];

    pub fn extension(self) -> &'static str {
        match self {
            ExportFormat::Json => "json",
            ExportFormat::Csv => "csv",
            ExportFormat::Pdf => "pdf",
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for ExportFormat {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(ExportFormat::Json),
            "csv" => Ok(ExportFormat::Csv),
            "pdf" => Ok(ExportFormat::Pdf),
            other => Err(CoreError::invalid_parameter(
                "INVALID_EXPORT_FORMAT",
                format!("Unsupported export format: {}", other),
                "Export request",
                "Use one of json, csv or pdf",
                "format",
                other,
                "json | csv | pdf",
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportRequest {
    pub experiment_id: String,
    pub format: ExportFormat,
    #[serde(default)]
    pub include_metrics: bool,
    #[serde(default)]
    pub include_details: bool,
}

impl ExportRequest {
    /// Export as issued from the results and history views: metrics on, details off.
    pub fn with_metrics(experiment_id: impl Into<String>, format: ExportFormat) -> Self {
        Self {
            experiment_id: experiment_id.into(),
            format,
            include_metrics: true,
            include_details: false,
        }
    }
}

/// Uniform success/error envelope wrapping every proxied call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            message: None,
        }
    }

    pub fn error(error: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error.into()),
            message: None,
        }
    }

    /// Collapse the envelope into a result, using `fallback` when a failed
    /// envelope carries no error text.
    pub fn into_result(self, fallback: &str) -> crate::Result<T> {
        match (self.success, self.data) {
            (true, Some(data)) => Ok(data),
            (true, None) => Err(CoreError::backend(
                "BACKEND_EMPTY_PAYLOAD",
                "Backend reported success without data",
                None,
            )),
            (false, _) => Err(CoreError::backend(
                "BACKEND_REPORTED_FAILURE",
                self.error.unwrap_or_else(|| fallback.to_string()),
                None,
            )),
        }
    }
}

/// Payload of the experiment listing
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ExperimentList {
    pub experiments: Vec<ExperimentData>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
}
