//! Paramlab Core - experiment data model and session state
//!
//! This crate holds the wire contract shared with the generation backend
//! (parameter ranges, responses, experiments, request envelopes), the sweep
//! enumeration over a parameter range, quality-metric aggregation, and the
//! session-local state that drives the generate and history views.

pub mod api;
pub mod builder;
pub mod editor;
pub mod history;
pub mod metrics;
pub mod sweep;
pub mod types;
pub mod validation;
pub mod view;
pub mod workbench;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    /// Input validation and parameter errors
    #[error("Invalid input [{code}]: {message}\nContext: {context}\nSuggestion: {suggestion}")]
    InvalidInput {
        code: &'static str,
        message: String,
        context: String,
        suggestion: String,
        parameter_name: Option<String>,
        value: Option<String>,
        valid_range: Option<String>,
    },

    /// Session state violations (e.g. a second generation while one is running)
    #[error("State error [{code}]: {message}")]
    State {
        code: &'static str,
        message: String,
    },

    /// The backend (or the proxy in front of it) rejected or failed a call
    #[error("Backend error [{code}]: {message}")]
    Backend {
        code: &'static str,
        message: String,
        status: Option<u16>,
    },

    /// Payload could not be decoded into the expected shape
    #[error("Decode error [{code}]: {message}")]
    Decode {
        code: &'static str,
        message: String,
        #[source]
        source: Option<serde_json::Error>,
    },
}

pub type Result<T> = std::result::Result<T, CoreError>;

impl CoreError {
    /// Create an invalid input error with context
    pub fn invalid_input<S1, S2, S3>(
        code: &'static str,
        message: S1,
        context: S2,
        suggestion: S3,
    ) -> Self
    where
        S1: Into<String>,
        S2: Into<String>,
        S3: Into<String>,
    {
        Self::InvalidInput {
            code,
            message: message.into(),
            context: context.into(),
            suggestion: suggestion.into(),
            parameter_name: None,
            value: None,
            valid_range: None,
        }
    }

    /// Create an invalid input error with parameter validation details
    pub fn invalid_parameter<S1, S2, S3, S4, S5, S6>(
        code: &'static str,
        message: S1,
        context: S2,
        suggestion: S3,
        param_name: S4,
        value: S5,
        valid_range: S6,
    ) -> Self
    where
        S1: Into<String>,
        S2: Into<String>,
        S3: Into<String>,
        S4: Into<String>,
        S5: Into<String>,
        S6: Into<String>,
    {
        Self::InvalidInput {
            code,
            message: message.into(),
            context: context.into(),
            suggestion: suggestion.into(),
            parameter_name: Some(param_name.into()),
            value: Some(value.into()),
            valid_range: Some(valid_range.into()),
        }
    }

    pub fn state<S: Into<String>>(code: &'static str, message: S) -> Self {
        Self::State {
            code,
            message: message.into(),
        }
    }

    /// Create a backend error, keeping the HTTP status when one was received
    pub fn backend<S: Into<String>>(code: &'static str, message: S, status: Option<u16>) -> Self {
        Self::Backend {
            code,
            message: message.into(),
            status,
        }
    }

    /// Get the error code for programmatic handling
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidInput { code, .. } => code,
            Self::State { code, .. } => code,
            Self::Backend { code, .. } => code,
            Self::Decode { code, .. } => code,
        }
    }

    /// Short message without the context/suggestion trailer, suitable for
    /// showing to an end user or placing in an error envelope.
    pub fn user_message(&self) -> &str {
        match self {
            Self::InvalidInput { message, .. }
            | Self::State { message, .. }
            | Self::Backend { message, .. }
            | Self::Decode { message, .. } => message,
        }
    }
}

impl From<serde_json::Error> for CoreError {
    fn from(err: serde_json::Error) -> Self {
        Self::Decode {
            code: "DECODE_JSON",
            message: err.to_string(),
            source: Some(err),
        }
    }
}

/// Prelude module for common imports
pub mod prelude {
    pub use crate::{
        api::ExperimentApi,
        builder::{GenerationRequestBuilder, RunCount},
        editor::{Field, Parameter, ParameterRangeEditor},
        history::{ExperimentHistory, ListState},
        metrics::{average_metrics, average_score, best_response, best_score, ExperimentSummary},
        types::*,
        validation::Validator,
        view::{export_filename, truncate_preview, ExpansionSet},
        workbench::{ActiveTab, Workbench},
        CoreError, Result,
    };
}

pub use types::{ExperimentData, GenerationRequest, ParameterRange, ResponseData};
