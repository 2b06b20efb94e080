//! Generate-and-analyze view state
//!
//! The workbench owns the current experiment and the busy flag. A
//! generation is split into `begin_generate` / `complete_generate` so the
//! caller does not need to hold the workbench across the network call;
//! `generate` chains the two for the common case.

use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::api::{ExperimentApi, ExportedFile};
use crate::builder::GenerationRequestBuilder;
use crate::editor::ParameterRangeEditor;
use crate::metrics::{self, ChartRow, ExperimentSummary};
use crate::types::{ExperimentData, ExportFormat, ExportRequest, GenerationRequest, ParameterRange};
use crate::view::{response_preview, ExpansionSet};
use crate::{CoreError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActiveTab {
    #[default]
    Generate,
    History,
}

/// Marks an in-flight generation; hand it back to `complete_generate`
#[derive(Debug)]
#[must_use]
pub struct GenerationTicket {
    request: GenerationRequest,
}

impl GenerationTicket {
    pub fn request(&self) -> &GenerationRequest {
        &self.request
    }
}

#[derive(Debug, Default)]
pub struct Workbench {
    editor: ParameterRangeEditor,
    current_experiment: Option<ExperimentData>,
    generating: bool,
    active_tab: ActiveTab,
    expanded_responses: ExpansionSet,
}

impl Workbench {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn parameter_range(&self) -> &ParameterRange {
        self.editor.range()
    }

    pub fn editor_mut(&mut self) -> &mut ParameterRangeEditor {
        &mut self.editor
    }

    pub fn current_experiment(&self) -> Option<&ExperimentData> {
        self.current_experiment.as_ref()
    }

    pub fn is_generating(&self) -> bool {
        self.generating
    }

    pub fn active_tab(&self) -> ActiveTab {
        self.active_tab
    }

    pub fn select_tab(&mut self, tab: ActiveTab) {
        self.active_tab = tab;
    }

    /// Build a request from the form against the current range. A blank
    /// prompt or invalid range fails here, before any network call.
    pub fn prepare(&self, form: &GenerationRequestBuilder) -> Result<GenerationRequest> {
        form.build(self.editor.range())
    }

    /// Mark the workbench busy. Rejected while another generation runs.
    pub fn begin_generate(&mut self, request: GenerationRequest) -> Result<GenerationTicket> {
        if self.generating {
            return Err(CoreError::state(
                "GENERATION_IN_PROGRESS",
                "A generation is already running",
            ));
        }
        self.generating = true;
        Ok(GenerationTicket { request })
    }

    /// Apply the outcome of a generation. On success the experiment becomes
    /// current and the generate tab is shown; on failure the current
    /// experiment is kept. The busy flag is cleared either way.
    pub fn complete_generate(
        &mut self,
        ticket: GenerationTicket,
        outcome: Result<ExperimentData>,
    ) -> Result<&ExperimentData> {
        self.generating = false;
        match outcome {
            Ok(experiment) => {
                info!(
                    experiment_id = %experiment.id,
                    responses = experiment.responses.len(),
                    "generation completed"
                );
                self.expanded_responses = ExpansionSet::new();
                self.active_tab = ActiveTab::Generate;
                Ok(&*self.current_experiment.insert(experiment))
            }
            Err(err) => {
                error!(
                    prompt_len = ticket.request.prompt.len(),
                    code = err.code(),
                    "Generation error: {}",
                    err
                );
                Err(err)
            }
        }
    }

    pub async fn generate(
        &mut self,
        api: &dyn ExperimentApi,
        request: GenerationRequest,
    ) -> Result<&ExperimentData> {
        let ticket = self.begin_generate(request)?;
        let outcome = api.generate(ticket.request()).await;
        self.complete_generate(ticket, outcome)
    }

    pub fn summary(&self) -> Option<ExperimentSummary> {
        self.current_experiment.as_ref().map(ExperimentData::summary)
    }

    pub fn chart_rows(&self) -> Vec<ChartRow> {
        self.current_experiment
            .as_ref()
            .map(|e| metrics::chart_rows(&e.responses))
            .unwrap_or_default()
    }

    pub fn toggle_response(&mut self, response_id: &str) -> bool {
        self.expanded_responses.toggle(response_id)
    }

    /// Content of a response of the current experiment as currently shown
    pub fn response_text(&self, response_id: &str) -> Option<String> {
        let experiment = self.current_experiment.as_ref()?;
        let response = experiment.responses.iter().find(|r| r.id == response_id)?;
        Some(response_preview(
            &response.content,
            self.expanded_responses.is_expanded(response_id),
        ))
    }

    /// Export the current experiment with metrics included
    pub async fn export_current(&self, api: &dyn ExperimentApi, format: ExportFormat) -> Result<ExportedFile> {
        let experiment = self.current_experiment.as_ref().ok_or_else(|| {
            CoreError::state("NO_CURRENT_EXPERIMENT", "There is no experiment to export")
        })?;
        api.export(&ExportRequest::with_metrics(experiment.id.clone(), format))
            .await
            .map_err(|err| {
                error!(experiment_id = %experiment.id, "Export error: {}", err);
                err
            })
    }
}
