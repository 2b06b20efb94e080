//! Experiment history view state

use tracing::{error, info, warn};

use crate::api::{ExperimentApi, ExportedFile};
use crate::types::{ExperimentData, ExportFormat, ExportRequest, ResponseData};
use crate::view::{response_preview, ExpansionSet};
use crate::Result;

pub const DEFAULT_PAGE: u32 = 1;
pub const DEFAULT_LIMIT: u32 = 10;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListState {
    Loading,
    /// Fetch failed; the view offers a retry
    Error(String),
    Empty,
    Loaded,
}

/// Outcome of a delete attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    /// The user did not confirm; nothing was sent
    Cancelled,
    Deleted,
}

#[derive(Debug)]
pub struct ExperimentHistory {
    experiments: Vec<ExperimentData>,
    state: ListState,
    page: u32,
    limit: u32,
    expanded_responses: ExpansionSet,
    export_menus: ExpansionSet,
}

impl Default for ExperimentHistory {
    fn default() -> Self {
        Self::new(DEFAULT_PAGE, DEFAULT_LIMIT)
    }
}

impl ExperimentHistory {
    pub fn new(page: u32, limit: u32) -> Self {
        Self {
            experiments: Vec::new(),
            state: ListState::Loading,
            page,
            limit,
            expanded_responses: ExpansionSet::new(),
            export_menus: ExpansionSet::new(),
        }
    }

    pub fn state(&self) -> &ListState {
        &self.state
    }

    pub fn experiments(&self) -> &[ExperimentData] {
        &self.experiments
    }

    /// Fetch the current page and replace the local list
    pub async fn refresh(&mut self, api: &dyn ExperimentApi) -> &ListState {
        self.state = ListState::Loading;
        match api.list_experiments(self.page, self.limit).await {
            Ok(list) => {
                info!(count = list.experiments.len(), page = self.page, "experiments loaded");
                self.experiments = list.experiments;
                self.state = self.settled_state();
            }
            Err(err) => {
                warn!(code = err.code(), "failed to fetch experiments: {}", err);
                self.state = ListState::Error(err.user_message().to_string());
            }
        }
        &self.state
    }

    /// Delete after confirmation. The item is removed from the local list
    /// only once the backend accepted the delete; no refetch follows.
    pub async fn delete(
        &mut self,
        api: &dyn ExperimentApi,
        experiment_id: &str,
        confirmed: bool,
    ) -> Result<DeleteOutcome> {
        if !confirmed {
            return Ok(DeleteOutcome::Cancelled);
        }

        if let Err(err) = api.delete_experiment(experiment_id).await {
            error!(experiment_id, "Delete error: {}", err);
            return Err(err);
        }

        self.experiments.retain(|e| e.id != experiment_id);
        self.export_menus.close(experiment_id);
        let remaining: Vec<&str> = self
            .experiments
            .iter()
            .flat_map(|e| e.responses.iter().map(|r| r.id.as_str()))
            .collect();
        self.expanded_responses.retain(|id| remaining.contains(&id));
        self.state = self.settled_state();
        Ok(DeleteOutcome::Deleted)
    }

    pub async fn export(
        &mut self,
        api: &dyn ExperimentApi,
        experiment_id: &str,
        format: ExportFormat,
    ) -> Result<ExportedFile> {
        let file = api
            .export(&ExportRequest::with_metrics(experiment_id, format))
            .await
            .map_err(|err| {
                error!(experiment_id, %format, "Export error: {}", err);
                err
            })?;
        self.export_menus.close(experiment_id);
        Ok(file)
    }

    pub fn toggle_export_menu(&mut self, experiment_id: &str) -> bool {
        self.export_menus.toggle(experiment_id)
    }

    pub fn is_export_menu_open(&self, experiment_id: &str) -> bool {
        self.export_menus.is_expanded(experiment_id)
    }

    pub fn toggle_response(&mut self, response_id: &str) -> bool {
        self.expanded_responses.toggle(response_id)
    }

    pub fn preview(&self, response: &ResponseData) -> String {
        response_preview(&response.content, self.expanded_responses.is_expanded(&response.id))
    }

    fn settled_state(&self) -> ListState {
        if self.experiments.is_empty() {
            ListState::Empty
        } else {
            ListState::Loaded
        }
    }
}
