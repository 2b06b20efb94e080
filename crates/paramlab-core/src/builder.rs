//! Generation request form

use serde::{Deserialize, Serialize};

use crate::types::{GenerationRequest, ParameterRange};
use crate::validation::Validator;
use crate::{CoreError, Result};

/// Number of responses to generate, restricted to the choices the form offers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub enum RunCount {
    Three,
    Five,
    Ten,
    Fifteen,
    Twenty,
}

impl RunCount {
    pub const ALL: [RunCount; 5] = [
        RunCount::Three,
        RunCount::Five,
        RunCount::Ten,
        RunCount::Fifteen,
        RunCount::Twenty,
    ];

    pub fn get(self) -> u32 {
        match self {
            RunCount::Three => 3,
            RunCount::Five => 5,
            RunCount::Ten => 10,
            RunCount::Fifteen => 15,
            RunCount::Twenty => 20,
        }
    }
}

impl Default for RunCount {
    fn default() -> Self {
        RunCount::Five
    }
}

impl TryFrom<u32> for RunCount {
    type Error = CoreError;

    fn try_from(runs: u32) -> Result<Self> {
        RunCount::ALL
            .into_iter()
            .find(|count| count.get() == runs)
            .ok_or_else(|| {
                CoreError::invalid_parameter(
                    "INVALID_RUN_COUNT",
                    format!("Unsupported number of runs: {}", runs),
                    "Generation request validation",
                    "Choose 3, 5, 10, 15 or 20 runs",
                    "numberOfRuns",
                    runs.to_string(),
                    "3 | 5 | 10 | 15 | 20",
                )
            })
    }
}

impl From<RunCount> for u32 {
    fn from(count: RunCount) -> Self {
        count.get()
    }
}

/// Collects the prompt form fields and turns them into a request
#[derive(Debug, Clone, Default)]
pub struct GenerationRequestBuilder {
    prompt: String,
    experiment_name: String,
    experiment_description: String,
    runs: RunCount,
}

impl GenerationRequestBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn prompt(mut self, prompt: impl Into<String>) -> Self {
        self.prompt = prompt.into();
        self
    }

    pub fn experiment_name(mut self, name: impl Into<String>) -> Self {
        self.experiment_name = name.into();
        self
    }

    pub fn experiment_description(mut self, description: impl Into<String>) -> Self {
        self.experiment_description = description.into();
        self
    }

    pub fn runs(mut self, runs: RunCount) -> Self {
        self.runs = runs;
        self
    }

    /// Build the request for `range`. Fails with "Please enter a prompt" when
    /// the prompt is blank, or with the range error when the range is invalid.
    pub fn build(&self, range: &ParameterRange) -> Result<GenerationRequest> {
        Validator::validate_prompt(&self.prompt)?;
        Validator::validate_parameter_range(range)?;

        Ok(GenerationRequest {
            prompt: self.prompt.trim().to_string(),
            parameter_range: *range,
            number_of_runs: self.runs.get(),
            experiment_name: non_empty(&self.experiment_name),
            experiment_description: non_empty(&self.experiment_description),
        })
    }
}

fn non_empty(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_trims_fields() {
        let request = GenerationRequestBuilder::new()
            .prompt("  Write a story about a robot learning to paint \n")
            .experiment_name("  Creative Writing Analysis ")
            .experiment_description("   ")
            .runs(RunCount::Ten)
            .build(&ParameterRange::default())
            .unwrap();

        assert_eq!(request.prompt, "Write a story about a robot learning to paint");
        assert_eq!(request.experiment_name.as_deref(), Some("Creative Writing Analysis"));
        assert_eq!(request.experiment_description, None);
        assert_eq!(request.number_of_runs, 10);
    }

    #[test]
    fn test_default_run_count_is_five() {
        let request = GenerationRequestBuilder::new()
            .prompt("hi")
            .build(&ParameterRange::default())
            .unwrap();
        assert_eq!(request.number_of_runs, 5);
    }

    #[test]
    fn test_blank_prompt_rejected() {
        let err = GenerationRequestBuilder::new()
            .prompt("   ")
            .build(&ParameterRange::default())
            .unwrap_err();
        assert_eq!(err.user_message(), "Please enter a prompt");
    }

    #[test]
    fn test_invalid_range_rejected() {
        let mut range = ParameterRange::default();
        range.max_tokens.step = 0;
        let err = GenerationRequestBuilder::new().prompt("hi").build(&range).unwrap_err();
        assert_eq!(err.code(), "INVALID_RANGE_STEP");
    }

    #[test]
    fn test_run_count_choices() {
        for runs in [3, 5, 10, 15, 20] {
            assert_eq!(RunCount::try_from(runs).unwrap().get(), runs);
        }
        for runs in [0, 1, 4, 25] {
            assert_eq!(RunCount::try_from(runs).unwrap_err().code(), "INVALID_RUN_COUNT");
        }
        assert_eq!(serde_json::to_value(RunCount::Fifteen).unwrap(), 15);
        assert!(serde_json::from_value::<RunCount>(serde_json::json!(7)).is_err());
    }
}
