//! Parameter range editing
//!
//! Edits are not validated: an inverted or zero-step range is accepted here
//! and rejected when the request is built.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::types::ParameterRange;
use crate::CoreError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Parameter {
    Temperature,
    TopP,
    MaxTokens,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Field {
    Min,
    Max,
    Step,
}

impl Parameter {
    pub fn label(self) -> &'static str {
        match self {
            Parameter::Temperature => "Temperature",
            Parameter::TopP => "Top P",
            Parameter::MaxTokens => "Max Tokens",
        }
    }

    pub fn help(self) -> &'static str {
        match self {
            Parameter::Temperature => "Controls randomness (0.1 = deterministic, 1.0 = creative)",
            Parameter::TopP => "Nucleus sampling threshold (lower = more focused vocabulary)",
            Parameter::MaxTokens => "Upper bound on the length of each response",
        }
    }
}

impl fmt::Display for Parameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Parameter::Temperature => "temperature",
            Parameter::TopP => "top_p",
            Parameter::MaxTokens => "max_tokens",
        })
    }
}

impl FromStr for Parameter {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "temperature" => Ok(Parameter::Temperature),
            "top_p" | "top-p" => Ok(Parameter::TopP),
            "max_tokens" | "max-tokens" => Ok(Parameter::MaxTokens),
            other => Err(CoreError::invalid_input(
                "INVALID_PARAMETER_NAME",
                format!("Unknown parameter: {}", other),
                "Parameter range edit",
                "Use temperature, top_p or max_tokens",
            )),
        }
    }
}

impl FromStr for Field {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "min" => Ok(Field::Min),
            "max" => Ok(Field::Max),
            "step" => Ok(Field::Step),
            other => Err(CoreError::invalid_input(
                "INVALID_FIELD_NAME",
                format!("Unknown range field: {}", other),
                "Parameter range edit",
                "Use min, max or step",
            )),
        }
    }
}

/// Holds the range being edited and produces a fresh copy on every change
#[derive(Debug, Clone, Default)]
pub struct ParameterRangeEditor {
    range: ParameterRange,
}

impl ParameterRangeEditor {
    pub fn new(range: ParameterRange) -> Self {
        Self { range }
    }

    pub fn range(&self) -> &ParameterRange {
        &self.range
    }

    /// Replace exactly one field and return the resulting range.
    /// Token values are rounded to the nearest integer and floored at zero.
    pub fn update(&mut self, param: Parameter, field: Field, value: f64) -> ParameterRange {
        let mut next = self.range;
        match param {
            Parameter::Temperature => *float_slot(&mut next.temperature, field) = value,
            Parameter::TopP => *float_slot(&mut next.top_p, field) = value,
            Parameter::MaxTokens => {
                let tokens = if value.is_finite() && value > 0.0 {
                    value.round().min(u32::MAX as f64) as u32
                } else {
                    0
                };
                match field {
                    Field::Min => next.max_tokens.min = tokens,
                    Field::Max => next.max_tokens.max = tokens,
                    Field::Step => next.max_tokens.step = tokens,
                }
            }
        }
        tracing::debug!(parameter = %param, ?field, value, "parameter range updated");
        self.range = next;
        next
    }

    /// Restore the fixed defaults
    pub fn reset(&mut self) -> ParameterRange {
        self.range = ParameterRange::default();
        self.range
    }
}

fn float_slot(bounds: &mut crate::types::Bounds<f64>, field: Field) -> &mut f64 {
    match field {
        Field::Min => &mut bounds.min,
        Field::Max => &mut bounds.max,
        Field::Step => &mut bounds.step,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Bounds;

    #[test]
    fn test_update_replaces_single_field() {
        let mut editor = ParameterRangeEditor::default();
        let before = *editor.range();
        let after = editor.update(Parameter::TopP, Field::Max, 0.8);

        assert_eq!(after.top_p, Bounds::new(0.1, 0.8, 0.1));
        assert_eq!(after.temperature, before.temperature);
        assert_eq!(after.max_tokens, before.max_tokens);
        assert_eq!(*editor.range(), after);
    }

    #[test]
    fn test_token_fields_are_integral() {
        let mut editor = ParameterRangeEditor::default();
        let range = editor.update(Parameter::MaxTokens, Field::Step, 149.6);
        assert_eq!(range.max_tokens.step, 150);
        let range = editor.update(Parameter::MaxTokens, Field::Min, -10.0);
        assert_eq!(range.max_tokens.min, 0);
    }

    #[test]
    fn test_edits_are_not_validated() {
        let mut editor = ParameterRangeEditor::default();
        let range = editor.update(Parameter::Temperature, Field::Min, 5.0);
        assert_eq!(range.temperature.min, 5.0);
    }

    #[test]
    fn test_reset_restores_defaults() {
        let mut editor = ParameterRangeEditor::default();
        editor.update(Parameter::Temperature, Field::Step, 0.3);
        editor.update(Parameter::MaxTokens, Field::Max, 4000.0);
        let range = editor.reset();

        assert_eq!(range.temperature, Bounds::new(0.1, 1.0, 0.1));
        assert_eq!(range.top_p, Bounds::new(0.1, 1.0, 0.1));
        assert_eq!(range.max_tokens, Bounds::new(100, 1000, 100));
    }

    #[test]
    fn test_parse_names() {
        assert_eq!("top_p".parse::<Parameter>().unwrap(), Parameter::TopP);
        assert_eq!("step".parse::<Field>().unwrap(), Field::Step);
        assert!("frequency_penalty".parse::<Parameter>().is_err());
    }
}
