//! Boundary validation for sweep requests
//!
//! Ranges are checked before a request leaves the client and again when the
//! proxy receives it, so an inverted or zero-step sweep is never forwarded
//! to the backend.

use crate::builder::RunCount;
use crate::types::{Bounds, GenerationRequest, ParameterRange};
use crate::{CoreError, Result};

pub const TEMPERATURE_DOMAIN: (f64, f64) = (0.0, 2.0);
pub const TOP_P_DOMAIN: (f64, f64) = (0.0, 1.0);
/// Largest number of values a single axis may enumerate to
pub const MAX_AXIS_POINTS: usize = 10_000;
/// Largest cartesian sweep a request may describe
pub const MAX_SWEEP_POINTS: usize = 1_000_000;

/// Validation utilities for experiment inputs
pub struct Validator;

impl Validator {
    /// Reject prompts that are empty after trimming
    pub fn validate_prompt(prompt: &str) -> Result<()> {
        if prompt.trim().is_empty() {
            return Err(CoreError::invalid_parameter(
                "INVALID_PROMPT_EMPTY",
                "Please enter a prompt",
                "Generation request validation",
                "Type the prompt the sweep should be run against",
                "prompt",
                "",
                "non-empty text",
            ));
        }
        Ok(())
    }

    /// Only the run counts offered by the request form are accepted
    pub fn validate_run_count(runs: u32) -> Result<RunCount> {
        RunCount::try_from(runs)
    }

    pub fn validate_parameter_range(range: &ParameterRange) -> Result<()> {
        Self::validate_float_bounds("temperature", &range.temperature, TEMPERATURE_DOMAIN)?;
        Self::validate_float_bounds("top_p", &range.top_p, TOP_P_DOMAIN)?;
        Self::validate_token_bounds(&range.max_tokens)?;

        for (name, points) in [
            ("temperature", range.temperature.len()),
            ("top_p", range.top_p.len()),
            ("max_tokens", range.max_tokens.len()),
        ] {
            if points > MAX_AXIS_POINTS {
                return Err(CoreError::invalid_parameter(
                    "INVALID_RANGE_TOO_LARGE",
                    format!("{} range has too many steps ({} points)", name, points),
                    "Parameter range validation",
                    format!("Use a larger {} step or a narrower range", name),
                    format!("{}.step", name),
                    points.to_string(),
                    format!("at most {} points", MAX_AXIS_POINTS),
                ));
            }
        }

        let total = range.grid_size();
        if total > MAX_SWEEP_POINTS {
            return Err(CoreError::invalid_parameter(
                "INVALID_RANGE_TOO_LARGE",
                format!("Sweep covers {} parameter combinations", total),
                "Parameter range validation",
                "Use larger steps or narrower ranges",
                "parameterRange",
                total.to_string(),
                format!("at most {} combinations", MAX_SWEEP_POINTS),
            ));
        }
        Ok(())
    }

    /// Full check of a request as it would be sent downstream
    pub fn validate_request(request: &GenerationRequest) -> Result<()> {
        Self::validate_prompt(&request.prompt)?;
        Self::validate_run_count(request.number_of_runs)?;
        Self::validate_parameter_range(&request.parameter_range)
    }

    fn validate_float_bounds(name: &str, bounds: &Bounds<f64>, domain: (f64, f64)) -> Result<()> {
        let valid_range = format!("{} to {}", domain.0, domain.1);

        for (field, value) in [("min", bounds.min), ("max", bounds.max), ("step", bounds.step)] {
            if !value.is_finite() {
                return Err(CoreError::invalid_parameter(
                    "INVALID_RANGE_NOT_FINITE",
                    format!("{}.{} must be a finite number", name, field),
                    "Parameter range validation",
                    "Enter a numeric value",
                    format!("{}.{}", name, field),
                    value.to_string(),
                    valid_range,
                ));
            }
        }

        if bounds.min < domain.0 || bounds.max > domain.1 {
            return Err(CoreError::invalid_parameter(
                "INVALID_RANGE_OUT_OF_DOMAIN",
                format!("{} range {}..{} lies outside {}", name, bounds.min, bounds.max, valid_range),
                "Parameter range validation",
                format!("Keep {} within {}", name, valid_range),
                name,
                format!("{}..{}", bounds.min, bounds.max),
                valid_range,
            ));
        }

        Self::check_order(name, bounds.min, bounds.max, bounds.step, bounds.step > 0.0)
    }

    fn validate_token_bounds(bounds: &Bounds<u32>) -> Result<()> {
        if bounds.min == 0 {
            return Err(CoreError::invalid_parameter(
                "INVALID_MAX_TOKENS",
                "max_tokens.min cannot be zero",
                "Parameter range validation",
                "Use a positive value to generate at least one token",
                "max_tokens.min",
                "0",
                "1 or more",
            ));
        }
        Self::check_order("max_tokens", bounds.min, bounds.max, bounds.step, bounds.step > 0)
    }

    fn check_order<T>(name: &str, min: T, max: T, step: T, step_positive: bool) -> Result<()>
    where
        T: PartialOrd + std::fmt::Display,
    {
        if min > max {
            return Err(CoreError::invalid_parameter(
                "INVALID_RANGE_INVERTED",
                format!("{} minimum {} is greater than maximum {}", name, min, max),
                "Parameter range validation",
                "Swap the bounds or lower the minimum",
                name,
                format!("{}..{}", min, max),
                "min <= max",
            ));
        }
        if !step_positive {
            return Err(CoreError::invalid_parameter(
                "INVALID_RANGE_STEP",
                format!("{} step must be positive, got {}", name, step),
                "Parameter range validation",
                "Use a step greater than zero",
                format!("{}.step", name),
                step.to_string(),
                "> 0",
            ));
        }
        Ok(())
    }
}
