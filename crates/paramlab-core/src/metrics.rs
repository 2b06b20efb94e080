//! Aggregation over the quality metrics of an experiment's responses
//!
//! Everything here is derived from data already fetched; nothing calls the
//! backend. Empty response sets yield `None` instead of the `-inf` / `NaN`
//! a naive max/mean would produce.

use serde::Serialize;

use crate::types::{ExperimentData, QualityMetrics, ResponseData};

/// Highest overall score across the responses
pub fn best_score(responses: &[ResponseData]) -> Option<f64> {
    responses
        .iter()
        .map(|r| r.metrics.overall_score)
        .fold(None, |best: Option<f64>, score| match best {
            Some(b) if b >= score => Some(b),
            _ => Some(score),
        })
}

/// Arithmetic mean of the overall scores
pub fn average_score(responses: &[ResponseData]) -> Option<f64> {
    if responses.is_empty() {
        return None;
    }
    let total: f64 = responses.iter().map(|r| r.metrics.overall_score).sum();
    Some(total / responses.len() as f64)
}

/// First response holding the highest overall score
pub fn best_response(responses: &[ResponseData]) -> Option<&ResponseData> {
    responses.iter().fold(None, |best: Option<&ResponseData>, current| match best {
        Some(b) if current.metrics.overall_score <= b.metrics.overall_score => Some(b),
        _ => Some(current),
    })
}

/// Per-metric means
pub fn average_metrics(responses: &[ResponseData]) -> Option<QualityMetrics> {
    if responses.is_empty() {
        return None;
    }
    let n = responses.len() as f64;
    let sum = responses.iter().fold(QualityMetrics::default(), |acc, r| QualityMetrics {
        coherence: acc.coherence + r.metrics.coherence,
        completeness: acc.completeness + r.metrics.completeness,
        readability: acc.readability + r.metrics.readability,
        relevance: acc.relevance + r.metrics.relevance,
        overall_score: acc.overall_score + r.metrics.overall_score,
    });
    Some(QualityMetrics {
        coherence: sum.coherence / n,
        completeness: sum.completeness / n,
        readability: sum.readability / n,
        relevance: sum.relevance / n,
        overall_score: sum.overall_score / n,
    })
}

/// Round to two decimals for display
pub fn format_score(score: f64) -> f64 {
    (score * 100.0).round() / 100.0
}

/// One bar group of the per-response comparison chart
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartRow {
    pub name: String,
    pub coherence: f64,
    pub completeness: f64,
    pub readability: f64,
    pub relevance: f64,
    pub overall: f64,
}

pub fn chart_rows(responses: &[ResponseData]) -> Vec<ChartRow> {
    responses
        .iter()
        .enumerate()
        .map(|(index, response)| ChartRow {
            name: format!("Response {}", index + 1),
            coherence: format_score(response.metrics.coherence),
            completeness: format_score(response.metrics.completeness),
            readability: format_score(response.metrics.readability),
            relevance: format_score(response.metrics.relevance),
            overall: format_score(response.metrics.overall_score),
        })
        .collect()
}

/// Average of each component metric, in radar-chart order
pub fn radar_points(responses: &[ResponseData]) -> Vec<(&'static str, f64)> {
    match average_metrics(responses) {
        Some(avg) => vec![
            ("Coherence", avg.coherence),
            ("Completeness", avg.completeness),
            ("Readability", avg.readability),
            ("Relevance", avg.relevance),
        ],
        None => Vec::new(),
    }
}

/// Headline numbers shown for an experiment card
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExperimentSummary {
    pub best: Option<f64>,
    pub average: Option<f64>,
    pub response_count: usize,
    pub total_runs: u32,
    pub runs_consistent: bool,
}

impl ExperimentData {
    pub fn summary(&self) -> ExperimentSummary {
        ExperimentSummary {
            best: best_score(&self.responses),
            average: average_score(&self.responses),
            response_count: self.responses.len(),
            total_runs: self.total_runs,
            runs_consistent: self.runs_consistent(),
        }
    }
}


#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_best_and_average() {
        let exp = experiment("e", &[0.4, 0.9, 0.65]);
        assert_eq!(best_score(&exp.responses), Some(0.9));
        let avg = average_score(&exp.responses).unwrap();
        assert!((avg - 0.65).abs() < 1e-12);
        assert_eq!(best_response(&exp.responses).unwrap().id, "e-r1");
    }

    #[test]
    fn test_empty_responses() {
        assert_eq!(best_score(&[]), None);
        assert_eq!(average_score(&[]), None);
        assert!(best_response(&[]).is_none());
        assert!(average_metrics(&[]).is_none());
        assert!(radar_points(&[]).is_empty());
    }

    #[test]
    fn test_best_response_keeps_first_on_tie() {
        let exp = experiment("t", &[0.7, 0.7]);
        assert_eq!(best_response(&exp.responses).unwrap().id, "t-r0");
    }

    #[test]
    fn test_chart_rows_are_rounded() {
        let exp = experiment("c", &[0.12345]);
        let rows = chart_rows(&exp.responses);
        assert_eq!(rows[0].name, "Response 1");
        assert_eq!(rows[0].overall, 0.12);
        assert_eq!(rows[0].readability, 0.88);
    }

    #[test]
    fn test_summary() {
        let mut exp = experiment("s", &[0.2, 0.6]);
        let summary = exp.summary();
        assert_eq!(summary.response_count, 2);
        assert!(summary.runs_consistent);

        exp.total_runs = 5;
        assert!(!exp.summary().runs_consistent);
    }

    proptest! {
        #[test]
        fn test_scores_match_definition(scores in prop::collection::vec(0.0f64..=1.0, 1..40)) {
            let exp = experiment("p", &scores);
            let expected_max = scores.iter().cloned().fold(f64::MIN, f64::max);
            let expected_mean = scores.iter().sum::<f64>() / scores.len() as f64;

            prop_assert_eq!(best_score(&exp.responses), Some(expected_max));
            let mean = average_score(&exp.responses).unwrap();
            prop_assert!((mean - expected_mean).abs() < 1e-9);
            prop_assert_eq!(average_score(&exp.responses), Some(mean));
        }
    }
}
