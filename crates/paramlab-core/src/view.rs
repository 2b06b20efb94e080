//! Display helpers and per-view visibility state

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};

use crate::types::ExportFormat;

/// Preview length for collapsed response text
pub const PREVIEW_LENGTH: usize = 150;

/// Set of panel ids that are currently open. Each id toggles independently,
/// so any number of responses or dropdowns can be expanded at once.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExpansionSet {
    open: BTreeSet<String>,
}

impl ExpansionSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Flip the state of `id`; returns whether it is now open
    pub fn toggle(&mut self, id: &str) -> bool {
        if self.open.remove(id) {
            false
        } else {
            self.open.insert(id.to_string());
            true
        }
    }

    pub fn open(&mut self, id: &str) {
        self.open.insert(id.to_string());
    }

    pub fn close(&mut self, id: &str) {
        self.open.remove(id);
    }

    pub fn is_expanded(&self, id: &str) -> bool {
        self.open.contains(id)
    }

    pub fn len(&self) -> usize {
        self.open.len()
    }

    pub fn is_empty(&self) -> bool {
        self.open.is_empty()
    }

    /// Drop every id not satisfying `keep`, e.g. after items are removed
    pub fn retain<F: FnMut(&str) -> bool>(&mut self, mut keep: F) {
        self.open.retain(|id| keep(id.as_str()));
    }
}

/// First `max_len` characters followed by `...`, or the text unchanged when
/// it already fits. Counts characters, never splitting a code point.
pub fn truncate_preview(text: &str, max_len: usize) -> String {
    match text.char_indices().nth(max_len) {
        None => text.to_string(),
        Some((cut, _)) => format!("{}...", &text[..cut]),
    }
}

/// Response text as shown in a list, collapsed or in full
pub fn response_preview(content: &str, expanded: bool) -> String {
    if expanded {
        content.to_string()
    } else {
        truncate_preview(content, PREVIEW_LENGTH)
    }
}

/// Whether the content is long enough to need an expand toggle
pub fn needs_expansion(content: &str) -> bool {
    content.chars().nth(PREVIEW_LENGTH).is_some()
}

/// Download name of an exported experiment
pub fn export_filename(experiment_id: &str, format: ExportFormat) -> String {
    format!("experiment_{}.{}", experiment_id, format.extension())
}

/// Human-readable timestamp such as `Mar 1 2024 10:05 AM`
pub fn format_timestamp(raw: &str) -> String {
    match DateTime::parse_from_rfc3339(raw) {
        Ok(ts) => ts.with_timezone(&Utc).format("%b %-d %Y %I:%M %p").to_string(),
        Err(_) => "Invalid Date".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_long_text() {
        let text = "a".repeat(151);
        let preview = truncate_preview(&text, PREVIEW_LENGTH);
        assert_eq!(preview, format!("{}...", "a".repeat(150)));
    }

    #[test]
    fn test_truncate_short_text_unchanged() {
        let exact = "b".repeat(150);
        assert_eq!(truncate_preview(&exact, PREVIEW_LENGTH), exact);
        assert_eq!(truncate_preview("", PREVIEW_LENGTH), "");
        assert!(!needs_expansion(&exact));
        assert!(needs_expansion(&format!("{}c", exact)));
    }

    #[test]
    fn test_truncate_respects_char_boundaries() {
        let text = "é".repeat(200);
        let preview = truncate_preview(&text, PREVIEW_LENGTH);
        assert_eq!(preview.chars().count(), 153);
        assert!(preview.starts_with(&"é".repeat(150)));
    }

    #[test]
    fn test_expansion_is_independent_per_id() {
        let long = "x".repeat(400);
        let mut expanded = ExpansionSet::new();

        assert!(expanded.toggle("r1"));
        assert!(expanded.toggle("r2"));
        assert_eq!(response_preview(&long, expanded.is_expanded("r1")), long);

        assert!(!expanded.toggle("r1"));
        assert!(!expanded.is_expanded("r1"));
        assert!(expanded.is_expanded("r2"));
        assert_eq!(
            response_preview(&long, expanded.is_expanded("r1")),
            format!("{}...", "x".repeat(150))
        );

        expanded.retain(|id| id != "r2");
        assert!(expanded.is_empty());
    }

    #[test]
    fn test_export_filename() {
        assert_eq!(export_filename("abc123", ExportFormat::Csv), "experiment_abc123.csv");
        assert_eq!(export_filename("abc123", ExportFormat::Pdf), "experiment_abc123.pdf");
    }

    #[test]
    fn test_format_timestamp() {
        assert_eq!(format_timestamp("2024-03-01T10:05:00Z"), "Mar 1 2024 10:05 AM");
        assert_eq!(format_timestamp("2024-12-24T18:30:00+00:00"), "Dec 24 2024 06:30 PM");
        assert_eq!(format_timestamp("yesterday"), "Invalid Date");
    }
}
