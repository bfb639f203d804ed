//! Response normalization
//!
//! Detects which columns of a raw export hold assessment items and converts
//! Likert answers to values in [0,1].
//!
//! Conversion order for a single cell:
//! 1. Exact lookup in the canonical Likert table
//! 2. Embedded percentage range "(a-b%)" → midpoint / 100
//! 3. Numeric value: integers 0-5 and fractions above 1 (up to 5) are read
//!    on a 0-5 scale, other fractions in [0,1] are taken as already normalized
//! 4. Keyword match (always / often / sometimes / seldom, rarely / never)
//! 5. Missing, with a warning
//!
//! Conversion never fails; unmappable cells are reported as [`MappingIssue`]s.

use crate::models::{NormalizedResponseTable, RawCell, RawResponseTable};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::{debug, info, warn};
use traitscope_common::config::NormalizerConfig;

/// Percentage range embedded in Likert text, e.g. "(36-65%)"
static PERCENT_RANGE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\((\d+(?:\.\d+)?)\s*-\s*(\d+(?:\.\d+)?)\s*%\)").expect("Invalid percent range regex")
});

/// Canonical Likert answers
const CANONICAL_LIKERT: &[(&str, f64)] = &[
    ("Always (91-100%)", 1.0),
    ("Often (66-90%)", 0.7),
    ("Sometimes (36-65%)", 0.5),
    ("Seldom (11-35%)", 0.2),
    ("Rarely (11-35%)", 0.2),
    ("Never (0-10%)", 0.0),
    ("Always", 1.0),
    ("Often", 0.7),
    ("Sometimes", 0.5),
    ("Seldom", 0.2),
    ("Rarely", 0.2),
    ("Never", 0.0),
];

/// Keyword fallbacks, checked in order
const KEYWORDS: &[(&str, f64)] = &[
    ("always", 1.0),
    ("often", 0.7),
    ("sometimes", 0.5),
    ("seldom", 0.2),
    ("rarely", 0.2),
    ("never", 0.0),
];

/// Cell that could not be converted
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MappingIssue {
    pub person_id: String,
    pub column: String,
    pub raw_value: String,
}

/// Per-column conversion statistics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnConversion {
    pub column: String,
    /// Non-missing raw cells
    pub original_count: usize,
    /// Cells converted to a numeric value
    pub converted_count: usize,
    /// converted / original (0 when the column is empty)
    pub conversion_rate: f64,
}

/// Overall conversion summary
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConversionSummary {
    pub assessment_columns: usize,
    pub total_columns: usize,
    pub total_responses: usize,
    pub converted_responses: usize,
    pub overall_rate: f64,
    /// Distinct Likert answer texts seen (sorted, at most 10)
    pub likert_patterns_found: Vec<String>,
    /// Columns below the low-conversion threshold
    pub low_conversion_columns: Vec<String>,
}

/// Result of [`ResponseNormalizer::process`]
#[derive(Debug, Clone)]
pub struct NormalizationOutput {
    pub table: NormalizedResponseTable,
    pub column_stats: Vec<ColumnConversion>,
    pub summary: ConversionSummary,
    pub issues: Vec<MappingIssue>,
}

/// Likert response normalizer
pub struct ResponseNormalizer {
    config: NormalizerConfig,
}

impl Default for ResponseNormalizer {
    fn default() -> Self {
        Self::new(NormalizerConfig::default())
    }
}

impl ResponseNormalizer {
    pub fn new(config: NormalizerConfig) -> Self {
        Self { config }
    }

    fn is_metadata(&self, column: &str) -> bool {
        self.config.skip_columns.iter().any(|c| c == column)
            || self
                .config
                .skip_patterns
                .iter()
                .any(|p| !p.is_empty() && column.contains(p.as_str()))
    }

    /// Detect assessment item columns
    ///
    /// A column qualifies when any of the first `detection_sample` non-missing
    /// values looks like Likert text (contains both '(' and '%'). Configured
    /// metadata names and patterns are always excluded.
    ///
    /// # Returns
    /// Column names in table order
    pub fn detect_assessment_columns(&self, table: &RawResponseTable) -> Vec<String> {
        let detected: Vec<String> = table
            .columns()
            .iter()
            .enumerate()
            .filter(|(_, name)| !self.is_metadata(name))
            .filter(|(i, _)| {
                table
                    .column_values(*i)
                    .take(self.config.detection_sample)
                    .any(|cell| looks_like_likert(&cell.as_text()))
            })
            .map(|(_, name)| name.clone())
            .collect();

        info!(
            detected = detected.len(),
            total = table.columns().len(),
            "Detected assessment columns"
        );
        detected
    }

    /// Convert one cell, logging a warning when it cannot be mapped
    ///
    /// A lone numeric cell is its own column: values in [0,1] are kept,
    /// anything else is read on the 0-5 scale.
    pub fn map_response_to_numeric(&self, value: &RawCell) -> Option<f64> {
        let scale = NumericScale::detect(std::iter::once(value));
        let mapped = convert_cell(value, scale);
        if mapped.is_none() {
            warn!(raw = %value.as_text(), "Could not map response");
        }
        mapped
    }

    /// Normalize the given assessment columns
    ///
    /// Columns absent from the table are skipped with a warning.
    pub fn process(&self, table: &RawResponseTable, assessment_columns: &[String]) -> NormalizationOutput {
        let mut items = Vec::with_capacity(assessment_columns.len());
        let mut col_indices = Vec::with_capacity(assessment_columns.len());
        for name in assessment_columns {
            match table.column_index(name) {
                Some(i) => {
                    items.push(name.clone());
                    col_indices.push(i);
                }
                None => warn!(column = %name, "Assessment column not found in table"),
            }
        }

        let n_persons = table.n_persons();
        let mut values = vec![vec![None; items.len()]; n_persons];
        let mut column_stats = Vec::with_capacity(items.len());
        let mut issues = Vec::new();
        let mut patterns = BTreeSet::new();

        for (j, &col) in col_indices.iter().enumerate() {
            let scale = NumericScale::detect(table.column_values(col));
            let mut original = 0usize;
            let mut converted = 0usize;

            for (row, row_values) in values.iter_mut().enumerate() {
                let Some(cell) = table.cell(row, col) else {
                    continue;
                };
                original += 1;

                let text = cell.as_text();
                if looks_like_likert(&text) {
                    patterns.insert(text.trim().to_string());
                }

                match convert_cell(cell, scale) {
                    Some(v) => {
                        row_values[j] = Some(v);
                        converted += 1;
                    }
                    None => {
                        let person_id = table.person_ids()[row].clone();
                        warn!(
                            person_id = %person_id,
                            column = %items[j],
                            raw = %text,
                            "Could not map response, treating as missing"
                        );
                        issues.push(MappingIssue {
                            person_id,
                            column: items[j].clone(),
                            raw_value: text,
                        });
                    }
                }
            }

            let conversion_rate = if original > 0 {
                converted as f64 / original as f64
            } else {
                0.0
            };
            if conversion_rate < self.config.low_conversion_threshold {
                warn!(
                    column = %items[j],
                    rate = %format!("{:.2}%", conversion_rate * 100.0),
                    "Low conversion rate"
                );
            }
            column_stats.push(ColumnConversion {
                column: items[j].clone(),
                original_count: original,
                converted_count: converted,
                conversion_rate,
            });
        }

        let total_responses: usize = column_stats.iter().map(|c| c.original_count).sum();
        let converted_responses: usize = column_stats.iter().map(|c| c.converted_count).sum();
        let overall_rate = if total_responses > 0 {
            converted_responses as f64 / total_responses as f64
        } else {
            0.0
        };

        let summary = ConversionSummary {
            assessment_columns: items.len(),
            total_columns: table.columns().len(),
            total_responses,
            converted_responses,
            overall_rate,
            likert_patterns_found: patterns.into_iter().take(10).collect(),
            low_conversion_columns: column_stats
                .iter()
                .filter(|c| c.conversion_rate < self.config.low_conversion_threshold)
                .map(|c| c.column.clone())
                .collect(),
        };

        info!(
            columns = summary.assessment_columns,
            responses = total_responses,
            converted = converted_responses,
            rate = %format!("{:.2}%", overall_rate * 100.0),
            "Response mapping completed"
        );
        debug!(issues = issues.len(), "Unmapped cells");

        NormalizationOutput {
            table: NormalizedResponseTable::new(table.person_ids().to_vec(), items, values),
            column_stats,
            summary,
            issues,
        }
    }
}

fn looks_like_likert(text: &str) -> bool {
    text.contains('(') && text.contains('%')
}

/// Scale shared by every numeric value in one column
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum NumericScale {
    /// Every numeric value lies in [0,1] and is kept as-is
    Unit,
    /// Values are divided by 5
    FivePoint,
}

impl NumericScale {
    fn detect<'a>(cells: impl Iterator<Item = &'a RawCell>) -> Self {
        let all_unit = cells
            .filter_map(numeric_value)
            .filter(|n| n.is_finite())
            .all(|n| (0.0..=1.0).contains(&n));
        if all_unit {
            NumericScale::Unit
        } else {
            NumericScale::FivePoint
        }
    }
}

/// The cell's number, if it is one or parses as one
fn numeric_value(cell: &RawCell) -> Option<f64> {
    match cell {
        RawCell::Number(n) => Some(*n),
        RawCell::Text(s) => s.trim().parse::<f64>().ok(),
    }
}

/// Steps 1-4 of the conversion order; `None` means unmappable
fn convert_cell(value: &RawCell, scale: NumericScale) -> Option<f64> {
    match value {
        RawCell::Number(n) => normalize_numeric(*n, scale),
        RawCell::Text(s) => convert_text(s, scale),
    }
}

fn convert_text(raw: &str, scale: NumericScale) -> Option<f64> {
    let text = raw.trim();
    if text.is_empty() {
        return None;
    }

    if let Some(&(_, v)) = CANONICAL_LIKERT.iter().find(|(k, _)| *k == text) {
        return Some(v);
    }

    if let Some(caps) = PERCENT_RANGE.captures(text) {
        let lo = caps.get(1).and_then(|m| m.as_str().parse::<f64>().ok());
        let hi = caps.get(2).and_then(|m| m.as_str().parse::<f64>().ok());
        if let (Some(lo), Some(hi)) = (lo, hi) {
            let mid = (lo + hi) / 2.0 / 100.0;
            if (0.0..=1.0).contains(&mid) {
                return Some(mid);
            }
        }
    }

    if let Ok(n) = text.parse::<f64>() {
        return normalize_numeric(n, scale);
    }

    let lower = text.to_lowercase();
    KEYWORDS
        .iter()
        .find(|(k, _)| lower.contains(k))
        .map(|&(_, v)| v)
}

fn normalize_numeric(n: f64, scale: NumericScale) -> Option<f64> {
    if !n.is_finite() || !(0.0..=5.0).contains(&n) {
        return None;
    }
    match scale {
        NumericScale::Unit => Some(n),
        NumericScale::FivePoint => Some(n / 5.0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(s: &str) -> RawCell {
        RawCell::Text(s.to_string())
    }

    fn sample_table() -> RawResponseTable {
        RawResponseTable::new(
            vec!["p1".into(), "p2".into(), "p3".into()],
            vec![
                "Response Type".into(),
                "I meet deadlines".into(),
                "enrich_score".into(),
                "Comment".into(),
            ],
            vec![
                vec![
                    Some(text("completed")),
                    Some(text("Often (66-90%)")),
                    Some(text("(10%)")),
                    Some(text("fine")),
                ],
                vec![
                    Some(text("completed")),
                    Some(text("banana")),
                    None,
                    None,
                ],
                vec![Some(text("completed")), None, None, Some(text("ok"))],
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_canonical_table() {
        let n = ResponseNormalizer::default();
        assert_eq!(n.map_response_to_numeric(&text("Always (91-100%)")), Some(1.0));
        assert_eq!(n.map_response_to_numeric(&text("Often (66-90%)")), Some(0.7));
        assert_eq!(n.map_response_to_numeric(&text("Sometimes (36-65%)")), Some(0.5));
        assert_eq!(n.map_response_to_numeric(&text("Seldom (11-35%)")), Some(0.2));
        assert_eq!(n.map_response_to_numeric(&text("Never (0-10%)")), Some(0.0));
    }

    #[test]
    fn test_range_midpoint() {
        let n = ResponseNormalizer::default();
        assert_eq!(n.map_response_to_numeric(&text("Mostly (40-60%)")), Some(0.5));
        assert_eq!(n.map_response_to_numeric(&text("Usually (70 - 90%)")), Some(0.8));
    }

    #[test]
    fn test_numeric_scales() {
        let n = ResponseNormalizer::default();
        assert_eq!(n.map_response_to_numeric(&text("5")), Some(1.0));
        assert_eq!(n.map_response_to_numeric(&text("4")), Some(0.8));
        assert_eq!(n.map_response_to_numeric(&RawCell::Number(0.7)), Some(0.7));
        assert_eq!(n.map_response_to_numeric(&RawCell::Number(2.5)), Some(0.5));
        assert_eq!(n.map_response_to_numeric(&RawCell::Number(9.0)), None);
        assert_eq!(n.map_response_to_numeric(&RawCell::Number(-1.0)), None);
    }

    #[test]
    fn test_unit_column_keeps_order() {
        let n = ResponseNormalizer::default();
        let cells = [0.5, 0.9, 0.99, 1.0, 0.0];
        let rows = cells.iter().map(|&v| vec![Some(RawCell::Number(v))]).collect();
        let ids = (0..cells.len()).map(|i| format!("p{}", i)).collect();
        let table = RawResponseTable::new(ids, vec!["Q".to_string()], rows).unwrap();

        let out = n.process(&table, &["Q".to_string()]);
        let values: Vec<Option<f64>> = (0..cells.len()).map(|p| out.table.value(p, 0)).collect();
        assert_eq!(values, cells.iter().map(|&v| Some(v)).collect::<Vec<_>>());
        assert!(values[1] < values[3]);

        assert_eq!(n.map_response_to_numeric(&RawCell::Number(1.0)), Some(1.0));
        assert_eq!(n.map_response_to_numeric(&text("1.0")), Some(1.0));
    }

    #[test]
    fn test_five_point_column_divides_every_value() {
        let n = ResponseNormalizer::default();
        let cells = [text("1"), text("0.5"), RawCell::Number(3.0), text("5")];
        let rows = cells.iter().map(|c| vec![Some(c.clone())]).collect();
        let ids = (0..cells.len()).map(|i| format!("p{}", i)).collect();
        let table = RawResponseTable::new(ids, vec!["Q".to_string()], rows).unwrap();

        let out = n.process(&table, &["Q".to_string()]);
        let values: Vec<Option<f64>> = (0..cells.len()).map(|p| out.table.value(p, 0)).collect();
        assert_eq!(values, vec![Some(0.2), Some(0.1), Some(0.6), Some(1.0)]);
    }

    #[test]
    fn test_keyword_fallback() {
        let n = ResponseNormalizer::default();
        assert_eq!(n.map_response_to_numeric(&text("almost ALWAYS")), Some(1.0));
        assert_eq!(n.map_response_to_numeric(&text("rarely, if ever")), Some(0.2));
        assert_eq!(n.map_response_to_numeric(&text("never really")), Some(0.0));
    }

    #[test]
    fn test_unmappable_is_missing() {
        let n = ResponseNormalizer::default();
        assert_eq!(n.map_response_to_numeric(&text("banana")), None);
        assert_eq!(n.map_response_to_numeric(&text("   ")), None);
    }

    #[test]
    fn test_detection_skips_metadata() {
        let n = ResponseNormalizer::default();
        let detected = n.detect_assessment_columns(&sample_table());
        // "enrich_score" matches the Likert shape but is excluded by pattern
        assert_eq!(detected, vec!["I meet deadlines".to_string()]);
    }

    #[test]
    fn test_process_reports_issues_and_rates() {
        let n = ResponseNormalizer::default();
        let table = sample_table();
        let columns = vec!["I meet deadlines".to_string(), "Missing column".to_string()];
        let out = n.process(&table, &columns);

        assert_eq!(out.table.items(), &["I meet deadlines".to_string()]);
        assert_eq!(out.table.value(0, 0), Some(0.7));
        assert_eq!(out.table.value(1, 0), None);
        assert_eq!(out.table.value(2, 0), None);

        assert_eq!(out.issues.len(), 1);
        assert_eq!(out.issues[0].person_id, "p2");
        assert_eq!(out.issues[0].raw_value, "banana");

        let stats = &out.column_stats[0];
        assert_eq!(stats.original_count, 2);
        assert_eq!(stats.converted_count, 1);
        assert!((stats.conversion_rate - 0.5).abs() < 1e-12);
        assert_eq!(out.summary.low_conversion_columns, vec!["I meet deadlines".to_string()]);
        assert_eq!(out.summary.likert_patterns_found, vec!["Often (66-90%)".to_string()]);
    }
}
