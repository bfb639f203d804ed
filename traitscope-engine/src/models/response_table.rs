//! Response tables passed between pipeline stages
//!
//! Each stage produces a new table from its predecessor; nothing is mutated
//! in place once built.
//!
//! - [`RawResponseTable`]: persons × columns (items and metadata), free text or numbers
//! - [`NormalizedResponseTable`]: persons × assessment items, values in [0,1] or missing
//! - [`EncodedResponseMatrix`]: persons × assessment items, ordinal codes 0-4 or missing

use crate::error::{EngineError, EngineResult};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Single raw cell value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawCell {
    Number(f64),
    Text(String),
}

impl RawCell {
    /// Text form used for pattern checks and logging
    pub fn as_text(&self) -> String {
        match self {
            RawCell::Number(n) => n.to_string(),
            RawCell::Text(s) => s.clone(),
        }
    }
}

/// Raw questionnaire export: one row per person
#[derive(Debug, Clone, Serialize)]
pub struct RawResponseTable {
    person_ids: Vec<String>,
    columns: Vec<String>,
    rows: Vec<Vec<Option<RawCell>>>,
}

impl RawResponseTable {
    /// Build a table, checking that every row matches the column count
    ///
    /// # Errors
    ///
    /// - [`EngineError::MissingData`] if there are no rows or no columns
    /// - [`EngineError::InvalidParameter`] on ragged rows, id/row count
    ///   mismatch, or duplicate person ids / column names
    pub fn new(
        person_ids: Vec<String>,
        columns: Vec<String>,
        rows: Vec<Vec<Option<RawCell>>>,
    ) -> EngineResult<Self> {
        if rows.is_empty() {
            return Err(EngineError::MissingData("response table has no rows".into()));
        }
        if columns.is_empty() {
            return Err(EngineError::MissingData("response table has no columns".into()));
        }
        if person_ids.len() != rows.len() {
            return Err(EngineError::InvalidParameter(format!(
                "{} person ids for {} rows",
                person_ids.len(),
                rows.len()
            )));
        }
        if let Some((i, row)) = rows.iter().enumerate().find(|(_, r)| r.len() != columns.len()) {
            return Err(EngineError::InvalidParameter(format!(
                "row {} has {} cells, expected {}",
                i,
                row.len(),
                columns.len()
            )));
        }
        ensure_unique(&person_ids, "person id")?;
        ensure_unique(&columns, "column")?;

        Ok(Self {
            person_ids,
            columns,
            rows,
        })
    }

    pub fn person_ids(&self) -> &[String] {
        &self.person_ids
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn n_persons(&self) -> usize {
        self.rows.len()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn cell(&self, row: usize, col: usize) -> Option<&RawCell> {
        self.rows.get(row).and_then(|r| r.get(col)).and_then(|c| c.as_ref())
    }

    /// Non-missing values of a column, in row order
    pub fn column_values(&self, col: usize) -> impl Iterator<Item = &RawCell> + '_ {
        self.rows.iter().filter_map(move |r| r.get(col).and_then(|c| c.as_ref()))
    }
}

fn ensure_unique(values: &[String], what: &str) -> EngineResult<()> {
    let mut seen = HashSet::with_capacity(values.len());
    for v in values {
        if !seen.insert(v.as_str()) {
            return Err(EngineError::InvalidParameter(format!("duplicate {}: '{}'", what, v)));
        }
    }
    Ok(())
}

/// JSON input document accepted by the command-line tool
///
/// ```json
/// { "person_id_column": "Respondent",
///   "columns": ["Respondent", "I meet deadlines"],
///   "rows": [["p1", "Often (66-90%)"]] }
/// ```
///
/// Without `person_id_column`, persons are numbered `row-1`, `row-2`, ...
#[derive(Debug, Clone, Deserialize)]
pub struct TableInput {
    #[serde(default)]
    pub person_id_column: Option<String>,
    pub columns: Vec<String>,
    pub rows: Vec<Vec<serde_json::Value>>,
}

impl TableInput {
    /// Convert to a [`RawResponseTable`], splitting off the id column
    pub fn into_raw_table(self) -> EngineResult<RawResponseTable> {
        let id_col = match &self.person_id_column {
            Some(name) => Some(self.columns.iter().position(|c| c == name).ok_or_else(|| {
                EngineError::MissingData(format!("person id column '{}' not in columns", name))
            })?),
            None => None,
        };

        let columns: Vec<String> = self
            .columns
            .iter()
            .enumerate()
            .filter(|(i, _)| Some(*i) != id_col)
            .map(|(_, c)| c.clone())
            .collect();

        let mut person_ids = Vec::with_capacity(self.rows.len());
        let mut rows = Vec::with_capacity(self.rows.len());
        for (r, row) in self.rows.into_iter().enumerate() {
            if row.len() != self.columns.len() {
                return Err(EngineError::InvalidParameter(format!(
                    "row {} has {} cells, expected {}",
                    r,
                    row.len(),
                    self.columns.len()
                )));
            }
            let mut cells = Vec::with_capacity(columns.len());
            let mut person_id = format!("row-{}", r + 1);
            for (c, value) in row.into_iter().enumerate() {
                if Some(c) == id_col {
                    match json_to_cell(value) {
                        Some(cell) => person_id = cell.as_text(),
                        None => {
                            return Err(EngineError::MissingData(format!(
                                "row {} has no person id",
                                r
                            )))
                        }
                    }
                } else {
                    cells.push(json_to_cell(value));
                }
            }
            person_ids.push(person_id);
            rows.push(cells);
        }

        RawResponseTable::new(person_ids, columns, rows)
    }
}

fn json_to_cell(value: serde_json::Value) -> Option<RawCell> {
    match value {
        serde_json::Value::Null => None,
        serde_json::Value::Number(n) => n.as_f64().map(RawCell::Number),
        serde_json::Value::String(s) if s.trim().is_empty() => None,
        serde_json::Value::String(s) => Some(RawCell::Text(s)),
        other => Some(RawCell::Text(other.to_string())),
    }
}

/// Assessment-item values normalized to [0,1]
#[derive(Debug, Clone, Serialize)]
pub struct NormalizedResponseTable {
    person_ids: Vec<String>,
    items: Vec<String>,
    values: Vec<Vec<Option<f64>>>,
}

impl NormalizedResponseTable {
    /// Build from row-major values; out-of-range values become missing
    pub fn new(person_ids: Vec<String>, items: Vec<String>, values: Vec<Vec<Option<f64>>>) -> Self {
        let values = values
            .into_iter()
            .map(|row| {
                row.into_iter()
                    .map(|v| v.filter(|x| x.is_finite() && (0.0..=1.0).contains(x)))
                    .collect()
            })
            .collect();
        Self {
            person_ids,
            items,
            values,
        }
    }

    pub fn person_ids(&self) -> &[String] {
        &self.person_ids
    }

    pub fn items(&self) -> &[String] {
        &self.items
    }

    pub fn n_persons(&self) -> usize {
        self.person_ids.len()
    }

    pub fn person_index(&self, person_id: &str) -> Option<usize> {
        self.person_ids.iter().position(|p| p == person_id)
    }

    pub fn item_index(&self, item: &str) -> Option<usize> {
        self.items.iter().position(|i| i == item)
    }

    pub fn value(&self, person: usize, item: usize) -> Option<f64> {
        self.values.get(person).and_then(|r| r.get(item)).copied().flatten()
    }

    pub fn row(&self, person: usize) -> &[Option<f64>] {
        self.values.get(person).map(|r| r.as_slice()).unwrap_or(&[])
    }
}

/// Ordinal codes after reverse-scoring
#[derive(Debug, Clone, Serialize)]
pub struct EncodedResponseMatrix {
    person_ids: Vec<String>,
    items: Vec<String>,
    codes: Vec<Vec<Option<u8>>>,
    reversed: Vec<bool>,
}

impl EncodedResponseMatrix {
    pub fn new(
        person_ids: Vec<String>,
        items: Vec<String>,
        codes: Vec<Vec<Option<u8>>>,
        reversed: Vec<bool>,
    ) -> Self {
        Self {
            person_ids,
            items,
            codes,
            reversed,
        }
    }

    pub fn person_ids(&self) -> &[String] {
        &self.person_ids
    }

    pub fn items(&self) -> &[String] {
        &self.items
    }

    pub fn n_persons(&self) -> usize {
        self.person_ids.len()
    }

    pub fn n_items(&self) -> usize {
        self.items.len()
    }

    pub fn code(&self, person: usize, item: usize) -> Option<u8> {
        self.codes.get(person).and_then(|r| r.get(item)).copied().flatten()
    }

    /// Whether an item was reverse-scored during encoding
    pub fn is_reversed(&self, item: usize) -> bool {
        self.reversed.get(item).copied().unwrap_or(false)
    }

    pub fn rows(&self) -> &[Vec<Option<u8>>] {
        &self.codes
    }
}
