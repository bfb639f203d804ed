//! Ordinal encoding with reverse-scoring
//!
//! Normalized values map to five ordered categories through a
//! non-decreasing step function:
//!
//! | value        | code |
//! |--------------|------|
//! | < 0.10       | 0    |
//! | < 0.35       | 1    |
//! | < 0.65       | 2    |
//! | < 0.90       | 3    |
//! | otherwise    | 4    |
//!
//! Items in the reverse-scored table are mirrored (0↔4, 1↔3, 2 fixed).

use crate::models::{EncodedResponseMatrix, NormalizedResponseTable};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{info, warn};
use traitscope_common::ReverseScoredItems;

/// Highest ordinal code
pub const MAX_CODE: u8 = 4;

/// Upper bounds (exclusive) for codes 0..=3
const STEP_BOUNDS: [f64; 4] = [0.10, 0.35, 0.65, 0.90];

/// Encoding statistics
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EncodingStats {
    pub columns_converted: usize,
    pub columns_reverse_scored: usize,
    /// Reverse-scored table version applied
    pub reverse_table_version: String,
    /// Cells per final code (after reverse-scoring)
    pub score_distribution: BTreeMap<u8, usize>,
    pub missing_cells: usize,
}

/// Result of [`IntegerEncoder::convert`]
#[derive(Debug, Clone)]
pub struct EncodingOutput {
    pub matrix: EncodedResponseMatrix,
    pub stats: EncodingStats,
}

/// Normalized value → ordinal code converter
#[derive(Debug, Default)]
pub struct IntegerEncoder;

impl IntegerEncoder {
    pub fn new() -> Self {
        Self
    }

    /// Step function from [0,1] to 0..=4
    ///
    /// Values outside [0,1] saturate at the end codes; NaN maps to 0.
    pub fn float_to_integer(value: f64) -> u8 {
        if value.is_nan() {
            return 0;
        }
        STEP_BOUNDS
            .iter()
            .position(|&bound| value < bound)
            .map(|p| p as u8)
            .unwrap_or(MAX_CODE)
    }

    /// Mirror a code around the scale midpoint (an involution)
    pub fn reverse_score(code: u8) -> u8 {
        MAX_CODE - code.min(MAX_CODE)
    }

    /// Encode the given columns of a normalized table
    ///
    /// # Arguments
    /// * `table` - Normalized responses
    /// * `assessment_columns` - Columns to encode, in output order
    /// * `reverse` - Canonical reverse-scored item table
    pub fn convert(
        &self,
        table: &NormalizedResponseTable,
        assessment_columns: &[String],
        reverse: &ReverseScoredItems,
    ) -> EncodingOutput {
        let mut items = Vec::with_capacity(assessment_columns.len());
        let mut indices = Vec::with_capacity(assessment_columns.len());
        for name in assessment_columns {
            match table.item_index(name) {
                Some(j) => {
                    items.push(name.clone());
                    indices.push(j);
                }
                None => warn!(column = %name, "Column not in normalized table, not encoded"),
            }
        }

        let reversed: Vec<bool> = items.iter().map(|i| reverse.contains(i)).collect();

        let mut stats = EncodingStats {
            columns_converted: items.len(),
            columns_reverse_scored: reversed.iter().filter(|r| **r).count(),
            reverse_table_version: reverse.version.clone(),
            ..Default::default()
        };
        for code in 0..=MAX_CODE {
            stats.score_distribution.insert(code, 0);
        }

        let codes: Vec<Vec<Option<u8>>> = (0..table.n_persons())
            .map(|p| {
                indices
                    .iter()
                    .zip(&reversed)
                    .map(|(&j, &is_reversed)| {
                        let code = table.value(p, j).map(|v| {
                            let c = Self::float_to_integer(v);
                            if is_reversed {
                                Self::reverse_score(c)
                            } else {
                                c
                            }
                        });
                        match code {
                            Some(c) => *stats.score_distribution.entry(c).or_insert(0) += 1,
                            None => stats.missing_cells += 1,
                        }
                        code
                    })
                    .collect()
            })
            .collect();

        info!(
            columns = stats.columns_converted,
            reverse_scored = stats.columns_reverse_scored,
            version = %stats.reverse_table_version,
            "Encoded responses"
        );

        EncodingOutput {
            matrix: EncodedResponseMatrix::new(table.person_ids().to_vec(), items, codes, reversed),
            stats,
        }
    }
}
