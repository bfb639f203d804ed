//! Test Helper Utilities
//!
//! Shared fixtures for traitscope-engine integration tests: small definition
//! sets, Likert tables and a reproducible synthetic cohort.

#![allow(dead_code)]

use traitscope_common::{DefinitionSet, ReverseScoredItems, Trait, TraitDefinitionTable};
use traitscope_engine::models::{RawCell, RawResponseTable};

/// Likert answer text for codes 0 (Never) through 4 (Always)
pub const LIKERT: [&str; 5] = [
    "Never (0-10%)",
    "Seldom (11-35%)",
    "Sometimes (36-65%)",
    "Often (66-90%)",
    "Always (91-100%)",
];

/// Item columns of [`definitions`], two per trait
pub const ITEMS: [(&str, Trait); 12] = [
    ("I take calculated risks", Trait::RiskTaking),
    ("I back bold bets", Trait::RiskTaking),
    ("I look for new approaches", Trait::InnovationOrientation),
    ("I question how things are done", Trait::InnovationOrientation),
    ("I set ambitious goals", Trait::DriveAmbition),
    ("I push past setbacks", Trait::ResilienceGrit),
    ("I give up when things get hard", Trait::ResilienceGrit),
    ("I break problems into parts", Trait::ProblemSolving),
    ("I find workable solutions", Trait::ProblemSolving),
    ("I work hard for long-term goals", Trait::DriveAmbition),
    ("I own my mistakes", Trait::Accountability),
    ("I follow through on commitments", Trait::Accountability),
];

/// Reverse-scored item of [`definitions`]
pub const REVERSED_ITEM: &str = "I give up when things get hard";

pub fn definitions() -> DefinitionSet {
    let table =
        TraitDefinitionTable::from_entries(ITEMS.iter().map(|&(q, t)| (q, vec![t]))).unwrap();
    DefinitionSet::new(
        table,
        ReverseScoredItems::new("test", vec![REVERSED_ITEM.to_string()]),
    )
}

pub fn item_columns() -> Vec<String> {
    ITEMS.iter().map(|(q, _)| q.to_string()).collect()
}

/// Raw table of Likert answers; `None` codes are blank cells
///
/// A "Tags" metadata column is appended to every row.
pub fn likert_table(codes: &[Vec<Option<usize>>]) -> RawResponseTable {
    let mut columns = item_columns();
    columns.push("Tags".to_string());
    let person_ids = (0..codes.len()).map(|p| format!("person-{:02}", p + 1)).collect();
    let rows = codes
        .iter()
        .map(|row| {
            let mut cells: Vec<Option<RawCell>> = row
                .iter()
                .map(|c| c.map(|c| RawCell::Text(LIKERT[c].to_string())))
                .collect();
            cells.push(Some(RawCell::Text("panel-a".to_string())));
            cells
        })
        .collect();
    RawResponseTable::new(person_ids, columns, rows).unwrap()
}

/// Minimal linear congruential generator for reproducible fixtures
pub struct Lcg(u64);

impl Lcg {
    pub fn new(seed: u64) -> Self {
        Self(seed)
    }

    pub fn next_u32(&mut self) -> u32 {
        self.0 = self
            .0
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        (self.0 >> 33) as u32
    }

    /// Uniform integer in 0..n
    pub fn below(&mut self, n: u32) -> u32 {
        self.next_u32() % n
    }
}

/// Synthetic cohort of `n` complete response rows
///
/// Each person has a base level (0-4) plus per-item noise of -1, 0 or +1,
/// so responses vary within and across persons.
pub fn cohort_codes(n: usize, seed: u64) -> Vec<Vec<Option<usize>>> {
    let mut rng = Lcg::new(seed);
    (0..n)
        .map(|_| {
            let base = rng.below(5) as i64;
            (0..ITEMS.len())
                .map(|_| {
                    let noise = rng.below(3) as i64 - 1;
                    Some((base + noise).clamp(0, 4) as usize)
                })
                .collect()
        })
        .collect()
}

pub fn cohort_table(n: usize, seed: u64) -> RawResponseTable {
    likert_table(&cohort_codes(n, seed))
}
