//! Cohort statistics: trait score summaries and internal consistency

use crate::models::{EncodedResponseMatrix, PersonTraitProfile};
use serde::Serialize;
use std::collections::BTreeMap;
use traitscope_common::{Trait, TraitDefinitionTable};

/// Descriptive statistics of one score distribution
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryStats {
    pub count: usize,
    pub mean: f64,
    /// Sample standard deviation (0 for fewer than two values)
    pub std: f64,
    pub min: f64,
    pub max: f64,
    pub median: f64,
}

impl SummaryStats {
    /// `None` for an empty sample
    pub fn from_values(values: &[f64]) -> Option<Self> {
        if values.is_empty() {
            return None;
        }
        let n = values.len();
        let mean = values.iter().sum::<f64>() / n as f64;
        let std = if n > 1 {
            (values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1) as f64).sqrt()
        } else {
            0.0
        };
        let mut sorted = values.to_vec();
        sorted.sort_by(|a, b| a.total_cmp(b));
        let median = if n % 2 == 1 {
            sorted[n / 2]
        } else {
            (sorted[n / 2 - 1] + sorted[n / 2]) / 2.0
        };
        Some(Self {
            count: n,
            mean,
            std,
            min: sorted[0],
            max: sorted[n - 1],
            median,
        })
    }
}

/// Per-trait and overall score summaries for a cohort
#[derive(Debug, Clone, Serialize)]
pub struct GroupStatistics {
    pub profiles: usize,
    /// Measured scores only; neutral placeholders are left out
    pub traits: BTreeMap<Trait, SummaryStats>,
    pub overall: Option<SummaryStats>,
}

pub fn group_statistics(profiles: &[PersonTraitProfile]) -> GroupStatistics {
    let mut per_trait: BTreeMap<Trait, Vec<f64>> = BTreeMap::new();
    for profile in profiles {
        for score in profile.traits.iter().filter(|s| !s.is_neutral_default()) {
            per_trait.entry(score.trait_code).or_default().push(score.score);
        }
    }
    let overall: Vec<f64> = profiles.iter().map(|p| p.overall_score).collect();

    GroupStatistics {
        profiles: profiles.len(),
        traits: per_trait
            .into_iter()
            .filter_map(|(t, values)| SummaryStats::from_values(&values).map(|s| (t, s)))
            .collect(),
        overall: SummaryStats::from_values(&overall),
    }
}

/// Cronbach's alpha for one trait
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TraitReliability {
    #[serde(rename = "trait")]
    pub trait_code: Trait,
    pub items: usize,
    /// Persons who answered every item of the trait
    pub complete_persons: usize,
    /// In [0,1]; `None` with fewer than two complete persons or zero total variance
    pub alpha: Option<f64>,
}

fn sample_variance(values: &[f64]) -> f64 {
    let n = values.len();
    if n < 2 {
        return 0.0;
    }
    let mean = values.iter().sum::<f64>() / n as f64;
    values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1) as f64
}

/// Cronbach's alpha per trait with at least two items in the matrix
///
/// Uses encoded codes of persons with no missing item for the trait.
pub fn cronbach_alpha(
    matrix: &EncodedResponseMatrix,
    definitions: &TraitDefinitionTable,
) -> Vec<TraitReliability> {
    Trait::all()
        .iter()
        .filter_map(|&t| {
            let columns: Vec<usize> = matrix
                .items()
                .iter()
                .enumerate()
                .filter(|(_, name)| {
                    definitions
                        .traits_for(name)
                        .map(|traits| traits.contains(&t))
                        .unwrap_or(false)
                })
                .map(|(j, _)| j)
                .collect();
            if columns.len() < 2 {
                return None;
            }

            let complete: Vec<Vec<f64>> = (0..matrix.n_persons())
                .filter_map(|p| {
                    columns
                        .iter()
                        .map(|&j| matrix.code(p, j).map(f64::from))
                        .collect::<Option<Vec<f64>>>()
                })
                .collect();

            let alpha = if complete.len() < 2 {
                None
            } else {
                let k = columns.len() as f64;
                let item_variance: f64 = (0..columns.len())
                    .map(|c| sample_variance(&complete.iter().map(|r| r[c]).collect::<Vec<_>>()))
                    .sum();
                let totals: Vec<f64> = complete.iter().map(|r| r.iter().sum()).collect();
                let total_variance = sample_variance(&totals);
                if total_variance > 0.0 {
                    Some((k / (k - 1.0) * (1.0 - item_variance / total_variance)).clamp(0.0, 1.0))
                } else {
                    None
                }
            };

            Some(TraitReliability {
                trait_code: t,
                items: columns.len(),
                complete_persons: complete.len(),
                alpha,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_stats() {
        let s = SummaryStats::from_values(&[1.0, 2.0, 3.0, 4.0]).unwrap();
        assert_eq!(s.count, 4);
        assert_eq!(s.mean, 2.5);
        assert_eq!(s.median, 2.5);
        assert_eq!(s.min, 1.0);
        assert_eq!(s.max, 4.0);
        assert!((s.std - (5.0f64 / 3.0).sqrt()).abs() < 1e-12);
        assert!(SummaryStats::from_values(&[]).is_none());
    }

    fn matrix(rows: Vec<Vec<Option<u8>>>) -> EncodedResponseMatrix {
        let persons = (0..rows.len()).map(|p| format!("p{}", p)).collect();
        EncodedResponseMatrix::new(
            persons,
            vec!["a1".into(), "a2".into(), "n1".into()],
            rows,
            vec![false; 3],
        )
    }

    fn definitions() -> TraitDefinitionTable {
        TraitDefinitionTable::from_entries(vec![
            ("a1", vec![Trait::Accountability]),
            ("a2", vec![Trait::Accountability]),
            ("n1", vec![Trait::Negotiation]),
        ])
        .unwrap()
    }

    #[test]
    fn test_alpha_parallel_items() {
        let m = matrix(vec![
            vec![Some(0), Some(0), Some(2)],
            vec![Some(2), Some(2), Some(2)],
            vec![Some(4), Some(4), None],
            vec![Some(1), None, Some(1)],
        ]);
        let rel = cronbach_alpha(&m, &definitions());
        // Only Accountability has two items
        assert_eq!(rel.len(), 1);
        assert_eq!(rel[0].trait_code, Trait::Accountability);
        assert_eq!(rel[0].complete_persons, 3);
        // Identical columns: alpha = 1
        assert!((rel[0].alpha.unwrap() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_alpha_undefined_without_variance() {
        let m = matrix(vec![
            vec![Some(2), Some(2), None],
            vec![Some(2), Some(2), None],
        ]);
        assert_eq!(cronbach_alpha(&m, &definitions())[0].alpha, None);
    }
}
