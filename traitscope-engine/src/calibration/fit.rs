//! Infit/outfit mean-squares and separation reliability

use super::rating_scale::expectation;
use serde::{Deserialize, Serialize};

/// Variance floor for standardized residuals
const MIN_VARIANCE: f64 = 1e-9;

/// Mean-square fit for one item or person
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FitEntry {
    pub id: String,
    /// Information-weighted mean-square
    pub infit: f64,
    /// Unweighted mean-square
    pub outfit: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MeanSquares {
    pub infit: f64,
    pub outfit: f64,
}

impl MeanSquares {
    pub fn named(self, id: &str) -> FitEntry {
        FitEntry {
            id: id.to_string(),
            infit: self.infit,
            outfit: self.outfit,
        }
    }
}

#[derive(Debug, Clone)]
pub struct FitReport {
    pub item_fit: Vec<MeanSquares>,
    pub person_fit: Vec<MeanSquares>,
    pub item_reliability: f64,
    pub person_reliability: f64,
}

#[derive(Default, Clone, Copy)]
struct Accumulator {
    squared_residuals: f64,
    variance: f64,
    z_squared: f64,
    count: usize,
}

impl Accumulator {
    fn add(&mut self, residual: f64, variance: f64) {
        let r2 = residual * residual;
        self.squared_residuals += r2;
        self.variance += variance;
        self.z_squared += r2 / variance.max(MIN_VARIANCE);
        self.count += 1;
    }

    fn mean_squares(&self) -> MeanSquares {
        MeanSquares {
            infit: self.squared_residuals / self.variance.max(MIN_VARIANCE),
            outfit: if self.count == 0 {
                0.0
            } else {
                self.z_squared / self.count as f64
            },
        }
    }
}

/// Fit statistics for rating scale estimates over a complete matrix
pub fn compute(
    data: &[Vec<u8>],
    abilities: &[f64],
    difficulties: &[f64],
    thresholds: &[f64],
) -> FitReport {
    let mut scratch = vec![0.0; thresholds.len() + 1];
    let mut items = vec![Accumulator::default(); difficulties.len()];
    let mut persons = vec![Accumulator::default(); abilities.len()];

    for (n, (row, beta)) in data.iter().zip(abilities).enumerate() {
        for (i, (&x, delta)) in row.iter().zip(difficulties).enumerate() {
            let (e, v) = expectation(beta - delta, thresholds, &mut scratch);
            let residual = f64::from(x) - e;
            persons[n].add(residual, v);
            items[i].add(residual, v);
        }
    }

    let person_information: Vec<f64> = persons.iter().map(|a| a.variance).collect();
    let item_information: Vec<f64> = items.iter().map(|a| a.variance).collect();

    FitReport {
        item_fit: items.iter().map(Accumulator::mean_squares).collect(),
        person_fit: persons.iter().map(Accumulator::mean_squares).collect(),
        item_reliability: separation_reliability(difficulties, &item_information),
        person_reliability: separation_reliability(abilities, &person_information),
    }
}

/// (observed variance − mean error variance) / observed variance, in [0,1]
///
/// Error variance of each measure is 1 / information. Zero observed
/// variance gives 0.
pub fn separation_reliability(measures: &[f64], information: &[f64]) -> f64 {
    if measures.is_empty() {
        return 0.0;
    }
    let n = measures.len() as f64;
    let mean = measures.iter().sum::<f64>() / n;
    let observed = measures.iter().map(|m| (m - mean).powi(2)).sum::<f64>() / n;
    if observed <= 0.0 {
        return 0.0;
    }
    let error = information
        .iter()
        .map(|i| 1.0 / i.max(MIN_VARIANCE))
        .sum::<f64>()
        / information.len().max(1) as f64;
    ((observed - error) / observed).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dichotomous_fit_at_expectation() {
        // β = δ = 0 with one threshold at 0: E = 0.5, V = 0.25
        let report = compute(&[vec![1, 0]], &[0.0], &[0.0, 0.0], &[0.0]);
        let person = report.person_fit[0];
        assert!((person.infit - 1.0).abs() < 1e-12);
        assert!((person.outfit - 1.0).abs() < 1e-12);
        assert_eq!(report.item_fit.len(), 2);
    }

    #[test]
    fn test_reliability_bounds() {
        assert_eq!(separation_reliability(&[1.0, 1.0, 1.0], &[4.0, 4.0, 4.0]), 0.0);
        let r = separation_reliability(&[-3.0, 0.0, 3.0], &[100.0, 100.0, 100.0]);
        assert!(r > 0.99 && r <= 1.0);
        // Error variance larger than the spread clamps to 0
        assert_eq!(separation_reliability(&[-0.1, 0.1], &[1.0, 1.0]), 0.0);
    }
}
