//! Proportion-logit estimator
//!
//! Closed-form and deterministic. Used whenever the rating scale estimator
//! is disabled, not applicable, or fails.

/// Proportions are clamped into this range before taking logits
const PROPORTION_FLOOR: f64 = 0.01;
const PROPORTION_CEIL: f64 = 0.99;

#[derive(Debug, Clone, PartialEq)]
pub struct FallbackEstimates {
    pub abilities: Vec<f64>,
    pub difficulties: Vec<f64>,
}

fn clamped_logit(proportion: f64) -> f64 {
    let p = proportion.clamp(PROPORTION_FLOOR, PROPORTION_CEIL);
    (p / (1.0 - p)).ln()
}

/// Difficulty = −logit(mean item proportion), ability = +logit(mean person proportion)
///
/// `data` must be a complete persons × items matrix of codes in `0..=max_score`.
pub fn estimate(data: &[Vec<u8>], max_score: u8) -> FallbackEstimates {
    let n_persons = data.len();
    let n_items = data.first().map(|r| r.len()).unwrap_or(0);
    let scale = f64::from(max_score.max(1));

    let abilities = data
        .iter()
        .map(|row| {
            let mean = row.iter().map(|&x| f64::from(x) / scale).sum::<f64>() / n_items.max(1) as f64;
            clamped_logit(mean)
        })
        .collect();

    let difficulties = (0..n_items)
        .map(|i| {
            let mean = data.iter().map(|row| f64::from(row[i]) / scale).sum::<f64>()
                / n_persons.max(1) as f64;
            -clamped_logit(mean)
        })
        .collect();

    FallbackEstimates {
        abilities,
        difficulties,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fallback_is_deterministic() {
        let data = vec![vec![4, 3, 0], vec![2, 2, 1], vec![0, 1, 4]];
        assert_eq!(estimate(&data, 4), estimate(&data, 4));
    }

    #[test]
    fn test_fallback_values() {
        let data = vec![vec![4, 0], vec![4, 2]];
        let est = estimate(&data, 4);

        // Item 0 always at max: proportion clamps to 0.99
        assert!((est.difficulties[0] + (0.99f64 / 0.01).ln()).abs() < 1e-12);
        // Item 1 mean proportion 0.25
        assert!((est.difficulties[1] - 3.0f64.ln()).abs() < 1e-12);
        // Person 0 mean proportion 0.5
        assert!(est.abilities[0].abs() < 1e-12);
        assert!(est.abilities[1] > est.abilities[0]);
    }
}
