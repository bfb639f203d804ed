//! Joint maximum-likelihood estimation of the Rating Scale Model
//!
//! P(X = x | β, δ, τ) ∝ exp(Σ_{k=1..x} (β − δ − τ_k)), with one set of step
//! thresholds τ shared by all items.
//!
//! Each sweep takes one Newton step per person ability, per item difficulty
//! and per threshold, then re-centers difficulties (mean 0) and thresholds
//! (sum 0). Steps are capped at one logit and parameters are clamped to
//! ±[`MAX_LOGIT`](super::MAX_LOGIT).
//!
//! Extreme raw scores (zero or perfect) have no finite estimate; their
//! targets are pulled in by [`EXTREME_SCORE_ADJUSTMENT`] score points.
//! Unobserved categories are handled the same way on the threshold counts.

use super::MAX_LOGIT;

/// Score points an extreme raw score is pulled toward the interior
pub const EXTREME_SCORE_ADJUSTMENT: f64 = 0.3;

/// Largest parameter change allowed per Newton step (logits)
const MAX_STEP: f64 = 1.0;

/// Information floor to keep Newton steps finite
const MIN_INFORMATION: f64 = 1e-9;

/// Converged RSM parameters
#[derive(Debug, Clone)]
pub struct RatingScaleEstimates {
    pub abilities: Vec<f64>,
    pub difficulties: Vec<f64>,
    /// τ_1..τ_m (sum 0)
    pub thresholds: Vec<f64>,
    pub iterations: usize,
    pub max_residual: f64,
}

/// Why the joint estimator gave up
#[derive(Debug, Clone, PartialEq)]
pub enum EstimationFailure {
    NonConvergence { iterations: usize, max_residual: f64 },
    Numerical(String),
}

/// Category probabilities for a person-item logit distance θ = β − δ
///
/// `out` must have `thresholds.len() + 1` slots.
pub fn category_probabilities(theta: f64, thresholds: &[f64], out: &mut [f64]) {
    // Log-numerators, shifted by their max for stability
    out[0] = 0.0;
    let mut acc = 0.0;
    for (k, tau) in thresholds.iter().enumerate() {
        acc += theta - tau;
        out[k + 1] = acc;
    }
    let max = out.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let mut total = 0.0;
    for v in out.iter_mut() {
        *v = (*v - max).exp();
        total += *v;
    }
    for v in out.iter_mut() {
        *v /= total;
    }
}

/// Expected score and variance for θ = β − δ
pub fn expectation(theta: f64, thresholds: &[f64], scratch: &mut [f64]) -> (f64, f64) {
    category_probabilities(theta, thresholds, scratch);
    let mut mean = 0.0;
    let mut second = 0.0;
    for (x, p) in scratch.iter().enumerate() {
        let x = x as f64;
        mean += x * p;
        second += x * x * p;
    }
    (mean, (second - mean * mean).max(0.0))
}

/// Newton step for a score equation, capped at ±[`MAX_STEP`]
fn newton_step(residual: f64, information: f64) -> f64 {
    (residual / information.max(MIN_INFORMATION)).clamp(-MAX_STEP, MAX_STEP)
}

fn clamp_logit(v: f64) -> f64 {
    v.clamp(-MAX_LOGIT, MAX_LOGIT)
}

fn logit(p: f64) -> f64 {
    (p / (1.0 - p)).ln()
}

/// Sufficient statistics of a complete persons × items matrix
struct Targets {
    person: Vec<f64>,
    item: Vec<f64>,
    /// Responses at or above category k, for k = 1..=m
    at_or_above: Vec<f64>,
}

impl Targets {
    fn from_data(data: &[Vec<u8>], n_items: usize, m: usize) -> Self {
        let n_persons = data.len();
        let max_person = (m * n_items) as f64;
        let max_item = (m * n_persons) as f64;
        let total = (n_persons * n_items) as f64;
        let adj = EXTREME_SCORE_ADJUSTMENT;

        let person = data
            .iter()
            .map(|row| {
                let r: f64 = row.iter().map(|&x| x as f64).sum();
                r.clamp(adj, max_person - adj)
            })
            .collect();

        let item = (0..n_items)
            .map(|i| {
                let s: f64 = data.iter().map(|row| row[i] as f64).sum();
                s.clamp(adj, max_item - adj)
            })
            .collect();

        let at_or_above = (1..=m)
            .map(|k| {
                let count = data
                    .iter()
                    .flat_map(|row| row.iter())
                    .filter(|&&x| x as usize >= k)
                    .count() as f64;
                count.clamp(0.5, total - 0.5)
            })
            .collect();

        Self {
            person,
            item,
            at_or_above,
        }
    }
}

/// Largest absolute residual across person, item and threshold equations
fn max_residual(
    targets: &Targets,
    abilities: &[f64],
    difficulties: &[f64],
    thresholds: &[f64],
    scratch: &mut [f64],
) -> f64 {
    let m = thresholds.len();
    let mut item_expected = vec![0.0; difficulties.len()];
    let mut at_or_above_expected = vec![0.0; m];
    let mut worst: f64 = 0.0;

    for (n, beta) in abilities.iter().enumerate() {
        let mut person_expected = 0.0;
        for (i, delta) in difficulties.iter().enumerate() {
            let (e, _) = expectation(beta - delta, thresholds, scratch);
            person_expected += e;
            item_expected[i] += e;
            let mut tail = 0.0;
            for k in (1..=m).rev() {
                tail += scratch[k];
                at_or_above_expected[k - 1] += tail;
            }
        }
        worst = worst.max((targets.person[n] - person_expected).abs());
    }
    for (i, e) in item_expected.iter().enumerate() {
        worst = worst.max((targets.item[i] - e).abs());
    }
    if m > 1 {
        for (k, e) in at_or_above_expected.iter().enumerate() {
            worst = worst.max((targets.at_or_above[k] - e).abs());
        }
    }
    worst
}

/// Estimate abilities, difficulties and shared thresholds
///
/// # Arguments
/// * `data` - Complete persons × items matrix of codes in 0..=max_score
/// * `max_score` - Highest category code (m ≥ 1)
/// * `max_iterations` - Sweep cap
/// * `tolerance` - Residual bound for convergence
///
/// # Errors
/// [`EstimationFailure`] when the cap is reached or a parameter becomes
/// non-finite; callers switch to the fallback estimator.
pub fn estimate(
    data: &[Vec<u8>],
    max_score: u8,
    max_iterations: usize,
    tolerance: f64,
) -> Result<RatingScaleEstimates, EstimationFailure> {
    let n_persons = data.len();
    let n_items = data.first().map(|r| r.len()).unwrap_or(0);
    let m = max_score as usize;
    if n_persons == 0 || n_items == 0 || m == 0 {
        return Err(EstimationFailure::Numerical("empty matrix".into()));
    }

    let targets = Targets::from_data(data, n_items, m);
    let mut scratch = vec![0.0; m + 1];
    let mut tail_scratch = vec![0.0; m];

    // Start from proportion logits
    let mut abilities: Vec<f64> = targets
        .person
        .iter()
        .map(|r| clamp_logit(logit(r / (m * n_items) as f64)))
        .collect();
    let mut difficulties: Vec<f64> = targets
        .item
        .iter()
        .map(|s| clamp_logit(-logit(s / (m * n_persons) as f64)))
        .collect();
    center(&mut difficulties);
    let mut thresholds = vec![0.0; m];

    let mut residual = f64::INFINITY;
    for iteration in 1..=max_iterations {
        // Person abilities
        for (n, beta) in abilities.iter_mut().enumerate() {
            let (mut e_sum, mut v_sum) = (0.0, 0.0);
            for delta in &difficulties {
                let (e, v) = expectation(*beta - delta, &thresholds, &mut scratch);
                e_sum += e;
                v_sum += v;
            }
            *beta = clamp_logit(*beta + newton_step(targets.person[n] - e_sum, v_sum));
        }

        // Item difficulties
        for (i, delta) in difficulties.iter_mut().enumerate() {
            let (mut e_sum, mut v_sum) = (0.0, 0.0);
            for beta in &abilities {
                let (e, v) = expectation(beta - *delta, &thresholds, &mut scratch);
                e_sum += e;
                v_sum += v;
            }
            *delta = clamp_logit(*delta + newton_step(e_sum - targets.item[i], v_sum));
        }
        center(&mut difficulties);

        // Shared thresholds
        if m > 1 {
            let mut expected = vec![0.0; m];
            let mut information = vec![0.0; m];
            for beta in &abilities {
                for delta in &difficulties {
                    category_probabilities(beta - delta, &thresholds, &mut scratch);
                    let mut tail = 0.0;
                    for k in (1..=m).rev() {
                        tail += scratch[k];
                        tail_scratch[k - 1] = tail;
                    }
                    for k in 0..m {
                        let p = tail_scratch[k];
                        expected[k] += p;
                        information[k] += p * (1.0 - p);
                    }
                }
            }
            for k in 0..m {
                thresholds[k] = clamp_logit(
                    thresholds[k] + newton_step(expected[k] - targets.at_or_above[k], information[k]),
                );
            }
            center(&mut thresholds);
        }

        if abilities
            .iter()
            .chain(difficulties.iter())
            .chain(thresholds.iter())
            .any(|v| !v.is_finite())
        {
            return Err(EstimationFailure::Numerical(format!(
                "non-finite parameter at iteration {}",
                iteration
            )));
        }

        residual = max_residual(&targets, &abilities, &difficulties, &thresholds, &mut scratch);
        if !residual.is_finite() {
            return Err(EstimationFailure::Numerical(format!(
                "non-finite residual at iteration {}",
                iteration
            )));
        }
        if residual < tolerance {
            return Ok(RatingScaleEstimates {
                abilities,
                difficulties,
                thresholds,
                iterations: iteration,
                max_residual: residual,
            });
        }
    }

    Err(EstimationFailure::NonConvergence {
        iterations: max_iterations,
        max_residual: residual,
    })
}

fn center(values: &mut [f64]) {
    if values.is_empty() {
        return;
    }
    let mean = values.iter().sum::<f64>() / values.len() as f64;
    for v in values.iter_mut() {
        *v -= mean;
    }
}
