//! Seeded k-means with k-means++ initialization
//!
//! 1. Pick k initial centroids by k-means++ (D² weighting) from a seeded RNG
//! 2. Assign each point to its nearest centroid (ties to the lower index)
//! 3. Refill any empty cluster with the point farthest from its centroid,
//!    taken from a cluster that keeps at least one member
//! 4. Recompute centroids and stop once no centroid moves more than the
//!    tolerance, or at the iteration cap
//!
//! Several restarts run from one RNG stream; the lowest inertia wins.

use super::quality::squared_distance;
use crate::error::{EngineError, EngineResult};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::debug;

/// Validated k-means parameters
#[derive(Debug, Clone)]
pub struct KMeansConfig {
    pub k: usize,
    pub max_iterations: usize,
    pub tolerance: f64,
    pub restarts: usize,
    pub seed: u64,
}

impl KMeansConfig {
    /// # Errors
    ///
    /// [`EngineError::InvalidParameter`] if k, max_iterations or restarts is
    /// zero, or tolerance is not a positive finite number.
    pub fn new(
        k: usize,
        max_iterations: usize,
        tolerance: f64,
        restarts: usize,
        seed: u64,
    ) -> EngineResult<Self> {
        if k == 0 {
            return Err(EngineError::InvalidParameter("k must be > 0".into()));
        }
        if max_iterations == 0 {
            return Err(EngineError::InvalidParameter("max_iterations must be > 0".into()));
        }
        if restarts == 0 {
            return Err(EngineError::InvalidParameter("restarts must be > 0".into()));
        }
        if !tolerance.is_finite() || tolerance <= 0.0 {
            return Err(EngineError::InvalidParameter(
                "tolerance must be a finite positive number".into(),
            ));
        }
        Ok(Self {
            k,
            max_iterations,
            tolerance,
            restarts,
            seed,
        })
    }
}

/// Best partition found
#[derive(Debug, Clone)]
pub struct KMeansFit {
    pub assignments: Vec<usize>,
    pub centroids: Vec<Vec<f64>>,
    /// Sum of squared distances to assigned centroids
    pub inertia: f64,
    pub iterations: usize,
    pub converged: bool,
}

/// Index of the nearest centroid (lowest index on ties)
pub fn nearest(point: &[f64], centroids: &[Vec<f64>]) -> usize {
    let mut best = 0;
    let mut best_dist = f64::INFINITY;
    for (j, c) in centroids.iter().enumerate() {
        let d = squared_distance(point, c);
        if d < best_dist {
            best_dist = d;
            best = j;
        }
    }
    best
}

fn init_plus_plus(data: &[Vec<f64>], k: usize, rng: &mut StdRng) -> Vec<Vec<f64>> {
    let n = data.len();
    let mut centroids = Vec::with_capacity(k);
    centroids.push(data[rng.gen_range(0..n)].clone());

    let mut min_dist = vec![f64::INFINITY; n];
    while centroids.len() < k {
        if let Some(last) = centroids.last() {
            for (d, point) in min_dist.iter_mut().zip(data) {
                *d = d.min(squared_distance(point, last));
            }
        }
        let total: f64 = min_dist.iter().sum();
        let next = if total > 0.0 {
            let mut target = rng.gen::<f64>() * total;
            let mut chosen = n - 1;
            for (i, d) in min_dist.iter().enumerate() {
                if target < *d {
                    chosen = i;
                    break;
                }
                target -= d;
            }
            chosen
        } else {
            // Every point coincides with a centroid
            rng.gen_range(0..n)
        };
        centroids.push(data[next].clone());
    }
    centroids
}

/// Move points into empty clusters so every cluster has a member
fn refill_empty(data: &[Vec<f64>], centroids: &[Vec<f64>], assignments: &mut [usize], k: usize) {
    let mut sizes = vec![0usize; k];
    for &a in assignments.iter() {
        sizes[a] += 1;
    }
    for empty in 0..k {
        if sizes[empty] > 0 {
            continue;
        }
        let donor = (0..data.len())
            .filter(|&i| sizes[assignments[i]] > 1)
            .map(|i| (i, squared_distance(&data[i], &centroids[assignments[i]])))
            .fold(None, |best: Option<(usize, f64)>, (i, d)| match best {
                Some((_, bd)) if bd >= d => best,
                _ => Some((i, d)),
            });
        if let Some((i, _)) = donor {
            sizes[assignments[i]] -= 1;
            assignments[i] = empty;
            sizes[empty] = 1;
        }
    }
}

fn means(data: &[Vec<f64>], assignments: &[usize], k: usize, previous: &[Vec<f64>]) -> Vec<Vec<f64>> {
    let dim = data[0].len();
    let mut sums = vec![vec![0.0; dim]; k];
    let mut counts = vec![0usize; k];
    for (point, &a) in data.iter().zip(assignments) {
        counts[a] += 1;
        for (s, x) in sums[a].iter_mut().zip(point) {
            *s += x;
        }
    }
    sums.into_iter()
        .zip(counts)
        .enumerate()
        .map(|(j, (mut sum, count))| {
            if count == 0 {
                return previous[j].clone();
            }
            sum.iter_mut().for_each(|s| *s /= count as f64);
            sum
        })
        .collect()
}

fn lloyd(data: &[Vec<f64>], config: &KMeansConfig, rng: &mut StdRng) -> KMeansFit {
    let k = config.k;
    let mut centroids = init_plus_plus(data, k, rng);
    let mut assignments = vec![0usize; data.len()];
    let mut iterations = 0;
    let mut converged = false;

    for iteration in 1..=config.max_iterations {
        iterations = iteration;
        for (a, point) in assignments.iter_mut().zip(data) {
            *a = nearest(point, &centroids);
        }
        refill_empty(data, &centroids, &mut assignments, k);

        let updated = means(data, &assignments, k, &centroids);
        let movement = centroids
            .iter()
            .zip(&updated)
            .map(|(old, new)| squared_distance(old, new).sqrt())
            .fold(0.0, f64::max);
        centroids = updated;

        if movement < config.tolerance {
            converged = true;
            break;
        }
    }

    let inertia = data
        .iter()
        .zip(&assignments)
        .map(|(p, &a)| squared_distance(p, &centroids[a]))
        .sum();

    KMeansFit {
        assignments,
        centroids,
        inertia,
        iterations,
        converged,
    }
}

/// Partition `data` into exactly `config.k` non-empty clusters
///
/// # Errors
///
/// [`EngineError::InvalidParameter`] if there are fewer points than clusters.
pub fn fit(data: &[Vec<f64>], config: &KMeansConfig) -> EngineResult<KMeansFit> {
    if data.len() < config.k {
        return Err(EngineError::InvalidParameter(format!(
            "k ({}) must be <= number of points ({})",
            config.k,
            data.len()
        )));
    }

    let mut rng = StdRng::seed_from_u64(config.seed);
    let mut best: Option<KMeansFit> = None;
    for restart in 0..config.restarts {
        let candidate = lloyd(data, config, &mut rng);
        debug!(
            restart,
            inertia = candidate.inertia,
            iterations = candidate.iterations,
            converged = candidate.converged,
            "k-means restart"
        );
        let better = best
            .as_ref()
            .map(|b| candidate.inertia < b.inertia)
            .unwrap_or(true);
        if better {
            best = Some(candidate);
        }
    }

    best.ok_or_else(|| EngineError::InvalidParameter("restarts must be > 0".into()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn blobs() -> Vec<Vec<f64>> {
        let mut data = Vec::new();
        for (cx, cy) in [(0.0, 0.0), (10.0, 0.0), (0.0, 10.0)] {
            for i in 0..5 {
                let d = i as f64 * 0.1;
                data.push(vec![cx + d, cy - d]);
            }
        }
        data
    }

    #[test]
    fn test_config_validation() {
        assert!(KMeansConfig::new(0, 10, 1e-4, 1, 0).is_err());
        assert!(KMeansConfig::new(2, 0, 1e-4, 1, 0).is_err());
        assert!(KMeansConfig::new(2, 10, 0.0, 1, 0).is_err());
        assert!(KMeansConfig::new(2, 10, f64::NAN, 1, 0).is_err());
        assert!(KMeansConfig::new(2, 10, 1e-4, 0, 0).is_err());
    }

    #[test]
    fn test_recovers_separated_blobs() {
        let config = KMeansConfig::new(3, 100, 1e-6, 5, 42).unwrap();
        let fit = fit(&blobs(), &config).unwrap();

        for group in fit.assignments.chunks(5) {
            assert!(group.iter().all(|&a| a == group[0]));
        }
        let mut labels: Vec<usize> = fit.assignments.chunks(5).map(|g| g[0]).collect();
        labels.sort_unstable();
        assert_eq!(labels, vec![0, 1, 2]);
    }

    #[test]
    fn test_same_seed_same_partition() {
        let config = KMeansConfig::new(4, 100, 1e-6, 3, 7).unwrap();
        let a = fit(&blobs(), &config).unwrap();
        let b = fit(&blobs(), &config).unwrap();
        assert_eq!(a.assignments, b.assignments);
    }

    #[test]
    fn test_duplicates_still_fill_every_cluster() {
        let data = vec![vec![1.0, 1.0]; 6];
        let config = KMeansConfig::new(3, 50, 1e-6, 2, 1).unwrap();
        let fit = fit(&data, &config).unwrap();
        for cluster in 0..3 {
            assert!(fit.assignments.contains(&cluster));
        }
    }

    #[test]
    fn test_more_clusters_than_points_rejected() {
        let config = KMeansConfig::new(5, 50, 1e-6, 1, 1).unwrap();
        assert!(matches!(
            fit(&[vec![0.0], vec![1.0]], &config),
            Err(EngineError::InvalidParameter(_))
        ));
    }
}
