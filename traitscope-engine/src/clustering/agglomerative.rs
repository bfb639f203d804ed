//! Hierarchical agglomerative clustering with Ward linkage
//!
//! Starts from singletons and repeatedly merges the pair with the smallest
//! Ward distance until k clusters remain. Distances are updated with the
//! Lance–Williams recurrence on squared Euclidean distances:
//!
//! d(k, i∪j) = ((nᵢ + nₖ)·d(k,i) + (nⱼ + nₖ)·d(k,j) − nₖ·d(i,j)) / (nᵢ + nⱼ + nₖ)

use super::quality::squared_distance;
use crate::error::{EngineError, EngineResult};

/// Cluster labels in 0..k, numbered by each cluster's first member
pub fn ward(data: &[Vec<f64>], k: usize) -> EngineResult<Vec<usize>> {
    let n = data.len();
    if k == 0 || k > n {
        return Err(EngineError::InvalidParameter(format!(
            "k ({}) must be in 1..={}",
            k, n
        )));
    }

    let mut dist: Vec<Vec<f64>> = (0..n)
        .map(|i| (0..n).map(|j| squared_distance(&data[i], &data[j])).collect())
        .collect();
    let mut sizes = vec![1usize; n];
    let mut active = vec![true; n];
    // Representative cluster of each point
    let mut owner: Vec<usize> = (0..n).collect();

    for _ in 0..(n - k) {
        let mut best: Option<(usize, usize, f64)> = None;
        for i in (0..n).filter(|&i| active[i]) {
            for j in (i + 1..n).filter(|&j| active[j]) {
                if best.map(|(_, _, d)| dist[i][j] < d).unwrap_or(true) {
                    best = Some((i, j, dist[i][j]));
                }
            }
        }
        let Some((i, j, dij)) = best else { break };

        let (ni, nj) = (sizes[i] as f64, sizes[j] as f64);
        for m in (0..n).filter(|&m| active[m] && m != i && m != j) {
            let nm = sizes[m] as f64;
            let updated =
                ((ni + nm) * dist[m][i] + (nj + nm) * dist[m][j] - nm * dij) / (ni + nj + nm);
            dist[i][m] = updated;
            dist[m][i] = updated;
        }
        sizes[i] += sizes[j];
        active[j] = false;
        for o in owner.iter_mut().filter(|o| **o == j) {
            *o = i;
        }
    }

    // Relabel by order of first appearance
    let mut labels = vec![usize::MAX; n];
    let mut next = 0;
    let mut out = Vec::with_capacity(n);
    for &o in &owner {
        if labels[o] == usize::MAX {
            labels[o] = next;
            next += 1;
        }
        out.push(labels[o]);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ward_separates_groups() {
        let data = vec![
            vec![0.0, 0.0],
            vec![9.0, 9.0],
            vec![0.2, 0.1],
            vec![9.1, 8.9],
            vec![0.1, 0.3],
        ];
        assert_eq!(ward(&data, 2).unwrap(), vec![0, 1, 0, 1, 0]);
    }

    #[test]
    fn test_ward_k_equals_n_gives_singletons() {
        let data = vec![vec![0.0], vec![1.0], vec![2.0]];
        assert_eq!(ward(&data, 3).unwrap(), vec![0, 1, 2]);
    }

    #[test]
    fn test_ward_rejects_bad_k() {
        assert!(ward(&[vec![0.0]], 2).is_err());
        assert!(ward(&[vec![0.0]], 0).is_err());
    }
}
