//! Standardization and cluster quality metrics
//!
//! All metrics are computed on standardized data with Euclidean distance.

use serde::Serialize;

/// Off-diagonal magnitude at which the Jacobi sweep stops
const JACOBI_EPSILON: f64 = 1e-12;
const JACOBI_MAX_SWEEPS: usize = 100;

/// Principal components counted by [`explained_variance`]
pub const PRINCIPAL_COMPONENTS: usize = 3;

/// Quality report for one partition
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct QualityMetrics {
    /// Mean silhouette in [-1, 1]
    pub silhouette: f64,
    pub calinski_harabasz: f64,
    /// Variance share of the top principal components, [0, 1]
    pub explained_variance: f64,
}

/// Column-wise z-score transform (population standard deviation)
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Standardizer {
    pub means: Vec<f64>,
    pub stds: Vec<f64>,
}

impl Standardizer {
    pub fn fit(rows: &[Vec<f64>]) -> Self {
        let n_cols = rows.first().map(|r| r.len()).unwrap_or(0);
        let n = rows.len().max(1) as f64;
        let means: Vec<f64> = (0..n_cols)
            .map(|j| rows.iter().map(|r| r[j]).sum::<f64>() / n)
            .collect();
        let stds = (0..n_cols)
            .map(|j| {
                let var = rows.iter().map(|r| (r[j] - means[j]).powi(2)).sum::<f64>() / n;
                var.sqrt()
            })
            .collect();
        Self { means, stds }
    }

    /// Zero-variance columns map to 0
    pub fn transform_row(&self, row: &[f64]) -> Vec<f64> {
        row.iter()
            .zip(self.means.iter().zip(&self.stds))
            .map(|(x, (mean, std))| if *std > 0.0 { (x - mean) / std } else { 0.0 })
            .collect()
    }

    pub fn transform(&self, rows: &[Vec<f64>]) -> Vec<Vec<f64>> {
        rows.iter().map(|r| self.transform_row(r)).collect()
    }
}

pub fn squared_distance(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum()
}

pub fn distance(a: &[f64], b: &[f64]) -> f64 {
    squared_distance(a, b).sqrt()
}

/// Number of distinct labels in use
fn label_count(labels: &[usize]) -> usize {
    let mut seen: Vec<usize> = labels.to_vec();
    seen.sort_unstable();
    seen.dedup();
    seen.len()
}

/// Mean silhouette coefficient
///
/// s(i) = (b − a) / max(a, b), with s = 0 for members of singleton
/// clusters. Returns 0 unless 2 ≤ clusters ≤ N − 1.
pub fn silhouette(data: &[Vec<f64>], labels: &[usize]) -> f64 {
    let n = data.len();
    let k = label_count(labels);
    if k < 2 || k >= n {
        return 0.0;
    }
    let n_labels = labels.iter().copied().max().map(|m| m + 1).unwrap_or(0);

    let mut sizes = vec![0usize; n_labels];
    for &l in labels {
        sizes[l] += 1;
    }

    let mut total = 0.0;
    let mut sums = vec![0.0; n_labels];
    for i in 0..n {
        let own = labels[i];
        if sizes[own] <= 1 {
            continue;
        }
        sums.iter_mut().for_each(|s| *s = 0.0);
        for j in 0..n {
            if i != j {
                sums[labels[j]] += distance(&data[i], &data[j]);
            }
        }
        let a = sums[own] / (sizes[own] - 1) as f64;
        let b = (0..n_labels)
            .filter(|&c| c != own && sizes[c] > 0)
            .map(|c| sums[c] / sizes[c] as f64)
            .fold(f64::INFINITY, f64::min);
        let max_ab = a.max(b);
        if max_ab > f64::EPSILON {
            total += (b - a) / max_ab;
        }
    }
    total / n as f64
}

/// Calinski–Harabasz variance ratio
///
/// 1.0 when within-cluster dispersion is zero; 0 unless 2 ≤ clusters < N.
pub fn calinski_harabasz(data: &[Vec<f64>], labels: &[usize]) -> f64 {
    let n = data.len();
    let k = label_count(labels);
    if k < 2 || n <= k {
        return 0.0;
    }
    let dim = data[0].len();
    let n_labels = labels.iter().copied().max().map(|m| m + 1).unwrap_or(0);

    let overall: Vec<f64> = (0..dim)
        .map(|j| data.iter().map(|r| r[j]).sum::<f64>() / n as f64)
        .collect();
    let mut centroids = vec![vec![0.0; dim]; n_labels];
    let mut sizes = vec![0usize; n_labels];
    for (row, &l) in data.iter().zip(labels) {
        sizes[l] += 1;
        for (c, x) in centroids[l].iter_mut().zip(row) {
            *c += x;
        }
    }
    for (c, &size) in centroids.iter_mut().zip(&sizes) {
        if size > 0 {
            c.iter_mut().for_each(|v| *v /= size as f64);
        }
    }

    let between: f64 = centroids
        .iter()
        .zip(&sizes)
        .map(|(c, &size)| size as f64 * squared_distance(c, &overall))
        .sum();
    let within: f64 = data
        .iter()
        .zip(labels)
        .map(|(row, &l)| squared_distance(row, &centroids[l]))
        .sum();

    if within == 0.0 {
        return 1.0;
    }
    between * (n - k) as f64 / (within * (k - 1) as f64)
}

/// Share of total variance carried by the top principal components
pub fn explained_variance(data: &[Vec<f64>], components: usize) -> f64 {
    let n = data.len();
    if n < 2 {
        return 0.0;
    }
    let dim = data[0].len();
    let means: Vec<f64> = (0..dim)
        .map(|j| data.iter().map(|r| r[j]).sum::<f64>() / n as f64)
        .collect();

    let mut cov = vec![vec![0.0; dim]; dim];
    for row in data {
        for a in 0..dim {
            let da = row[a] - means[a];
            for b in a..dim {
                cov[a][b] += da * (row[b] - means[b]);
            }
        }
    }
    for a in 0..dim {
        for b in a..dim {
            cov[a][b] /= (n - 1) as f64;
            cov[b][a] = cov[a][b];
        }
    }

    let mut eigenvalues = symmetric_eigenvalues(cov);
    let total: f64 = eigenvalues.iter().map(|v| v.max(0.0)).sum();
    if total <= 0.0 {
        return 0.0;
    }
    eigenvalues.sort_by(|a, b| b.total_cmp(a));
    let top: f64 = eigenvalues.iter().take(components).map(|v| v.max(0.0)).sum();
    (top / total).clamp(0.0, 1.0)
}

/// Eigenvalues of a symmetric matrix by cyclic Jacobi rotations
pub fn symmetric_eigenvalues(mut a: Vec<Vec<f64>>) -> Vec<f64> {
    let n = a.len();
    for _ in 0..JACOBI_MAX_SWEEPS {
        let off: f64 = (0..n)
            .flat_map(|p| (p + 1..n).map(move |q| (p, q)))
            .map(|(p, q)| a[p][q] * a[p][q])
            .sum();
        if off.sqrt() < JACOBI_EPSILON {
            break;
        }
        for p in 0..n {
            for q in p + 1..n {
                if a[p][q].abs() < f64::MIN_POSITIVE {
                    continue;
                }
                let theta = (a[q][q] - a[p][p]) / (2.0 * a[p][q]);
                let t = theta.signum() / (theta.abs() + (theta * theta + 1.0).sqrt());
                let t = if theta == 0.0 { 1.0 } else { t };
                let c = 1.0 / (t * t + 1.0).sqrt();
                let s = t * c;

                for k in 0..n {
                    let akp = a[k][p];
                    let akq = a[k][q];
                    a[k][p] = c * akp - s * akq;
                    a[k][q] = s * akp + c * akq;
                }
                for k in 0..n {
                    let apk = a[p][k];
                    let aqk = a[q][k];
                    a[p][k] = c * apk - s * aqk;
                    a[q][k] = s * apk + c * aqk;
                }
            }
        }
    }
    (0..n).map(|i| a[i][i]).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_blobs() -> (Vec<Vec<f64>>, Vec<usize>) {
        let data = vec![
            vec![0.0, 0.0],
            vec![0.1, 0.0],
            vec![0.0, 0.1],
            vec![5.0, 5.0],
            vec![5.1, 5.0],
            vec![5.0, 5.1],
        ];
        (data, vec![0, 0, 0, 1, 1, 1])
    }

    #[test]
    fn test_standardizer_zero_variance_column() {
        let rows = vec![vec![1.0, 3.0], vec![3.0, 3.0]];
        let s = Standardizer::fit(&rows);
        assert_eq!(s.means, vec![2.0, 3.0]);
        assert_eq!(s.transform(&rows), vec![vec![-1.0, 0.0], vec![1.0, 0.0]]);
    }

    #[test]
    fn test_silhouette_separated_blobs() {
        let (data, labels) = two_blobs();
        let s = silhouette(&data, &labels);
        assert!(s > 0.9 && s <= 1.0);
        // One cluster or all singletons
        assert_eq!(silhouette(&data, &[0; 6]), 0.0);
        assert_eq!(silhouette(&data, &[0, 1, 2, 3, 4, 5]), 0.0);
    }

    #[test]
    fn test_calinski_harabasz() {
        let (data, labels) = two_blobs();
        assert!(calinski_harabasz(&data, &labels) > 100.0);
        let dup = vec![vec![0.0], vec![0.0], vec![1.0], vec![1.0]];
        assert_eq!(calinski_harabasz(&dup, &[0, 0, 1, 1]), 1.0);
    }

    #[test]
    fn test_eigenvalues_of_diagonalizable_matrix() {
        // [[2,1],[1,2]] has eigenvalues 3 and 1
        let mut ev = symmetric_eigenvalues(vec![vec![2.0, 1.0], vec![1.0, 2.0]]);
        ev.sort_by(|a, b| b.total_cmp(a));
        assert!((ev[0] - 3.0).abs() < 1e-9);
        assert!((ev[1] - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_explained_variance_bounds() {
        let (data, _) = two_blobs();
        // Two dimensions: top three components carry everything
        assert!((explained_variance(&data, 3) - 1.0).abs() < 1e-9);
        let one = explained_variance(&data, 1);
        assert!(one > 0.9 && one <= 1.0);
    }
}
