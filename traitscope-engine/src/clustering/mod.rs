//! Cohort clustering of trait profiles
//!
//! Profiles passing the completion filter form a persons × traits matrix
//! (all [`Trait::COUNT`] columns in canonical order, absent traits 0.0).
//! Columns are standardized before partitioning; centroids and dominant
//! traits are reported in the original trait-score space.
//!
//! Fatal conditions: no profile passes the filter
//! ([`EngineError::ClusteringInputEmpty`]) and k outside 1..=N
//! ([`EngineError::InvalidParameter`]).

pub mod agglomerative;
pub mod archetype_mapping;
pub mod kmeans;
pub mod quality;

use crate::error::{EngineError, EngineResult};
use crate::models::PersonTraitProfile;
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::{debug, info};
use traitscope_common::config::{ClusterMethod, ClusteringConfig};
use traitscope_common::{ArchetypeCatalog, ArchetypeId, Trait};

pub use archetype_mapping::ArchetypeMatch;
pub use kmeans::KMeansConfig;
pub use quality::{QualityMetrics, Standardizer};

/// Quantile of the within-cluster trait means that marks a trait dominant
const DOMINANT_QUANTILE: f64 = 0.7;

/// Centroid value above which a trait is named in a cluster description
const DESCRIPTION_STRENGTH: f64 = 0.5;

const MIN_DOMINANT: usize = 2;
const FALLBACK_DOMINANT: usize = 3;
const DESCRIPTION_TRAITS: usize = 3;

/// Persons × traits score matrix
#[derive(Debug, Clone, Serialize)]
pub struct TraitMatrix {
    pub person_ids: Vec<String>,
    /// One row per person, indexed by [`Trait::index`]
    pub rows: Vec<Vec<f64>>,
}

impl TraitMatrix {
    pub fn n_persons(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// One cluster of a partition
#[derive(Debug, Clone, Serialize)]
pub struct TraitCluster {
    pub cluster_id: usize,
    /// "A + B Cluster"
    pub name: String,
    pub description: String,
    /// Mean trait scores of the members, indexed by [`Trait::index`]
    pub centroid: Vec<f64>,
    /// At least two traits, strongest first
    pub dominant_traits: Vec<Trait>,
    pub size: usize,
    pub members: Vec<String>,
    pub archetype_mapping: Option<ArchetypeId>,
}

/// Result of clustering a cohort
#[derive(Debug, Clone, Serialize)]
pub struct ClusteringResult {
    /// Exactly k clusters
    pub clusters: Vec<TraitCluster>,
    /// Cluster of each person, in matrix row order
    pub assignments: Vec<usize>,
    pub person_ids: Vec<String>,
    pub silhouette_score: f64,
    pub calinski_harabasz: f64,
    pub explained_variance: f64,
    pub method: ClusterMethod,
    pub n_clusters: usize,
    pub archetype_mappings: BTreeMap<usize, ArchetypeId>,
    /// k-means only
    pub inertia: Option<f64>,
}

/// Size of one cluster relative to the cohort
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClusterSummary {
    pub cluster_id: usize,
    pub name: String,
    pub size: usize,
    pub percentage: f64,
    pub dominant_traits: Vec<Trait>,
    pub archetype: Option<ArchetypeId>,
}

impl ClusteringResult {
    /// Cluster of a person, if they were clustered
    pub fn cluster_of(&self, person_id: &str) -> Option<usize> {
        self.person_ids
            .iter()
            .position(|p| p == person_id)
            .map(|i| self.assignments[i])
    }

    pub fn summary(&self) -> Vec<ClusterSummary> {
        let total: usize = self.clusters.iter().map(|c| c.size).sum();
        self.clusters
            .iter()
            .map(|c| ClusterSummary {
                cluster_id: c.cluster_id,
                name: c.name.clone(),
                size: c.size,
                percentage: if total == 0 {
                    0.0
                } else {
                    c.size as f64 / total as f64 * 100.0
                },
                dominant_traits: c.dominant_traits.clone(),
                archetype: c.archetype_mapping,
            })
            .collect()
    }
}

/// Silhouette score per candidate k
#[derive(Debug, Clone, Serialize)]
pub struct KSelection {
    pub best_k: usize,
    pub scores: Vec<(usize, f64)>,
}

/// Fitted k-means model kept for prediction
#[derive(Debug, Clone)]
struct FittedModel {
    standardizer: Standardizer,
    centroids: Vec<Vec<f64>>,
}

/// Clusters cohorts of profiles and maps clusters to archetypes
pub struct CohortClusteringEngine {
    config: ClusteringConfig,
    catalog: ArchetypeCatalog,
    min_completion: f64,
    fitted: Option<FittedModel>,
}

impl CohortClusteringEngine {
    pub fn new(config: ClusteringConfig, catalog: ArchetypeCatalog) -> Self {
        Self {
            config,
            catalog,
            min_completion: 0.5,
            fitted: None,
        }
    }

    /// Set the completion-rate filter
    pub fn with_min_completion(mut self, min_completion: f64) -> EngineResult<Self> {
        if !(0.0..=1.0).contains(&min_completion) {
            return Err(EngineError::InvalidParameter(format!(
                "min_completion must be in [0, 1], got {}",
                min_completion
            )));
        }
        self.min_completion = min_completion;
        Ok(self)
    }

    pub fn config(&self) -> &ClusteringConfig {
        &self.config
    }

    /// Rows for profiles with completion ≥ the filter, all traits as columns
    pub fn build_matrix(&self, profiles: &[PersonTraitProfile]) -> EngineResult<TraitMatrix> {
        let mut person_ids = Vec::new();
        let mut rows = Vec::new();
        for profile in profiles {
            if profile.completion_rate < self.min_completion {
                debug!(
                    person_id = %profile.person_id,
                    completion = profile.completion_rate,
                    "Profile below completion filter, not clustered"
                );
                continue;
            }
            person_ids.push(profile.person_id.clone());
            rows.push(
                Trait::all()
                    .iter()
                    .map(|&t| profile.score_of(t).unwrap_or(0.0))
                    .collect(),
            );
        }

        if rows.is_empty() {
            return Err(EngineError::ClusteringInputEmpty(format!(
                "no profile has completion rate >= {}",
                self.min_completion
            )));
        }
        info!(
            persons = rows.len(),
            excluded = profiles.len() - rows.len(),
            "Cohort matrix built"
        );
        Ok(TraitMatrix { person_ids, rows })
    }

    fn kmeans_config(&self, k: usize) -> EngineResult<KMeansConfig> {
        KMeansConfig::new(
            k,
            self.config.max_iterations,
            self.config.tolerance,
            self.config.restarts,
            self.config.seed,
        )
    }

    /// Partition the matrix into exactly k clusters
    pub fn cluster(
        &mut self,
        matrix: &TraitMatrix,
        k: usize,
        method: ClusterMethod,
    ) -> EngineResult<ClusteringResult> {
        if matrix.is_empty() {
            return Err(EngineError::ClusteringInputEmpty("trait matrix has no rows".into()));
        }
        if k == 0 || k > matrix.n_persons() {
            return Err(EngineError::InvalidParameter(format!(
                "k ({}) must be in 1..={}",
                k,
                matrix.n_persons()
            )));
        }

        let standardizer = Standardizer::fit(&matrix.rows);
        let scaled = standardizer.transform(&matrix.rows);

        let (assignments, inertia) = match method {
            ClusterMethod::KMeans => {
                let fit = kmeans::fit(&scaled, &self.kmeans_config(k)?)?;
                self.fitted = Some(FittedModel {
                    standardizer,
                    centroids: fit.centroids,
                });
                (fit.assignments, Some(fit.inertia))
            }
            ClusterMethod::Agglomerative => {
                self.fitted = None;
                (agglomerative::ward(&scaled, k)?, None)
            }
        };

        let metrics = Self::quality_scaled(&scaled, &assignments);
        let clusters: Vec<TraitCluster> = (0..k)
            .map(|id| self.build_cluster(id, matrix, &assignments))
            .collect();
        let archetype_mappings = clusters
            .iter()
            .filter_map(|c| c.archetype_mapping.map(|a| (c.cluster_id, a)))
            .collect();

        info!(
            method = method.as_str(),
            k,
            silhouette = metrics.silhouette,
            calinski_harabasz = metrics.calinski_harabasz,
            explained_variance = metrics.explained_variance,
            "Clustering completed"
        );

        Ok(ClusteringResult {
            clusters,
            assignments,
            person_ids: matrix.person_ids.clone(),
            silhouette_score: metrics.silhouette,
            calinski_harabasz: metrics.calinski_harabasz,
            explained_variance: metrics.explained_variance,
            method,
            n_clusters: k,
            archetype_mappings,
            inertia,
        })
    }

    /// build_matrix + cluster with the configured k and method
    pub fn analyze(&mut self, profiles: &[PersonTraitProfile]) -> EngineResult<ClusteringResult> {
        let matrix = self.build_matrix(profiles)?;
        self.cluster(&matrix, self.config.k, self.config.method)
    }

    fn build_cluster(&self, id: usize, matrix: &TraitMatrix, assignments: &[usize]) -> TraitCluster {
        let member_rows: Vec<usize> = assignments
            .iter()
            .enumerate()
            .filter(|(_, a)| **a == id)
            .map(|(i, _)| i)
            .collect();

        let mut centroid = vec![0.0; Trait::COUNT];
        for &i in &member_rows {
            for (c, x) in centroid.iter_mut().zip(&matrix.rows[i]) {
                *c += x;
            }
        }
        if !member_rows.is_empty() {
            centroid.iter_mut().for_each(|c| *c /= member_rows.len() as f64);
        }

        let dominant_traits = Self::dominant_traits(&centroid);
        let archetype_mapping =
            archetype_mapping::best_match(&dominant_traits, &centroid, &self.catalog)
                .map(|m| m.archetype_id);

        TraitCluster {
            cluster_id: id,
            name: cluster_name(id, &dominant_traits),
            description: cluster_description(&dominant_traits, &centroid),
            centroid,
            dominant_traits,
            size: member_rows.len(),
            members: member_rows
                .iter()
                .map(|&i| matrix.person_ids[i].clone())
                .collect(),
            archetype_mapping,
        }
    }

    fn quality_scaled(scaled: &[Vec<f64>], assignments: &[usize]) -> QualityMetrics {
        QualityMetrics {
            silhouette: quality::silhouette(scaled, assignments),
            calinski_harabasz: quality::calinski_harabasz(scaled, assignments),
            explained_variance: quality::explained_variance(scaled, quality::PRINCIPAL_COMPONENTS),
        }
    }

    /// Silhouette, Calinski–Harabasz and explained variance of a partition
    pub fn quality(matrix: &TraitMatrix, assignments: &[usize]) -> QualityMetrics {
        let scaled = Standardizer::fit(&matrix.rows).transform(&matrix.rows);
        Self::quality_scaled(&scaled, assignments)
    }

    /// Traits whose within-cluster mean reaches the 70th percentile of all
    /// trait means, strongest first; the top three when fewer than two qualify
    pub fn dominant_traits(trait_means: &[f64]) -> Vec<Trait> {
        let mut ranked: Vec<(Trait, f64)> = Trait::all()
            .iter()
            .map(|&t| (t, trait_means.get(t.index()).copied().unwrap_or(0.0)))
            .collect();
        // Stable: canonical order among equal means
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1));

        let threshold = quantile(&ranked.iter().map(|(_, v)| *v).collect::<Vec<_>>(), DOMINANT_QUANTILE);
        let dominant: Vec<Trait> = ranked
            .iter()
            .filter(|(_, v)| *v >= threshold)
            .map(|(t, _)| *t)
            .collect();

        if dominant.len() < MIN_DOMINANT {
            ranked.iter().take(FALLBACK_DOMINANT).map(|(t, _)| *t).collect()
        } else {
            dominant
        }
    }

    /// Archetype for a cluster, if the best match clears the acceptance threshold
    pub fn map_cluster_to_archetype(&self, cluster: &TraitCluster) -> Option<ArchetypeMatch> {
        archetype_mapping::best_match(&cluster.dominant_traits, &cluster.centroid, &self.catalog)
    }

    /// Silhouette-maximizing k over 2..=min(max_k, N − 1), smaller k on ties
    pub fn optimize_k(&mut self, matrix: &TraitMatrix) -> EngineResult<KSelection> {
        let upper = self.config.max_k.min(matrix.n_persons().saturating_sub(1));
        if upper < 2 {
            return Err(EngineError::InvalidParameter(format!(
                "need at least 3 persons and max_k >= 2 to choose k (persons: {}, max_k: {})",
                matrix.n_persons(),
                self.config.max_k
            )));
        }

        let scaled = Standardizer::fit(&matrix.rows).transform(&matrix.rows);
        let mut scores = Vec::new();
        for k in 2..=upper {
            let fit = kmeans::fit(&scaled, &self.kmeans_config(k)?)?;
            let s = quality::silhouette(&scaled, &fit.assignments);
            debug!(k, silhouette = s, "Candidate cluster count");
            scores.push((k, s));
        }

        let best_k = scores
            .iter()
            .fold(None, |best: Option<(usize, f64)>, &(k, s)| match best {
                Some((_, bs)) if bs >= s => best,
                _ => Some((k, s)),
            })
            .map(|(k, _)| k)
            .unwrap_or(2);
        info!(best_k, "Optimal cluster count selected");
        Ok(KSelection { best_k, scores })
    }

    /// Nearest fitted k-means centroid for each trait vector
    ///
    /// Vectors are indexed by [`Trait::index`] and standardized with the
    /// fitted column statistics.
    pub fn predict(&self, trait_vectors: &[Vec<f64>]) -> EngineResult<Vec<usize>> {
        let model = self.fitted.as_ref().ok_or_else(|| {
            EngineError::InvalidState("predict requires a fitted k-means model".into())
        })?;
        trait_vectors
            .iter()
            .map(|v| {
                if v.len() != Trait::COUNT {
                    return Err(EngineError::InvalidParameter(format!(
                        "trait vector has {} values, expected {}",
                        v.len(),
                        Trait::COUNT
                    )));
                }
                Ok(kmeans::nearest(&model.standardizer.transform_row(v), &model.centroids))
            })
            .collect()
    }
}

/// Linear-interpolation quantile of unsorted values
fn quantile(values: &[f64], q: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let pos = q * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = (lo + 1).min(sorted.len() - 1);
    sorted[lo] + (pos - lo as f64) * (sorted[hi] - sorted[lo])
}

fn cluster_name(id: usize, dominant: &[Trait]) -> String {
    match dominant {
        [a, b, ..] => format!("{} + {} Cluster", a.display_name(), b.display_name()),
        _ => format!("Cluster {}", id + 1),
    }
}

fn cluster_description(dominant: &[Trait], centroid: &[f64]) -> String {
    let strong: Vec<&str> = Trait::all()
        .iter()
        .filter(|t| centroid.get(t.index()).copied().unwrap_or(0.0) > DESCRIPTION_STRENGTH)
        .take(DESCRIPTION_TRAITS)
        .map(|t| t.display_name())
        .collect();
    if strong.is_empty() {
        format!("Cluster of {} dominant traits", dominant.len())
    } else {
        format!("Individuals with strong {} characteristics", strong.join(", "))
    }
}
