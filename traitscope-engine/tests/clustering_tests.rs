//! Integration tests for cohort clustering on trait profiles
//!
//! Two synthetic groups with distinct archetype signatures:
//! - Group A: strong Drive & Ambition, Resilience & Grit, Problem Solving
//! - Group B: strong Accountability, Team Building, Servant Leadership

use traitscope_common::config::{ClusterMethod, ClusteringConfig};
use traitscope_common::{ArchetypeCatalog, ArchetypeId, ScoreLevel, Trait};
use traitscope_engine::models::{PersonTraitProfile, TraitScore};
use traitscope_engine::{CohortClusteringEngine, EngineError};

// Canonical trait order, so equal cluster means keep this order
const GROUP_A: [Trait; 3] = [Trait::DriveAmbition, Trait::ProblemSolving, Trait::ResilienceGrit];
const GROUP_B: [Trait; 3] = [
    Trait::Accountability,
    Trait::TeamBuilding,
    Trait::ServantLeadership,
];

fn profile(id: &str, scores: &[(Trait, f64)], completion_rate: f64) -> PersonTraitProfile {
    let traits: Vec<TraitScore> = scores
        .iter()
        .map(|&(t, score)| TraitScore {
            trait_code: t,
            trait_name: t.display_name().to_string(),
            score,
            percentile: 50.0,
            items_count: 2,
            level: ScoreLevel::from_percentile(50.0),
            confidence: 0.2,
        })
        .collect();
    let overall_score = scores.iter().map(|(_, s)| s).sum::<f64>() / scores.len() as f64;
    PersonTraitProfile {
        person_id: id.to_string(),
        traits,
        overall_score,
        completion_rate,
        primary_archetype: None,
        secondary_archetypes: Vec::new(),
        insights: None,
        growth_areas: Vec::new(),
    }
}

/// Member `i` of a group: strong traits near 0.9, the other group's near 0.1
fn group_member(prefix: &str, strong: &[Trait], weak: &[Trait], i: usize) -> PersonTraitProfile {
    let jitter = i as f64 * 0.01;
    let scores: Vec<(Trait, f64)> = strong
        .iter()
        .map(|&t| (t, 0.9 - jitter))
        .chain(weak.iter().map(|&t| (t, 0.1 + jitter)))
        .collect();
    profile(&format!("{}-{}", prefix, i), &scores, 1.0)
}

fn two_groups() -> Vec<PersonTraitProfile> {
    (0..6)
        .map(|i| group_member("a", &GROUP_A, &GROUP_B, i))
        .chain((0..6).map(|i| group_member("b", &GROUP_B, &GROUP_A, i)))
        .collect()
}

fn engine(k: usize, method: ClusterMethod) -> CohortClusteringEngine {
    let config = ClusteringConfig {
        k,
        method,
        ..ClusteringConfig::default()
    };
    CohortClusteringEngine::new(config, ArchetypeCatalog::standard())
}

#[test]
fn test_groups_separate_and_map_to_archetypes() {
    let mut engine = engine(2, ClusterMethod::KMeans);
    let result = engine.analyze(&two_groups()).unwrap();

    let a = result.cluster_of("a-0").unwrap();
    let b = result.cluster_of("b-0").unwrap();
    assert_ne!(a, b);
    for i in 0..6 {
        assert_eq!(result.cluster_of(&format!("a-{}", i)), Some(a));
        assert_eq!(result.cluster_of(&format!("b-{}", i)), Some(b));
    }

    assert_eq!(result.archetype_mappings.get(&a), Some(&ArchetypeId::AmbitiousDrive));
    assert_eq!(
        result.archetype_mappings.get(&b),
        Some(&ArchetypeId::CollaborativeResponsibility)
    );
    assert!(result.silhouette_score > 0.5);

    let cluster_a = &result.clusters[a];
    assert_eq!(cluster_a.size, 6);
    assert_eq!(&cluster_a.dominant_traits[..3], &GROUP_A[..]);
    let mapped = engine.map_cluster_to_archetype(cluster_a).unwrap();
    assert!((mapped.score - 0.5 * (1.0 + cluster_a.centroid[Trait::DriveAmbition.index()])).abs() < 1e-9);
}

#[test]
fn test_optimize_k_prefers_two_groups() {
    let mut engine = engine(2, ClusterMethod::KMeans);
    let matrix = engine.build_matrix(&two_groups()).unwrap();
    let selection = engine.optimize_k(&matrix).unwrap();

    assert_eq!(selection.best_k, 2);
    // k ranges over 2..=min(max_k, N - 1)
    assert_eq!(selection.scores.first().map(|s| s.0), Some(2));
    assert_eq!(selection.scores.last().map(|s| s.0), Some(8));
}

#[test]
fn test_predict_after_kmeans() {
    let mut engine = engine(2, ClusterMethod::KMeans);
    let result = engine.analyze(&two_groups()).unwrap();

    let mut vector = vec![0.0; Trait::COUNT];
    for t in GROUP_B {
        vector[t.index()] = 0.85;
    }
    for t in GROUP_A {
        vector[t.index()] = 0.15;
    }
    let predicted = engine.predict(&[vector]).unwrap();
    assert_eq!(predicted, vec![result.cluster_of("b-0").unwrap()]);

    assert!(matches!(
        engine.predict(&[vec![0.5; 3]]),
        Err(EngineError::InvalidParameter(_))
    ));
}

#[test]
fn test_predict_requires_kmeans_model() {
    let mut engine = engine(2, ClusterMethod::Agglomerative);
    assert!(matches!(
        engine.predict(&[vec![0.0; Trait::COUNT]]),
        Err(EngineError::InvalidState(_))
    ));

    let result = engine.analyze(&two_groups()).unwrap();
    assert_eq!(result.clusters.len(), 2);
    assert!(matches!(
        engine.predict(&[vec![0.0; Trait::COUNT]]),
        Err(EngineError::InvalidState(_))
    ));
}

#[test]
fn test_completion_filter() {
    let mut profiles = two_groups();
    profiles.push(profile("sparse", &[(Trait::RiskTaking, 0.9)], 0.2));

    let engine = engine(2, ClusterMethod::KMeans);
    let matrix = engine.build_matrix(&profiles).unwrap();
    assert_eq!(matrix.n_persons(), 12);
    assert!(!matrix.person_ids.contains(&"sparse".to_string()));

    let strict = engine.with_min_completion(1.0).unwrap();
    let sparse_only = vec![profile("sparse", &[(Trait::RiskTaking, 0.9)], 0.2)];
    assert!(matches!(
        strict.build_matrix(&sparse_only),
        Err(EngineError::ClusteringInputEmpty(_))
    ));
}

#[test]
fn test_invalid_min_completion() {
    assert!(matches!(
        engine(2, ClusterMethod::KMeans).with_min_completion(1.5),
        Err(EngineError::InvalidParameter(_))
    ));
}

#[test]
fn test_k_larger_than_cohort() {
    let mut engine = engine(20, ClusterMethod::KMeans);
    assert!(matches!(
        engine.analyze(&two_groups()),
        Err(EngineError::InvalidParameter(_))
    ));
}
