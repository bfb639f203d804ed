//! Cluster → archetype mapping
//!
//! match = overlap × (0.5 + 0.5 × max(0, strength)), where overlap is the
//! share of the archetype's core traits among the cluster's dominant traits
//! and strength is the mean centroid value over those shared traits.

use serde::Serialize;
use traitscope_common::{ArchetypeCatalog, ArchetypeDefinition, ArchetypeId, Trait};

/// A mapping is accepted only above this score
pub const ACCEPT_THRESHOLD: f64 = 0.4;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ArchetypeMatch {
    pub archetype_id: ArchetypeId,
    pub name: String,
    pub score: f64,
}

/// Match score of one archetype for a cluster
///
/// `centroid` is indexed by [`Trait::index`].
pub fn match_score(dominant: &[Trait], centroid: &[f64], definition: &ArchetypeDefinition) -> f64 {
    if definition.core_traits.is_empty() {
        return 0.0;
    }
    let shared: Vec<Trait> = definition
        .core_traits
        .iter()
        .copied()
        .filter(|t| dominant.contains(t))
        .collect();
    let overlap = shared.len() as f64 / definition.core_traits.len() as f64;
    let strength = if shared.is_empty() {
        0.0
    } else {
        shared
            .iter()
            .map(|t| centroid.get(t.index()).copied().unwrap_or(0.0))
            .sum::<f64>()
            / shared.len() as f64
    };
    overlap * (0.5 + 0.5 * strength.max(0.0))
}

/// Best-matching archetype, if its score clears [`ACCEPT_THRESHOLD`]
///
/// Earlier catalog entries win ties.
pub fn best_match(
    dominant: &[Trait],
    centroid: &[f64],
    catalog: &ArchetypeCatalog,
) -> Option<ArchetypeMatch> {
    let mut best: Option<(&ArchetypeDefinition, f64)> = None;
    for def in catalog.iter() {
        let score = match_score(dominant, centroid, def);
        if score > best.map(|(_, s)| s).unwrap_or(0.0) {
            best = Some((def, score));
        }
    }
    best.filter(|(_, score)| *score > ACCEPT_THRESHOLD)
        .map(|(def, score)| ArchetypeMatch {
            archetype_id: def.id,
            name: def.name.clone(),
            score,
        })
}
