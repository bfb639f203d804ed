//! Per-person scoring results

use serde::{Deserialize, Serialize};
use traitscope_common::{ArchetypeId, ScoreLevel, Trait};

/// Score for one trait of one person
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraitScore {
    #[serde(rename = "trait")]
    pub trait_code: Trait,
    pub trait_name: String,
    /// Normalized score [0,1]
    pub score: f64,
    /// Percentile [0,100]
    pub percentile: f64,
    /// Answered items contributing to the score (0 for a neutral default)
    pub items_count: usize,
    pub level: ScoreLevel,
    /// [0,1]
    pub confidence: f64,
}

impl TraitScore {
    /// Whether this score is the neutral placeholder for an unanswered trait
    pub fn is_neutral_default(&self) -> bool {
        self.items_count == 0
    }
}

/// Archetype match for a profile
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArchetypeScore {
    pub archetype_id: ArchetypeId,
    pub name: String,
    /// Mean core-trait percentile / 100
    pub score: f64,
    /// [0,1]
    pub confidence: f64,
    /// Core traits present in the profile (non-empty when score > 0)
    pub matching_traits: Vec<Trait>,
    pub description: String,
    pub characteristics: Vec<String>,
}

impl ArchetypeScore {
    /// Ranking key used by classification
    pub fn rank_value(&self) -> f64 {
        self.score * self.confidence
    }
}

/// Core trait flagged as a strength or development area
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraitInsight {
    #[serde(rename = "trait")]
    pub trait_code: Trait,
    pub percentile: f64,
    pub level: ScoreLevel,
}

/// Interpretation of a profile's primary archetype
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArchetypeInsights {
    pub archetype_id: ArchetypeId,
    pub match_strength: f64,
    pub confidence: f64,
    /// Matching traits above the 70th percentile
    pub key_strengths: Vec<TraitInsight>,
    /// Core traits below the 40th percentile
    pub development_areas: Vec<TraitInsight>,
    /// At most 5
    pub recommendations: Vec<String>,
    pub career_alignments: Vec<String>,
}

/// Terminal per-person artifact
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersonTraitProfile {
    pub person_id: String,
    /// Canonical trait order, never empty
    pub traits: Vec<TraitScore>,
    /// Mean trait score [0,1]
    pub overall_score: f64,
    /// Answered trait-mapped items / trait-mapped items
    pub completion_rate: f64,
    #[serde(default)]
    pub primary_archetype: Option<ArchetypeScore>,
    /// At most 2
    #[serde(default)]
    pub secondary_archetypes: Vec<ArchetypeScore>,
    #[serde(default)]
    pub insights: Option<ArchetypeInsights>,
    /// Development suggestions for traits below the 30th percentile (at most 3)
    #[serde(default)]
    pub growth_areas: Vec<String>,
}

impl PersonTraitProfile {
    pub fn trait_score(&self, t: Trait) -> Option<&TraitScore> {
        self.traits.iter().find(|s| s.trait_code == t)
    }

    /// Score for a trait, or `None` when absent from the profile
    pub fn score_of(&self, t: Trait) -> Option<f64> {
        self.trait_score(t).map(|s| s.score)
    }
}
