//! Archetype catalog
//!
//! Five fixed behavioral archetypes, each defined by 3-4 core traits, a
//! description, characteristic tags, and the recommendation and career
//! alignment text used by the insight lookup.
//!
//! The catalog is built once and handed to the classifier and clustering
//! engine as an immutable value. Definition order is significant: it breaks
//! ranking ties in classification and cluster mapping.

use crate::traits::Trait;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Archetype identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArchetypeId {
    StrategicInnovation,
    ResilientLeadership,
    CollaborativeResponsibility,
    AmbitiousDrive,
    AdaptiveIntelligence,
}

impl ArchetypeId {
    /// Stable string key ("strategic_innovation", ...)
    pub fn as_str(&self) -> &'static str {
        match self {
            ArchetypeId::StrategicInnovation => "strategic_innovation",
            ArchetypeId::ResilientLeadership => "resilient_leadership",
            ArchetypeId::CollaborativeResponsibility => "collaborative_responsibility",
            ArchetypeId::AmbitiousDrive => "ambitious_drive",
            ArchetypeId::AdaptiveIntelligence => "adaptive_intelligence",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "strategic_innovation" => Some(ArchetypeId::StrategicInnovation),
            "resilient_leadership" => Some(ArchetypeId::ResilientLeadership),
            "collaborative_responsibility" => Some(ArchetypeId::CollaborativeResponsibility),
            "ambitious_drive" => Some(ArchetypeId::AmbitiousDrive),
            "adaptive_intelligence" => Some(ArchetypeId::AdaptiveIntelligence),
            _ => None,
        }
    }
}

impl fmt::Display for ArchetypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Definition of a single archetype
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArchetypeDefinition {
    pub id: ArchetypeId,
    /// Display name ("Strategic Innovation")
    pub name: String,
    /// Core traits (3-4)
    pub core_traits: Vec<Trait>,
    pub description: String,
    /// Characteristic tags ("Strategic planners", ...)
    pub characteristics: Vec<String>,
    /// Archetype-specific development recommendations
    pub recommendations: Vec<String>,
    /// Career paths aligned with the archetype
    pub career_alignments: Vec<String>,
}

impl ArchetypeDefinition {
    pub fn has_core_trait(&self, t: Trait) -> bool {
        self.core_traits.contains(&t)
    }
}

/// Immutable, ordered set of archetype definitions
#[derive(Debug, Clone)]
pub struct ArchetypeCatalog {
    definitions: Vec<ArchetypeDefinition>,
}

impl ArchetypeCatalog {
    /// Build a catalog from explicit definitions (order preserved)
    pub fn new(definitions: Vec<ArchetypeDefinition>) -> Self {
        Self { definitions }
    }

    /// The five standard archetypes
    pub fn standard() -> Self {
        fn strings(items: &[&str]) -> Vec<String> {
            items.iter().map(|s| s.to_string()).collect()
        }

        Self::new(vec![
            ArchetypeDefinition {
                id: ArchetypeId::StrategicInnovation,
                name: "Strategic Innovation".to_string(),
                core_traits: vec![
                    Trait::RiskTaking,
                    Trait::InnovationOrientation,
                    Trait::CriticalThinking,
                    Trait::DecisionMaking,
                ],
                description: "Calculated risk-takers who use strategic thinking to guide innovation"
                    .to_string(),
                characteristics: strings(&[
                    "Strategic planners",
                    "Calculated decision-makers",
                    "Innovation-focused",
                ]),
                recommendations: strings(&[
                    "Develop structured innovation frameworks",
                    "Focus on strategic planning and market analysis",
                    "Build skills in technology assessment and trend analysis",
                ]),
                career_alignments: strings(&[
                    "Chief Innovation Officer",
                    "Strategic Planning Director",
                    "R&D Leadership",
                    "Technology Strategy Consultant",
                ]),
            },
            ArchetypeDefinition {
                id: ArchetypeId::ResilientLeadership,
                name: "Resilient Leadership".to_string(),
                core_traits: vec![
                    Trait::ResilienceGrit,
                    Trait::TeamBuilding,
                    Trait::Adaptability,
                    Trait::ConflictManagement,
                ],
                description: "Leaders who navigate setbacks and interpersonal challenges"
                    .to_string(),
                characteristics: strings(&[
                    "Team builders",
                    "Crisis managers",
                    "Adaptive leaders",
                ]),
                recommendations: strings(&[
                    "Enhance crisis management capabilities",
                    "Develop advanced conflict resolution skills",
                    "Focus on team resilience and change management",
                ]),
                career_alignments: strings(&[
                    "CEO/Executive Leadership",
                    "Crisis Management Consultant",
                    "Change Management Director",
                    "Team Leadership Roles",
                ]),
            },
            ArchetypeDefinition {
                id: ArchetypeId::CollaborativeResponsibility,
                name: "Collaborative Responsibility".to_string(),
                core_traits: vec![
                    Trait::Accountability,
                    Trait::TeamBuilding,
                    Trait::ServantLeadership,
                ],
                description: "Focus on team growth, ownership, and trust-building".to_string(),
                characteristics: strings(&["Team-oriented", "Responsible", "Trust-builders"]),
                recommendations: strings(&[
                    "Strengthen servant leadership practices",
                    "Build advanced team development skills",
                    "Focus on accountability systems and trust-building",
                ]),
                career_alignments: strings(&[
                    "Team Development Manager",
                    "Servant Leadership Roles",
                    "HR Leadership",
                    "Mentorship and Coaching",
                ]),
            },
            ArchetypeDefinition {
                id: ArchetypeId::AmbitiousDrive,
                name: "Ambitious Drive".to_string(),
                core_traits: vec![
                    Trait::DriveAmbition,
                    Trait::ResilienceGrit,
                    Trait::ProblemSolving,
                ],
                description: "Highly motivated individuals who persevere through challenges"
                    .to_string(),
                characteristics: strings(&["Goal-driven", "Persistent", "Solution-oriented"]),
                recommendations: strings(&[
                    "Set challenging long-term goals with clear metrics",
                    "Develop persistence and grit training",
                    "Focus on achievement psychology and motivation",
                ]),
                career_alignments: strings(&[
                    "Entrepreneur/Founder",
                    "Sales Leadership",
                    "Business Development",
                    "Growth Strategy Roles",
                ]),
            },
            ArchetypeDefinition {
                id: ArchetypeId::AdaptiveIntelligence,
                name: "Adaptive Intelligence".to_string(),
                core_traits: vec![
                    Trait::CriticalThinking,
                    Trait::ProblemSolving,
                    Trait::EmotionalIntelligence,
                    Trait::Adaptability,
                ],
                description: "Logical problem-solvers who understand team/customer needs"
                    .to_string(),
                characteristics: strings(&[
                    "Analytical",
                    "Empathetic",
                    "Flexible",
                    "Customer-focused",
                ]),
                recommendations: strings(&[
                    "Enhance analytical problem-solving frameworks",
                    "Develop emotional intelligence competencies",
                    "Focus on customer empathy and market understanding",
                ]),
                career_alignments: strings(&[
                    "Management Consulting",
                    "Business Analysis",
                    "Customer Experience Leadership",
                    "Strategic Advisory",
                ]),
            },
        ])
    }

    /// Definitions in catalog order
    pub fn iter(&self) -> impl Iterator<Item = &ArchetypeDefinition> {
        self.definitions.iter()
    }

    pub fn get(&self, id: ArchetypeId) -> Option<&ArchetypeDefinition> {
        self.definitions.iter().find(|d| d.id == id)
    }

    /// Catalog position of an archetype (tie-break order)
    pub fn position(&self, id: ArchetypeId) -> Option<usize> {
        self.definitions.iter().position(|d| d.id == id)
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }
}

impl Default for ArchetypeCatalog {
    fn default() -> Self {
        Self::standard()
    }
}
