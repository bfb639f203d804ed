//! Archetype matching for person profiles
//!
//! For every archetype, the percentiles of the core traits present in a
//! profile give:
//!
//! - score = mean(percentile / 100)
//! - coverage = present / core
//! - consistency = 1 − population std of the present values (1 for one trait)
//! - confidence = score × coverage × consistency × (0.5 + 0.5 × score)
//!
//! Archetypes with no core trait present are not scored. Matches rank by
//! score × confidence, ties resolved by catalog order.

use crate::models::{ArchetypeInsights, ArchetypeScore, PersonTraitProfile, TraitInsight};
use tracing::debug;
use traitscope_common::{ArchetypeCatalog, ArchetypeDefinition, Trait};

/// Matching traits above this percentile are key strengths
const STRENGTH_PERCENTILE: f64 = 70.0;

/// Core traits below this percentile are development areas
const DEVELOPMENT_PERCENTILE: f64 = 40.0;

/// Traits below this percentile produce growth suggestions
const GROWTH_PERCENTILE: f64 = 30.0;

const MAX_SECONDARY: usize = 2;
const MAX_RECOMMENDATIONS: usize = 5;
const MAX_GROWTH_AREAS: usize = 3;

/// Development areas that add a trait-specific recommendation
const DEVELOPMENT_RECOMMENDATION_SLOTS: usize = 2;

/// Classifier over an immutable archetype catalog
#[derive(Debug, Clone)]
pub struct ArchetypeClassifier {
    catalog: ArchetypeCatalog,
}

impl Default for ArchetypeClassifier {
    fn default() -> Self {
        Self::new(ArchetypeCatalog::standard())
    }
}

impl ArchetypeClassifier {
    pub fn new(catalog: ArchetypeCatalog) -> Self {
        Self { catalog }
    }

    pub fn catalog(&self) -> &ArchetypeCatalog {
        &self.catalog
    }

    /// Score one archetype against a profile
    ///
    /// Returns `None` when none of the archetype's core traits is in the profile.
    pub fn score_archetype(
        profile: &PersonTraitProfile,
        definition: &ArchetypeDefinition,
    ) -> Option<ArchetypeScore> {
        let present: Vec<(Trait, f64)> = definition
            .core_traits
            .iter()
            .filter_map(|&t| profile.trait_score(t).map(|s| (t, s.percentile / 100.0)))
            .collect();

        if present.is_empty() {
            return None;
        }

        let n = present.len() as f64;
        let score = present.iter().map(|(_, v)| v).sum::<f64>() / n;
        let coverage = n / definition.core_traits.len() as f64;
        let consistency = if present.len() == 1 {
            1.0
        } else {
            let variance = present.iter().map(|(_, v)| (v - score).powi(2)).sum::<f64>() / n;
            (1.0 - variance.sqrt()).clamp(0.0, 1.0)
        };
        let confidence = (score * coverage * consistency * (0.5 + 0.5 * score)).clamp(0.0, 1.0);

        Some(ArchetypeScore {
            archetype_id: definition.id,
            name: definition.name.clone(),
            score,
            confidence,
            matching_traits: present.into_iter().map(|(t, _)| t).collect(),
            description: definition.description.clone(),
            characteristics: definition.characteristics.clone(),
        })
    }

    /// All scored archetypes, best first
    pub fn classify(&self, profile: &PersonTraitProfile) -> Vec<ArchetypeScore> {
        let mut scores: Vec<ArchetypeScore> = self
            .catalog
            .iter()
            .filter_map(|def| Self::score_archetype(profile, def))
            .collect();
        // Stable sort keeps catalog order on ties
        scores.sort_by(|a, b| b.rank_value().total_cmp(&a.rank_value()));
        scores
    }

    /// Strengths, development areas, recommendations and careers for a match
    pub fn insights(&self, profile: &PersonTraitProfile, matched: &ArchetypeScore) -> ArchetypeInsights {
        let insight = |t: Trait| {
            profile.trait_score(t).map(|s| TraitInsight {
                trait_code: t,
                percentile: s.percentile,
                level: s.level,
            })
        };

        let key_strengths: Vec<TraitInsight> = matched
            .matching_traits
            .iter()
            .filter_map(|&t| insight(t))
            .filter(|i| i.percentile > STRENGTH_PERCENTILE)
            .collect();

        let definition = self.catalog.get(matched.archetype_id);
        let development_areas: Vec<TraitInsight> = definition
            .map(|d| d.core_traits.as_slice())
            .unwrap_or(&[])
            .iter()
            .filter_map(|&t| insight(t))
            .filter(|i| i.percentile < DEVELOPMENT_PERCENTILE)
            .collect();

        let mut recommendations: Vec<String> = definition
            .map(|d| d.recommendations.clone())
            .unwrap_or_default();
        recommendations.extend(
            development_areas
                .iter()
                .take(DEVELOPMENT_RECOMMENDATION_SLOTS)
                .map(|area| development_recommendation(area.trait_code).to_string()),
        );
        recommendations.truncate(MAX_RECOMMENDATIONS);

        ArchetypeInsights {
            archetype_id: matched.archetype_id,
            match_strength: matched.score,
            confidence: matched.confidence,
            key_strengths,
            development_areas,
            recommendations,
            career_alignments: definition
                .map(|d| d.career_alignments.clone())
                .unwrap_or_default(),
        }
    }

    /// Suggestions for traits below the 30th percentile, at most three
    pub fn growth_areas(profile: &PersonTraitProfile) -> Vec<String> {
        profile
            .traits
            .iter()
            .filter(|s| s.percentile < GROWTH_PERCENTILE)
            .take(MAX_GROWTH_AREAS)
            .map(|s| growth_suggestion(s.trait_code).to_string())
            .collect()
    }

    /// Classify and attach archetypes, insights and growth areas to a profile
    pub fn apply(&self, profile: &mut PersonTraitProfile) {
        let mut ranked = self.classify(profile).into_iter();
        profile.primary_archetype = ranked.next();
        profile.secondary_archetypes = ranked.take(MAX_SECONDARY).collect();
        let insights = profile
            .primary_archetype
            .as_ref()
            .map(|primary| self.insights(profile, primary));
        profile.insights = insights;
        profile.growth_areas = Self::growth_areas(profile);

        if let Some(primary) = &profile.primary_archetype {
            debug!(
                person_id = %profile.person_id,
                archetype = primary.archetype_id.as_str(),
                score = primary.score,
                confidence = primary.confidence,
                "Primary archetype assigned"
            );
        }
    }
}

/// Recommendation added for a weak core trait
pub fn development_recommendation(t: Trait) -> &'static str {
    match t {
        Trait::RiskTaking => "Practice calculated risk-taking in low-stakes situations",
        Trait::InnovationOrientation => "Engage in creative thinking workshops or innovation labs",
        Trait::DriveAmbition => "Break long-term ambitions into milestones with visible progress",
        Trait::DecisionMaking => "Commit to decisions once most of the needed information is in hand",
        Trait::CriticalThinking => "Test assumptions by seeking out opposing evidence before concluding",
        Trait::ProblemSolving => "Break complex problems into smaller, manageable components",
        Trait::ResilienceGrit => "Reflect on past setbacks to build a personal recovery routine",
        Trait::FailureResponse => "Run short post-mortems on failures and record one lesson each",
        Trait::Adaptability => "Practice scenario planning for changes in your environment",
        Trait::Accountability => "Share progress on commitments openly, including misses",
        Trait::EmotionalIntelligence => "Practice active listening and ask for interpersonal feedback",
        Trait::ConflictManagement => "Address disagreements early with structured conversations",
        Trait::TeamBuilding => "Consider leadership development programs or mentoring",
        Trait::ServantLeadership => "Set aside time each week to remove obstacles for others",
        Trait::RelationshipBuilding => "Schedule regular check-ins with key contacts outside immediate work",
        Trait::Negotiation => "Prepare walk-away points and trade-offs before negotiations",
        Trait::SocialOrientation => "Join peer groups or communities related to your field",
    }
}

/// Growth suggestion for a low-scoring trait
pub fn growth_suggestion(t: Trait) -> &'static str {
    match t {
        Trait::RiskTaking => "Build comfort with calculated risk-taking",
        Trait::InnovationOrientation => "Cultivate creative thinking and innovation practices",
        Trait::DriveAmbition => "Clarify long-term goals and connect daily work to them",
        Trait::DecisionMaking => "Strengthen decisiveness under uncertainty",
        Trait::CriticalThinking => "Develop structured analysis of arguments and evidence",
        Trait::ProblemSolving => "Build systematic problem-solving methods",
        Trait::ResilienceGrit => "Develop persistence through progressively harder challenges",
        Trait::FailureResponse => "Reframe failures as sources of learning",
        Trait::Adaptability => "Increase flexibility when plans or conditions change",
        Trait::Accountability => "Strengthen ownership of outcomes and commitments",
        Trait::EmotionalIntelligence => "Enhance emotional awareness and interpersonal skills",
        Trait::ConflictManagement => "Develop conflict resolution and mediation skills",
        Trait::TeamBuilding => "Develop leadership and team management skills",
        Trait::ServantLeadership => "Focus on developing the people around you",
        Trait::RelationshipBuilding => "Invest in building and maintaining professional relationships",
        Trait::Negotiation => "Practice negotiation and persuasion techniques",
        Trait::SocialOrientation => "Seek more collaborative and social work settings",
    }
}
