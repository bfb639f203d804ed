//! Trait enumeration and score level buckets
//!
//! The assessment measures a fixed set of behavioral traits. Every item in the
//! definition table maps to one or two of these codes, and every per-trait map
//! in the engine is keyed by [`Trait`] rather than by free-form strings.
//!
//! Trait names used by older definition files ("Resilience and Grit",
//! "Passion/Drive", "Conflict Resolution", ...) are accepted as aliases by
//! [`Trait::from_name`] so that archetype and item tables written against
//! either naming resolve to the same key.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Behavioral trait measured by the assessment
///
/// Declaration order is the canonical column order for cohort matrices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Trait {
    #[serde(rename = "RT")]
    RiskTaking,
    #[serde(rename = "IO")]
    InnovationOrientation,
    #[serde(rename = "DA")]
    DriveAmbition,
    #[serde(rename = "DM")]
    DecisionMaking,
    #[serde(rename = "CT")]
    CriticalThinking,
    #[serde(rename = "PS")]
    ProblemSolving,
    #[serde(rename = "RG")]
    ResilienceGrit,
    #[serde(rename = "F")]
    FailureResponse,
    #[serde(rename = "AD")]
    Adaptability,
    #[serde(rename = "A")]
    Accountability,
    #[serde(rename = "EI")]
    EmotionalIntelligence,
    #[serde(rename = "C")]
    ConflictManagement,
    #[serde(rename = "TB")]
    TeamBuilding,
    #[serde(rename = "SL")]
    ServantLeadership,
    #[serde(rename = "RB")]
    RelationshipBuilding,
    #[serde(rename = "N")]
    Negotiation,
    #[serde(rename = "IN")]
    SocialOrientation,
}

impl Trait {
    /// Number of traits in the fixed set
    pub const COUNT: usize = 17;

    /// All traits in canonical order
    pub fn all() -> &'static [Trait] {
        &[
            Trait::RiskTaking,
            Trait::InnovationOrientation,
            Trait::DriveAmbition,
            Trait::DecisionMaking,
            Trait::CriticalThinking,
            Trait::ProblemSolving,
            Trait::ResilienceGrit,
            Trait::FailureResponse,
            Trait::Adaptability,
            Trait::Accountability,
            Trait::EmotionalIntelligence,
            Trait::ConflictManagement,
            Trait::TeamBuilding,
            Trait::ServantLeadership,
            Trait::RelationshipBuilding,
            Trait::Negotiation,
            Trait::SocialOrientation,
        ]
    }

    /// Position of this trait in [`Trait::all`]
    pub fn index(&self) -> usize {
        *self as usize
    }

    /// Short code used by definition tables ("RT", "IO", ...)
    pub fn code(&self) -> &'static str {
        match self {
            Trait::RiskTaking => "RT",
            Trait::InnovationOrientation => "IO",
            Trait::DriveAmbition => "DA",
            Trait::DecisionMaking => "DM",
            Trait::CriticalThinking => "CT",
            Trait::ProblemSolving => "PS",
            Trait::ResilienceGrit => "RG",
            Trait::FailureResponse => "F",
            Trait::Adaptability => "AD",
            Trait::Accountability => "A",
            Trait::EmotionalIntelligence => "EI",
            Trait::ConflictManagement => "C",
            Trait::TeamBuilding => "TB",
            Trait::ServantLeadership => "SL",
            Trait::RelationshipBuilding => "RB",
            Trait::Negotiation => "N",
            Trait::SocialOrientation => "IN",
        }
    }

    /// Human-readable trait name
    pub fn display_name(&self) -> &'static str {
        match self {
            Trait::RiskTaking => "Risk Taking",
            Trait::InnovationOrientation => "Innovation Orientation",
            Trait::DriveAmbition => "Drive & Ambition",
            Trait::DecisionMaking => "Decision Making",
            Trait::CriticalThinking => "Critical Thinking",
            Trait::ProblemSolving => "Problem Solving",
            Trait::ResilienceGrit => "Resilience & Grit",
            Trait::FailureResponse => "Failure Response",
            Trait::Adaptability => "Adaptability",
            Trait::Accountability => "Accountability",
            Trait::EmotionalIntelligence => "Emotional Intelligence",
            Trait::ConflictManagement => "Conflict Management",
            Trait::TeamBuilding => "Team Building",
            Trait::ServantLeadership => "Servant Leadership",
            Trait::RelationshipBuilding => "Relationship Building",
            Trait::Negotiation => "Negotiation",
            Trait::SocialOrientation => "Social Orientation",
        }
    }

    /// Parse a definition-table code ("RT", "io", ...)
    pub fn from_code(code: &str) -> Option<Self> {
        let code = code.trim();
        Trait::all()
            .iter()
            .copied()
            .find(|t| t.code().eq_ignore_ascii_case(code))
    }

    /// Parse a trait name, accepting legacy aliases
    pub fn from_name(name: &str) -> Option<Self> {
        let normalized = name.trim().to_lowercase();
        if let Some(t) = Trait::all()
            .iter()
            .copied()
            .find(|t| t.display_name().to_lowercase() == normalized)
        {
            return Some(t);
        }

        match normalized.as_str() {
            "innovation" => Some(Trait::InnovationOrientation),
            "resilience" | "resilience and grit" => Some(Trait::ResilienceGrit),
            "drive and ambition" | "passion/drive" | "ambition" => Some(Trait::DriveAmbition),
            "conflict resolution" => Some(Trait::ConflictManagement),
            "introverted vs extroverted" | "interpersonal" => Some(Trait::SocialOrientation),
            _ => None,
        }
    }

    /// Parse either a code or a name
    pub fn parse(value: &str) -> Option<Self> {
        Trait::from_code(value).or_else(|| Trait::from_name(value))
    }
}

impl fmt::Display for Trait {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// Score level bucket derived from a percentile
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ScoreLevel {
    Low,
    Moderate,
    High,
    VeryHigh,
}

impl ScoreLevel {
    /// Bucket a percentile: ≥90 VeryHigh, ≥70 High, ≥30 Moderate, else Low
    pub fn from_percentile(percentile: f64) -> Self {
        if percentile >= 90.0 {
            ScoreLevel::VeryHigh
        } else if percentile >= 70.0 {
            ScoreLevel::High
        } else if percentile >= 30.0 {
            ScoreLevel::Moderate
        } else {
            ScoreLevel::Low
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ScoreLevel::Low => "LOW",
            ScoreLevel::Moderate => "MODERATE",
            ScoreLevel::High => "HIGH",
            ScoreLevel::VeryHigh => "VERY_HIGH",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_traits_indexed_in_order() {
        assert_eq!(Trait::all().len(), Trait::COUNT);
        for (i, t) in Trait::all().iter().enumerate() {
            assert_eq!(t.index(), i);
        }
    }

    #[test]
    fn test_code_round_trip() {
        for t in Trait::all() {
            assert_eq!(Trait::from_code(t.code()), Some(*t));
        }
        assert_eq!(Trait::from_code("rt"), Some(Trait::RiskTaking));
        assert_eq!(Trait::from_code("XX"), None);
    }

    #[test]
    fn test_name_aliases() {
        assert_eq!(Trait::from_name("Risk Taking"), Some(Trait::RiskTaking));
        assert_eq!(Trait::from_name("Resilience and Grit"), Some(Trait::ResilienceGrit));
        assert_eq!(Trait::from_name("Passion/Drive"), Some(Trait::DriveAmbition));
        assert_eq!(Trait::from_name("Conflict Resolution"), Some(Trait::ConflictManagement));
        assert_eq!(Trait::from_name("Leadership"), None);
    }

    #[test]
    fn test_serde_uses_codes() {
        let json = serde_json::to_string(&Trait::ResilienceGrit).unwrap();
        assert_eq!(json, "\"RG\"");
        let parsed: Trait = serde_json::from_str("\"A\"").unwrap();
        assert_eq!(parsed, Trait::Accountability);
    }

    #[test]
    fn test_level_buckets() {
        assert_eq!(ScoreLevel::from_percentile(95.0), ScoreLevel::VeryHigh);
        assert_eq!(ScoreLevel::from_percentile(90.0), ScoreLevel::VeryHigh);
        assert_eq!(ScoreLevel::from_percentile(89.9), ScoreLevel::High);
        assert_eq!(ScoreLevel::from_percentile(70.0), ScoreLevel::High);
        assert_eq!(ScoreLevel::from_percentile(30.0), ScoreLevel::Moderate);
        assert_eq!(ScoreLevel::from_percentile(29.9), ScoreLevel::Low);
    }
}
