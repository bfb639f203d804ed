//! Per-trait aggregation into person profiles
//!
//! Each answered item contributes one signal value to every trait it is
//! mapped to. Two signal sources are supported:
//!
//! - **Rasch**: person-item logit distance (ability − difficulty), averaged
//!   per trait and normalized with `clamp((mean + 3) / 6, 0, 1)`
//! - **Normalized**: the [0,1] response value, mirrored (1 − v) for
//!   reverse-scored items
//!
//! A trait with no answered items gets a neutral score of 0.5 with reduced
//! confidence.

use crate::calibration::CalibrationResult;
use crate::error::{EngineError, EngineResult};
use crate::models::{NormalizedResponseTable, PersonTraitProfile, TraitScore};
use tracing::{debug, warn};
use traitscope_common::{ReverseScoredItems, ScoreLevel, Trait, TraitDefinitionTable};

/// Score assigned to traits without answered items
pub const NEUTRAL_SCORE: f64 = 0.5;

/// Confidence assigned to neutral scores
pub const NEUTRAL_CONFIDENCE: f64 = 0.1;

/// Answered items needed for full confidence
const FULL_CONFIDENCE_ITEMS: f64 = 10.0;

/// Half-width of the logit window mapped onto [0,1]
const LOGIT_WINDOW: f64 = 3.0;

/// Logistic spread of the percentile mapping
const PERCENTILE_SCALE: f64 = 0.15;

/// Per-item signal source
#[derive(Debug, Clone, Copy)]
pub enum ItemSignal<'a> {
    Rasch(&'a CalibrationResult),
    Normalized,
}

/// Mapped item present in the response table
struct MappedItem {
    name: String,
    column: usize,
    traits: Vec<Trait>,
    reversed: bool,
}

/// Aggregates item signals into trait scores and profiles
pub struct TraitAggregator<'a> {
    responses: &'a NormalizedResponseTable,
    signal: ItemSignal<'a>,
    items: Vec<MappedItem>,
    traits: Vec<Trait>,
}

impl<'a> TraitAggregator<'a> {
    /// Create an aggregator over the mapped items of a response table
    ///
    /// Columns without a trait mapping are ignored.
    pub fn new(
        definitions: &TraitDefinitionTable,
        reverse: &ReverseScoredItems,
        responses: &'a NormalizedResponseTable,
        signal: ItemSignal<'a>,
    ) -> Self {
        let items: Vec<MappedItem> = responses
            .items()
            .iter()
            .enumerate()
            .filter_map(|(column, name)| {
                definitions.traits_for(name).map(|traits| MappedItem {
                    name: name.clone(),
                    column,
                    traits: traits.to_vec(),
                    reversed: reverse.contains(name),
                })
            })
            .collect();

        let traits: Vec<Trait> = Trait::all()
            .iter()
            .copied()
            .filter(|t| items.iter().any(|i| i.traits.contains(t)))
            .collect();

        let unmapped = responses.items().len() - items.len();
        if unmapped > 0 {
            debug!(unmapped, "Assessment columns without trait mapping");
        }

        Self {
            responses,
            signal,
            items,
            traits,
        }
    }

    /// Traits with at least one mapped item in the table, canonical order
    pub fn traits(&self) -> &[Trait] {
        &self.traits
    }

    /// Logistic-CDF percentile of a [0,1] score, strictly increasing in (0,100)
    pub fn percentile(score: f64) -> f64 {
        100.0 / (1.0 + (-(score - 0.5) / PERCENTILE_SCALE).exp())
    }

    /// Placeholder for a trait without answered items
    pub fn neutral_score(t: Trait) -> TraitScore {
        let percentile = Self::percentile(NEUTRAL_SCORE);
        TraitScore {
            trait_code: t,
            trait_name: t.display_name().to_string(),
            score: NEUTRAL_SCORE,
            percentile,
            items_count: 0,
            level: ScoreLevel::from_percentile(percentile),
            confidence: NEUTRAL_CONFIDENCE,
        }
    }

    fn person_row(&self, person_id: &str) -> EngineResult<usize> {
        self.responses
            .person_index(person_id)
            .ok_or_else(|| EngineError::MissingData(format!("unknown person '{}'", person_id)))
    }

    fn item_signal(&self, person_id: &str, person: usize, item: &MappedItem) -> Option<f64> {
        let value = self.responses.value(person, item.column)?;
        match self.signal {
            ItemSignal::Normalized => Some(if item.reversed { 1.0 - value } else { value }),
            ItemSignal::Rasch(calibration) => calibration.measure(person_id, &item.name),
        }
    }

    /// Score one trait for one person
    ///
    /// Returns `Ok(None)` when the person answered no item mapped to the trait.
    pub fn trait_score(&self, person_id: &str, t: Trait) -> EngineResult<Option<TraitScore>> {
        let person = self.person_row(person_id)?;
        let signals: Vec<f64> = self
            .items
            .iter()
            .filter(|item| item.traits.contains(&t))
            .filter_map(|item| self.item_signal(person_id, person, item))
            .collect();

        if signals.is_empty() {
            return Ok(None);
        }

        let mean = signals.iter().sum::<f64>() / signals.len() as f64;
        let score = match self.signal {
            ItemSignal::Normalized => mean.clamp(0.0, 1.0),
            ItemSignal::Rasch(_) => ((mean + LOGIT_WINDOW) / (2.0 * LOGIT_WINDOW)).clamp(0.0, 1.0),
        };
        let percentile = Self::percentile(score);

        Ok(Some(TraitScore {
            trait_code: t,
            trait_name: t.display_name().to_string(),
            score,
            percentile,
            items_count: signals.len(),
            level: ScoreLevel::from_percentile(percentile),
            confidence: (signals.len() as f64 / FULL_CONFIDENCE_ITEMS).min(1.0),
        }))
    }

    /// Answered mapped items / mapped items
    pub fn completion_rate(&self, person_id: &str) -> EngineResult<f64> {
        let person = self.person_row(person_id)?;
        if self.items.is_empty() {
            return Ok(0.0);
        }
        let answered = self
            .items
            .iter()
            .filter(|item| self.responses.value(person, item.column).is_some())
            .count();
        Ok(answered as f64 / self.items.len() as f64)
    }

    /// Build the trait profile for one person (archetypes left empty)
    ///
    /// # Errors
    ///
    /// [`EngineError::MissingData`] for an unknown person or when no column
    /// maps to any trait.
    pub fn build_profile(&self, person_id: &str) -> EngineResult<PersonTraitProfile> {
        if self.traits.is_empty() {
            return Err(EngineError::MissingData(
                "no assessment column maps to a trait".into(),
            ));
        }

        let mut traits = Vec::with_capacity(self.traits.len());
        for &t in &self.traits {
            match self.trait_score(person_id, t)? {
                Some(score) => traits.push(score),
                None => {
                    warn!(
                        person_id = %person_id,
                        trait_code = t.code(),
                        "No answered items for trait, using neutral score"
                    );
                    traits.push(Self::neutral_score(t));
                }
            }
        }

        let overall_score = traits.iter().map(|s| s.score).sum::<f64>() / traits.len() as f64;

        Ok(PersonTraitProfile {
            person_id: person_id.to_string(),
            traits,
            overall_score,
            completion_rate: self.completion_rate(person_id)?,
            primary_archetype: None,
            secondary_archetypes: Vec::new(),
            insights: None,
            growth_areas: Vec::new(),
        })
    }

    /// Profiles for every person, in table order
    pub fn build_profiles(&self) -> EngineResult<Vec<PersonTraitProfile>> {
        self.responses
            .person_ids()
            .iter()
            .map(|id| self.build_profile(id))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn definitions() -> TraitDefinitionTable {
        TraitDefinitionTable::from_entries(vec![
            ("I take risks", vec![Trait::RiskTaking]),
            ("I try new things", vec![Trait::RiskTaking, Trait::InnovationOrientation]),
            ("I avoid danger", vec![Trait::RiskTaking]),
            ("I meet deadlines", vec![Trait::Accountability]),
        ])
        .unwrap()
    }

    fn responses() -> NormalizedResponseTable {
        NormalizedResponseTable::new(
            vec!["p1".into(), "p2".into()],
            vec![
                "I take risks".into(),
                "I try new things".into(),
                "I avoid danger".into(),
                "I meet deadlines".into(),
                "Unmapped column".into(),
            ],
            vec![
                vec![Some(1.0), Some(0.7), Some(0.2), None, Some(0.5)],
                vec![None, None, None, Some(0.5), None],
            ],
        )
    }

    #[test]
    fn test_percentile_monotonic_and_bounded() {
        let mut prev = -1.0;
        for i in 0..=100 {
            let p = TraitAggregator::percentile(i as f64 / 100.0);
            assert!(p > prev);
            assert!((0.0..=100.0).contains(&p));
            prev = p;
        }
        assert!((TraitAggregator::percentile(0.5) - 50.0).abs() < 1e-12);
    }

    #[test]
    fn test_normalized_signal_mirrors_reverse_items() {
        let defs = definitions();
        let reverse = ReverseScoredItems::new("1", vec!["I avoid danger".to_string()]);
        let table = responses();
        let agg = TraitAggregator::new(&defs, &reverse, &table, ItemSignal::Normalized);

        let rt = agg.trait_score("p1", Trait::RiskTaking).unwrap().unwrap();
        // (1.0 + 0.7 + (1 − 0.2)) / 3
        assert!((rt.score - 2.5 / 3.0).abs() < 1e-12);
        assert_eq!(rt.items_count, 3);
        assert!((rt.confidence - 0.3).abs() < 1e-12);

        assert!(agg.trait_score("p1", Trait::Accountability).unwrap().is_none());
        assert!(agg.trait_score("p1", Trait::Negotiation).unwrap().is_none());
    }

    #[test]
    fn test_profile_uses_neutral_default_and_completion() {
        let defs = definitions();
        let reverse = ReverseScoredItems::default();
        let table = responses();
        let agg = TraitAggregator::new(&defs, &reverse, &table, ItemSignal::Normalized);

        assert_eq!(
            agg.traits(),
            &[Trait::RiskTaking, Trait::InnovationOrientation, Trait::Accountability]
        );

        let p2 = agg.build_profile("p2").unwrap();
        assert_eq!(p2.traits.len(), 3);
        let rt = p2.trait_score(Trait::RiskTaking).unwrap();
        assert!(rt.is_neutral_default());
        assert_eq!(rt.score, NEUTRAL_SCORE);
        assert_eq!(rt.confidence, NEUTRAL_CONFIDENCE);
        assert_eq!(p2.completion_rate, 0.25);

        let p1 = agg.build_profile("p1").unwrap();
        assert_eq!(p1.completion_rate, 0.75);
    }

    #[test]
    fn test_unknown_person_is_missing_data() {
        let defs = definitions();
        let reverse = ReverseScoredItems::default();
        let table = responses();
        let agg = TraitAggregator::new(&defs, &reverse, &table, ItemSignal::Normalized);
        assert!(matches!(
            agg.build_profile("nobody"),
            Err(EngineError::MissingData(_))
        ));
    }
}
