//! Integration tests for Rasch calibration over encoded survey data
//!
//! Covers:
//! - Rating Scale convergence and lifecycle on realistic cohorts
//! - Lifecycle paths for the fallback estimator
//! - Fallback reasons for single-person and disabled-primary runs
//! - Deterministic fallback measures
//! - Item ordering: items answered higher are easier

mod helpers;

use helpers::{cohort_table, definitions, likert_table};
use traitscope_common::config::CalibrationConfig;
use traitscope_engine::calibration::{
    CalibrationState, Estimator, FallbackReason, RaschCalibrationEngine,
};
use traitscope_engine::models::{EncodedResponseMatrix, RawResponseTable};
use traitscope_engine::services::{IntegerEncoder, ResponseNormalizer};
use traitscope_engine::EngineError;

fn encode(table: &RawResponseTable) -> EncodedResponseMatrix {
    let normalizer = ResponseNormalizer::default();
    let columns = normalizer.detect_assessment_columns(table);
    let normalized = normalizer.process(table, &columns);
    IntegerEncoder::new()
        .convert(&normalized.table, &columns, &definitions().reverse_scored)
        .matrix
}

fn fallback_only() -> CalibrationConfig {
    CalibrationConfig {
        use_primary: false,
        ..CalibrationConfig::default()
    }
}

#[test]
fn test_cohort_calibration_converges_on_rating_scale() {
    let config = CalibrationConfig::default();
    for (n, seed) in [(12, 4), (30, 13), (40, 17)] {
        let matrix = encode(&cohort_table(n, seed));
        let mut engine = RaschCalibrationEngine::new(config.clone());
        let result = engine.run(&matrix).unwrap();

        assert_eq!(engine.state(), CalibrationState::Finalized);
        assert_eq!(result.items.len(), 12);
        assert_eq!(result.abilities.len(), n);
        assert!(result.abilities.iter().all(|a| a.is_finite()));
        assert!(result.difficulties.iter().all(|d| d.is_finite()));

        let fit = &result.fit_statistics;
        assert_eq!(fit.estimator, Estimator::RatingScale, "cohort of {}", n);
        assert!(fit.converged);
        assert!(fit.fallback_reason.is_none());
        assert!(!result.is_degraded());
        assert!(fit.iterations <= config.max_iterations);
        assert!(fit.max_residual.unwrap() < config.tolerance);
        assert_eq!(fit.item_fit.len(), 12);
        assert_eq!(fit.person_fit.len(), n);

        let states: Vec<CalibrationState> =
            engine.transitions().iter().map(|t| t.new_state).collect();
        assert_eq!(
            states,
            vec![
                CalibrationState::Prepared,
                CalibrationState::Calibrated,
                CalibrationState::Measured,
                CalibrationState::Finalized,
            ]
        );
    }
}

#[test]
fn test_single_person_uses_fallback() {
    let matrix = encode(&cohort_table(1, 3));
    let mut engine = RaschCalibrationEngine::new(CalibrationConfig::default());
    let result = engine.run(&matrix).unwrap();

    assert_eq!(result.fit_statistics.estimator, Estimator::Fallback);
    assert_eq!(
        result.fit_statistics.fallback_reason,
        Some(FallbackReason::SinglePerson)
    );
    assert!(result.fit_statistics.item_fit.is_empty());
    assert!(!engine
        .transitions()
        .iter()
        .any(|t| t.new_state == CalibrationState::Failed));
}

#[test]
fn test_fallback_measures_are_deterministic() {
    let matrix = encode(&cohort_table(25, 8));
    let a = RaschCalibrationEngine::new(fallback_only()).run(&matrix).unwrap();
    let b = RaschCalibrationEngine::new(fallback_only()).run(&matrix).unwrap();

    assert_eq!(a.abilities, b.abilities);
    assert_eq!(a.difficulties, b.difficulties);
    assert_eq!(a.person_abilities(), b.person_abilities());
    assert_eq!(
        a.fit_statistics.fallback_reason,
        Some(FallbackReason::PrimaryDisabled)
    );
}

#[test]
fn test_higher_answered_item_is_easier() {
    // Column 0 mostly Often/Always, column 1 mostly Never/Seldom
    let rows: Vec<Vec<Option<usize>>> = (0..6)
        .map(|p| {
            let mut row = vec![Some(2); 12];
            row[0] = Some(3 + p % 2);
            row[1] = Some(p % 2);
            row
        })
        .collect();
    let matrix = encode(&likert_table(&rows));
    let result = RaschCalibrationEngine::new(fallback_only()).run(&matrix).unwrap();

    let easy = result.difficulty(&matrix.items()[0]).unwrap();
    let hard = result.difficulty(&matrix.items()[1]).unwrap();
    assert!(easy < hard);

    let person = &matrix.person_ids()[0];
    let measure = result.measure(person, &matrix.items()[0]).unwrap();
    assert!((measure - (result.ability(person).unwrap() - easy)).abs() < 1e-12);
}

#[test]
fn test_run_twice_is_invalid_state() {
    let matrix = encode(&cohort_table(5, 1));
    let mut engine = RaschCalibrationEngine::new(fallback_only());
    engine.run(&matrix).unwrap();
    assert!(matches!(
        engine.run(&matrix),
        Err(EngineError::InvalidState(_))
    ));
}
