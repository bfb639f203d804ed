//! Rasch calibration engine
//!
//! Jointly estimates item difficulties and person abilities from the encoded
//! persons × items matrix. The primary estimator is the Rating Scale Model
//! ([`rating_scale`]); when it is disabled, cannot apply, or fails, the
//! deterministic proportion-logit estimator ([`fallback`]) is used and the
//! result is tagged degraded.
//!
//! Lifecycle:
//!
//! ```text
//! Uninitialized → Prepared → Calibrated ──────────────→ Measured → Finalized
//!                     │                                   ↑
//!                     ├──→ Failed → FallbackUsed ─────────┤
//!                     └──────────→ FallbackUsed ──────────┘
//! ```
//!
//! Numerical trouble never surfaces as an error; only calling an operation
//! from the wrong state does.

pub mod fallback;
pub mod fit;
pub mod rating_scale;

use crate::error::{EngineError, EngineResult};
use crate::models::EncodedResponseMatrix;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, info, warn};
use traitscope_common::config::CalibrationConfig;

pub use fit::FitEntry;
pub use rating_scale::EstimationFailure;

/// Logit magnitude beyond which estimates are clamped and unit-scale values saturate
pub const MAX_LOGIT: f64 = 10.0;

/// Map a logit onto [0,1]
///
/// Sigmoid, saturating to exactly 1.0 above +[`MAX_LOGIT`] and 0.0 below −[`MAX_LOGIT`].
pub fn to_unit_scale(logit: f64) -> f64 {
    if logit > MAX_LOGIT {
        1.0
    } else if logit < -MAX_LOGIT {
        0.0
    } else {
        1.0 / (1.0 + (-logit).exp())
    }
}

/// Calibration lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CalibrationState {
    Uninitialized,
    /// Integer matrix built
    Prepared,
    /// Primary estimator converged
    Calibrated,
    /// Primary estimator gave up
    Failed,
    /// Fallback estimates in place
    FallbackUsed,
    /// Fit statistics attached
    Measured,
    /// Result handed out
    Finalized,
}

/// Recorded state change
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateTransition {
    pub old_state: CalibrationState,
    pub new_state: CalibrationState,
    pub transitioned_at: DateTime<Utc>,
}

/// Estimator that produced a set of measures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Estimator {
    RatingScale,
    Fallback,
}

impl Estimator {
    pub fn as_str(&self) -> &'static str {
        match self {
            Estimator::RatingScale => "rating_scale",
            Estimator::Fallback => "fallback",
        }
    }
}

/// Why the fallback estimator was used
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FallbackReason {
    /// Fewer than two persons
    SinglePerson,
    /// Fewer than two items, or every response identical
    DegenerateInput,
    NonConvergence { iterations: usize, max_residual: f64 },
    NumericalFailure { message: String },
    /// `use_primary = false` in configuration
    PrimaryDisabled,
}

impl From<EstimationFailure> for FallbackReason {
    fn from(failure: EstimationFailure) -> Self {
        match failure {
            EstimationFailure::NonConvergence {
                iterations,
                max_residual,
            } => FallbackReason::NonConvergence {
                iterations,
                max_residual,
            },
            EstimationFailure::Numerical(message) => FallbackReason::NumericalFailure { message },
        }
    }
}

/// Persons × items integer matrix ready for estimation
#[derive(Debug, Clone, Serialize)]
pub struct PreparedMatrix {
    pub person_ids: Vec<String>,
    pub items: Vec<String>,
    /// Complete matrix, every cell in 0..=max_score
    pub data: Vec<Vec<u8>>,
    pub max_score: u8,
    /// Missing cells filled with 0
    pub filled_cells: usize,
    /// Codes above max_score clamped down
    pub clamped_cells: usize,
}

impl PreparedMatrix {
    /// Build from an encoded matrix
    ///
    /// Missing cells become 0 (lossy; counted in `filled_cells`).
    pub fn from_encoded(matrix: &EncodedResponseMatrix, max_score: u8) -> EngineResult<Self> {
        if matrix.n_persons() == 0 {
            return Err(EngineError::MissingData("encoded matrix has no persons".into()));
        }
        if matrix.n_items() == 0 {
            return Err(EngineError::MissingData("encoded matrix has no items".into()));
        }

        let mut filled_cells = 0;
        let mut clamped_cells = 0;
        let data = matrix
            .rows()
            .iter()
            .map(|row| {
                row.iter()
                    .map(|cell| match cell {
                        Some(code) if *code > max_score => {
                            clamped_cells += 1;
                            max_score
                        }
                        Some(code) => *code,
                        None => {
                            filled_cells += 1;
                            0
                        }
                    })
                    .collect()
            })
            .collect();

        Ok(Self {
            person_ids: matrix.person_ids().to_vec(),
            items: matrix.items().to_vec(),
            data,
            max_score,
            filled_cells,
            clamped_cells,
        })
    }

    pub fn n_persons(&self) -> usize {
        self.data.len()
    }

    pub fn n_items(&self) -> usize {
        self.items.len()
    }

    /// Every cell holds the same code
    pub fn is_constant(&self) -> bool {
        let first = self.data.first().and_then(|r| r.first()).copied();
        self.data.iter().flatten().all(|&x| Some(x) == first)
    }
}

/// Diagnostics attached to a calibration result
#[derive(Debug, Clone, Serialize)]
pub struct FitStatistics {
    pub estimator: Estimator,
    /// True when the fallback estimator produced the measures
    pub degraded: bool,
    pub fallback_reason: Option<FallbackReason>,
    pub converged: bool,
    pub iterations: usize,
    pub max_residual: Option<f64>,
    pub filled_cells: usize,
    /// Empty for fallback estimates
    pub item_fit: Vec<FitEntry>,
    /// Empty for fallback estimates
    pub person_fit: Vec<FitEntry>,
    pub item_reliability: Option<f64>,
    pub person_reliability: Option<f64>,
}

/// Item difficulties and person abilities on the logit scale
#[derive(Debug, Clone, Serialize)]
pub struct CalibrationResult {
    pub items: Vec<String>,
    pub difficulties: Vec<f64>,
    pub person_ids: Vec<String>,
    pub abilities: Vec<f64>,
    /// Shared category thresholds (primary estimator only)
    pub thresholds: Vec<f64>,
    pub fit_statistics: FitStatistics,
    #[serde(skip)]
    item_index: HashMap<String, usize>,
    #[serde(skip)]
    person_index: HashMap<String, usize>,
}

impl CalibrationResult {
    fn new(
        prepared: &PreparedMatrix,
        abilities: Vec<f64>,
        difficulties: Vec<f64>,
        thresholds: Vec<f64>,
        fit_statistics: FitStatistics,
    ) -> Self {
        let item_index = prepared
            .items
            .iter()
            .enumerate()
            .map(|(i, name)| (name.clone(), i))
            .collect();
        let person_index = prepared
            .person_ids
            .iter()
            .enumerate()
            .map(|(i, id)| (id.clone(), i))
            .collect();
        Self {
            items: prepared.items.clone(),
            difficulties,
            person_ids: prepared.person_ids.clone(),
            abilities,
            thresholds,
            fit_statistics,
            item_index,
            person_index,
        }
    }

    pub fn difficulty(&self, item: &str) -> Option<f64> {
        self.item_index.get(item).map(|&i| self.difficulties[i])
    }

    pub fn ability(&self, person_id: &str) -> Option<f64> {
        self.person_index.get(person_id).map(|&p| self.abilities[p])
    }

    /// Person-item logit distance (ability − difficulty)
    pub fn measure(&self, person_id: &str, item: &str) -> Option<f64> {
        Some(self.ability(person_id)? - self.difficulty(item)?)
    }

    pub fn item_difficulties(&self) -> BTreeMap<String, f64> {
        self.items.iter().cloned().zip(self.difficulties.iter().copied()).collect()
    }

    pub fn person_abilities(&self) -> BTreeMap<String, f64> {
        self.person_ids.iter().cloned().zip(self.abilities.iter().copied()).collect()
    }

    pub fn is_degraded(&self) -> bool {
        self.fit_statistics.degraded
    }
}

/// Calibration engine driving the lifecycle for one pipeline run
pub struct RaschCalibrationEngine {
    config: CalibrationConfig,
    state: CalibrationState,
    transitions: Vec<StateTransition>,
    prepared: Option<PreparedMatrix>,
    result: Option<CalibrationResult>,
}

impl RaschCalibrationEngine {
    pub fn new(config: CalibrationConfig) -> Self {
        Self {
            config,
            state: CalibrationState::Uninitialized,
            transitions: Vec::new(),
            prepared: None,
            result: None,
        }
    }

    pub fn state(&self) -> CalibrationState {
        self.state
    }

    /// State changes so far, oldest first
    pub fn transitions(&self) -> &[StateTransition] {
        &self.transitions
    }

    pub fn prepared(&self) -> Option<&PreparedMatrix> {
        self.prepared.as_ref()
    }

    fn transition_to(&mut self, new_state: CalibrationState) {
        debug!(from = ?self.state, to = ?new_state, "Calibration state change");
        self.transitions.push(StateTransition {
            old_state: self.state,
            new_state,
            transitioned_at: Utc::now(),
        });
        self.state = new_state;
    }

    fn require(&self, allowed: &[CalibrationState], operation: &str) -> EngineResult<()> {
        if allowed.contains(&self.state) {
            Ok(())
        } else {
            Err(EngineError::InvalidState(format!(
                "{} not allowed in state {:?}",
                operation, self.state
            )))
        }
    }

    /// Build the integer matrix from the encoded responses
    pub fn prepare(&mut self, matrix: &EncodedResponseMatrix) -> EngineResult<&PreparedMatrix> {
        self.require(&[CalibrationState::Uninitialized], "prepare")?;
        let prepared = PreparedMatrix::from_encoded(matrix, self.config.max_score)?;

        if prepared.filled_cells > 0 {
            warn!(
                filled_cells = prepared.filled_cells,
                "Missing responses filled with 0 for calibration"
            );
        }
        if prepared.clamped_cells > 0 {
            warn!(
                clamped_cells = prepared.clamped_cells,
                max_score = prepared.max_score,
                "Codes above max score clamped"
            );
        }
        info!(
            persons = prepared.n_persons(),
            items = prepared.n_items(),
            "Calibration matrix prepared"
        );

        self.prepared = Some(prepared);
        self.transition_to(CalibrationState::Prepared);
        stored(&self.prepared)
    }

    /// Estimate difficulties and abilities
    ///
    /// Runs the primary estimator when it applies, otherwise (or on
    /// failure) the fallback estimator.
    pub fn calibrate(&mut self) -> EngineResult<&CalibrationResult> {
        self.require(&[CalibrationState::Prepared], "calibrate")?;
        let prepared = self
            .prepared
            .take()
            .ok_or_else(|| EngineError::InvalidState("no prepared matrix".into()))?;

        let skip_reason = if !self.config.use_primary {
            Some(FallbackReason::PrimaryDisabled)
        } else if prepared.n_persons() < 2 {
            Some(FallbackReason::SinglePerson)
        } else if prepared.n_items() < 2 || prepared.is_constant() {
            Some(FallbackReason::DegenerateInput)
        } else {
            None
        };

        let result = match skip_reason {
            Some(reason) => {
                warn!(reason = ?reason, "Primary calibration skipped, using fallback estimator");
                self.transition_to(CalibrationState::FallbackUsed);
                fallback_result(&prepared, reason)
            }
            None => match rating_scale::estimate(
                &prepared.data,
                prepared.max_score,
                self.config.max_iterations,
                self.config.tolerance,
            ) {
                Ok(est) => {
                    info!(
                        iterations = est.iterations,
                        max_residual = est.max_residual,
                        "Rating scale calibration converged"
                    );
                    self.transition_to(CalibrationState::Calibrated);
                    let stats = FitStatistics {
                        estimator: Estimator::RatingScale,
                        degraded: false,
                        fallback_reason: None,
                        converged: true,
                        iterations: est.iterations,
                        max_residual: Some(est.max_residual),
                        filled_cells: prepared.filled_cells,
                        item_fit: Vec::new(),
                        person_fit: Vec::new(),
                        item_reliability: None,
                        person_reliability: None,
                    };
                    CalibrationResult::new(
                        &prepared,
                        est.abilities,
                        est.difficulties,
                        est.thresholds,
                        stats,
                    )
                }
                Err(failure) => {
                    warn!(failure = ?failure, "Rating scale calibration failed, using fallback estimator");
                    self.transition_to(CalibrationState::Failed);
                    self.transition_to(CalibrationState::FallbackUsed);
                    fallback_result(&prepared, failure.into())
                }
            },
        };

        self.prepared = Some(prepared);
        self.result = Some(result);
        stored(&self.result)
    }

    /// Attach fit statistics and reliabilities (primary estimates only)
    pub fn measure(&mut self) -> EngineResult<&CalibrationResult> {
        self.require(
            &[CalibrationState::Calibrated, CalibrationState::FallbackUsed],
            "measure",
        )?;
        let (Some(prepared), Some(result)) = (self.prepared.as_ref(), self.result.as_mut()) else {
            return Err(EngineError::InvalidState("no calibration result".into()));
        };

        if result.fit_statistics.estimator == Estimator::RatingScale {
            let report = fit::compute(
                &prepared.data,
                &result.abilities,
                &result.difficulties,
                &result.thresholds,
            );
            let stats = &mut result.fit_statistics;
            stats.item_fit = prepared
                .items
                .iter()
                .zip(report.item_fit)
                .map(|(id, f)| f.named(id))
                .collect();
            stats.person_fit = prepared
                .person_ids
                .iter()
                .zip(report.person_fit)
                .map(|(id, f)| f.named(id))
                .collect();
            stats.item_reliability = Some(report.item_reliability);
            stats.person_reliability = Some(report.person_reliability);
            info!(
                item_reliability = report.item_reliability,
                person_reliability = report.person_reliability,
                "Fit statistics computed"
            );
        } else {
            debug!("Fallback estimates carry no fit statistics");
        }

        self.transition_to(CalibrationState::Measured);
        stored(&self.result)
    }

    /// Hand out the result; the engine accepts no further operations
    pub fn finalize(&mut self) -> EngineResult<CalibrationResult> {
        self.require(&[CalibrationState::Measured], "finalize")?;
        let result = self
            .result
            .take()
            .ok_or_else(|| EngineError::InvalidState("no calibration result".into()))?;
        self.transition_to(CalibrationState::Finalized);
        info!(
            estimator = result.fit_statistics.estimator.as_str(),
            degraded = result.fit_statistics.degraded,
            "Calibration finalized"
        );
        Ok(result)
    }

    /// prepare → calibrate → measure → finalize
    pub fn run(&mut self, matrix: &EncodedResponseMatrix) -> EngineResult<CalibrationResult> {
        self.prepare(matrix)?;
        self.calibrate()?;
        self.measure()?;
        self.finalize()
    }
}

fn stored<T>(slot: &Option<T>) -> EngineResult<&T> {
    slot.as_ref()
        .ok_or_else(|| EngineError::InvalidState("calibration data missing".into()))
}

fn fallback_result(prepared: &PreparedMatrix, reason: FallbackReason) -> CalibrationResult {
    let est = fallback::estimate(&prepared.data, prepared.max_score);
    let stats = FitStatistics {
        estimator: Estimator::Fallback,
        degraded: true,
        fallback_reason: Some(reason),
        converged: false,
        iterations: 0,
        max_residual: None,
        filled_cells: prepared.filled_cells,
        item_fit: Vec::new(),
        person_fit: Vec::new(),
        item_reliability: None,
        person_reliability: None,
    };
    CalibrationResult::new(prepared, est.abilities, est.difficulties, Vec::new(), stats)
}
