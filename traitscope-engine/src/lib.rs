//! traitscope-engine library interface
//!
//! Scoring pipeline for Likert-scale behavioral assessments: response
//! normalization, integer encoding, Rasch calibration, trait aggregation,
//! archetype classification and cohort clustering.

pub mod calibration;
pub mod clustering;
pub mod error;
pub mod models;
pub mod services;
pub mod workflow;

pub use crate::calibration::{CalibrationResult, RaschCalibrationEngine};
pub use crate::clustering::{ClusteringResult, CohortClusteringEngine};
pub use crate::error::{EngineError, EngineResult};
pub use crate::workflow::{PipelineOutput, ScoringPipeline};
