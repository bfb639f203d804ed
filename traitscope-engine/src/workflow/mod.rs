//! Whole-table scoring workflow
//!
//! Chains the per-stage services over one response table:
//! 1. Detect and normalize assessment columns
//! 2. Encode to ordinal codes
//! 3. Calibrate item difficulties and person abilities
//! 4. Aggregate trait profiles and classify archetypes
//! 5. Cluster the cohort
//! 6. Summarize group statistics and item reliability

pub mod pipeline;
pub mod statistics;

pub use pipeline::{PipelineOutput, ScoringPipeline};
pub use statistics::{GroupStatistics, SummaryStats, TraitReliability};
