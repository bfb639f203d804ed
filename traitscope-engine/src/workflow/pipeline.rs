//! Scoring pipeline orchestrator
//!
//! Runs every stage over one response table and collects the results into a
//! single serializable report.
//!
//! # Phases
//! - **Phase 1**: Column detection and Likert normalization
//! - **Phase 2**: Integer encoding with reverse-scoring
//! - **Phase 3**: Rasch calibration (fallback estimator on failure)
//! - **Phase 4**: Trait aggregation and archetype classification
//! - **Phase 5**: Cohort clustering
//! - **Phase 6**: Group statistics and item reliability
//!
//! # Error Handling
//! - Missing assessment data is fatal
//! - Calibration problems degrade to the fallback estimator
//! - A cohort too small to cluster skips Phase 5 and records the reason
//!
//! # Example
//! ```rust,ignore
//! let pipeline = ScoringPipeline::new(config, DefinitionSet::embedded()?);
//! let report = pipeline.run(&table)?;
//! ```

use super::statistics::{cronbach_alpha, group_statistics, GroupStatistics, TraitReliability};
use crate::calibration::{CalibrationResult, CalibrationState, RaschCalibrationEngine};
use crate::clustering::{ClusterSummary, ClusteringResult, CohortClusteringEngine};
use crate::error::{EngineError, EngineResult};
use crate::models::{PersonTraitProfile, RawResponseTable};
use crate::services::{
    ArchetypeClassifier, ColumnConversion, ConversionSummary, EncodingStats, IntegerEncoder,
    ItemSignal, MappingIssue, ResponseNormalizer, TraitAggregator,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};
use traitscope_common::config::{SignalSource, TomlConfig};
use traitscope_common::{ArchetypeCatalog, DefinitionSet};
use uuid::Uuid;

/// Everything one pipeline run produced
#[derive(Debug, Clone, Serialize)]
pub struct PipelineOutput {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub assessment_columns: Vec<String>,
    pub normalization: ConversionSummary,
    pub column_stats: Vec<ColumnConversion>,
    pub mapping_issues: Vec<MappingIssue>,
    pub encoding: EncodingStats,
    pub calibration: CalibrationResult,
    /// States visited by the calibration engine, in order
    pub calibration_path: Vec<CalibrationState>,
    pub signal: SignalSource,
    pub profiles: Vec<PersonTraitProfile>,
    pub clustering: Option<ClusteringResult>,
    pub cluster_summary: Vec<ClusterSummary>,
    /// Why clustering did not run
    pub clustering_skipped: Option<String>,
    pub statistics: GroupStatistics,
    pub reliability: Vec<TraitReliability>,
}

/// End-to-end scoring of a response table
pub struct ScoringPipeline {
    config: TomlConfig,
    definitions: DefinitionSet,
    catalog: ArchetypeCatalog,
}

impl ScoringPipeline {
    /// Pipeline using the standard archetype catalog
    pub fn new(config: TomlConfig, definitions: DefinitionSet) -> Self {
        Self {
            config,
            definitions,
            catalog: ArchetypeCatalog::standard(),
        }
    }

    /// Replace the archetype catalog
    pub fn with_catalog(mut self, catalog: ArchetypeCatalog) -> Self {
        self.catalog = catalog;
        self
    }

    pub fn config(&self) -> &TomlConfig {
        &self.config
    }

    /// Assessment columns of a table
    ///
    /// Likert detection first; when nothing qualifies (numeric exports), the
    /// columns named in the trait definition table are used instead.
    pub fn assessment_columns(&self, table: &RawResponseTable) -> Vec<String> {
        let normalizer = ResponseNormalizer::new(self.config.normalizer.clone());
        let detected = normalizer.detect_assessment_columns(table);
        if !detected.is_empty() {
            return detected;
        }
        let defined: Vec<String> = table
            .columns()
            .iter()
            .filter(|c| self.definitions.traits.contains(c))
            .cloned()
            .collect();
        if !defined.is_empty() {
            debug!(
                columns = defined.len(),
                "No Likert columns detected, using defined item columns"
            );
        }
        defined
    }

    /// Run all phases over `table`
    ///
    /// # Errors
    ///
    /// [`EngineError::MissingData`] if the table has no persons, no assessment
    /// columns, or no column with a trait mapping. Calibration and clustering
    /// problems are reported on the output instead.
    pub fn run(&self, table: &RawResponseTable) -> EngineResult<PipelineOutput> {
        let run_id = Uuid::new_v4();
        let started_at = Utc::now();
        info!(%run_id, persons = table.n_persons(), columns = table.columns().len(), "Starting scoring run");

        if table.n_persons() == 0 {
            return Err(EngineError::MissingData("response table has no rows".into()));
        }

        // Phase 1: detection + normalization
        let columns = self.assessment_columns(table);
        if columns.is_empty() {
            return Err(EngineError::MissingData(
                "no assessment columns detected".into(),
            ));
        }
        let normalizer = ResponseNormalizer::new(self.config.normalizer.clone());
        let normalized = normalizer.process(table, &columns);
        info!(
            columns = columns.len(),
            rate = normalized.summary.overall_rate,
            issues = normalized.issues.len(),
            "Phase 1 complete: normalization"
        );
        for column in &normalized.summary.low_conversion_columns {
            warn!(column = %column, "Low conversion rate");
        }

        // Phase 2: encoding
        let encoded = IntegerEncoder::new().convert(
            &normalized.table,
            &columns,
            &self.definitions.reverse_scored,
        );
        info!(
            items = encoded.matrix.n_items(),
            reversed = encoded.stats.columns_reverse_scored,
            "Phase 2 complete: encoding"
        );

        // Phase 3: calibration
        let mut engine = RaschCalibrationEngine::new(self.config.calibration.clone());
        let calibration = engine.run(&encoded.matrix)?;
        let mut calibration_path = vec![CalibrationState::Uninitialized];
        calibration_path.extend(engine.transitions().iter().map(|t| t.new_state));
        info!(
            estimator = calibration.fit_statistics.estimator.as_str(),
            degraded = calibration.is_degraded(),
            "Phase 3 complete: calibration"
        );

        // Phase 4: aggregation + classification
        let signal = match self.config.scoring.signal {
            SignalSource::Rasch => ItemSignal::Rasch(&calibration),
            SignalSource::Normalized => ItemSignal::Normalized,
        };
        let aggregator = TraitAggregator::new(
            &self.definitions.traits,
            &self.definitions.reverse_scored,
            &normalized.table,
            signal,
        );
        let mut profiles = aggregator.build_profiles()?;
        let classifier = ArchetypeClassifier::new(self.catalog.clone());
        for profile in profiles.iter_mut() {
            classifier.apply(profile);
        }
        info!(
            profiles = profiles.len(),
            traits = aggregator.traits().len(),
            "Phase 4 complete: profiles"
        );

        // Phase 5: clustering
        let (clustering, clustering_skipped) = match self.cluster(&profiles) {
            Ok(result) => (Some(result), None),
            Err(e @ (EngineError::ClusteringInputEmpty(_) | EngineError::InvalidParameter(_))) => {
                warn!(error = %e, "Skipping cohort clustering");
                (None, Some(e.to_string()))
            }
            Err(e) => return Err(e),
        };
        let cluster_summary = clustering
            .as_ref()
            .map(|c| c.summary())
            .unwrap_or_default();

        // Phase 6: statistics
        let statistics = group_statistics(&profiles);
        let reliability = cronbach_alpha(&encoded.matrix, &self.definitions.traits);

        let finished_at = Utc::now();
        info!(
            %run_id,
            elapsed_ms = (finished_at - started_at).num_milliseconds(),
            clustered = clustering.is_some(),
            "Scoring run complete"
        );

        Ok(PipelineOutput {
            run_id,
            started_at,
            finished_at,
            assessment_columns: columns,
            normalization: normalized.summary,
            column_stats: normalized.column_stats,
            mapping_issues: normalized.issues,
            encoding: encoded.stats,
            calibration_path,
            signal: self.config.scoring.signal,
            calibration,
            profiles,
            clustering,
            cluster_summary,
            clustering_skipped,
            statistics,
            reliability,
        })
    }

    fn cluster(&self, profiles: &[PersonTraitProfile]) -> EngineResult<ClusteringResult> {
        let mut engine =
            CohortClusteringEngine::new(self.config.clustering.clone(), self.catalog.clone())
                .with_min_completion(self.config.scoring.min_completion)?;
        engine.analyze(profiles)
    }
}
