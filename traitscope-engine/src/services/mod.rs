//! Per-stage scoring services
//!
//! Normalization and encoding run over the whole response table; aggregation
//! and classification run per person after calibration.

pub mod archetype_classifier;
pub mod integer_encoder;
pub mod response_normalizer;
pub mod trait_aggregator;

pub use archetype_classifier::ArchetypeClassifier;
pub use integer_encoder::{EncodingOutput, EncodingStats, IntegerEncoder};
pub use response_normalizer::{
    ColumnConversion, ConversionSummary, MappingIssue, NormalizationOutput, ResponseNormalizer,
};
pub use trait_aggregator::{ItemSignal, TraitAggregator};
