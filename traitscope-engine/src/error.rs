//! Error types for traitscope-engine
//!
//! Only fatal conditions are errors. Recoverable conditions (unmappable
//! cells, calibration non-convergence, traits without answered items) are
//! reported as values on the stage outputs and logged.

use thiserror::Error;

/// Engine error type
#[derive(Debug, Error)]
pub enum EngineError {
    /// Required input data is absent (empty table, unknown person, no mapped items)
    #[error("Missing data: {0}")]
    MissingData(String),

    /// No profile passed the completion filter
    #[error("Clustering input empty: {0}")]
    ClusteringInputEmpty(String),

    /// Parameter outside its valid range (k, thresholds, ...)
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Operation invoked from the wrong lifecycle state
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// traitscope-common error
    #[error("Common error: {0}")]
    Common(#[from] traitscope_common::Error),
}

/// Result type for engine operations
pub type EngineResult<T> = Result<T, EngineError>;
