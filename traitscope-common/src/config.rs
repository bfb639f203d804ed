//! Configuration loading and resolution
//!
//! Bootstrap configuration is a single TOML file. Every section and every
//! field is optional; anything omitted falls back to a compiled default.
//!
//! # Resolution Priority
//!
//! 1. Command-line argument (`--config`)
//! 2. Environment variable (`TRAITSCOPE_CONFIG`)
//! 3. Platform config directory (`<config_dir>/traitscope/config.toml`)
//! 4. Compiled defaults
//!
//! A missing config file is never fatal: the resolver reports it and the
//! compiled defaults are used. A file that exists but fails to parse or
//! validate is an error.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable naming an explicit config file
pub const CONFIG_ENV_VAR: &str = "TRAITSCOPE_CONFIG";

/// Bootstrap configuration loaded from TOML
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TomlConfig {
    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub normalizer: NormalizerConfig,

    #[serde(default)]
    pub calibration: CalibrationConfig,

    #[serde(default)]
    pub scoring: ScoringConfig,

    #[serde(default)]
    pub clustering: ClusteringConfig,

    /// External trait/reverse-item definition file (embedded table if unset)
    #[serde(default)]
    pub definitions_path: Option<PathBuf>,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log file path (optional, logs to stderr if not specified)
    #[serde(default)]
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: None,
        }
    }
}

/// Column detection and conversion settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NormalizerConfig {
    /// Column names that are always metadata
    #[serde(default = "default_skip_columns")]
    pub skip_columns: Vec<String>,

    /// Substrings marking a column as metadata
    #[serde(default = "default_skip_patterns")]
    pub skip_patterns: Vec<String>,

    /// Non-missing values inspected per column during detection
    #[serde(default = "default_detection_sample")]
    pub detection_sample: usize,

    /// Conversion rate below which a column is reported
    #[serde(default = "default_low_conversion_threshold")]
    pub low_conversion_threshold: f64,
}

impl Default for NormalizerConfig {
    fn default() -> Self {
        Self {
            skip_columns: default_skip_columns(),
            skip_patterns: default_skip_patterns(),
            detection_sample: default_detection_sample(),
            low_conversion_threshold: default_low_conversion_threshold(),
        }
    }
}

/// Rasch calibration settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalibrationConfig {
    #[serde(default = "default_calibration_iterations")]
    pub max_iterations: usize,

    /// Largest absolute residual sum (observed − expected score) accepted as converged
    #[serde(default = "default_calibration_tolerance")]
    pub tolerance: f64,

    /// Highest ordinal category code
    #[serde(default = "default_max_score")]
    pub max_score: u8,

    /// Run the joint estimator; `false` forces the fallback estimator
    #[serde(default = "default_true")]
    pub use_primary: bool,
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self {
            max_iterations: default_calibration_iterations(),
            tolerance: default_calibration_tolerance(),
            max_score: default_max_score(),
            use_primary: true,
        }
    }
}

/// Per-item signal fed to trait aggregation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalSource {
    /// person ability − item difficulty (logits)
    #[default]
    Rasch,
    /// Normalized response value in [0,1]
    Normalized,
}

impl SignalSource {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "rasch" => Some(SignalSource::Rasch),
            "normalized" => Some(SignalSource::Normalized),
            _ => None,
        }
    }
}

/// Trait scoring settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoringConfig {
    #[serde(default)]
    pub signal: SignalSource,

    /// Minimum completion rate for a profile to enter cohort clustering
    #[serde(default = "default_min_completion")]
    pub min_completion: f64,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            signal: SignalSource::default(),
            min_completion: default_min_completion(),
        }
    }
}

/// Cohort clustering algorithm
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClusterMethod {
    /// Centroid-based (k-means with k-means++ seeding)
    #[default]
    KMeans,
    /// Hierarchical agglomerative (Ward linkage)
    Agglomerative,
}

impl ClusterMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            ClusterMethod::KMeans => "kmeans",
            ClusterMethod::Agglomerative => "agglomerative",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "kmeans" | "k-means" | "centroid" => Some(ClusterMethod::KMeans),
            "agglomerative" | "hierarchical" => Some(ClusterMethod::Agglomerative),
            _ => None,
        }
    }
}

/// Cohort clustering settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClusteringConfig {
    /// Number of clusters
    #[serde(default = "default_k")]
    pub k: usize,

    #[serde(default)]
    pub method: ClusterMethod,

    /// RNG seed for k-means++ seeding
    #[serde(default = "default_seed")]
    pub seed: u64,

    /// Lloyd iteration cap per restart
    #[serde(default = "default_kmeans_iterations")]
    pub max_iterations: usize,

    /// Centroid movement below which k-means stops
    #[serde(default = "default_kmeans_tolerance")]
    pub tolerance: f64,

    /// Independent k-means++ restarts (lowest inertia kept)
    #[serde(default = "default_restarts")]
    pub restarts: usize,

    /// Upper bound when searching for the best k
    #[serde(default = "default_max_k")]
    pub max_k: usize,
}

impl Default for ClusteringConfig {
    fn default() -> Self {
        Self {
            k: default_k(),
            method: ClusterMethod::default(),
            seed: default_seed(),
            max_iterations: default_kmeans_iterations(),
            tolerance: default_kmeans_tolerance(),
            restarts: default_restarts(),
            max_k: default_max_k(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_skip_columns() -> Vec<String> {
    [
        "Please enter your prolific ID",
        "In what country do you currently reside?",
        "Are you interested in entrepreneurship?",
        "Thanks in advance for confirming your email address.",
        "Select the statement that resonates with you the most.",
        "Response Type",
        "Start Date (UTC)",
        "Submit Date (UTC)",
        "Network ID",
        "Tags",
        "Ending",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_skip_patterns() -> Vec<String> {
    vec!["enrich_".to_string(), "Stage Date".to_string()]
}

fn default_detection_sample() -> usize {
    10
}

fn default_low_conversion_threshold() -> f64 {
    0.8
}

fn default_calibration_iterations() -> usize {
    200
}

fn default_calibration_tolerance() -> f64 {
    0.01
}

fn default_max_score() -> u8 {
    4
}

fn default_true() -> bool {
    true
}

fn default_min_completion() -> f64 {
    0.5
}

fn default_k() -> usize {
    5
}

fn default_seed() -> u64 {
    42
}

fn default_kmeans_iterations() -> usize {
    300
}

fn default_kmeans_tolerance() -> f64 {
    1e-4
}

fn default_restarts() -> usize {
    10
}

fn default_max_k() -> usize {
    8
}

impl TomlConfig {
    /// Check value ranges
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] naming the first offending field.
    pub fn validate(&self) -> Result<()> {
        let cal = &self.calibration;
        if cal.max_iterations == 0 {
            return Err(Error::Config("calibration.max_iterations must be > 0".into()));
        }
        if cal.tolerance.is_nan() || cal.tolerance <= 0.0 {
            return Err(Error::Config("calibration.tolerance must be > 0".into()));
        }
        if cal.max_score == 0 {
            return Err(Error::Config("calibration.max_score must be >= 1".into()));
        }

        if !(0.0..=1.0).contains(&self.scoring.min_completion) {
            return Err(Error::Config("scoring.min_completion must be in [0, 1]".into()));
        }
        if !(0.0..=1.0).contains(&self.normalizer.low_conversion_threshold) {
            return Err(Error::Config(
                "normalizer.low_conversion_threshold must be in [0, 1]".into(),
            ));
        }
        if self.normalizer.detection_sample == 0 {
            return Err(Error::Config("normalizer.detection_sample must be > 0".into()));
        }

        let cl = &self.clustering;
        if cl.k == 0 {
            return Err(Error::Config("clustering.k must be > 0".into()));
        }
        if cl.max_iterations == 0 || cl.restarts == 0 {
            return Err(Error::Config(
                "clustering.max_iterations and clustering.restarts must be > 0".into(),
            ));
        }
        if cl.max_k < 2 {
            return Err(Error::Config("clustering.max_k must be >= 2".into()));
        }

        Ok(())
    }
}

/// Load and validate a TOML config file
///
/// # Errors
///
/// - [`Error::NotFound`] if the file does not exist
/// - [`Error::Io`] on read failure
/// - [`Error::Parse`] on malformed TOML
/// - [`Error::Config`] on out-of-range values
pub fn load_toml_config(path: &Path) -> Result<TomlConfig> {
    if !path.exists() {
        return Err(Error::NotFound(format!(
            "config file not found: {}",
            path.display()
        )));
    }
    let content = std::fs::read_to_string(path)?;
    let config: TomlConfig = toml::from_str(&content)?;
    config.validate()?;
    Ok(config)
}

/// Where the effective configuration came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfigSource {
    CommandLine,
    Environment,
    PlatformDir,
    CompiledDefaults,
}

/// Outcome of config resolution
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub config: TomlConfig,
    pub source: ConfigSource,
    /// File that was selected (may not exist)
    pub path: Option<PathBuf>,
    /// Selected file was missing and compiled defaults were used
    pub missing: bool,
}

/// Config file resolver following the priority order in the module docs
///
/// Resolution happens before the tracing subscriber exists, so the resolver
/// does not log; callers report [`ResolvedConfig::source`] and
/// [`ResolvedConfig::missing`] once logging is up.
pub struct ConfigResolver {
    cli_path: Option<PathBuf>,
    env_var: String,
}

impl ConfigResolver {
    pub fn new(cli_path: Option<PathBuf>) -> Self {
        Self {
            cli_path,
            env_var: CONFIG_ENV_VAR.to_string(),
        }
    }

    /// Override the environment variable consulted at priority 2
    pub fn with_env_var(mut self, name: impl Into<String>) -> Self {
        self.env_var = name.into();
        self
    }

    /// Select the config file path without reading it
    pub fn locate(&self) -> (ConfigSource, Option<PathBuf>) {
        // Priority 1: Command-line argument
        if let Some(path) = &self.cli_path {
            return (ConfigSource::CommandLine, Some(path.clone()));
        }

        // Priority 2: Environment variable
        if let Ok(path) = std::env::var(&self.env_var) {
            if !path.trim().is_empty() {
                return (ConfigSource::Environment, Some(PathBuf::from(path)));
            }
        }

        // Priority 3: Platform config directory (only if present)
        if let Some(path) = platform_config_path() {
            if path.exists() {
                return (ConfigSource::PlatformDir, Some(path));
            }
        }

        // Priority 4: Compiled defaults
        (ConfigSource::CompiledDefaults, None)
    }

    /// Resolve and load the effective configuration
    ///
    /// # Errors
    ///
    /// Fails only if the selected file exists but cannot be read, parsed or
    /// validated.
    pub fn resolve(&self) -> Result<ResolvedConfig> {
        let (source, path) = self.locate();

        let Some(file) = path.clone() else {
            return Ok(ResolvedConfig {
                config: TomlConfig::default(),
                source,
                path: None,
                missing: false,
            });
        };

        match load_toml_config(&file) {
            Ok(config) => Ok(ResolvedConfig {
                config,
                source,
                path,
                missing: false,
            }),
            Err(Error::NotFound(_)) => Ok(ResolvedConfig {
                config: TomlConfig::default(),
                source,
                path,
                missing: true,
            }),
            Err(e) => Err(e),
        }
    }
}

/// `<config_dir>/traitscope/config.toml` for the current platform
pub fn platform_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("traitscope").join("config.toml"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_validate() {
        let config = TomlConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.clustering.k, 5);
        assert_eq!(config.calibration.max_score, 4);
        assert_eq!(config.scoring.signal, SignalSource::Rasch);
    }

    #[test]
    fn test_empty_toml_is_all_defaults() {
        let config: TomlConfig = toml::from_str("").unwrap();
        assert_eq!(config.normalizer.detection_sample, 10);
        assert!(config.calibration.use_primary);
        assert!(config.definitions_path.is_none());
    }

    #[test]
    fn test_partial_section() {
        let config: TomlConfig = toml::from_str(
            r#"
[clustering]
k = 3
method = "agglomerative"
"#,
        )
        .unwrap();
        assert_eq!(config.clustering.k, 3);
        assert_eq!(config.clustering.method, ClusterMethod::Agglomerative);
        assert_eq!(config.clustering.seed, 42);
    }

    #[test]
    fn test_validate_rejects_zero_k() {
        let mut config = TomlConfig::default();
        config.clustering.k = 0;
        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn test_method_parse() {
        assert_eq!(ClusterMethod::from_str("k-means"), Some(ClusterMethod::KMeans));
        assert_eq!(
            ClusterMethod::from_str("Hierarchical"),
            Some(ClusterMethod::Agglomerative)
        );
        assert_eq!(ClusterMethod::from_str("dbscan"), None);
        assert_eq!(SignalSource::from_str("NORMALIZED"), Some(SignalSource::Normalized));
    }
}
