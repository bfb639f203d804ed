//! Integration tests for configuration resolution and definition loading
//!
//! Covers:
//! - Missing config files fall back to compiled defaults (never fatal)
//! - Priority order: command line → environment → platform dir → defaults
//! - Malformed or out-of-range config files are errors
//! - External definition files replace the embedded table
//!
//! Tests that touch TRAITSCOPE_CONFIG are marked #[serial] so they never run
//! in parallel with each other.

use serial_test::serial;
use std::env;
use std::io::Write;
use std::path::PathBuf;
use tempfile::{NamedTempFile, TempDir};
use traitscope_common::config::{
    load_toml_config, ClusterMethod, ConfigResolver, ConfigSource, SignalSource, TomlConfig,
    CONFIG_ENV_VAR,
};
use traitscope_common::{DefinitionSet, Error, Trait};

fn write_temp(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

#[test]
fn test_load_full_config() {
    let file = write_temp(
        r#"
definitions_path = "/opt/traitscope/items.toml"

[logging]
level = "debug"
file = "/tmp/traitscope.log"

[normalizer]
skip_columns = ["Email"]
skip_patterns = ["meta_"]
low_conversion_threshold = 0.9

[calibration]
max_iterations = 50
tolerance = 0.001
use_primary = false

[scoring]
signal = "normalized"
min_completion = 0.75

[clustering]
k = 4
method = "agglomerative"
seed = 7
"#,
    );

    let config = load_toml_config(file.path()).unwrap();
    assert_eq!(config.logging.level, "debug");
    assert_eq!(config.logging.file, Some(PathBuf::from("/tmp/traitscope.log")));
    assert_eq!(config.normalizer.skip_columns, vec!["Email".to_string()]);
    assert_eq!(config.normalizer.low_conversion_threshold, 0.9);
    assert_eq!(config.calibration.max_iterations, 50);
    assert!(!config.calibration.use_primary);
    assert_eq!(config.calibration.max_score, 4);
    assert_eq!(config.scoring.signal, SignalSource::Normalized);
    assert_eq!(config.scoring.min_completion, 0.75);
    assert_eq!(config.clustering.k, 4);
    assert_eq!(config.clustering.method, ClusterMethod::Agglomerative);
    assert_eq!(config.clustering.seed, 7);
    assert_eq!(
        config.definitions_path,
        Some(PathBuf::from("/opt/traitscope/items.toml"))
    );
}

#[test]
fn test_load_missing_file_is_not_found() {
    let result = load_toml_config(&PathBuf::from("/nonexistent/traitscope/config.toml"));
    assert!(matches!(result, Err(Error::NotFound(_))));
}

#[test]
fn test_load_malformed_file_is_parse_error() {
    let file = write_temp("[clustering\nk = ");
    assert!(matches!(load_toml_config(file.path()), Err(Error::Parse(_))));
}

#[test]
fn test_load_out_of_range_is_config_error() {
    let file = write_temp("[scoring]\nmin_completion = 1.5\n");
    assert!(matches!(load_toml_config(file.path()), Err(Error::Config(_))));
}

#[test]
#[serial]
fn test_cli_path_takes_priority_over_env() {
    let cli_file = write_temp("[clustering]\nk = 3\n");
    let env_file = write_temp("[clustering]\nk = 6\n");
    env::set_var(CONFIG_ENV_VAR, env_file.path());

    let resolved = ConfigResolver::new(Some(cli_file.path().to_path_buf()))
        .resolve()
        .unwrap();

    env::remove_var(CONFIG_ENV_VAR);

    assert_eq!(resolved.source, ConfigSource::CommandLine);
    assert_eq!(resolved.config.clustering.k, 3);
    assert!(!resolved.missing);
}

#[test]
#[serial]
fn test_env_var_used_without_cli() {
    let env_file = write_temp("[clustering]\nk = 6\n");
    env::set_var(CONFIG_ENV_VAR, env_file.path());

    let resolved = ConfigResolver::new(None).resolve().unwrap();

    env::remove_var(CONFIG_ENV_VAR);

    assert_eq!(resolved.source, ConfigSource::Environment);
    assert_eq!(resolved.config.clustering.k, 6);
}

#[test]
#[serial]
fn test_missing_cli_file_falls_back_to_defaults() {
    env::remove_var(CONFIG_ENV_VAR);
    let dir = TempDir::new().unwrap();
    let missing = dir.path().join("absent.toml");

    let resolved = ConfigResolver::new(Some(missing.clone())).resolve().unwrap();

    assert_eq!(resolved.source, ConfigSource::CommandLine);
    assert!(resolved.missing);
    assert_eq!(resolved.path, Some(missing));
    assert_eq!(resolved.config.clustering.k, TomlConfig::default().clustering.k);
}

#[test]
#[serial]
fn test_custom_env_var_name() {
    let env_file = write_temp("[logging]\nlevel = \"trace\"\n");
    env::set_var("TRAITSCOPE_TEST_CONFIG", env_file.path());

    let resolved = ConfigResolver::new(None)
        .with_env_var("TRAITSCOPE_TEST_CONFIG")
        .resolve()
        .unwrap();

    env::remove_var("TRAITSCOPE_TEST_CONFIG");

    assert_eq!(resolved.source, ConfigSource::Environment);
    assert_eq!(resolved.config.logging.level, "trace");
}

#[test]
fn test_malformed_cli_file_is_error() {
    let file = write_temp("not = [valid");
    let result = ConfigResolver::new(Some(file.path().to_path_buf())).resolve();
    assert!(result.is_err());
}

#[test]
fn test_external_definition_file() {
    let file = write_temp(
        r#"
[reverse_scored]
version = "2"
items = ["I avoid risk"]

[[items]]
question = "I take risks"
traits = ["RT"]

[[items]]
question = "I avoid risk"
traits = ["RT", "DM"]
"#,
    );

    let set = DefinitionSet::load(file.path()).unwrap();
    assert_eq!(set.traits.len(), 2);
    assert_eq!(set.reverse_scored.version, "2");
    assert!(set.reverse_scored.contains("I avoid risk"));
    assert_eq!(
        set.traits.traits_covered(),
        vec![Trait::RiskTaking, Trait::DecisionMaking]
    );
}

#[test]
fn test_load_or_embedded_without_path() {
    let set = DefinitionSet::load_or_embedded(None).unwrap();
    assert!(!set.traits.is_empty());
    assert!(!set.reverse_scored.is_empty());
}

#[test]
fn test_missing_definition_file_is_not_found() {
    let result = DefinitionSet::load(&PathBuf::from("/nonexistent/items.toml"));
    assert!(matches!(result, Err(Error::NotFound(_))));
}
