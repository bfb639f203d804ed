//! traitscope-engine - command-line entry point
//!
//! `score` runs the full pipeline over a JSON response table and writes the
//! report as JSON. `config` prints the effective configuration as TOML.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing::{info, warn};
use traitscope_common::config::{
    ClusterMethod, ConfigResolver, ResolvedConfig, SignalSource, TomlConfig,
};
use traitscope_common::logging::init_tracing;
use traitscope_common::DefinitionSet;
use traitscope_engine::models::TableInput;
use traitscope_engine::ScoringPipeline;

/// Command-line arguments for traitscope-engine
#[derive(Parser, Debug)]
#[command(name = "traitscope-engine")]
#[command(about = "Psychometric scoring pipeline for Likert-scale assessments")]
#[command(version)]
struct Args {
    /// Config file (TOML); falls back to $TRAITSCOPE_CONFIG
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Score a response table
    Score {
        /// Response table (JSON: columns, rows, optional person_id_column)
        #[arg(short, long)]
        input: PathBuf,

        /// Report destination (stdout if omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Trait definition file (overrides config)
        #[arg(short, long)]
        definitions: Option<PathBuf>,

        /// Number of cohort clusters
        #[arg(short, long)]
        k: Option<usize>,

        /// Clustering method (kmeans, agglomerative)
        #[arg(short, long)]
        method: Option<String>,

        /// Item signal for trait scores (rasch, normalized)
        #[arg(short, long)]
        signal: Option<String>,
    },
    /// Print the effective configuration
    Config,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let resolved = ConfigResolver::new(args.config.clone())
        .resolve()
        .context("Failed to load configuration")?;

    init_tracing(&resolved.config.logging).context("Failed to initialize logging")?;
    report_config_source(&resolved);

    match args.command {
        Command::Score {
            input,
            output,
            definitions,
            k,
            method,
            signal,
        } => {
            let mut config = resolved.config;
            apply_overrides(&mut config, k, method.as_deref(), signal.as_deref())?;
            if definitions.is_some() {
                config.definitions_path = definitions;
            }
            score(config, &input, output.as_deref())
        }
        Command::Config => {
            let text = toml::to_string_pretty(&resolved.config)
                .context("Failed to serialize configuration")?;
            println!("{}", text);
            Ok(())
        }
    }
}

fn report_config_source(resolved: &ResolvedConfig) {
    match (&resolved.path, resolved.missing) {
        (Some(path), true) => warn!(
            source = ?resolved.source,
            path = %path.display(),
            "Config file not found, using compiled defaults"
        ),
        (Some(path), false) => info!(source = ?resolved.source, path = %path.display(), "Loaded config"),
        (None, _) => info!("No config file, using compiled defaults"),
    }
}

fn apply_overrides(
    config: &mut TomlConfig,
    k: Option<usize>,
    method: Option<&str>,
    signal: Option<&str>,
) -> Result<()> {
    if let Some(k) = k {
        config.clustering.k = k;
    }
    if let Some(m) = method {
        config.clustering.method = match ClusterMethod::from_str(m) {
            Some(m) => m,
            None => bail!("Unknown clustering method: {}", m),
        };
    }
    if let Some(s) = signal {
        config.scoring.signal = match SignalSource::from_str(s) {
            Some(s) => s,
            None => bail!("Unknown signal source: {}", s),
        };
    }
    config.validate().context("Invalid option")?;
    Ok(())
}

fn score(config: TomlConfig, input: &Path, output: Option<&Path>) -> Result<()> {
    let definitions = DefinitionSet::load_or_embedded(config.definitions_path.as_deref())
        .context("Failed to load trait definitions")?;

    let content = std::fs::read_to_string(input)
        .with_context(|| format!("Failed to read {}", input.display()))?;
    let table: TableInput = serde_json::from_str(&content)
        .with_context(|| format!("Invalid response table in {}", input.display()))?;
    let table = table.into_raw_table().context("Invalid response table")?;

    let report = ScoringPipeline::new(config, definitions)
        .run(&table)
        .context("Scoring failed")?;

    let json = serde_json::to_string_pretty(&report).context("Failed to serialize report")?;
    match output {
        Some(path) => {
            std::fs::write(path, json)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            info!(path = %path.display(), profiles = report.profiles.len(), "Report written");
        }
        None => println!("{}", json),
    }
    Ok(())
}
