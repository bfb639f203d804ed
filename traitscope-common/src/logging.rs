//! Tracing subscriber initialization
//!
//! Filter precedence: `RUST_LOG` → `[logging] level` → `info`.
//! Output goes to stderr, or to `[logging] file` (no ANSI colors) when set.

use crate::config::LoggingConfig;
use crate::{Error, Result};
use std::fs::OpenOptions;
use std::sync::Mutex;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Filter directive used when neither `RUST_LOG` nor the config gives a usable one
pub const DEFAULT_DIRECTIVE: &str = "info";

/// Pick the filter directive from `RUST_LOG` (if set) or the configured level
pub fn filter_directive(config: &LoggingConfig, rust_log: Option<&str>) -> String {
    if let Some(env) = rust_log.map(str::trim).filter(|s| !s.is_empty()) {
        return env.to_string();
    }
    let level = config.level.trim();
    if level.is_empty() {
        DEFAULT_DIRECTIVE.to_string()
    } else {
        level.to_lowercase()
    }
}

/// Install the global tracing subscriber
///
/// # Errors
///
/// Returns [`Error::Io`] if the log file cannot be opened and
/// [`Error::Internal`] if a global subscriber is already installed.
pub fn init_tracing(config: &LoggingConfig) -> Result<()> {
    let rust_log = std::env::var("RUST_LOG").ok();
    let directive = filter_directive(config, rust_log.as_deref());
    let filter = EnvFilter::try_new(&directive).unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVE));

    match &config.file {
        Some(path) => {
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            tracing_subscriber::registry()
                .with(filter)
                .with(
                    tracing_subscriber::fmt::layer()
                        .with_ansi(false)
                        .with_writer(Mutex::new(file)),
                )
                .try_init()
                .map_err(|e| Error::Internal(format!("tracing init failed: {}", e)))
        }
        None => tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .try_init()
            .map_err(|e| Error::Internal(format!("tracing init failed: {}", e))),
    }
}
