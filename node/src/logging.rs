//! # Structured Logging
//!
//! One `tracing` subscriber for the whole process: an `EnvFilter` built from
//! `RUST_LOG` (or the `--log` directives when it is unset) feeding a pretty
//! or JSON formatter.
//!
//! Logs always go to stderr. Stdout is reserved for replay outcome lines.

use anyhow::{Context, Result};
use clap::ValueEnum;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Log output format, selected with `--log-format` or `PHOENIX_LOG_FORMAT`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    /// Human-readable lines for interactive runs.
    Pretty,
    /// One JSON object per event, for log collectors.
    Json,
}

/// Installs the global subscriber.
///
/// # Errors
///
/// Fails if the directives do not parse or a subscriber is already set.
pub fn init_logging(directives: &str, format: LogFormat) -> Result<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(directives)
            .with_context(|| format!("invalid log directives {directives:?}"))?,
    };
    let layer = fmt::layer().with_writer(std::io::stderr).with_target(true);
    let registry = tracing_subscriber::registry().with(filter);

    let installed = match format {
        LogFormat::Pretty => registry.with(layer).try_init(),
        LogFormat::Json => registry.with(layer.json()).try_init(),
    };
    installed.context("failed to install the tracing subscriber")?;

    tracing::debug!(?format, "logging initialized");
    Ok(())
}
