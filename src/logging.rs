//! Tracing subscriber setup
//!
//! Logs go to stderr so the `resolve` command keeps stdout for its answer.
//! `RUST_LOG`, when set, replaces the configured level.

use anyhow::{Context, Result};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::Layer;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use crate::config::LoggingConfig;

/// Install the global subscriber described by `config`
pub fn init(config: &LoggingConfig) -> Result<()> {
    let filter = build_filter(&config.level, std::env::var(EnvFilter::DEFAULT_ENV).ok())?;

    let registry = tracing_subscriber::registry();
    if config.format == "json" {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr)
                    .with_filter(filter),
            )
            .try_init()
            .context("Failed to install JSON log subscriber")?;
    } else {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_filter(filter),
            )
            .try_init()
            .context("Failed to install log subscriber")?;
    }

    tracing::debug!("Logging initialized ({} / {})", config.level, config.format);
    Ok(())
}

fn build_filter(level: &str, directives: Option<String>) -> Result<EnvFilter> {
    match directives.filter(|d| !d.trim().is_empty()) {
        Some(directives) => EnvFilter::try_new(&directives)
            .with_context(|| format!("Invalid RUST_LOG directives: {directives}")),
        None => EnvFilter::try_new(level).with_context(|| format!("Invalid log level: {level}")),
    }
}
