//! Structured logging setup
//!
//! Logs always go to stderr: when the browser launches the host, stdout
//! carries native messaging frames and must stay clean. JSON or
//! human-readable output, with an optional append-only file copy.

use crate::config::LoggingConfig;
use anyhow::Result;
use std::fs::OpenOptions;
use std::sync::Arc;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Filter directive for a configured level
///
/// # Examples
///
/// ```
/// use mindful_social::logging::filter_directive;
///
/// assert_eq!(filter_directive("DEBUG"), "mindful_social=debug");
/// ```
pub fn filter_directive(level: &str) -> String {
    format!("mindful_social={}", level.to_lowercase())
}

/// Initialize logging based on configuration
///
/// `RUST_LOG` overrides the configured level when set.
///
/// # Errors
///
/// Returns error if the level is not a valid filter, the log file cannot
/// be opened, or a global subscriber is already installed
///
/// # Examples
///
/// ```no_run
/// use mindful_social::config::LoggingConfig;
/// use mindful_social::logging::init_logging;
///
/// let config = LoggingConfig {
///     level: "info".to_string(),
///     json_format: true,
///     file_path: None,
/// };
///
/// init_logging(&config).unwrap();
/// ```
pub fn init_logging(config: &LoggingConfig) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(filter_directive(&config.level)))?;

    let registry = tracing_subscriber::registry().with(env_filter);

    if config.json_format {
        let stderr_layer = fmt::layer()
            .json()
            .with_current_span(true)
            .with_writer(std::io::stderr);

        if let Some(file_path) = &config.file_path {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(file_path)?;

            let file_layer = fmt::layer()
                .json()
                .with_current_span(true)
                .with_writer(Arc::new(file));

            registry.with(stderr_layer).with(file_layer).try_init()?;
        } else {
            registry.with(stderr_layer).try_init()?;
        }
    } else {
        let stderr_layer = fmt::layer()
            .with_target(true)
            .with_level(true)
            .with_writer(std::io::stderr);

        if let Some(file_path) = &config.file_path {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(file_path)?;

            let file_layer = fmt::layer()
                .with_target(true)
                .with_level(true)
                .with_ansi(false)
                .with_writer(Arc::new(file));

            registry.with(stderr_layer).with(file_layer).try_init()?;
        } else {
            registry.with(stderr_layer).try_init()?;
        }
    }

    Ok(())
}
