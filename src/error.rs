//! Error types for Mindful Social
//!
//! This module defines all error types used throughout the application,
//! using `thiserror` for ergonomic error handling.

use thiserror::Error;

/// Main error type for Mindful Social operations
///
/// Covers configuration loading, durable storage, the generation service,
/// the browser host channel and user input validation.
#[derive(Error, Debug)]
pub enum MindfulError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Durable key-value store errors
    #[error("Storage error: {0}")]
    Storage(String),

    /// Generation service errors (network, status, malformed responses)
    #[error("Provider error: {0}")]
    Provider(String),

    /// Browser host channel errors (timeouts, closed channel, host-side failures)
    #[error("Host error: {0}")]
    Host(String),

    /// Rejected user input (goal labels, action URLs, settings values)
    #[error("Validation error: {0}")]
    Validation(String),

    /// Host request exceeded its deadline
    #[error("Host request '{method}' timed out after {timeout_ms}ms")]
    HostTimeout {
        /// The request method that timed out
        method: String,
        /// Configured deadline in milliseconds
        timeout_ms: u64,
    },

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// YAML parsing errors
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// HTTP request errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Result type alias for Mindful Social operations
///
/// This is a convenience alias that uses `anyhow::Error` as the error type,
/// allowing for rich error context and easy error propagation.
pub type Result<T> = anyhow::Result<T>;
