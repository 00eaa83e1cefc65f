//! Test utilities for Mindful Social
//!
//! Temporary directories, config fixtures, a fixed clock origin, and error
//! assertions shared by the unit tests.

use crate::config::Config;
use chrono::{DateTime, TimeZone, Utc};
use std::path::PathBuf;
use tempfile::TempDir;

/// Create a temporary directory for testing
pub fn temp_dir() -> TempDir {
    TempDir::new().expect("Failed to create temporary directory")
}

/// Create a test file with the given content
///
/// # Panics
///
/// Panics if file creation or writing fails
pub fn create_test_file(dir: &TempDir, name: &str, content: &str) -> PathBuf {
    let path = dir.path().join(name);
    std::fs::write(&path, content).expect("Failed to write test file");
    path
}

/// Assert that an error's message contains the expected text
///
/// # Panics
///
/// Panics if the result is Ok or the message does not match
pub fn assert_error_contains<T: std::fmt::Debug>(result: anyhow::Result<T>, expected: &str) {
    match result {
        Ok(value) => panic!("Expected error containing '{}', got Ok({:?})", expected, value),
        Err(e) => {
            let message = format!("{:#}", e);
            assert!(
                message.contains(expected),
                "Expected error containing '{}', got '{}'",
                expected,
                message
            );
        }
    }
}

/// A fixed instant used as the origin of test timelines
pub fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 14, 10, 0, 0).unwrap()
}

/// Default config with storage inside `dir`
pub fn test_config(dir: &TempDir) -> Config {
    let mut config = Config::default();
    config.storage.path = Some(dir.path().join("store"));
    config
}

/// A complete configuration file exercising every section
pub fn test_config_yaml() -> String {
    r#"
generation:
  type: direct
  endpoint: https://router.huggingface.co/v1/chat/completions
  model: openai/gpt-oss-120b:groq
  api_key: hf_test
  timeout_seconds: 10
  tone: gentle
links:
  resolver: search
  search_base: https://duckduckgo.com/
tracker:
  tick_interval_seconds: 15
  recheck_interval_seconds: 2
storage:
  path: /tmp/mindful-test-store
logging:
  level: debug
  json_format: true
"#
    .to_string()
}
