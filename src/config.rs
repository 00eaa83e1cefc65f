//! Configuration management for Mindful Social
//!
//! This module handles loading, parsing, validating, and managing
//! configuration from files, environment variables, and CLI overrides.

use crate::error::{MindfulError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Chat-completions generation service
    #[serde(default)]
    pub generation: GenerationConfig,
    /// Link resolution for suggested actions
    #[serde(default)]
    pub links: LinksConfig,
    /// Tracker cadences and host timeouts
    #[serde(default)]
    pub tracker: TrackerConfig,
    /// Durable store location
    #[serde(default)]
    pub storage: StorageConfig,
    /// Log output
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Generation service configuration
///
/// `proxy` posts to a thin proxy that holds the credentials and picks the
/// model; `direct` talks to an OpenAI-compatible endpoint with a bearer key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationConfig {
    /// Connection mode: `proxy` or `direct`
    #[serde(rename = "type", default = "default_generation_type")]
    pub provider_type: String,

    /// Full URL of the chat-completions endpoint (or proxy)
    #[serde(default = "default_generation_endpoint")]
    pub endpoint: String,

    #[serde(default = "default_generation_model")]
    pub model: String,

    /// Bearer token, required in `direct` mode
    #[serde(default)]
    pub api_key: Option<String>,

    /// Per-call deadline; a timeout falls back like any other failure
    #[serde(default = "default_generation_timeout")]
    pub timeout_seconds: u64,

    /// Tone requested from the coaching prompt
    #[serde(default = "default_tone")]
    pub tone: String,

    #[serde(default = "default_coaching_max_tokens")]
    pub coaching_max_tokens: u32,

    #[serde(default = "default_coaching_temperature")]
    pub coaching_temperature: f32,

    #[serde(default = "default_actions_max_tokens")]
    pub actions_max_tokens: u32,

    #[serde(default)]
    pub actions_temperature: f32,
}

fn default_generation_type() -> String {
    "proxy".to_string()
}

fn default_generation_endpoint() -> String {
    "http://localhost:3000/api/huggingface-proxy".to_string()
}

fn default_generation_model() -> String {
    "openai/gpt-oss-120b:groq".to_string()
}

fn default_generation_timeout() -> u64 {
    20
}

fn default_tone() -> String {
    "warm but firm".to_string()
}

fn default_coaching_max_tokens() -> u32 {
    150
}

fn default_coaching_temperature() -> f32 {
    0.7
}

fn default_actions_max_tokens() -> u32 {
    750
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            provider_type: default_generation_type(),
            endpoint: default_generation_endpoint(),
            model: default_generation_model(),
            api_key: None,
            timeout_seconds: default_generation_timeout(),
            tone: default_tone(),
            coaching_max_tokens: default_coaching_max_tokens(),
            coaching_temperature: default_coaching_temperature(),
            actions_max_tokens: default_actions_max_tokens(),
            actions_temperature: 0.0,
        }
    }
}

impl GenerationConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

/// Link resolution configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinksConfig {
    /// `instant_answer` queries the instant-answer endpoint first;
    /// `search` always links to a web search
    #[serde(default = "default_resolver")]
    pub resolver: String,

    #[serde(default = "default_instant_answer_endpoint")]
    pub instant_answer_endpoint: String,

    /// Base URL of the fallback web search (query goes in `q`)
    #[serde(default = "default_search_base")]
    pub search_base: String,

    #[serde(default = "default_links_timeout")]
    pub timeout_seconds: u64,
}

fn default_resolver() -> String {
    "instant_answer".to_string()
}

fn default_instant_answer_endpoint() -> String {
    "https://api.duckduckgo.com/".to_string()
}

fn default_search_base() -> String {
    "https://www.google.com/search".to_string()
}

fn default_links_timeout() -> u64 {
    5
}

impl Default for LinksConfig {
    fn default() -> Self {
        Self {
            resolver: default_resolver(),
            instant_answer_endpoint: default_instant_answer_endpoint(),
            search_base: default_search_base(),
            timeout_seconds: default_links_timeout(),
        }
    }
}

/// Tracker cadences
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackerConfig {
    /// Incremental-save ticker period
    #[serde(default = "default_tick_interval")]
    pub tick_interval_seconds: u64,

    /// Active-tab poll period
    #[serde(default = "default_recheck_interval")]
    pub recheck_interval_seconds: u64,

    /// Wait after re-injecting the page listener before re-probing
    #[serde(default = "default_settle_millis")]
    pub injection_settle_millis: u64,

    /// Deadline for each browser host request
    #[serde(default = "default_host_timeout_millis")]
    pub host_request_timeout_millis: u64,
}

fn default_tick_interval() -> u64 {
    30
}

fn default_recheck_interval() -> u64 {
    5
}

fn default_settle_millis() -> u64 {
    1000
}

fn default_host_timeout_millis() -> u64 {
    5000
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            tick_interval_seconds: default_tick_interval(),
            recheck_interval_seconds: default_recheck_interval(),
            injection_settle_millis: default_settle_millis(),
            host_request_timeout_millis: default_host_timeout_millis(),
        }
    }
}

impl TrackerConfig {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_secs(self.tick_interval_seconds)
    }

    pub fn recheck_interval(&self) -> Duration {
        Duration::from_secs(self.recheck_interval_seconds)
    }

    pub fn injection_settle(&self) -> Duration {
        Duration::from_millis(self.injection_settle_millis)
    }

    pub fn host_request_timeout(&self) -> Duration {
        Duration::from_millis(self.host_request_timeout_millis)
    }
}

/// Durable store location
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Database directory; defaults to the platform data directory
    #[serde(default)]
    pub path: Option<PathBuf>,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Emit JSON lines instead of human-readable output
    #[serde(default)]
    pub json_format: bool,

    /// Also append logs to this file
    #[serde(default)]
    pub file_path: Option<String>,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json_format: false,
            file_path: None,
        }
    }
}

impl Config {
    /// Load configuration from file with environment and CLI overrides
    ///
    /// # Arguments
    ///
    /// * `path` - Path to configuration file
    /// * `cli` - CLI arguments for overrides
    ///
    /// # Errors
    ///
    /// Returns error if the file exists but cannot be read or parsed
    pub fn load(path: &str, cli: &crate::cli::Cli) -> Result<Self> {
        let mut config = if Path::new(path).exists() {
            Self::from_file(path)?
        } else {
            tracing::warn!("Config file not found at {}, using defaults", path);
            Self::default()
        };

        config.apply_env_vars();
        config.apply_cli_overrides(cli);

        Ok(config)
    }

    fn from_file(path: &str) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| MindfulError::Config(format!("Failed to read config file: {}", e)))?;
        serde_yaml::from_str(&contents)
            .map_err(|e| MindfulError::Config(format!("Failed to parse config: {}", e)).into())
    }

    fn apply_env_vars(&mut self) {
        if let Ok(kind) = std::env::var("MINDFUL_GENERATION_TYPE") {
            self.generation.provider_type = kind;
        }

        if let Ok(endpoint) = std::env::var("MINDFUL_GENERATION_ENDPOINT") {
            self.generation.endpoint = endpoint;
        }

        if let Ok(model) = std::env::var("MINDFUL_MODEL") {
            self.generation.model = model;
        }

        if let Ok(api_key) = std::env::var("MINDFUL_API_KEY") {
            if !api_key.is_empty() {
                self.generation.api_key = Some(api_key);
            }
        }

        if let Ok(timeout) = std::env::var("MINDFUL_GENERATION_TIMEOUT_SECONDS") {
            if let Ok(value) = timeout.parse() {
                self.generation.timeout_seconds = value;
            } else {
                tracing::warn!("Invalid MINDFUL_GENERATION_TIMEOUT_SECONDS: {}", timeout);
            }
        }

        if let Ok(resolver) = std::env::var("MINDFUL_LINK_RESOLVER") {
            self.links.resolver = resolver;
        }

        if let Ok(tick) = std::env::var("MINDFUL_TICK_INTERVAL_SECONDS") {
            if let Ok(value) = tick.parse() {
                self.tracker.tick_interval_seconds = value;
            } else {
                tracing::warn!("Invalid MINDFUL_TICK_INTERVAL_SECONDS: {}", tick);
            }
        }

        if let Ok(path) = std::env::var("MINDFUL_STORAGE_PATH") {
            if !path.is_empty() {
                self.storage.path = Some(PathBuf::from(path));
            }
        }

        if let Ok(level) = std::env::var("MINDFUL_LOG_LEVEL") {
            self.logging.level = level;
        }

        if let Ok(json) = std::env::var("MINDFUL_LOG_JSON") {
            self.logging.json_format = matches!(json.as_str(), "1" | "true" | "yes");
        }

        if let Ok(file) = std::env::var("MINDFUL_LOG_FILE") {
            if !file.is_empty() {
                self.logging.file_path = Some(file);
            }
        }
    }

    fn apply_cli_overrides(&mut self, cli: &crate::cli::Cli) {
        if cli.verbose {
            self.logging.level = "debug".to_string();
        }

        if let Some(path) = &cli.storage_path {
            self.storage.path = Some(path.clone());
        }
    }

    /// Database directory, falling back to the platform data directory
    pub fn storage_path(&self) -> Result<PathBuf> {
        match &self.storage.path {
            Some(path) => Ok(path.clone()),
            None => crate::storage::default_storage_path(),
        }
    }

    /// Validate the configuration
    ///
    /// # Errors
    ///
    /// Returns `MindfulError::Config` naming the first invalid field
    pub fn validate(&self) -> Result<()> {
        let valid_types = ["proxy", "direct"];
        if !valid_types.contains(&self.generation.provider_type.as_str()) {
            return Err(MindfulError::Config(format!(
                "Invalid generation type: {}. Must be one of: {}",
                self.generation.provider_type,
                valid_types.join(", ")
            ))
            .into());
        }

        validate_url("generation.endpoint", &self.generation.endpoint)?;

        if self.generation.provider_type == "direct"
            && self
                .generation
                .api_key
                .as_deref()
                .map_or(true, |key| key.trim().is_empty())
        {
            return Err(MindfulError::Config(
                "generation.api_key is required when generation.type is direct".to_string(),
            )
            .into());
        }

        if self.generation.model.trim().is_empty() {
            return Err(
                MindfulError::Config("generation.model cannot be empty".to_string()).into(),
            );
        }

        if self.generation.timeout_seconds == 0 {
            return Err(MindfulError::Config(
                "generation.timeout_seconds must be greater than 0".to_string(),
            )
            .into());
        }

        if self.generation.coaching_max_tokens == 0 || self.generation.actions_max_tokens == 0 {
            return Err(MindfulError::Config(
                "generation max tokens must be greater than 0".to_string(),
            )
            .into());
        }

        for (name, value) in [
            ("coaching_temperature", self.generation.coaching_temperature),
            ("actions_temperature", self.generation.actions_temperature),
        ] {
            if !(0.0..=2.0).contains(&value) {
                return Err(MindfulError::Config(format!(
                    "generation.{} must be between 0.0 and 2.0",
                    name
                ))
                .into());
            }
        }

        let valid_resolvers = ["instant_answer", "search"];
        if !valid_resolvers.contains(&self.links.resolver.as_str()) {
            return Err(MindfulError::Config(format!(
                "Invalid links.resolver: {}. Must be one of: {}",
                self.links.resolver,
                valid_resolvers.join(", ")
            ))
            .into());
        }

        validate_url("links.instant_answer_endpoint", &self.links.instant_answer_endpoint)?;
        validate_url("links.search_base", &self.links.search_base)?;

        if self.links.timeout_seconds == 0 {
            return Err(MindfulError::Config(
                "links.timeout_seconds must be greater than 0".to_string(),
            )
            .into());
        }

        if self.tracker.tick_interval_seconds == 0 || self.tracker.recheck_interval_seconds == 0 {
            return Err(MindfulError::Config(
                "tracker intervals must be greater than 0".to_string(),
            )
            .into());
        }

        if self.tracker.host_request_timeout_millis == 0 {
            return Err(MindfulError::Config(
                "tracker.host_request_timeout_millis must be greater than 0".to_string(),
            )
            .into());
        }

        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.to_lowercase().as_str()) {
            return Err(MindfulError::Config(format!(
                "Invalid logging.level: {}. Must be one of: {}",
                self.logging.level,
                valid_levels.join(", ")
            ))
            .into());
        }

        Ok(())
    }
}

fn validate_url(field: &str, value: &str) -> Result<()> {
    let parsed = url::Url::parse(value)
        .map_err(|e| MindfulError::Config(format!("{} is not a valid URL: {}", field, e)))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(MindfulError::Config(format!("{} must use http or https", field)).into());
    }
    Ok(())
}
