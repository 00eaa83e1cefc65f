//! Provider module for Mindful Social
//!
//! This module contains the text-generation provider abstraction and the
//! chat-completions implementation used for coaching and action suggestions.

pub mod base;
pub mod chat_completions;

pub use base::{CompletionOptions, CompletionResponse, Message, Provider, TokenUsage};
pub use chat_completions::{ChatCompletionsProvider, ConnectionMode};

#[cfg(test)]
pub use base::MockProvider;

use crate::config::GenerationConfig;
use crate::error::{MindfulError, Result};

/// Create a provider instance based on configuration
///
/// # Errors
///
/// Returns error if the generation type is unknown or initialization fails
pub fn create_provider(config: &GenerationConfig) -> Result<Box<dyn Provider>> {
    match config.provider_type.as_str() {
        "proxy" | "direct" => Ok(Box::new(ChatCompletionsProvider::new(config)?)),
        other => Err(MindfulError::Provider(format!("Unknown provider type: {}", other)).into()),
    }
}
