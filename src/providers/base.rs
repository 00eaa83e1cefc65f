//! Base provider trait and common types
//!
//! This module defines the Provider trait that text-generation backends
//! implement, along with the message, option, and response types shared by
//! every backend.

use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Message structure for a chat-completions conversation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Role of the message sender (system, user, assistant)
    pub role: String,
    /// Content of the message
    #[serde(default)]
    pub content: String,
}

impl Message {
    /// Creates a new user message
    ///
    /// # Examples
    ///
    /// ```
    /// use mindful_social::providers::Message;
    ///
    /// let msg = Message::user("Hello, assistant!");
    /// assert_eq!(msg.role, "user");
    /// ```
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }

    /// Creates a new assistant message
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: "assistant".to_string(),
            content: content.into(),
        }
    }

    /// Creates a new system message
    ///
    /// # Examples
    ///
    /// ```
    /// use mindful_social::providers::Message;
    ///
    /// let msg = Message::system("You are a mindful coach");
    /// assert_eq!(msg.role, "system");
    /// ```
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }
}

/// Sampling options for a single completion
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CompletionOptions {
    pub max_tokens: u32,
    pub temperature: f32,
}

impl CompletionOptions {
    pub fn new(max_tokens: u32, temperature: f32) -> Self {
        Self {
            max_tokens,
            temperature,
        }
    }
}

/// Token usage information from a completion
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    /// Number of tokens in the prompt
    pub prompt_tokens: usize,
    /// Number of tokens in the completion
    pub completion_tokens: usize,
    /// Total tokens used (prompt + completion)
    pub total_tokens: usize,
}

impl TokenUsage {
    /// Create a new TokenUsage instance
    ///
    /// # Examples
    ///
    /// ```
    /// use mindful_social::providers::TokenUsage;
    ///
    /// let usage = TokenUsage::new(100, 50);
    /// assert_eq!(usage.total_tokens, 150);
    /// ```
    pub fn new(prompt_tokens: usize, completion_tokens: usize) -> Self {
        Self {
            prompt_tokens,
            completion_tokens,
            total_tokens: prompt_tokens + completion_tokens,
        }
    }
}

/// Completion response with message and optional token usage
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionResponse {
    /// The response message from the model
    pub message: Message,
    /// Optional token usage information
    pub usage: Option<TokenUsage>,
}

impl CompletionResponse {
    pub fn new(message: Message) -> Self {
        Self {
            message,
            usage: None,
        }
    }

    pub fn with_usage(message: Message, usage: TokenUsage) -> Self {
        Self {
            message,
            usage: Some(usage),
        }
    }

    /// Text of the first choice
    pub fn text(&self) -> &str {
        &self.message.content
    }
}

/// Provider trait for text-generation backends
///
/// # Examples
///
/// ```no_run
/// use mindful_social::providers::{CompletionOptions, CompletionResponse, Message, Provider};
/// use mindful_social::error::Result;
/// use async_trait::async_trait;
///
/// struct Canned;
///
/// #[async_trait]
/// impl Provider for Canned {
///     fn name(&self) -> &str {
///         "canned"
///     }
///
///     async fn complete(
///         &self,
///         _messages: &[Message],
///         _options: CompletionOptions,
///     ) -> Result<CompletionResponse> {
///         Ok(CompletionResponse::new(Message::assistant("Take a breath.")))
///     }
/// }
/// ```
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Provider: Send + Sync {
    /// Short name for logs
    fn name(&self) -> &str;

    /// Completes a conversation with the given messages
    ///
    /// # Errors
    ///
    /// Returns error if the call fails, times out, or the response is
    /// malformed
    async fn complete(
        &self,
        messages: &[Message],
        options: CompletionOptions,
    ) -> Result<CompletionResponse>;
}
