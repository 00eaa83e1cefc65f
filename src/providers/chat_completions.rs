//! OpenAI-compatible chat-completions provider
//!
//! Two connection modes share the same wire format:
//!
//! - `proxy`: the request carries only messages and sampling options; the
//!   proxy owns the credentials and chooses the model.
//! - `direct`: the request names the model and is authorized with a bearer
//!   key.

use crate::config::GenerationConfig;
use crate::error::{MindfulError, Result};
use crate::providers::{CompletionOptions, CompletionResponse, Message, Provider, TokenUsage};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

/// How requests reach the chat-completions service
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionMode {
    Proxy,
    Direct { model: String, api_key: String },
}

/// Chat-completions provider over HTTP
#[derive(Debug, Clone)]
pub struct ChatCompletionsProvider {
    client: Client,
    endpoint: String,
    mode: ConnectionMode,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    model: Option<&'a str>,
    messages: &'a [Message],
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
    #[serde(default)]
    usage: Option<ChatUsage>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    #[serde(default)]
    role: Option<String>,
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatUsage {
    #[serde(default)]
    prompt_tokens: usize,
    #[serde(default)]
    completion_tokens: usize,
}

impl ChatCompletionsProvider {
    /// Create a provider from generation configuration
    ///
    /// # Errors
    ///
    /// Returns error if the mode is unknown, `direct` mode has no API key,
    /// or the HTTP client cannot be built
    ///
    /// # Examples
    ///
    /// ```
    /// use mindful_social::config::GenerationConfig;
    /// use mindful_social::providers::ChatCompletionsProvider;
    ///
    /// let provider = ChatCompletionsProvider::new(&GenerationConfig::default());
    /// assert!(provider.is_ok());
    /// ```
    pub fn new(config: &GenerationConfig) -> Result<Self> {
        let mode = match config.provider_type.as_str() {
            "proxy" => ConnectionMode::Proxy,
            "direct" => {
                let api_key = config
                    .api_key
                    .clone()
                    .filter(|key| !key.trim().is_empty())
                    .ok_or_else(|| {
                        MindfulError::Provider("Direct mode requires an API key".to_string())
                    })?;
                ConnectionMode::Direct {
                    model: config.model.clone(),
                    api_key,
                }
            }
            other => {
                return Err(
                    MindfulError::Provider(format!("Unknown generation type: {}", other)).into(),
                )
            }
        };

        let client = Client::builder()
            .timeout(config.timeout())
            .user_agent(concat!("mindful-social/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| MindfulError::Provider(format!("Failed to create HTTP client: {}", e)))?;

        tracing::info!(
            "Initialized chat-completions provider: endpoint={}, mode={}",
            config.endpoint,
            config.provider_type
        );

        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            mode,
        })
    }
}

#[async_trait]
impl Provider for ChatCompletionsProvider {
    fn name(&self) -> &str {
        match self.mode {
            ConnectionMode::Proxy => "proxy",
            ConnectionMode::Direct { .. } => "direct",
        }
    }

    async fn complete(
        &self,
        messages: &[Message],
        options: CompletionOptions,
    ) -> Result<CompletionResponse> {
        let request = ChatRequest {
            model: match &self.mode {
                ConnectionMode::Proxy => None,
                ConnectionMode::Direct { model, .. } => Some(model.as_str()),
            },
            messages,
            max_tokens: options.max_tokens,
            temperature: options.temperature,
        };

        tracing::debug!(
            "Sending chat-completions request: {} messages, max_tokens={}",
            messages.len(),
            options.max_tokens
        );

        let mut builder = self.client.post(&self.endpoint).json(&request);
        if let ConnectionMode::Direct { api_key, .. } = &self.mode {
            builder = builder.bearer_auth(api_key);
        }

        let response = builder.send().await.map_err(|e| {
            tracing::error!("Chat-completions request failed: {}", e);
            MindfulError::Provider(format!("Chat-completions request failed: {}", e))
        })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            tracing::error!("Generation service returned error {}: {}", status, error_text);
            return Err(MindfulError::Provider(format!(
                "Generation service returned error {}: {}",
                status, error_text
            ))
            .into());
        }

        let body: ChatResponse = response.json().await.map_err(|e| {
            tracing::error!("Failed to parse chat-completions response: {}", e);
            MindfulError::Provider(format!("Failed to parse chat-completions response: {}", e))
        })?;

        let choice = body.choices.into_iter().next().ok_or_else(|| {
            MindfulError::Provider("Chat-completions response had no choices".to_string())
        })?;

        let message = Message {
            role: choice
                .message
                .role
                .unwrap_or_else(|| "assistant".to_string()),
            content: choice.message.content.unwrap_or_default(),
        };

        Ok(match body.usage {
            Some(usage) => CompletionResponse::with_usage(
                message,
                TokenUsage::new(usage.prompt_tokens, usage.completion_tokens),
            ),
            None => CompletionResponse::new(message),
        })
    }
}
