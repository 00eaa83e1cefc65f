//! Check-in content generation
//!
//! Two independent calls produce a check-in: a short coaching message and
//! up to three suggested actions. Neither call ever fails outward. Network
//! errors, error statuses, timeouts, and unparseable output all degrade to
//! deterministic local content.

use crate::checkin::links::{normalize_url, LinkResolver};
use crate::config::GenerationConfig;
use crate::prompts::{fallback_coaching, generate_actions_prompt, generate_coaching_prompt};
use crate::providers::{CompletionOptions, CompletionResponse, Provider};
use crate::storage::{LinkSource, SeedAction, SuggestedAction};
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

/// At most this many actions accompany a check-in
pub const MAX_ACTIONS: usize = 3;

/// Label for an action the model left unlabeled
pub const DEFAULT_ACTION_LABEL: &str = "Take a mindful break";

/// One action as the model (or the fallback table) describes it
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct RawAction {
    #[serde(default)]
    pub label: Option<String>,
    #[serde(rename = "searchQuery", default)]
    pub search_query: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
}

/// Generated check-in content
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckinContent {
    pub coaching: String,
    pub actions: Vec<SuggestedAction>,
}

/// Canned actions used when the model yields nothing usable
///
/// # Examples
///
/// ```
/// use mindful_social::checkin::generator::fallback_actions;
///
/// let actions = fallback_actions("Learn Spanish");
/// assert_eq!(actions.len(), 3);
/// assert_eq!(actions[1].label.as_deref(), Some("Read an article about Learn Spanish"));
/// ```
pub fn fallback_actions(goal: &str) -> Vec<RawAction> {
    vec![
        RawAction {
            label: Some("Take 5 deep breaths".to_string()),
            search_query: Some("breathing exercises 5 minutes".to_string()),
            url: None,
        },
        RawAction {
            label: Some(format!("Read an article about {}", goal)),
            search_query: Some(format!("{} beginner guide", goal)),
            url: None,
        },
        RawAction {
            label: Some("Watch a 5-min educational video".to_string()),
            search_query: Some(format!("{} tutorial youtube", goal)),
            url: None,
        },
    ]
}

/// Find the first well-formed, non-empty JSON array in free text
///
/// Models often wrap the array in commentary or code fences, so every `[`
/// is tried as a starting point until one parses.
///
/// # Examples
///
/// ```
/// use mindful_social::checkin::generator::extract_actions;
///
/// let text = r#"Sure! [see below] ```json [{"label":"Read","searchQuery":"books"}] ```"#;
/// let actions = extract_actions(text).unwrap();
/// assert_eq!(actions[0].label.as_deref(), Some("Read"));
/// assert!(extract_actions("not json").is_none());
/// ```
pub fn extract_actions(content: &str) -> Option<Vec<RawAction>> {
    for (start, _) in content.match_indices('[') {
        let mut stream = serde_json::Deserializer::from_str(&content[start..]).into_iter::<Value>();
        if let Some(Ok(Value::Array(items))) = stream.next() {
            if items.is_empty() {
                return None;
            }
            return Some(items.into_iter().map(raw_action_from_value).collect());
        }
    }
    None
}

fn raw_action_from_value(value: Value) -> RawAction {
    match value {
        Value::String(label) => RawAction {
            label: Some(label),
            ..RawAction::default()
        },
        other => serde_json::from_value(other).unwrap_or_default(),
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Produces coaching text and suggested actions
pub struct CheckinGenerator {
    provider: Arc<dyn Provider>,
    links: Arc<dyn LinkResolver>,
    timeout: Duration,
    tone: String,
    coaching_options: CompletionOptions,
    actions_options: CompletionOptions,
}

impl CheckinGenerator {
    pub fn new(
        provider: Arc<dyn Provider>,
        links: Arc<dyn LinkResolver>,
        config: &GenerationConfig,
    ) -> Self {
        Self {
            provider,
            links,
            timeout: config.timeout(),
            tone: config.tone.clone(),
            coaching_options: CompletionOptions::new(
                config.coaching_max_tokens,
                config.coaching_temperature,
            ),
            actions_options: CompletionOptions::new(
                config.actions_max_tokens,
                config.actions_temperature,
            ),
        }
    }

    /// Override the per-call deadline
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Run both generation calls concurrently and wait for both
    pub async fn generate(&self, goal: &str, site: &str, seeds: &[SeedAction]) -> CheckinContent {
        let (coaching, actions) = tokio::join!(self.coaching(goal, site), self.actions(goal, seeds));
        CheckinContent { coaching, actions }
    }

    /// Coaching message, or the templated fallback
    pub async fn coaching(&self, goal: &str, site: &str) -> String {
        let messages = generate_coaching_prompt(goal, site, &self.tone);
        let call = self.provider.complete(&messages, self.coaching_options);

        match tokio::time::timeout(self.timeout, call).await {
            Ok(Ok(response)) => {
                log_usage("coaching", &response);
                let text = response.text().trim();
                if text.is_empty() {
                    tracing::warn!("Coaching response was empty, using fallback");
                    fallback_coaching(goal)
                } else {
                    text.to_string()
                }
            }
            Ok(Err(e)) => {
                tracing::warn!("Coaching generation failed: {}", e);
                fallback_coaching(goal)
            }
            Err(_) => {
                tracing::warn!("Coaching generation timed out after {:?}", self.timeout);
                fallback_coaching(goal)
            }
        }
    }

    /// Up to three suggested actions, each with a URL
    pub async fn actions(&self, goal: &str, seeds: &[SeedAction]) -> Vec<SuggestedAction> {
        let messages = generate_actions_prompt(goal, seeds);
        let call = self.provider.complete(&messages, self.actions_options);

        let raw = match tokio::time::timeout(self.timeout, call).await {
            Ok(Ok(response)) => {
                log_usage("actions", &response);
                extract_actions(response.text()).unwrap_or_else(|| {
                    tracing::warn!("Actions response had no usable JSON array, using fallback");
                    fallback_actions(goal)
                })
            }
            Ok(Err(e)) => {
                tracing::warn!("Actions generation failed: {}", e);
                fallback_actions(goal)
            }
            Err(_) => {
                tracing::warn!("Actions generation timed out after {:?}", self.timeout);
                fallback_actions(goal)
            }
        };

        self.resolve(raw, goal).await
    }

    async fn resolve(&self, raw: Vec<RawAction>, goal: &str) -> Vec<SuggestedAction> {
        let resolved = raw
            .into_iter()
            .take(MAX_ACTIONS)
            .map(|action| self.resolve_one(action, goal));
        futures::future::join_all(resolved).await
    }

    async fn resolve_one(&self, action: RawAction, goal: &str) -> SuggestedAction {
        let label = non_empty(action.label);
        let search_query = non_empty(action.search_query)
            .or_else(|| label.clone())
            .unwrap_or_else(|| goal.to_string());
        let label = label.unwrap_or_else(|| DEFAULT_ACTION_LABEL.to_string());

        match non_empty(action.url) {
            Some(url) => SuggestedAction {
                label,
                search_query,
                url: normalize_url(&url),
                source: LinkSource::UserProvided,
            },
            None => {
                let url = self.links.resolve(&search_query).await;
                SuggestedAction {
                    label,
                    search_query,
                    url,
                    source: LinkSource::AutoSearched,
                }
            }
        }
    }
}

fn log_usage(call: &str, response: &CompletionResponse) {
    if let Some(usage) = &response.usage {
        tracing::debug!(
            call,
            prompt_tokens = usage.prompt_tokens,
            completion_tokens = usage.completion_tokens,
            total_tokens = usage.total_tokens,
            "Generation token usage"
        );
    }
}
