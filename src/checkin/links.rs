//! Link resolution for suggested actions
//!
//! A [`LinkResolver`] turns a search query into a URL and never fails: any
//! lookup error degrades to a canonical web-search URL for the same query.

use crate::config::LinksConfig;
use crate::error::{MindfulError, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;

/// Resolves a search query to a single http(s) URL
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LinkResolver: Send + Sync {
    async fn resolve(&self, query: &str) -> String;
}

/// Canonical web-search URL for a query
///
/// # Examples
///
/// ```
/// use mindful_social::checkin::links::search_url;
///
/// assert_eq!(
///     search_url("https://www.google.com/search", "rust book"),
///     "https://www.google.com/search?q=rust+book"
/// );
/// ```
pub fn search_url(search_base: &str, query: &str) -> String {
    match url::Url::parse_with_params(search_base, &[("q", query)]) {
        Ok(url) => url.to_string(),
        Err(_) => format!(
            "https://www.google.com/search?q={}",
            url::form_urlencoded::byte_serialize(query.as_bytes()).collect::<String>()
        ),
    }
}

/// Whether a string starts with an http or https scheme
pub fn is_http_url(candidate: &str) -> bool {
    let lower = candidate.trim_start().to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}

/// Give a user-supplied link a scheme if it lacks one
///
/// # Examples
///
/// ```
/// use mindful_social::checkin::links::normalize_url;
///
/// assert_eq!(normalize_url("duolingo.com"), "https://duolingo.com");
/// assert_eq!(normalize_url("//example.com/a"), "https://example.com/a");
/// assert_eq!(normalize_url("http://a.b"), "http://a.b");
/// ```
pub fn normalize_url(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.is_empty() || is_http_url(trimmed) {
        return trimmed.to_string();
    }
    format!("https://{}", trimmed.trim_start_matches('/'))
}

/// Always links to a web search for the query
#[derive(Debug, Clone)]
pub struct SearchLinkResolver {
    search_base: String,
}

impl SearchLinkResolver {
    pub fn new(search_base: impl Into<String>) -> Self {
        Self {
            search_base: search_base.into(),
        }
    }
}

#[async_trait]
impl LinkResolver for SearchLinkResolver {
    async fn resolve(&self, query: &str) -> String {
        search_url(&self.search_base, query)
    }
}

/// Instant-answer lookup with a web-search fallback
///
/// Prefers the abstract URL, then the first related topic URL. Anything
/// else, including non-http results, falls back to [`search_url`].
#[derive(Debug, Clone)]
pub struct InstantAnswerResolver {
    client: Client,
    endpoint: String,
    search_base: String,
}

#[derive(Debug, Default, Deserialize)]
struct InstantAnswer {
    #[serde(rename = "AbstractURL", default)]
    abstract_url: String,
    #[serde(rename = "RelatedTopics", default)]
    related_topics: Vec<RelatedTopic>,
}

#[derive(Debug, Default, Deserialize)]
struct RelatedTopic {
    #[serde(rename = "FirstURL", default)]
    first_url: Option<String>,
}

impl InstantAnswerResolver {
    /// # Errors
    ///
    /// Returns error if the HTTP client cannot be built
    pub fn new(
        endpoint: impl Into<String>,
        search_base: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("mindful-social/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| MindfulError::Provider(format!("Failed to create HTTP client: {}", e)))?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
            search_base: search_base.into(),
        })
    }

    async fn lookup(&self, query: &str) -> Result<Option<String>> {
        let response = self
            .client
            .get(&self.endpoint)
            .query(&[
                ("q", query),
                ("format", "json"),
                ("no_html", "1"),
                ("skip_disambig", "1"),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(MindfulError::Provider(format!(
                "Instant-answer lookup returned {}",
                status
            ))
            .into());
        }

        let answer: InstantAnswer = response.json().await?;
        if !answer.abstract_url.is_empty() {
            return Ok(Some(answer.abstract_url));
        }
        Ok(answer
            .related_topics
            .into_iter()
            .next()
            .and_then(|topic| topic.first_url)
            .filter(|url| !url.is_empty()))
    }
}

#[async_trait]
impl LinkResolver for InstantAnswerResolver {
    async fn resolve(&self, query: &str) -> String {
        match self.lookup(query).await {
            Ok(Some(url)) if is_http_url(&url) => {
                tracing::debug!("Resolved {:?} to {}", query, url);
                url
            }
            Ok(_) => {
                tracing::debug!("No direct result for {:?}, using web search", query);
                search_url(&self.search_base, query)
            }
            Err(e) => {
                tracing::warn!("Link lookup failed for {:?}: {}", query, e);
                search_url(&self.search_base, query)
            }
        }
    }
}

/// Create the configured link resolver
///
/// # Errors
///
/// Returns error if the resolver kind is unknown or its client fails to build
pub fn create_link_resolver(config: &LinksConfig) -> Result<Arc<dyn LinkResolver>> {
    match config.resolver.as_str() {
        "instant_answer" => Ok(Arc::new(InstantAnswerResolver::new(
            config.instant_answer_endpoint.clone(),
            config.search_base.clone(),
            Duration::from_secs(config.timeout_seconds),
        )?)),
        "search" => Ok(Arc::new(SearchLinkResolver::new(config.search_base.clone()))),
        other => Err(MindfulError::Config(format!("Unknown link resolver: {}", other)).into()),
    }
}
