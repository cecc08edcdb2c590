//! Tavily search API provider.
//!
//! Tavily API: https://docs.tavily.com/documentation/api-reference/endpoint/search

use crate::provider::SearchProvider;
use crag_core::config::SearchSettings;
use crag_core::{retry_transient, AppError, AppResult, RetryPolicy};
use reqwest::header::AUTHORIZATION;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Tavily API request format.
#[derive(Debug, Serialize)]
struct TavilyRequest<'a> {
    query: &'a str,
    max_results: usize,
}

/// Tavily API response format.
#[derive(Debug, Deserialize)]
struct TavilyResponse {
    #[serde(default)]
    results: Vec<TavilyResult>,
}

#[derive(Debug, Deserialize)]
struct TavilyResult {
    #[serde(default)]
    content: String,
}

/// Tavily web search client.
pub struct TavilySearch {
    endpoint: String,
    api_key: String,
    client: reqwest::Client,
    retry: RetryPolicy,
}

impl TavilySearch {
    /// Create a client for `endpoint` authenticating with `api_key`.
    pub fn new(endpoint: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            api_key: api_key.into(),
            client: reqwest::Client::new(),
            retry: RetryPolicy::default(),
        }
    }

    /// Create a client from configuration.
    pub fn from_settings(
        settings: &SearchSettings,
        api_key: impl Into<String>,
        timeout: Duration,
        retry: RetryPolicy,
    ) -> AppResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            endpoint: settings.endpoint.clone(),
            api_key: api_key.into(),
            client,
            retry,
        })
    }

    /// Retry policy for transient failures.
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    async fn request_once(&self, query: &str, k: usize) -> AppResult<Vec<String>> {
        let response = self
            .client
            .post(&self.endpoint)
            .header(AUTHORIZATION, format!("Bearer {}", self.api_key))
            .json(&TavilyRequest {
                query,
                max_results: k,
            })
            .send()
            .await
            .map_err(|e| AppError::UpstreamUnavailable(format!("Search request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = format!("Tavily API error ({}): {}", status, body);
            return Err(if status.is_server_error() || status.as_u16() == 429 {
                AppError::UpstreamUnavailable(message)
            } else {
                AppError::Search(message)
            });
        }

        let parsed: TavilyResponse = response.json().await.map_err(|e| {
            AppError::UpstreamUnavailable(format!("Failed to read search response: {}", e))
        })?;

        Ok(parsed
            .results
            .into_iter()
            .map(|r| r.content)
            .take(k)
            .collect())
    }
}

#[async_trait::async_trait]
impl SearchProvider for TavilySearch {
    fn provider_name(&self) -> &str {
        "tavily"
    }

    async fn fetch_snippets(&self, query: &str, k: usize) -> AppResult<Vec<String>> {
        tracing::info!("Performing web search");
        retry_transient(&self.retry, "web_search", || self.request_once(query, k)).await
    }
}
