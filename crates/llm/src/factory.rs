//! LLM provider factory.
//!
//! This module builds an LLM client from the `llm` section of the
//! application configuration.

use crate::client::LlmClient;
use crate::providers::OllamaClient;
use crag_core::config::LlmSettings;
use crag_core::{AppError, AppResult};
use std::sync::Arc;
use std::time::Duration;

/// Create an LLM client for the configured provider.
///
/// # Errors
/// Returns `AppError::Config` if the provider is unknown or the HTTP client
/// cannot be initialized.
pub fn create_client(settings: &LlmSettings) -> AppResult<Arc<dyn LlmClient>> {
    match settings.provider.to_lowercase().as_str() {
        "ollama" => {
            let client = OllamaClient::with_timeout(
                settings.endpoint.as_str(),
                Duration::from_secs(settings.timeout_secs),
            )?;
            tracing::debug!(endpoint = %settings.endpoint, "Created Ollama client");
            Ok(Arc::new(client))
        }
        _ => Err(AppError::Config(format!(
            "Unknown provider: {}",
            settings.provider
        ))),
    }
}
