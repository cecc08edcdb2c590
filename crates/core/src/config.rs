//! Configuration management.
//!
//! This module handles loading and merging configuration from multiple sources:
//! - Built-in defaults
//! - Config files (.crag/config.yaml)
//! - Environment variables
//! - Explicit overrides from the embedding application
//!
//! The configuration is workspace-centric: prompt overrides and the config
//! file live under `<workspace>/.crag/`.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{AppError, AppResult};
use crate::retry::RetryPolicy;

/// Providers the judgment service can talk to.
pub const KNOWN_PROVIDERS: &[&str] = &["ollama"];

/// Main application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Path to the workspace root (contains .crag/)
    pub workspace: PathBuf,

    /// Optional config file path
    pub config_file: Option<PathBuf>,

    /// Log level override
    pub log_level: Option<String>,

    /// Disable colored output
    pub no_color: bool,

    pub llm: LlmSettings,
    pub workflow: WorkflowSettings,
    pub search: SearchSettings,
    pub knowledge: KnowledgeSettings,
    pub retry: RetryPolicy,
}

/// Language model settings used by the judgment service.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct LlmSettings {
    /// Provider identifier (e.g., "ollama")
    pub provider: String,

    /// Base URL of the provider API
    pub endpoint: String,

    /// Model identifier
    pub model: String,

    /// HTTP timeout for a single model request
    pub timeout_secs: u64,

    /// Sampling temperature; 0 keeps verdicts deterministic
    pub temperature: f32,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            provider: "ollama".to_string(), // Local-first default
            endpoint: "http://localhost:11434".to_string(),
            model: "llama3".to_string(),
            timeout_secs: 120,
            temperature: 0.0,
        }
    }
}

/// Loop bounds and timeouts for one workflow run.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct WorkflowSettings {
    /// Consecutive groundedness failures tolerated before the run fails
    pub max_verify_retries: u32,

    /// Re-searches after a usefulness failure before the run fails
    pub max_search_retries: u32,

    /// Timeout for any single collaborator call
    pub per_call_timeout_secs: u64,

    /// Overall deadline for the run
    pub run_timeout_secs: u64,

    /// Concurrent relevance grading calls
    pub grade_concurrency: usize,
}

impl Default for WorkflowSettings {
    fn default() -> Self {
        Self {
            max_verify_retries: 3,
            max_search_retries: 2,
            per_call_timeout_secs: 60,
            run_timeout_secs: 300,
            grade_concurrency: 4,
        }
    }
}

impl WorkflowSettings {
    pub fn per_call_timeout(&self) -> Duration {
        Duration::from_secs(self.per_call_timeout_secs)
    }

    pub fn run_timeout(&self) -> Duration {
        Duration::from_secs(self.run_timeout_secs)
    }
}

/// Web search provider settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct SearchSettings {
    /// Search API endpoint
    pub endpoint: String,

    /// Environment variable holding the API key
    pub api_key_env: String,

    /// Snippets requested per search (k)
    pub max_results: usize,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            endpoint: "https://api.tavily.com/search".to_string(),
            api_key_env: "TAVILY_API_KEY".to_string(),
            max_results: 3,
        }
    }
}

/// Corpus index settings.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct KnowledgeSettings {
    /// Chunk size in characters (roughly 250 tokens)
    pub chunk_size: usize,

    /// Overlap between consecutive chunks
    pub chunk_overlap: usize,

    /// Passages returned per query
    pub top_k: usize,

    /// Embedding vector dimension
    pub embedding_dim: usize,
}

impl Default for KnowledgeSettings {
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            chunk_overlap: 0,
            top_k: 4,
            embedding_dim: 384,
        }
    }
}

/// Full configuration file structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct ConfigFile {
    llm: Option<LlmSettings>,
    workflow: Option<WorkflowSettings>,
    search: Option<SearchSettings>,
    knowledge: Option<KnowledgeSettings>,
    retry: Option<RetryPolicy>,
    logging: Option<LoggingConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct LoggingConfig {
    level: Option<String>,
    color: Option<bool>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            workspace: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            config_file: None,
            log_level: None,
            no_color: false,
            llm: LlmSettings::default(),
            workflow: WorkflowSettings::default(),
            search: SearchSettings::default(),
            knowledge: KnowledgeSettings::default(),
            retry: RetryPolicy::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from defaults, the YAML config file and the environment.
    ///
    /// Environment variables:
    /// - `CRAG_WORKSPACE`: Override workspace path
    /// - `CRAG_CONFIG`: Path to config file
    /// - `CRAG_PROVIDER`: LLM provider
    /// - `CRAG_MODEL`: Model identifier
    /// - `CRAG_LLM_ENDPOINT`: Provider base URL
    /// - `RUST_LOG`: Log level
    /// - `NO_COLOR`: Disable colored output
    ///
    /// # Example
    /// ```no_run
    /// use crag_core::config::AppConfig;
    ///
    /// let config = AppConfig::load().expect("Failed to load config");
    /// println!("Model: {}", config.llm.model);
    /// ```
    pub fn load() -> AppResult<Self> {
        let mut config = Self::default();

        if let Ok(workspace) = std::env::var("CRAG_WORKSPACE") {
            config.workspace = PathBuf::from(workspace);
        }

        if let Ok(config_file) = std::env::var("CRAG_CONFIG") {
            config.config_file = Some(PathBuf::from(config_file));
        }

        if !config.workspace.exists() {
            return Err(AppError::Config(format!(
                "Workspace directory does not exist: {:?}",
                config.workspace
            )));
        }

        let config_path = config
            .config_file
            .clone()
            .unwrap_or_else(|| config.crag_dir().join("config.yaml"));

        if config_path.exists() {
            config = config.merge_yaml(&config_path)?;
        }

        // Environment variables override YAML config
        if let Ok(provider) = std::env::var("CRAG_PROVIDER") {
            config.llm.provider = provider;
        }

        if let Ok(model) = std::env::var("CRAG_MODEL") {
            config.llm.model = model;
        }

        if let Ok(endpoint) = std::env::var("CRAG_LLM_ENDPOINT") {
            config.llm.endpoint = endpoint;
        }

        if let Ok(level) = std::env::var("RUST_LOG") {
            config.log_level = Some(level);
        }

        if std::env::var("NO_COLOR").is_ok() {
            config.no_color = true;
        }

        Ok(config)
    }

    /// Merge a YAML configuration file into this config.
    ///
    /// Sections present in the file replace the corresponding section;
    /// fields missing inside a section fall back to their defaults.
    pub fn merge_yaml(&self, path: &Path) -> AppResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            AppError::Config(format!("Failed to read config file {:?}: {}", path, e))
        })?;

        let config_file: ConfigFile = serde_yaml::from_str(&contents).map_err(|e| {
            AppError::Config(format!("Failed to parse config file {:?}: {}", path, e))
        })?;

        let mut result = self.clone();

        if let Some(llm) = config_file.llm {
            result.llm = llm;
        }
        if let Some(workflow) = config_file.workflow {
            result.workflow = workflow;
        }
        if let Some(search) = config_file.search {
            result.search = search;
        }
        if let Some(knowledge) = config_file.knowledge {
            result.knowledge = knowledge;
        }
        if let Some(retry) = config_file.retry {
            result.retry = retry;
        }

        if let Some(logging) = config_file.logging {
            if let Some(level) = logging.level {
                result.log_level = Some(level);
            }
            if let Some(color) = logging.color {
                result.no_color = !color;
            }
        }

        tracing::debug!("Merged config file {:?}", path);
        Ok(result)
    }

    /// Apply explicit overrides from the embedding application.
    ///
    /// Overrides take precedence over environment variables and the config file.
    pub fn with_overrides(
        mut self,
        workspace: Option<PathBuf>,
        model: Option<String>,
        log_level: Option<String>,
        no_color: bool,
    ) -> Self {
        if let Some(workspace) = workspace {
            self.workspace = workspace;
        }

        if let Some(model) = model {
            self.llm.model = model;
        }

        if let Some(log_level) = log_level {
            self.log_level = Some(log_level);
        }

        if no_color {
            self.no_color = true;
        }

        self
    }

    /// Get the path to the .crag directory.
    pub fn crag_dir(&self) -> PathBuf {
        self.workspace.join(".crag")
    }

    /// Resolve the search API key from the configured environment variable.
    pub fn resolve_search_api_key(&self) -> AppResult<String> {
        std::env::var(&self.search.api_key_env).map_err(|_| {
            AppError::Config(format!(
                "Search API key not found in environment variable: {}",
                self.search.api_key_env
            ))
        })
    }

    /// Validate the configuration.
    pub fn validate(&self) -> AppResult<()> {
        let provider = self.llm.provider.to_lowercase();
        if !KNOWN_PROVIDERS.contains(&provider.as_str()) {
            return Err(AppError::Config(format!(
                "Unknown provider: {}. Supported: {}",
                self.llm.provider,
                KNOWN_PROVIDERS.join(", ")
            )));
        }

        if self.llm.model.trim().is_empty() {
            return Err(AppError::Config("Model cannot be empty".to_string()));
        }

        let wf = &self.workflow;
        if wf.max_verify_retries == 0 {
            return Err(AppError::Config(
                "workflow.maxVerifyRetries must be at least 1".to_string(),
            ));
        }
        if wf.grade_concurrency == 0 {
            return Err(AppError::Config(
                "workflow.gradeConcurrency must be at least 1".to_string(),
            ));
        }
        if wf.per_call_timeout_secs == 0 || wf.run_timeout_secs == 0 {
            return Err(AppError::Config("workflow timeouts must be non-zero".to_string()));
        }
        if wf.per_call_timeout_secs > wf.run_timeout_secs {
            return Err(AppError::Config(format!(
                "workflow.perCallTimeoutSecs ({}) exceeds workflow.runTimeoutSecs ({})",
                wf.per_call_timeout_secs, wf.run_timeout_secs
            )));
        }

        if self.search.max_results == 0 {
            return Err(AppError::Config("search.maxResults must be at least 1".to_string()));
        }

        let kb = &self.knowledge;
        if kb.chunk_size == 0 || kb.top_k == 0 || kb.embedding_dim == 0 {
            return Err(AppError::Config(
                "knowledge.chunkSize, topK and embeddingDim must be non-zero".to_string(),
            ));
        }
        if kb.chunk_overlap >= kb.chunk_size {
            return Err(AppError::Config(
                "knowledge.chunkOverlap must be smaller than chunkSize".to_string(),
            ));
        }

        Ok(())
    }
}
