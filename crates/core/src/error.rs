//! Error types for the corrective RAG workspace.
//!
//! This module defines a unified error enum that covers every error category
//! in the workspace: configuration, I/O, LLM transport, knowledge, prompt,
//! search, and the run-level taxonomy of the workflow engine.

use thiserror::Error;

/// Unified error type for all crates in the workspace.
///
/// All functions return `Result<T, AppError>`.
/// We never panic. Errors must be represented and propagated.
#[derive(Error, Debug)]
pub enum AppError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O and filesystem errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Non-transient LLM provider errors (bad request, unknown model)
    #[error("LLM error: {0}")]
    Llm(String),

    /// Corpus index errors
    #[error("Knowledge error: {0}")]
    Knowledge(String),

    /// Prompt system errors
    #[error("Prompt error: {0}")]
    Prompt(String),

    /// Non-transient search provider errors (missing key, rejected query)
    #[error("Search error: {0}")]
    Search(String),

    /// The judgment service returned output outside its contract.
    ///
    /// `raw` holds the offending model output for diagnosis.
    #[error("Malformed verdict for '{task}': {raw:?}")]
    MalformedVerdict { task: String, raw: String },

    /// Transport failure or timeout talking to an index, search or model backend
    #[error("Upstream unavailable: {0}")]
    UpstreamUnavailable(String),

    /// The run was cancelled or ran out of time while a call was in flight
    #[error("Run cancelled")]
    Cancelled,

    /// Workflow engine invariant violations
    #[error("Workflow error: {0}")]
    Workflow(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl AppError {
    /// Build a `MalformedVerdict` for the given judgment task.
    pub fn malformed(task: impl Into<String>, raw: impl Into<String>) -> Self {
        AppError::MalformedVerdict {
            task: task.into(),
            raw: raw.into(),
        }
    }

    /// Whether the call that produced this error may be retried.
    ///
    /// Only transport failures are transient. Malformed verdicts and
    /// cancellation are never retried.
    pub fn is_transient(&self) -> bool {
        matches!(self, AppError::UpstreamUnavailable(_))
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

impl From<serde_yaml::Error> for AppError {
    fn from(err: serde_yaml::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

/// Convenience type alias for Results with AppError.
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_upstream_is_transient() {
        assert!(AppError::UpstreamUnavailable("connection refused".into()).is_transient());
        assert!(!AppError::malformed("route", "{}").is_transient());
        assert!(!AppError::Cancelled.is_transient());
        assert!(!AppError::Llm("404 model not found".into()).is_transient());
    }

    #[test]
    fn test_malformed_verdict_keeps_raw_output() {
        let err = AppError::malformed("grade_relevance", "{\"score\": \"maybe\"}");
        let msg = err.to_string();
        assert!(msg.contains("grade_relevance"));
        assert!(msg.contains("maybe"));
    }
}
