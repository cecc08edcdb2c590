//! Run configuration for the workflow engine.

use crag_core::config::{AppConfig, SearchSettings, WorkflowSettings};
use std::time::Duration;

use crate::machine::Limits;

/// Bounds and timeouts applied to every run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunConfig {
    /// Consecutive groundedness failures before the run fails
    pub max_verify_retries: u32,

    /// Re-searches after usefulness failures before the run fails
    pub max_search_retries: u32,

    /// Upper bound for a single judgment, index or search call
    pub per_call_timeout: Duration,

    /// Upper bound for the whole run
    pub run_timeout: Duration,

    /// Relevance grades in flight at once
    pub grade_concurrency: usize,

    /// Snippets requested per web search
    pub search_results: usize,
}

impl RunConfig {
    pub fn from_settings(workflow: &WorkflowSettings, search: &SearchSettings) -> Self {
        Self {
            max_verify_retries: workflow.max_verify_retries,
            max_search_retries: workflow.max_search_retries,
            per_call_timeout: workflow.per_call_timeout(),
            run_timeout: workflow.run_timeout(),
            grade_concurrency: workflow.grade_concurrency.max(1),
            search_results: search.max_results,
        }
    }

    pub fn limits(&self) -> Limits {
        Limits {
            max_verify_retries: self.max_verify_retries,
            max_search_retries: self.max_search_retries,
        }
    }
}

impl From<&AppConfig> for RunConfig {
    fn from(config: &AppConfig) -> Self {
        Self::from_settings(&config.workflow, &config.search)
    }
}

impl Default for RunConfig {
    fn default() -> Self {
        Self::from_settings(&WorkflowSettings::default(), &SearchSettings::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = RunConfig::default();
        assert_eq!(config.max_verify_retries, 3);
        assert_eq!(config.max_search_retries, 2);
        assert_eq!(config.per_call_timeout, Duration::from_secs(60));
        assert_eq!(config.run_timeout, Duration::from_secs(300));
        assert_eq!(config.grade_concurrency, 4);
        assert_eq!(config.search_results, 3);
    }

    #[test]
    fn test_zero_concurrency_is_clamped() {
        let workflow = WorkflowSettings {
            grade_concurrency: 0,
            ..WorkflowSettings::default()
        };
        let config = RunConfig::from_settings(&workflow, &SearchSettings::default());
        assert_eq!(config.grade_concurrency, 1);
    }
}
