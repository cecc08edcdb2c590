//! Prompt types.
//!
//! This module defines the domain entities for the prompt system.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// The five language-model tasks behind the judgment service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PromptTask {
    Route,
    Relevance,
    Generate,
    Groundedness,
    Usefulness,
}

impl PromptTask {
    pub const ALL: [PromptTask; 5] = [
        PromptTask::Route,
        PromptTask::Relevance,
        PromptTask::Generate,
        PromptTask::Groundedness,
        PromptTask::Usefulness,
    ];

    /// Prompt identifier, also the override file stem under `.crag/prompts/`.
    pub fn id(&self) -> &'static str {
        match self {
            PromptTask::Route => "judge.route",
            PromptTask::Relevance => "judge.relevance",
            PromptTask::Generate => "judge.generate",
            PromptTask::Groundedness => "judge.groundedness",
            PromptTask::Usefulness => "judge.usefulness",
        }
    }

    /// Parse a prompt identifier back into its task.
    pub fn from_id(id: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|task| task.id() == id)
    }

    /// Template variables the task's prompt must be rendered with.
    pub fn variables(&self) -> &'static [&'static str] {
        match self {
            PromptTask::Route => &["question"],
            PromptTask::Relevance => &["question", "document"],
            PromptTask::Generate => &["question", "context"],
            PromptTask::Groundedness => &["documents", "generation"],
            PromptTask::Usefulness => &["question", "generation"],
        }
    }
}

impl fmt::Display for PromptTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

/// Format the model is expected to answer in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PromptFormat {
    #[default]
    Text,
    Json,
}

/// A prompt definition, built in or loaded from YAML.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptDefinition {
    /// Unique prompt identifier
    pub id: String,

    /// Human-readable title
    pub title: String,

    /// API version for schema evolution
    #[serde(rename = "apiVersion")]
    pub api_version: String,

    /// Creator identifier
    #[serde(rename = "createdBy", default)]
    pub created_by: String,

    /// System message sent alongside the rendered template
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,

    /// Template string with Handlebars syntax
    pub template: String,

    /// Output specification
    #[serde(default)]
    pub output: PromptOutputSpec,
}

/// Output specification for the prompt.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PromptOutputSpec {
    /// Output format ("text" or "json")
    #[serde(default)]
    pub format: PromptFormat,
}

/// A fully built prompt ready for LLM execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuiltPrompt {
    /// System message (optional)
    pub system: Option<String>,

    /// User message (required)
    pub user: String,

    /// Metadata about the built prompt
    pub metadata: BuiltPromptMetadata,
}

/// Metadata about a built prompt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuiltPromptMetadata {
    /// Source prompt ID
    #[serde(rename = "sourcePromptId")]
    pub source_prompt_id: String,

    /// Format the model should answer in
    #[serde(rename = "outputFormat")]
    pub output_format: PromptFormat,

    /// Template variables that were resolved
    #[serde(rename = "resolvedVariables")]
    pub resolved_variables: HashMap<String, String>,
}

impl BuiltPrompt {
    /// Create a new built prompt.
    pub fn new(
        system: Option<String>,
        user: String,
        source_prompt_id: String,
        output_format: PromptFormat,
        resolved_variables: HashMap<String, String>,
    ) -> Self {
        Self {
            system,
            user,
            metadata: BuiltPromptMetadata {
                source_prompt_id,
                output_format,
                resolved_variables,
            },
        }
    }
}
