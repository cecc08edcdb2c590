//! The prompt set used by the judgment service.

use crate::builder::build_prompt;
use crate::defaults;
use crate::loader::{list_prompts, load_prompt};
use crate::types::{BuiltPrompt, PromptDefinition, PromptTask};
use crag_core::{AppError, AppResult};
use std::collections::HashMap;
use std::path::Path;

/// One definition per judgment task.
#[derive(Debug, Clone)]
pub struct PromptSet {
    definitions: HashMap<PromptTask, PromptDefinition>,
}

impl PromptSet {
    /// The built-in prompts.
    pub fn builtin() -> Self {
        let definitions = PromptTask::ALL
            .into_iter()
            .map(|task| (task, defaults::definition(task)))
            .collect();
        Self { definitions }
    }

    /// Built-in prompts with workspace overrides from `.crag/prompts/` applied.
    ///
    /// Files whose stem is not a judgment task id are ignored.
    pub fn load(workspace_path: &Path) -> AppResult<Self> {
        let mut set = Self::builtin();

        for id in list_prompts(workspace_path)? {
            match PromptTask::from_id(&id) {
                Some(task) => {
                    let definition = load_prompt(workspace_path, &id)?;
                    tracing::info!("Using workspace override for prompt '{}'", id);
                    set.definitions.insert(task, definition);
                }
                None => tracing::debug!("Ignoring unknown prompt file '{}'", id),
            }
        }

        Ok(set)
    }

    /// Definition for `task`.
    pub fn definition(&self, task: PromptTask) -> &PromptDefinition {
        // Every task is inserted by `builtin`, overrides only replace entries.
        &self.definitions[&task]
    }

    /// Render the prompt for `task`.
    ///
    /// All of the task's variables must be supplied.
    pub fn render(&self, task: PromptTask, variables: &[(&str, &str)]) -> AppResult<BuiltPrompt> {
        let vars: HashMap<String, String> = variables
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();

        for required in task.variables() {
            if !vars.contains_key(*required) {
                return Err(AppError::Prompt(format!(
                    "Missing variable '{}' for prompt '{}'",
                    required, task
                )));
            }
        }

        build_prompt(self.definition(task), vars)
    }
}

impl Default for PromptSet {
    fn default() -> Self {
        Self::builtin()
    }
}
