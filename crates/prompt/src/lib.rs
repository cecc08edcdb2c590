//! Prompt system for the judgment service.
//!
//! This crate provides structured prompt management with:
//! - Built-in prompt definitions for the five judgment tasks
//! - YAML overrides loaded from the workspace
//! - Strict Handlebars template rendering

pub mod builder;
pub mod defaults;
pub mod loader;
pub mod set;
pub mod types;

// Re-export main types
pub use builder::build_prompt;
pub use loader::{list_prompts, load_prompt};
pub use set::PromptSet;
pub use types::{
    BuiltPrompt, BuiltPromptMetadata, PromptDefinition, PromptFormat, PromptOutputSpec, PromptTask,
};
