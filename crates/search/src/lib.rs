//! Web search provider.
//!
//! Search results are consumed as evidence: every search call collapses its
//! snippets into a single `EvidenceItem` sourced from `Search`, so a result
//! set is graded and used as a whole.

pub mod provider;
pub mod tavily;

pub use provider::{join_snippets, SearchProvider};
pub use tavily::TavilySearch;
