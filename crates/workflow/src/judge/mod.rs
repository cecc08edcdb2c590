//! Judgment service: routing, grading and answer generation.

mod llm;
mod verdict;

pub use llm::{render_evidence, LlmJudge};
pub use verdict::{parse_verdict, Verdict, VerdictKind};

use crag_core::{AppError, AppResult};
use crag_knowledge::EvidenceItem;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Evidence source chosen for a question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Route {
    WebSearch,
    VectorStore,
}

impl TryFrom<&Verdict> for Route {
    type Error = AppError;

    fn try_from(verdict: &Verdict) -> AppResult<Self> {
        match (verdict.kind, verdict.value.as_str()) {
            (VerdictKind::Route, "websearch") => Ok(Route::WebSearch),
            (VerdictKind::Route, "vectorstore") => Ok(Route::VectorStore),
            _ => Err(AppError::malformed(verdict.kind.task(), &verdict.value)),
        }
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Route::WebSearch => f.write_str("websearch"),
            Route::VectorStore => f.write_str("vectorstore"),
        }
    }
}

/// Binary grade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Grade {
    Yes,
    No,
}

impl Grade {
    pub fn is_yes(self) -> bool {
        self == Grade::Yes
    }
}

impl TryFrom<&Verdict> for Grade {
    type Error = AppError;

    fn try_from(verdict: &Verdict) -> AppResult<Self> {
        match (verdict.kind, verdict.value.as_str()) {
            (VerdictKind::Route, _) => Err(AppError::malformed(verdict.kind.task(), &verdict.value)),
            (_, "yes") => Ok(Grade::Yes),
            (_, "no") => Ok(Grade::No),
            _ => Err(AppError::malformed(verdict.kind.task(), &verdict.value)),
        }
    }
}

/// Language-model backed judgments consumed by the workflow engine.
///
/// Calls are stateless. Output outside a call's contract fails with
/// `AppError::MalformedVerdict`; implementations never substitute a default.
#[async_trait::async_trait]
pub trait JudgmentService: Send + Sync {
    /// Choose between the corpus index and web search.
    async fn route(&self, question: &str) -> AppResult<Route>;

    /// Whether one passage is relevant to the question.
    async fn grade_relevance(&self, question: &str, passage: &str) -> AppResult<Grade>;

    /// Answer the question from the evidence, in at most three sentences.
    async fn generate(&self, question: &str, evidence: &[EvidenceItem]) -> AppResult<String>;

    /// Whether the answer is supported by the evidence.
    async fn grade_groundedness(&self, evidence: &[EvidenceItem], answer: &str)
        -> AppResult<Grade>;

    /// Whether the answer addresses the question.
    async fn grade_usefulness(&self, question: &str, answer: &str) -> AppResult<Grade>;
}
