//! Judgment service backed by an `LlmClient`.

use super::verdict::{parse_verdict, VerdictKind};
use super::{Grade, JudgmentService, Route};
use crag_core::config::AppConfig;
use crag_core::{retry_transient, AppError, AppResult, RetryPolicy};
use crag_knowledge::EvidenceItem;
use crag_llm::{create_client, LlmClient, LlmRequest};
use crag_prompt::{BuiltPrompt, PromptFormat, PromptSet, PromptTask};
use std::sync::Arc;

/// Renders prompts, calls the model and parses its verdicts.
pub struct LlmJudge {
    client: Arc<dyn LlmClient>,
    prompts: PromptSet,
    model: String,
    temperature: f32,
    retry: RetryPolicy,
}

impl LlmJudge {
    pub fn new(client: Arc<dyn LlmClient>, prompts: PromptSet, model: impl Into<String>) -> Self {
        Self {
            client,
            prompts,
            model: model.into(),
            temperature: 0.0,
            retry: RetryPolicy::default(),
        }
    }

    /// Build a judge from configuration, applying workspace prompt overrides.
    pub fn from_config(config: &AppConfig) -> AppResult<Self> {
        let client = create_client(&config.llm)?;
        let prompts = PromptSet::load(&config.workspace)?;

        Ok(Self::new(client, prompts, &config.llm.model)
            .with_temperature(config.llm.temperature)
            .with_retry(config.retry))
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Retry policy for transient model failures.
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    async fn complete(&self, task: PromptTask, built: BuiltPrompt) -> AppResult<String> {
        let mut request =
            LlmRequest::new(built.user, &self.model).with_temperature(self.temperature);

        if let Some(system) = built.system {
            request = request.with_system(system);
        }

        if built.metadata.output_format == PromptFormat::Json {
            request = request.with_json_output();
        }

        let response =
            retry_transient(&self.retry, task.id(), || self.client.complete(&request)).await?;
        Ok(response.content)
    }

    async fn verdict(
        &self,
        task: PromptTask,
        kind: VerdictKind,
        variables: &[(&str, &str)],
    ) -> AppResult<super::Verdict> {
        let built = self.prompts.render(task, variables)?;
        let raw = self.complete(task, built).await?;
        let verdict = parse_verdict(kind, &raw)?;
        tracing::debug!(kind = %kind, value = %verdict.value, "Verdict");
        Ok(verdict)
    }

    async fn grade(
        &self,
        task: PromptTask,
        kind: VerdictKind,
        variables: &[(&str, &str)],
    ) -> AppResult<Grade> {
        let verdict = self.verdict(task, kind, variables).await?;
        Grade::try_from(&verdict)
    }
}

#[async_trait::async_trait]
impl JudgmentService for LlmJudge {
    async fn route(&self, question: &str) -> AppResult<Route> {
        let verdict = self
            .verdict(PromptTask::Route, VerdictKind::Route, &[("question", question)])
            .await?;
        Route::try_from(&verdict)
    }

    async fn grade_relevance(&self, question: &str, passage: &str) -> AppResult<Grade> {
        self.grade(
            PromptTask::Relevance,
            VerdictKind::Relevance,
            &[("question", question), ("document", passage)],
        )
        .await
    }

    async fn generate(&self, question: &str, evidence: &[EvidenceItem]) -> AppResult<String> {
        let context = render_evidence(evidence);
        let built = self.prompts.render(
            PromptTask::Generate,
            &[("question", question), ("context", context.as_str())],
        )?;

        let raw = self.complete(PromptTask::Generate, built).await?;
        let answer = raw.trim();
        if answer.is_empty() {
            return Err(AppError::malformed("generate", raw));
        }

        Ok(answer.to_string())
    }

    async fn grade_groundedness(
        &self,
        evidence: &[EvidenceItem],
        answer: &str,
    ) -> AppResult<Grade> {
        let documents = render_evidence(evidence);
        self.grade(
            PromptTask::Groundedness,
            VerdictKind::Groundedness,
            &[("documents", documents.as_str()), ("generation", answer)],
        )
        .await
    }

    async fn grade_usefulness(&self, question: &str, answer: &str) -> AppResult<Grade> {
        self.grade(
            PromptTask::Usefulness,
            VerdictKind::Usefulness,
            &[("question", question), ("generation", answer)],
        )
        .await
    }
}

/// Render evidence as numbered documents separated by `---`.
pub fn render_evidence(evidence: &[EvidenceItem]) -> String {
    evidence
        .iter()
        .enumerate()
        .map(|(i, item)| format!("[Document {}] ({})\n{}", i + 1, item.source(), item.text()))
        .collect::<Vec<_>>()
        .join("\n\n---\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_evidence() {
        let evidence = vec![
            EvidenceItem::from_index("Agents plan."),
            EvidenceItem::from_search("Agents remember."),
        ];
        assert_eq!(
            render_evidence(&evidence),
            "[Document 1] (index)\nAgents plan.\n\n---\n\n[Document 2] (search)\nAgents remember."
        );
    }

    #[test]
    fn test_render_no_evidence() {
        assert_eq!(render_evidence(&[]), "");
    }
}
