//! Workflow engine.
//!
//! Drives one run from `Route` to a terminal step. Each step's I/O is bound
//! to the per-call timeout, the run deadline and the caller's cancellation
//! token; the decision that follows is made by [`advance`].

use std::future::Future;
use std::sync::Arc;

use crag_core::config::AppConfig;
use crag_core::{AppError, AppResult};
use crag_knowledge::{EvidenceItem, EvidenceStore};
use crag_search::{SearchProvider, TavilySearch};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;
use uuid::Uuid;

use crate::config::RunConfig;
use crate::judge::{Grade, JudgmentService, LlmJudge, Route};
use crate::machine::{advance, Event, RunState, Step, Verification};
use crate::outcome::{RunOutcome, RunStats};

/// Runs questions through the route, retrieve, grade, generate and verify loop.
///
/// The engine holds no per-run state and can serve concurrent runs.
pub struct Engine {
    judge: Arc<dyn JudgmentService>,
    store: Arc<dyn EvidenceStore>,
    search: Arc<dyn SearchProvider>,
    config: RunConfig,
}

impl Engine {
    pub fn new(
        judge: Arc<dyn JudgmentService>,
        store: Arc<dyn EvidenceStore>,
        search: Arc<dyn SearchProvider>,
        config: RunConfig,
    ) -> Self {
        Self {
            judge,
            store,
            search,
            config,
        }
    }

    /// Build an engine with the configured model and Tavily search.
    ///
    /// The evidence store is built by the caller from its corpus.
    pub fn from_config(config: &AppConfig, store: Arc<dyn EvidenceStore>) -> AppResult<Self> {
        config.validate()?;

        let run_config = RunConfig::from(config);
        let judge = LlmJudge::from_config(config)?;
        let api_key = config.resolve_search_api_key()?;
        let search = TavilySearch::from_settings(
            &config.search,
            api_key,
            run_config.per_call_timeout,
            config.retry,
        )?;

        Ok(Self::new(
            Arc::new(judge),
            store,
            Arc::new(search),
            run_config,
        ))
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    /// Answer `question`.
    ///
    /// Returns `Ok` with a `Cancelled` outcome when `cancel` fires or the run
    /// timeout passes. Malformed verdicts, exhausted upstream retries and
    /// per-call timeouts end the run with `Err`.
    pub async fn run(&self, question: &str, cancel: &CancellationToken) -> AppResult<RunOutcome> {
        let run_id = Uuid::new_v4();
        let span = tracing::info_span!("run", %run_id);
        self.execute(run_id, question, cancel).instrument(span).await
    }

    async fn execute(
        &self,
        run_id: Uuid,
        question: &str,
        cancel: &CancellationToken,
    ) -> AppResult<RunOutcome> {
        let deadline = Instant::now() + self.config.run_timeout;
        let limits = self.config.limits();
        let mut stats = RunStats::default();
        let mut state = RunState::new(question);
        let mut step = Step::Route;

        tracing::info!("Starting run");

        while !step.is_terminal() {
            if cancel.is_cancelled() || Instant::now() >= deadline {
                tracing::warn!(step = %step, "Run cancelled before step");
                step = Step::Cancelled;
                break;
            }

            let event = match self
                .perform(step, &state, &mut stats, deadline, cancel)
                .await
            {
                Ok(event) => event,
                Err(AppError::Cancelled) => {
                    tracing::warn!(step = %step, "Run cancelled during step");
                    step = Step::Cancelled;
                    break;
                }
                Err(e) => {
                    tracing::error!(step = %step, error = %e, "Run aborted");
                    return Err(e);
                }
            };

            let (next, next_state) = advance(step, state, event, &limits)?;
            tracing::info!(
                from = %step,
                to = %next,
                evidence = next_state.evidence().len(),
                "Transition"
            );
            step = next;
            state = next_state;
        }

        let outcome = RunOutcome::finish(run_id, step, state, stats);
        match &outcome.failure {
            Some(reason) => tracing::warn!(status = ?outcome.status, %reason, "Run finished"),
            None => tracing::info!(status = ?outcome.status, "Run finished"),
        }
        Ok(outcome)
    }

    async fn perform(
        &self,
        step: Step,
        state: &RunState,
        stats: &mut RunStats,
        deadline: Instant,
        cancel: &CancellationToken,
    ) -> AppResult<Event> {
        let question = state.question();

        match step {
            Step::Route => {
                stats.judgment_calls += 1;
                let route = self
                    .bounded("route", deadline, cancel, self.judge.route(question))
                    .await?;
                match route {
                    Route::WebSearch => tracing::info!("DECISION: route question to web search"),
                    Route::VectorStore => tracing::info!("DECISION: route question to the index"),
                }
                stats.route = Some(route);
                Ok(Event::Routed(route))
            }

            Step::Retrieve => {
                let items = self
                    .bounded("retrieve", deadline, cancel, self.store.query(question))
                    .await?;
                tracing::info!(items = items.len(), "Retrieved evidence");
                Ok(Event::Retrieved(items))
            }

            Step::Grade => {
                stats.judgment_calls += state.evidence().len() as u32;
                let grades = self
                    .grade_all(question, state.evidence(), deadline, cancel)
                    .await?;
                Ok(Event::Graded(grades))
            }

            Step::Search => {
                stats.searches += 1;
                let items = self
                    .bounded(
                        "search",
                        deadline,
                        cancel,
                        self.search.search(question, self.config.search_results),
                    )
                    .await?;
                if items.is_empty() {
                    tracing::warn!("Web search returned no results");
                }
                Ok(Event::Searched(items))
            }

            Step::Generate => {
                stats.judgment_calls += 1;
                stats.generations += 1;
                let answer = self
                    .bounded(
                        "generate",
                        deadline,
                        cancel,
                        self.judge.generate(question, state.evidence()),
                    )
                    .await?;
                Ok(Event::Generated(answer))
            }

            Step::Verify => {
                let answer = state.answer().ok_or_else(|| {
                    AppError::Workflow("verification requested before generation".to_string())
                })?;

                stats.judgment_calls += 1;
                let grounded = self
                    .bounded(
                        "groundedness",
                        deadline,
                        cancel,
                        self.judge.grade_groundedness(state.evidence(), answer),
                    )
                    .await?;
                if !grounded.is_yes() {
                    stats.groundedness_failures += 1;
                    tracing::info!("DECISION: answer is not grounded in evidence");
                    return Ok(Event::Verified(Verification::Ungrounded));
                }
                tracing::info!("DECISION: answer is grounded in evidence");

                stats.judgment_calls += 1;
                let useful = self
                    .bounded(
                        "usefulness",
                        deadline,
                        cancel,
                        self.judge.grade_usefulness(question, answer),
                    )
                    .await?;
                if useful.is_yes() {
                    tracing::info!("DECISION: answer addresses the question");
                    Ok(Event::Verified(Verification::Accepted))
                } else {
                    stats.usefulness_failures += 1;
                    tracing::info!("DECISION: answer does not address the question");
                    Ok(Event::Verified(Verification::NotUseful))
                }
            }

            Step::Done | Step::Failed(_) | Step::Cancelled => Err(AppError::Workflow(format!(
                "no action for terminal step {}",
                step
            ))),
        }
    }

    /// Await `call` under the per-call timeout, the run deadline and `cancel`.
    ///
    /// Hitting the run deadline or the token yields `AppError::Cancelled`;
    /// hitting only the per-call timeout yields `AppError::UpstreamUnavailable`.
    async fn bounded<T>(
        &self,
        label: &str,
        deadline: Instant,
        cancel: &CancellationToken,
        call: impl Future<Output = AppResult<T>>,
    ) -> AppResult<T> {
        let remaining = deadline.saturating_duration_since(Instant::now());
        let limit = self.config.per_call_timeout.min(remaining);

        tokio::select! {
            _ = cancel.cancelled() => Err(AppError::Cancelled),
            result = tokio::time::timeout(limit, call) => match result {
                Ok(result) => result,
                Err(_) if limit < self.config.per_call_timeout => Err(AppError::Cancelled),
                Err(_) => {
                    tracing::warn!(call = label, timeout_ms = limit.as_millis() as u64, "Call timed out");
                    Err(AppError::UpstreamUnavailable(format!(
                        "{} timed out after {:?}",
                        label, limit
                    )))
                }
            },
        }
    }

    /// Grade every item concurrently, at most `grade_concurrency` at a time.
    ///
    /// Grades are returned in evidence order regardless of completion order.
    async fn grade_all(
        &self,
        question: &str,
        evidence: &[EvidenceItem],
        deadline: Instant,
        cancel: &CancellationToken,
    ) -> AppResult<Vec<Grade>> {
        let semaphore = Arc::new(Semaphore::new(self.config.grade_concurrency));
        let per_call = self.config.per_call_timeout;
        let mut join_set = JoinSet::new();

        for (index, item) in evidence.iter().enumerate() {
            let judge = Arc::clone(&self.judge);
            let semaphore = Arc::clone(&semaphore);
            let question = question.to_string();
            let passage = item.text().to_string();

            join_set.spawn(
                async move {
                    let _permit = semaphore.acquire_owned().await.map_err(|e| {
                        AppError::Workflow(format!("grading pool closed: {}", e))
                    })?;

                    let grade = tokio::time::timeout(
                        per_call,
                        judge.grade_relevance(&question, &passage),
                    )
                    .await
                    .map_err(|_| {
                        AppError::UpstreamUnavailable(format!(
                            "relevance grading timed out after {:?}",
                            per_call
                        ))
                    })??;

                    Ok::<_, AppError>((index, grade))
                }
                .in_current_span(),
            );
        }

        let mut grades: Vec<Option<Grade>> = vec![None; evidence.len()];
        let collected = tokio::select! {
            _ = cancel.cancelled() => Err(AppError::Cancelled),
            _ = tokio::time::sleep_until(deadline) => Err(AppError::Cancelled),
            result = collect_grades(&mut join_set, &mut grades) => result,
        };

        if let Err(e) = collected {
            join_set.abort_all();
            return Err(e);
        }

        grades
            .into_iter()
            .enumerate()
            .map(|(index, grade)| {
                grade.ok_or_else(|| {
                    AppError::Workflow(format!("no grade for evidence item {}", index))
                })
            })
            .collect()
    }
}

async fn collect_grades(
    join_set: &mut JoinSet<AppResult<(usize, Grade)>>,
    grades: &mut [Option<Grade>],
) -> AppResult<()> {
    while let Some(joined) = join_set.join_next().await {
        let (index, grade) = joined
            .map_err(|e| AppError::Workflow(format!("grading task failed: {}", e)))??;

        if grade.is_yes() {
            tracing::debug!(index, "GRADE: document relevant");
        } else {
            tracing::debug!(index, "GRADE: document not relevant");
        }
        grades[index] = Some(grade);
    }
    Ok(())
}
