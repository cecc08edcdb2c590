//! Scripted collaborators for engine tests.

#![allow(dead_code)]

use std::collections::{HashSet, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crag_core::{AppError, AppResult};
use crag_knowledge::{EvidenceItem, EvidenceStore};
use crag_search::SearchProvider;
use crag_workflow::{Engine, Grade, JudgmentService, Route, RunConfig};

/// Queue of grades with a fallback once the queue is empty.
pub struct Script {
    queue: Mutex<VecDeque<Grade>>,
    fallback: Grade,
}

impl Script {
    pub fn new(queue: &[Grade], fallback: Grade) -> Self {
        Self {
            queue: Mutex::new(queue.iter().copied().collect()),
            fallback,
        }
    }

    pub fn always(grade: Grade) -> Self {
        Self::new(&[], grade)
    }

    fn next(&self) -> Grade {
        self.queue
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(self.fallback)
    }
}

/// Judgment service answering from a script.
pub struct ScriptedJudge {
    route: Route,
    malformed_route: Option<String>,
    irrelevant: HashSet<String>,
    groundedness: Script,
    usefulness: Script,
    route_delay: Duration,
    grade_delay: Duration,
    generated: Mutex<Vec<Vec<EvidenceItem>>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    relevance_calls: AtomicUsize,
}

impl ScriptedJudge {
    /// Routes to `route` and accepts everything.
    pub fn new(route: Route) -> Self {
        Self {
            route,
            malformed_route: None,
            irrelevant: HashSet::new(),
            groundedness: Script::always(Grade::Yes),
            usefulness: Script::always(Grade::Yes),
            route_delay: Duration::ZERO,
            grade_delay: Duration::ZERO,
            generated: Mutex::new(Vec::new()),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
            relevance_calls: AtomicUsize::new(0),
        }
    }

    /// Grade these passages `no`.
    pub fn irrelevant(mut self, passages: &[&str]) -> Self {
        self.irrelevant = passages.iter().map(|p| p.to_string()).collect();
        self
    }

    pub fn groundedness(mut self, script: Script) -> Self {
        self.groundedness = script;
        self
    }

    pub fn usefulness(mut self, script: Script) -> Self {
        self.usefulness = script;
        self
    }

    pub fn route_delay(mut self, delay: Duration) -> Self {
        self.route_delay = delay;
        self
    }

    pub fn grade_delay(mut self, delay: Duration) -> Self {
        self.grade_delay = delay;
        self
    }

    /// Fail routing with a malformed verdict carrying `raw`.
    pub fn malformed_route(mut self, raw: &str) -> Self {
        self.malformed_route = Some(raw.to_string());
        self
    }

    /// Evidence passed to each `generate` call, in call order.
    pub fn generated(&self) -> Vec<Vec<EvidenceItem>> {
        self.generated.lock().unwrap().clone()
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    pub fn relevance_calls(&self) -> usize {
        self.relevance_calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl JudgmentService for ScriptedJudge {
    async fn route(&self, _question: &str) -> AppResult<Route> {
        if !self.route_delay.is_zero() {
            tokio::time::sleep(self.route_delay).await;
        }
        match &self.malformed_route {
            Some(raw) => Err(AppError::malformed("route", raw.as_str())),
            None => Ok(self.route),
        }
    }

    async fn grade_relevance(&self, _question: &str, passage: &str) -> AppResult<Grade> {
        self.relevance_calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        if !self.grade_delay.is_zero() {
            // Vary the delay per passage so tasks finish out of evidence order.
            let jitter = Duration::from_millis((passage.len() % 7) as u64 * 3);
            tokio::time::sleep(self.grade_delay.saturating_sub(jitter)).await;
        }

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        if self.irrelevant.contains(passage) {
            Ok(Grade::No)
        } else {
            Ok(Grade::Yes)
        }
    }

    async fn generate(&self, _question: &str, evidence: &[EvidenceItem]) -> AppResult<String> {
        let mut generated = self.generated.lock().unwrap();
        generated.push(evidence.to_vec());
        Ok(format!("answer {}", generated.len()))
    }

    async fn grade_groundedness(
        &self,
        _evidence: &[EvidenceItem],
        _answer: &str,
    ) -> AppResult<Grade> {
        Ok(self.groundedness.next())
    }

    async fn grade_usefulness(&self, _question: &str, _answer: &str) -> AppResult<Grade> {
        Ok(self.usefulness.next())
    }
}

/// Evidence store returning a fixed passage list.
pub struct FixedStore {
    items: Vec<EvidenceItem>,
    calls: AtomicUsize,
}

impl FixedStore {
    pub fn new(passages: &[&str]) -> Self {
        Self {
            items: passages.iter().map(|p| EvidenceItem::from_index(*p)).collect(),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl EvidenceStore for FixedStore {
    async fn query(&self, _question: &str) -> AppResult<Vec<EvidenceItem>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.items.clone())
    }
}

/// Search provider replaying scripted snippet lists, then numbered results.
pub struct ScriptedSearch {
    results: Mutex<VecDeque<Vec<String>>>,
    calls: AtomicUsize,
}

impl ScriptedSearch {
    pub fn new(results: Vec<Vec<&str>>) -> Self {
        Self {
            results: Mutex::new(
                results
                    .into_iter()
                    .map(|r| r.into_iter().map(String::from).collect())
                    .collect(),
            ),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl SearchProvider for ScriptedSearch {
    fn provider_name(&self) -> &str {
        "scripted"
    }

    async fn fetch_snippets(&self, _query: &str, k: usize) -> AppResult<Vec<String>> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        let snippets = self
            .results
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| vec![format!("web result {}", call)]);
        Ok(snippets.into_iter().take(k).collect())
    }
}

pub fn fast_config() -> RunConfig {
    RunConfig {
        per_call_timeout: Duration::from_secs(5),
        run_timeout: Duration::from_secs(10),
        ..RunConfig::default()
    }
}

pub fn engine(
    judge: &Arc<ScriptedJudge>,
    store: &Arc<FixedStore>,
    search: &Arc<ScriptedSearch>,
    config: RunConfig,
) -> Engine {
    Engine::new(judge.clone(), store.clone(), search.clone(), config)
}
