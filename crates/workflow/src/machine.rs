//! The workflow state machine.
//!
//! `advance` is a pure function from the current step, the run state and
//! the result of the step's I/O to the next step and run state. The engine
//! performs the I/O; every control-flow decision and loop bound is here.
//!
//! ```text
//! ROUTE     vectorstore -> RETRIEVE, websearch -> SEARCH
//! RETRIEVE  -> GRADE
//! GRADE     all relevant -> GENERATE, otherwise -> SEARCH
//! SEARCH    -> GENERATE
//! GENERATE  -> VERIFY
//! VERIFY    ungrounded -> GENERATE, not useful -> SEARCH, accepted -> DONE
//! ```
//!
//! A search that follows an unhelpful answer must add evidence; if it adds
//! none the run fails rather than regenerating from the same evidence.

use crag_core::{AppError, AppResult};
use crag_knowledge::{dedup_evidence, EvidenceItem};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::judge::{Grade, Route};

/// Why a run ended in `Failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FailureReason {
    /// Too many consecutive ungrounded generations
    VerifyRetriesExhausted,
    /// Too many re-searches after unhelpful answers
    SearchRetriesExhausted,
    /// Search left the run with no evidence to answer from
    NoEvidence,
    /// Re-searching after an unhelpful answer found nothing new
    NoNewEvidence,
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureReason::VerifyRetriesExhausted => {
                f.write_str("retry budget exhausted: answer never grounded in evidence")
            }
            FailureReason::SearchRetriesExhausted => {
                f.write_str("retry budget exhausted: answer never addressed the question")
            }
            FailureReason::NoEvidence => f.write_str("no evidence found for the question"),
            FailureReason::NoNewEvidence => {
                f.write_str("search after an unhelpful answer returned no new evidence")
            }
        }
    }
}

/// A workflow state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Route,
    Retrieve,
    Grade,
    Search,
    Generate,
    Verify,
    Done,
    Failed(FailureReason),
    Cancelled,
}

impl Step {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Step::Done | Step::Failed(_) | Step::Cancelled)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Step::Route => "ROUTE",
            Step::Retrieve => "RETRIEVE",
            Step::Grade => "GRADE",
            Step::Search => "SEARCH",
            Step::Generate => "GENERATE",
            Step::Verify => "VERIFY",
            Step::Done => "DONE",
            Step::Failed(_) => "FAILED",
            Step::Cancelled => "CANCELLED",
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Combined result of the two verification checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verification {
    /// The answer is not supported by the evidence
    Ungrounded,
    /// Grounded, but does not address the question
    NotUseful,
    /// Grounded and useful
    Accepted,
}

/// Result of performing one step's I/O.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Routed(Route),
    Retrieved(Vec<EvidenceItem>),
    /// One grade per evidence item, in evidence order
    Graded(Vec<Grade>),
    Searched(Vec<EvidenceItem>),
    Generated(String),
    Verified(Verification),
}

impl Event {
    fn name(&self) -> &'static str {
        match self {
            Event::Routed(_) => "routed",
            Event::Retrieved(_) => "retrieved",
            Event::Graded(_) => "graded",
            Event::Searched(_) => "searched",
            Event::Generated(_) => "generated",
            Event::Verified(_) => "verified",
        }
    }
}

/// Loop bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limits {
    pub max_verify_retries: u32,
    pub max_search_retries: u32,
}

/// State threaded through one run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunState {
    question: String,
    evidence: Vec<EvidenceItem>,
    needs_search: bool,
    research_pending: bool,
    answer: Option<String>,
    verify_failures: u32,
    search_retries: u32,
}

impl RunState {
    pub fn new(question: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            evidence: Vec::new(),
            needs_search: false,
            research_pending: false,
            answer: None,
            verify_failures: 0,
            search_retries: 0,
        }
    }

    pub fn question(&self) -> &str {
        &self.question
    }

    pub fn evidence(&self) -> &[EvidenceItem] {
        &self.evidence
    }

    /// Set once any retrieved passage was graded irrelevant.
    pub fn needs_search(&self) -> bool {
        self.needs_search
    }

    /// The latest generated answer, if generation has run.
    pub fn answer(&self) -> Option<&str> {
        self.answer.as_deref()
    }

    /// Consecutive groundedness failures against the current evidence.
    pub fn verify_failures(&self) -> u32 {
        self.verify_failures
    }

    /// Searches triggered by usefulness failures.
    pub fn search_retries(&self) -> u32 {
        self.search_retries
    }

    /// Consume the state into its evidence and answer.
    pub fn into_parts(self) -> (Vec<EvidenceItem>, Option<String>) {
        (self.evidence, self.answer)
    }

    /// Append items not already present; returns how many were added.
    fn append_evidence(&mut self, items: Vec<EvidenceItem>) -> usize {
        let before = self.evidence.len();
        for item in items {
            if !self.evidence.contains(&item) {
                self.evidence.push(item);
            }
        }
        self.evidence.len() - before
    }
}

/// Compute the next step and run state.
///
/// Fails with `AppError::Workflow` if `event` does not belong to `step`
/// or `step` is terminal.
pub fn advance(
    step: Step,
    mut state: RunState,
    event: Event,
    limits: &Limits,
) -> AppResult<(Step, RunState)> {
    let next = match (step, event) {
        (Step::Route, Event::Routed(Route::VectorStore)) => Step::Retrieve,
        (Step::Route, Event::Routed(Route::WebSearch)) => Step::Search,

        (Step::Retrieve, Event::Retrieved(items)) => {
            state.evidence = dedup_evidence(items);
            Step::Grade
        }

        (Step::Grade, Event::Graded(grades)) => {
            if grades.len() != state.evidence.len() {
                return Err(AppError::Workflow(format!(
                    "received {} grades for {} evidence items",
                    grades.len(),
                    state.evidence.len()
                )));
            }

            let before = state.evidence.len();
            state.evidence = std::mem::take(&mut state.evidence)
                .into_iter()
                .zip(grades)
                .filter_map(|(item, grade)| grade.is_yes().then_some(item))
                .collect();

            if state.evidence.len() < before {
                state.needs_search = true;
            }

            if state.needs_search || state.evidence.is_empty() {
                Step::Search
            } else {
                Step::Generate
            }
        }

        (Step::Search, Event::Searched(items)) => {
            let research = std::mem::take(&mut state.research_pending);
            let added = state.append_evidence(items);
            if added > 0 {
                state.verify_failures = 0;
            }

            if research && added == 0 {
                Step::Failed(FailureReason::NoNewEvidence)
            } else if state.evidence.is_empty() {
                Step::Failed(FailureReason::NoEvidence)
            } else {
                Step::Generate
            }
        }

        (Step::Generate, Event::Generated(answer)) => {
            state.answer = Some(answer);
            Step::Verify
        }

        (Step::Verify, Event::Verified(Verification::Ungrounded)) => {
            state.verify_failures += 1;
            if state.verify_failures >= limits.max_verify_retries {
                Step::Failed(FailureReason::VerifyRetriesExhausted)
            } else {
                Step::Generate
            }
        }

        (Step::Verify, Event::Verified(Verification::NotUseful)) => {
            state.verify_failures = 0;
            if state.search_retries >= limits.max_search_retries {
                Step::Failed(FailureReason::SearchRetriesExhausted)
            } else {
                state.search_retries += 1;
                state.research_pending = true;
                Step::Search
            }
        }

        (Step::Verify, Event::Verified(Verification::Accepted)) => Step::Done,

        (step, event) => {
            return Err(AppError::Workflow(format!(
                "event '{}' is not valid in step {}",
                event.name(),
                step
            )))
        }
    };

    Ok((next, state))
}
