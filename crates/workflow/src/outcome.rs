//! Run results returned to callers.

use crag_knowledge::EvidenceItem;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::judge::Route;
use crate::machine::{FailureReason, RunState, Step};

/// How a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RunStatus {
    /// The answer passed both verification checks
    Ok,
    /// No verified answer could be produced; any answer attached is unverified
    Failed,
    /// Cancelled or timed out; no answer
    Cancelled,
}

/// Counters collected during a run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunStats {
    pub route: Option<Route>,
    pub judgment_calls: u32,
    pub generations: u32,
    pub groundedness_failures: u32,
    pub usefulness_failures: u32,
    pub searches: u32,
}

/// Result of one workflow run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunOutcome {
    pub run_id: Uuid,
    pub status: RunStatus,

    /// Verified answer when `Ok`, last unverified answer when `Failed`
    pub answer: Option<String>,

    pub evidence_used: Vec<EvidenceItem>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure: Option<FailureReason>,

    pub stats: RunStats,
}

impl RunOutcome {
    /// Build the outcome for a run that stopped at `step`.
    pub(crate) fn finish(run_id: Uuid, step: Step, state: RunState, stats: RunStats) -> Self {
        let (evidence, answer) = state.into_parts();
        let (status, answer, failure) = match step {
            Step::Done => (RunStatus::Ok, answer, None),
            Step::Failed(reason) => (RunStatus::Failed, answer, Some(reason)),
            _ => (RunStatus::Cancelled, None, None),
        };

        Self {
            run_id,
            status,
            answer,
            evidence_used: evidence,
            failure,
            stats,
        }
    }

    /// Whether the answer passed verification.
    pub fn is_verified(&self) -> bool {
        self.status == RunStatus::Ok
    }

    /// The answer, only if it passed verification.
    pub fn verified_answer(&self) -> Option<&str> {
        if self.is_verified() {
            self.answer.as_deref()
        } else {
            None
        }
    }
}
