//! Self-correcting retrieval and generation workflow.
//!
//! A question is routed to the corpus index or to web search, the retrieved
//! evidence is graded, an answer is generated and then verified for
//! groundedness and usefulness. Failed checks loop back to regeneration or
//! to a fresh search, within configured bounds.
//!
//! The control flow lives in [`machine`] as a pure transition function;
//! [`engine::Engine`] performs the I/O for each step.

pub mod config;
pub mod engine;
pub mod judge;
pub mod machine;
pub mod outcome;

pub use config::RunConfig;
pub use engine::Engine;
pub use judge::{parse_verdict, Grade, JudgmentService, LlmJudge, Route, Verdict, VerdictKind};
pub use machine::{advance, Event, FailureReason, Limits, RunState, Step, Verification};
pub use outcome::{RunOutcome, RunStats, RunStatus};
pub use tokio_util::sync::CancellationToken;
