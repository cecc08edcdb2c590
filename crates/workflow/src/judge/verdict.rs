//! Structured verdicts returned by the judgment model.
//!
//! Every verdict is a JSON object with exactly one key whose value is drawn
//! from a closed vocabulary. Anything else is a `MalformedVerdict`.

use crag_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Which judgment produced a verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VerdictKind {
    Route,
    Relevance,
    Groundedness,
    Usefulness,
}

impl VerdictKind {
    /// The single JSON key the verdict must carry.
    pub fn key(&self) -> &'static str {
        match self {
            VerdictKind::Route => "datasource",
            _ => "score",
        }
    }

    /// Accepted values, lowercase.
    pub fn vocabulary(&self) -> &'static [&'static str] {
        match self {
            VerdictKind::Route => &["websearch", "vectorstore"],
            _ => &["yes", "no"],
        }
    }

    /// Task name used in errors and logs.
    pub fn task(&self) -> &'static str {
        match self {
            VerdictKind::Route => "route",
            VerdictKind::Relevance => "relevance",
            VerdictKind::Groundedness => "groundedness",
            VerdictKind::Usefulness => "usefulness",
        }
    }
}

impl fmt::Display for VerdictKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.task())
    }
}

/// A parsed verdict. `value` is always one of `kind.vocabulary()`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Verdict {
    pub kind: VerdictKind,
    pub value: String,
}

/// Parse raw model output into a verdict of `kind`.
///
/// The value is trimmed and compared case-insensitively. The object must
/// hold exactly the expected key.
pub fn parse_verdict(kind: VerdictKind, raw: &str) -> AppResult<Verdict> {
    let malformed = || AppError::malformed(kind.task(), raw);

    let value: serde_json::Value = serde_json::from_str(raw.trim()).map_err(|_| malformed())?;
    let object = value.as_object().ok_or_else(malformed)?;
    if object.len() != 1 {
        return Err(malformed());
    }

    let normalized = object
        .get(kind.key())
        .and_then(|v| v.as_str())
        .map(|v| v.trim().to_lowercase())
        .ok_or_else(malformed)?;

    if !kind.vocabulary().contains(&normalized.as_str()) {
        return Err(malformed());
    }

    Ok(Verdict {
        kind,
        value: normalized,
    })
}
