//! Evidence store: the read-only query interface over the corpus index.

use crate::embeddings::Embedder;
use crate::index::CorpusIndex;
use crate::types::{dedup_evidence, EvidenceItem};
use crag_core::{retry_transient, AppResult, RetryPolicy};
use std::sync::Arc;

/// Returns ranked candidate passages for a question.
///
/// No relevance filtering happens here: grading belongs to the workflow.
/// Implementations must be idempotent and free of side effects.
#[async_trait::async_trait]
pub trait EvidenceStore: Send + Sync {
    /// Nearest-match passages for `question`, best first, all sourced from the index.
    async fn query(&self, question: &str) -> AppResult<Vec<EvidenceItem>>;
}

/// Evidence store backed by an in-memory `CorpusIndex`.
#[derive(Debug, Clone)]
pub struct IndexEvidenceStore {
    index: Arc<CorpusIndex>,
    embedder: Arc<dyn Embedder>,
    top_k: usize,
    retry: RetryPolicy,
}

impl IndexEvidenceStore {
    pub fn new(index: Arc<CorpusIndex>, embedder: Arc<dyn Embedder>, top_k: usize) -> Self {
        Self {
            index,
            embedder,
            top_k,
            retry: RetryPolicy::default(),
        }
    }

    /// Retry policy for the question embedding call.
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }
}

#[async_trait::async_trait]
impl EvidenceStore for IndexEvidenceStore {
    async fn query(&self, question: &str) -> AppResult<Vec<EvidenceItem>> {
        let embedding = retry_transient(&self.retry, "embed_question", || {
            self.embedder.embed(question)
        })
        .await?;

        let items: Vec<EvidenceItem> = self
            .index
            .search(&embedding, self.top_k)
            .into_iter()
            .map(|(chunk, _score)| EvidenceItem::from_index(chunk.text.clone()))
            .collect();

        Ok(dedup_evidence(items))
    }
}
