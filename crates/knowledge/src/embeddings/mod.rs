//! Embedding providers for the corpus index.
//!
//! Embedding computation is a capability: the index depends only on the
//! `Embedder` trait. A deterministic trigram embedder ships for offline use
//! and tests.

pub mod trigram;

pub use trigram::TrigramEmbedder;

use crag_core::{AppError, AppResult};

/// Trait for embedding providers.
#[async_trait::async_trait]
pub trait Embedder: Send + Sync + std::fmt::Debug {
    /// Get model identifier
    fn model_name(&self) -> &str;

    /// Get embedding dimensions
    fn dimensions(&self) -> usize;

    /// Generate embeddings for multiple texts in a batch.
    async fn embed_batch(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>>;

    /// Generate embedding for a single text (convenience method).
    async fn embed(&self, text: &str) -> AppResult<Vec<f32>> {
        let mut results = self.embed_batch(&[text.to_string()]).await?;
        results
            .pop()
            .ok_or_else(|| AppError::Knowledge("No embedding returned".to_string()))
    }
}
