//! In-memory corpus index for knowledge chunks.
//!
//! The index is built once, offline, from a set of documents and is
//! read-only afterwards. Persisting it is left to the caller.

use crate::chunker::chunk_text;
use crate::embeddings::Embedder;
use crate::types::{CorpusDocument, IndexStats, KnowledgeChunk};
use crag_core::config::KnowledgeSettings;
use crag_core::{AppError, AppResult};
use sha2::{Digest, Sha256};
use std::collections::HashSet;

/// Vector index over embedded chunks.
#[derive(Debug, Default)]
pub struct CorpusIndex {
    chunks: Vec<KnowledgeChunk>,
    hashes: HashSet<String>,
    dimensions: usize,
    stats: IndexStats,
}

impl CorpusIndex {
    /// Create an empty index for embeddings of `dimensions`.
    pub fn new(dimensions: usize) -> Self {
        Self {
            dimensions,
            ..Self::default()
        }
    }

    /// Chunk, embed and index `documents`.
    pub async fn build(
        documents: &[CorpusDocument],
        settings: &KnowledgeSettings,
        embedder: &dyn Embedder,
    ) -> AppResult<Self> {
        let mut index = Self::new(embedder.dimensions());
        for document in documents {
            index.add_document(document, settings, embedder).await?;
        }

        tracing::info!(
            "Indexed {} documents into {} chunks ({} duplicates skipped)",
            index.stats.documents,
            index.stats.chunks,
            index.stats.duplicates_skipped
        );

        Ok(index)
    }

    /// Chunk, embed and add a single document.
    ///
    /// Chunks whose text was already indexed are skipped.
    pub async fn add_document(
        &mut self,
        document: &CorpusDocument,
        settings: &KnowledgeSettings,
        embedder: &dyn Embedder,
    ) -> AppResult<u32> {
        let candidates = chunk_text(
            &document.id,
            &document.text,
            settings.chunk_size,
            settings.chunk_overlap,
        );

        let mut fresh = Vec::new();
        for candidate in candidates {
            let hash = content_hash(&candidate.text);
            if self.hashes.insert(hash) {
                fresh.push(candidate);
            } else {
                self.stats.duplicates_skipped += 1;
            }
        }

        let texts: Vec<String> = fresh.iter().map(|c| c.text.clone()).collect();
        let embeddings = embedder.embed_batch(&texts).await?;
        if embeddings.len() != fresh.len() {
            return Err(AppError::Knowledge(format!(
                "Embedder returned {} vectors for {} chunks",
                embeddings.len(),
                fresh.len()
            )));
        }

        let added = fresh.len() as u32;
        for (candidate, embedding) in fresh.into_iter().zip(embeddings) {
            let mut metadata = candidate.metadata;
            if let Some(origin) = &document.origin {
                metadata["origin"] = serde_json::json!(origin);
            }

            self.insert(KnowledgeChunk {
                id: uuid::Uuid::new_v4().to_string(),
                source_id: candidate.source_id,
                position: candidate.position,
                text: candidate.text,
                embedding,
                metadata,
            })?;
        }

        self.stats.documents += 1;
        tracing::debug!("Indexed document '{}': {} chunks", document.id, added);
        Ok(added)
    }

    /// Insert an already embedded chunk.
    pub fn insert(&mut self, chunk: KnowledgeChunk) -> AppResult<()> {
        if chunk.embedding.len() != self.dimensions {
            return Err(AppError::Knowledge(format!(
                "Embedding dimension mismatch: expected {}, got {}",
                self.dimensions,
                chunk.embedding.len()
            )));
        }

        self.hashes.insert(content_hash(&chunk.text));
        self.chunks.push(chunk);
        self.stats.chunks += 1;
        Ok(())
    }

    /// Search for the top-k most similar chunks to the query embedding.
    ///
    /// Returns chunks ordered by descending similarity; ties keep insertion
    /// order so repeated searches return the same sequence.
    pub fn search(&self, query_embedding: &[f32], top_k: usize) -> Vec<(&KnowledgeChunk, f32)> {
        let mut results: Vec<(&KnowledgeChunk, f32)> = self
            .chunks
            .iter()
            .map(|chunk| (chunk, cosine_similarity(query_embedding, &chunk.embedding)))
            .collect();

        // Stable sort keeps insertion order among equal scores
        results.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        results.truncate(top_k);

        tracing::debug!(
            "Retrieved {} chunks (requested top-{})",
            results.len(),
            top_k
        );

        results
    }

    pub fn stats(&self) -> IndexStats {
        self.stats
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }
}

fn content_hash(text: &str) -> String {
    let digest = Sha256::digest(text.as_bytes());
    digest.iter().map(|b| format!("{:02x}", b)).collect()
}

/// Calculate cosine similarity between two vectors.
fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot_product / (norm_a * norm_b)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embeddings::TrigramEmbedder;

    fn chunk(id: &str, text: &str, embedding: Vec<f32>) -> KnowledgeChunk {
        KnowledgeChunk {
            id: id.to_string(),
            source_id: "source1".to_string(),
            position: 0,
            text: text.to_string(),
            embedding,
            metadata: serde_json::json!({}),
        }
    }

    #[test]
    fn test_cosine_similarity() {
        assert!((cosine_similarity(&[1.0, 0.0, 0.0], &[1.0, 0.0, 0.0]) - 1.0).abs() < 0.001);
        assert!(cosine_similarity(&[1.0, 0.0, 0.0], &[0.0, 1.0, 0.0]).abs() < 0.001);
        assert_eq!(cosine_similarity(&[1.0, 0.0], &[1.0, 0.0, 0.0]), 0.0);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]), 0.0);
    }

    #[test]
    fn test_search_orders_by_score() {
        let mut index = CorpusIndex::new(3);
        index.insert(chunk("far", "far", vec![0.0, 1.0, 0.0])).unwrap();
        index.insert(chunk("near", "near", vec![1.0, 0.0, 0.0])).unwrap();
        index.insert(chunk("mid", "mid", vec![0.7, 0.7, 0.0])).unwrap();

        let results = index.search(&[1.0, 0.0, 0.0], 2);
        let ids: Vec<&str> = results.iter().map(|(c, _)| c.id.as_str()).collect();
        assert_eq!(ids, vec!["near", "mid"]);
        assert!(results[0].1 > results[1].1);
    }

    #[test]
    fn test_ties_keep_insertion_order() {
        let mut index = CorpusIndex::new(2);
        index.insert(chunk("first", "a", vec![1.0, 0.0])).unwrap();
        index.insert(chunk("second", "b", vec![1.0, 0.0])).unwrap();

        let ids: Vec<String> = index
            .search(&[1.0, 0.0], 5)
            .iter()
            .map(|(c, _)| c.id.clone())
            .collect();
        assert_eq!(ids, vec!["first", "second"]);
    }

    #[test]
    fn test_insert_rejects_wrong_dimension() {
        let mut index = CorpusIndex::new(3);
        let result = index.insert(chunk("bad", "bad", vec![1.0]));
        assert!(matches!(result, Err(AppError::Knowledge(_))));
        assert!(index.is_empty());
    }

    #[tokio::test]
    async fn test_build_skips_duplicate_chunks() {
        let embedder = TrigramEmbedder::new(64);
        let settings = KnowledgeSettings {
            chunk_size: 1000,
            chunk_overlap: 0,
            top_k: 4,
            embedding_dim: 64,
        };
        let documents = vec![
            CorpusDocument::new("d1", "Agents use short-term memory.")
                .with_origin("https://example.com/agents"),
            CorpusDocument::new("d2", "Agents use short-term memory."),
            CorpusDocument::new("d3", "Prompt injection is an adversarial attack."),
        ];

        let index = CorpusIndex::build(&documents, &settings, &embedder)
            .await
            .unwrap();

        assert_eq!(index.len(), 2);
        assert_eq!(
            index.stats(),
            IndexStats {
                documents: 3,
                chunks: 2,
                duplicates_skipped: 1,
            }
        );
        assert_eq!(
            index.chunks[0].metadata["origin"],
            "https://example.com/agents"
        );
    }
}
