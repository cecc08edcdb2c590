//! Corpus index and evidence store.
//!
//! The corpus index is built once, offline, from raw documents: text is
//! chunked, embedded and held in memory. The workflow reads it only through
//! the `EvidenceStore` trait.

pub mod chunker;
pub mod embeddings;
pub mod index;
pub mod store;
pub mod types;

// Re-export commonly used types
pub use embeddings::{Embedder, TrigramEmbedder};
pub use index::CorpusIndex;
pub use store::{EvidenceStore, IndexEvidenceStore};
pub use types::{
    dedup_evidence, CorpusDocument, EvidenceItem, EvidenceSource, IndexStats, KnowledgeChunk,
};
