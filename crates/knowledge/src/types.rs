//! Knowledge system type definitions.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Where a piece of evidence came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EvidenceSource {
    /// The pre-built corpus index
    Index,
    /// A live web search
    Search,
}

impl fmt::Display for EvidenceSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EvidenceSource::Index => f.write_str("index"),
            EvidenceSource::Search => f.write_str("search"),
        }
    }
}

/// One unit of supporting text available to generation and verification.
///
/// Items are immutable once created; the workflow only filters or appends them.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EvidenceItem {
    text: String,
    source: EvidenceSource,
}

impl EvidenceItem {
    pub fn new(text: impl Into<String>, source: EvidenceSource) -> Self {
        Self {
            text: text.into(),
            source,
        }
    }

    /// An item retrieved from the corpus index.
    pub fn from_index(text: impl Into<String>) -> Self {
        Self::new(text, EvidenceSource::Index)
    }

    /// An item produced by a web search.
    pub fn from_search(text: impl Into<String>) -> Self {
        Self::new(text, EvidenceSource::Search)
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn source(&self) -> EvidenceSource {
        self.source
    }
}

/// Remove repeated (text, source) pairs, keeping first occurrences in order.
pub fn dedup_evidence(items: Vec<EvidenceItem>) -> Vec<EvidenceItem> {
    let mut seen = std::collections::HashSet::new();
    items
        .into_iter()
        .filter(|item| seen.insert((item.text.clone(), item.source)))
        .collect()
}

/// A raw document handed to the offline indexer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorpusDocument {
    /// Stable document identifier
    pub id: String,

    /// Where the document came from (URL or path), if known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin: Option<String>,

    /// Full text content
    pub text: String,
}

impl CorpusDocument {
    pub fn new(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            origin: None,
            text: text.into(),
        }
    }

    pub fn with_origin(mut self, origin: impl Into<String>) -> Self {
        self.origin = Some(origin.into());
        self
    }
}

/// A text chunk with embedding.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnowledgeChunk {
    /// Unique chunk identifier
    pub id: String,

    /// Source document ID
    pub source_id: String,

    /// Position within source
    pub position: u32,

    /// Text content
    pub text: String,

    /// Embedding vector (normalized)
    pub embedding: Vec<f32>,

    /// Metadata (e.g., byte range, origin)
    #[serde(default)]
    pub metadata: serde_json::Value,
}

/// Internal chunk candidate before embedding.
#[derive(Debug, Clone)]
pub struct ChunkCandidate {
    pub source_id: String,
    pub position: u32,
    pub text: String,
    pub metadata: serde_json::Value,
}

/// Statistics from building an index.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexStats {
    /// Documents processed
    pub documents: u32,

    /// Chunks stored
    pub chunks: u32,

    /// Chunks skipped because identical text was already indexed
    pub duplicates_skipped: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dedup_keeps_first_and_order() {
        let items = vec![
            EvidenceItem::from_index("a"),
            EvidenceItem::from_index("b"),
            EvidenceItem::from_index("a"),
            EvidenceItem::from_search("a"),
        ];
        let deduped = dedup_evidence(items);
        assert_eq!(
            deduped,
            vec![
                EvidenceItem::from_index("a"),
                EvidenceItem::from_index("b"),
                EvidenceItem::from_search("a"),
            ]
        );
    }

    #[test]
    fn test_evidence_item_serialization() {
        let item = EvidenceItem::from_search("snippet");
        let json = serde_json::to_value(&item).unwrap();
        assert_eq!(json, serde_json::json!({"text": "snippet", "source": "search"}));
    }
}
