//! Text chunking with configurable size and overlap.

use crate::types::ChunkCandidate;
use text_splitter::{ChunkConfig, TextSplitter};

/// Chunk text into overlapping segments of at most `chunk_size` characters.
///
/// Splits at the largest semantic boundary that fits (paragraphs, then
/// sentences, words and graphemes). An `overlap` that is not smaller than
/// `chunk_size` is ignored. Whitespace-only chunks are skipped.
pub fn chunk_text(
    source_id: &str,
    text: &str,
    chunk_size: usize,
    overlap: usize,
) -> Vec<ChunkCandidate> {
    if text.is_empty() || chunk_size == 0 {
        return vec![];
    }

    let overlap = if overlap < chunk_size { overlap } else { 0 };
    let config = ChunkConfig::new(chunk_size)
        .with_overlap(overlap)
        .unwrap_or_else(|_| ChunkConfig::new(chunk_size));
    let splitter = TextSplitter::new(config);

    let mut chunks = Vec::new();
    let mut position = 0u32;

    for (start, chunk) in splitter.chunk_indices(text) {
        if chunk.trim().is_empty() {
            continue;
        }

        chunks.push(ChunkCandidate {
            source_id: source_id.to_string(),
            position,
            text: chunk.to_string(),
            metadata: serde_json::json!({
                "start": start,
                "end": start + chunk.len(),
            }),
        });
        position += 1;
    }

    tracing::debug!(
        "Chunked text into {} chunks (size: {}, overlap: {})",
        chunks.len(),
        chunk_size,
        overlap
    );

    chunks
}
