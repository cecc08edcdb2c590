//! Search provider trait.

use crag_core::AppResult;
use crag_knowledge::EvidenceItem;

/// Returns top-k web snippets for a query string.
#[async_trait::async_trait]
pub trait SearchProvider: Send + Sync {
    /// Provider name for logs (e.g., "tavily").
    fn provider_name(&self) -> &str;

    /// Raw snippet texts, best first, at most `k`.
    async fn fetch_snippets(&self, query: &str, k: usize) -> AppResult<Vec<String>>;

    /// Search and join the snippets into one evidence item.
    ///
    /// Returns an empty sequence when the provider found nothing.
    async fn search(&self, query: &str, k: usize) -> AppResult<Vec<EvidenceItem>> {
        let snippets = self.fetch_snippets(query, k).await?;
        tracing::debug!(
            provider = self.provider_name(),
            snippets = snippets.len(),
            "Search returned snippets"
        );
        Ok(join_snippets(&snippets).into_iter().collect())
    }
}

/// Join snippets with newlines into a single search-sourced item.
///
/// Blank snippets are dropped; `None` if nothing is left.
pub fn join_snippets(snippets: &[String]) -> Option<EvidenceItem> {
    let parts: Vec<&str> = snippets
        .iter()
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .collect();

    if parts.is_empty() {
        None
    } else {
        Some(EvidenceItem::from_search(parts.join("\n")))
    }
}
