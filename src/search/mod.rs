// Search module
// Query sanitisation, encoding and nearest-neighbour lookup, plus ranking

pub mod ranker;

#[cfg(test)]
mod tests;

pub use ranker::{SearchResult, SimilarityRanker, similarity};

use tracing::debug;

use crate::database::lancedb::{CollectionHandle, RawHit, VectorStore};
use crate::embeddings::EmbeddingModel;
use crate::{Result, SearchError};

/// Turns a raw query string into nearest-neighbour hits for one collection
pub struct QueryProcessor<'a> {
    model: &'a dyn EmbeddingModel,
    store: &'a VectorStore,
    collection: &'a CollectionHandle,
}

impl<'a> QueryProcessor<'a> {
    #[inline]
    pub fn new(
        model: &'a dyn EmbeddingModel,
        store: &'a VectorStore,
        collection: &'a CollectionHandle,
    ) -> Self {
        Self {
            model,
            store,
            collection,
        }
    }

    /// Hits for `raw_query` in the store's order (ascending distance)
    #[inline]
    pub async fn search(&self, raw_query: &str, top_k: usize) -> Result<Vec<RawHit>> {
        if top_k == 0 {
            return Err(SearchError::InvalidArgument(
                "result count must be at least 1".to_string(),
            ));
        }

        let query = sanitize_query(raw_query)?;
        debug!("Searching '{}' for: {}", self.collection.name(), query);

        let vector = self.model.encode(&query)?;
        self.store.query(self.collection, &vector, top_k).await
    }
}

/// Strip everything except letters, digits and whitespace.
///
/// Fails with `EmptyQuery` if nothing searchable is left.
#[inline]
pub fn sanitize_query(raw: &str) -> Result<String> {
    if raw.trim().is_empty() {
        return Err(SearchError::EmptyQuery);
    }

    let cleaned: String = raw
        .chars()
        .filter(|c| c.is_alphanumeric() || c.is_whitespace())
        .collect();

    let cleaned = cleaned.trim();
    if cleaned.is_empty() {
        return Err(SearchError::EmptyQuery);
    }

    Ok(cleaned.to_string())
}
