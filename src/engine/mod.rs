// Engine module
// Long-lived search context: store, model and indexer opened once, used for many queries


use std::sync::Arc;

use tracing::{debug, info};

use crate::config::Config;
use crate::corpus::Document;
use crate::database::lancedb::{CollectionHandle, VectorStore};
use crate::embeddings::EmbeddingModel;
use crate::indexer::{BuildReport, CorpusIndexer};
use crate::search::{QueryProcessor, SearchResult, SimilarityRanker};
use crate::{Result, SearchError};

pub struct SearchEngine {
    config: Config,
    model: Arc<dyn EmbeddingModel>,
    store: VectorStore,
    indexer: CorpusIndexer,
    ranker: SimilarityRanker,
}

impl SearchEngine {
    /// Open the vector store named by `config` and wire it to `model`
    #[inline]
    pub async fn open(config: Config, model: Arc<dyn EmbeddingModel>) -> Result<Self> {
        let store = VectorStore::new(&config).await?;
        Ok(Self::with_store(config, model, store))
    }

    /// Use an already opened store
    #[inline]
    pub fn with_store(config: Config, model: Arc<dyn EmbeddingModel>, store: VectorStore) -> Self {
        let indexer = CorpusIndexer::new(
            Arc::clone(&model),
            store.clone(),
            config.ollama.batch_size as usize,
        );
        let ranker = SimilarityRanker::new(config.search.snippet_length);

        debug!(
            "Search engine ready with model '{}' ({} dimensions)",
            model.model_id(),
            model.dimension()
        );

        Self {
            config,
            model,
            store,
            indexer,
            ranker,
        }
    }

    /// Suppress the indexing progress bar
    #[inline]
    #[must_use]
    pub fn quiet(mut self) -> Self {
        self.indexer = self.indexer.quiet();
        self
    }

    #[inline]
    pub async fn build_if_absent(&self, corpus: &[Document], name: &str) -> Result<BuildReport> {
        self.indexer.build_if_absent(corpus, name).await
    }

    /// Handle for an existing collection
    #[inline]
    pub async fn collection(&self, name: &str) -> Result<CollectionHandle> {
        self.store
            .open_collection(name)
            .await?
            .ok_or_else(|| SearchError::NotFound(format!("collection '{}'", name)))
    }

    /// Sanitise, encode, look up and rank
    #[inline]
    pub async fn search(
        &self,
        collection: &CollectionHandle,
        query: &str,
        top_k: usize,
    ) -> Result<Vec<SearchResult>> {
        let processor = QueryProcessor::new(self.model.as_ref(), &self.store, collection);
        let hits = processor.search(query, top_k).await?;
        Ok(self.ranker.rank(hits))
    }

    #[inline]
    pub const fn config(&self) -> &Config {
        &self.config
    }

    #[inline]
    pub const fn store(&self) -> &VectorStore {
        &self.store
    }

    #[inline]
    pub fn model(&self) -> &dyn EmbeddingModel {
        self.model.as_ref()
    }

    /// End of the engine's lifetime. Everything written is already committed.
    #[inline]
    pub fn close(self) {
        info!("Closing search engine");
    }
}
