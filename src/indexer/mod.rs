// Indexer module
// One-shot population of a collection from a corpus

#[cfg(test)]
mod tests;

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, info};

use crate::corpus::Document;
use crate::database::lancedb::{
    CollectionHandle, CollectionSpec, Creation, IndexRecord, RecordMetadata, VectorStore,
};
use crate::embeddings::EmbeddingModel;
use crate::{Result, SearchError};

/// Builds collections from a corpus, at most once per collection name
pub struct CorpusIndexer {
    model: Arc<dyn EmbeddingModel>,
    store: VectorStore,
    batch_size: usize,
    show_progress: bool,
    build_locks: BuildLocks,
}

/// Outcome of [`CorpusIndexer::build_if_absent`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildReport {
    pub handle: CollectionHandle,
    /// Whether this call embedded and wrote the corpus
    pub built: bool,
    /// Records in the collection after the call
    pub records: usize,
}

/// One async mutex per collection name
#[derive(Default)]
struct BuildLocks {
    locks: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl BuildLocks {
    fn lock_for(&self, name: &str) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(locks.entry(name.to_string()).or_default())
    }
}

impl CorpusIndexer {
    #[inline]
    pub fn new(model: Arc<dyn EmbeddingModel>, store: VectorStore, batch_size: usize) -> Self {
        Self {
            model,
            store,
            batch_size: batch_size.max(1),
            show_progress: true,
            build_locks: BuildLocks::default(),
        }
    }

    /// Disable the terminal progress bar
    #[inline]
    #[must_use]
    pub const fn quiet(mut self) -> Self {
        self.show_progress = false;
        self
    }

    /// Build `name` from `corpus` unless the collection already exists.
    ///
    /// An existing collection is returned untouched and the corpus is ignored.
    /// Otherwise the corpus is validated, embedded in order, and written in a
    /// single commit with ids `"0"`, `"1"`, ... following input position. Any
    /// failure before that commit leaves no collection behind.
    #[inline]
    pub async fn build_if_absent(&self, corpus: &[Document], name: &str) -> Result<BuildReport> {
        let lock = self.build_locks.lock_for(name);
        let _guard = lock.lock().await;

        if let Some(handle) = self.store.open_collection(name).await? {
            info!("Collection '{}' already exists, skipping build", name);
            let records = self.store.count_records(&handle).await?;
            return Ok(BuildReport {
                handle,
                built: false,
                records,
            });
        }

        info!("Building collection '{}' from {} documents", name, corpus.len());
        validate_corpus(corpus)?;

        let vectors = self.encode_corpus(corpus)?;
        let records = build_records(corpus, vectors);

        let spec = CollectionSpec {
            dimension: self.model.dimension(),
            model: self.model.model_id().to_string(),
        };

        match self
            .store
            .create_collection_with(name, &spec, &records)
            .await?
        {
            Creation::Created(handle) => {
                info!(
                    "Collection '{}' built with {} records",
                    name,
                    records.len()
                );
                Ok(BuildReport {
                    handle,
                    built: true,
                    records: records.len(),
                })
            }
            Creation::Existing(handle) => {
                let records = self.store.count_records(&handle).await?;
                Ok(BuildReport {
                    handle,
                    built: false,
                    records,
                })
            }
        }
    }

    fn encode_corpus(&self, corpus: &[Document]) -> Result<Vec<Vec<f32>>> {
        let texts: Vec<String> = corpus.iter().map(|d| d.body.clone()).collect();
        let expected = self.model.dimension();

        let bar = if self.show_progress && console::user_attended_stderr() {
            ProgressBar::new(texts.len() as u64).with_style(
                ProgressStyle::with_template("{spinner} [{pos}/{len}] Embedding transcripts {bar:40}")
                    .expect("style template is valid"),
            )
        } else {
            ProgressBar::hidden()
        };

        let mut vectors = Vec::with_capacity(texts.len());
        for chunk in texts.chunks(self.batch_size) {
            let batch = self.model.encode_batch(chunk)?;
            if batch.len() != chunk.len() {
                return Err(SearchError::Embedding(format!(
                    "model returned {} vectors for {} texts",
                    batch.len(),
                    chunk.len()
                )));
            }
            if let Some(vector) = batch.iter().find(|v| v.len() != expected) {
                return Err(SearchError::Schema {
                    expected,
                    actual: vector.len(),
                });
            }

            vectors.extend(batch);
            bar.inc(chunk.len() as u64);
        }
        bar.finish_and_clear();

        debug!("Encoded {} documents", vectors.len());
        Ok(vectors)
    }
}

/// Reject corpora that cannot be indexed. Title and channel may be blank;
/// the body is what gets embedded and must not be.
#[inline]
pub fn validate_corpus(corpus: &[Document]) -> Result<()> {
    if corpus.is_empty() {
        return Err(SearchError::Validation("corpus is empty".to_string()));
    }

    if let Some(position) = corpus.iter().position(|d| d.body.trim().is_empty()) {
        return Err(SearchError::Validation(format!(
            "document {} is missing required field `body`",
            position
        )));
    }

    Ok(())
}

fn build_records(corpus: &[Document], vectors: Vec<Vec<f32>>) -> Vec<IndexRecord> {
    corpus
        .iter()
        .zip(vectors)
        .enumerate()
        .map(|(position, (document, vector))| IndexRecord {
            id: position.to_string(),
            vector,
            metadata: RecordMetadata {
                title: document.title.clone(),
                channel: document.channel.clone(),
            },
            body: document.body.clone(),
        })
        .collect()
}
