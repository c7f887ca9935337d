// Shared helpers for integration tests

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use transcript_search::embeddings::EmbeddingModel;
use transcript_search::{Result, SearchError};

/// Embedding model answering from a table of hand-written vectors
pub struct StubEmbeddings {
    model_id: String,
    dimension: usize,
    vectors: HashMap<String, Vec<f32>>,
    encoded: AtomicUsize,
}

impl StubEmbeddings {
    pub fn new(model_id: &str, dimension: usize) -> Self {
        Self {
            model_id: model_id.to_string(),
            dimension,
            vectors: HashMap::new(),
            encoded: AtomicUsize::new(0),
        }
    }

    pub fn with(mut self, text: &str, vector: Vec<f32>) -> Self {
        self.vectors.insert(text.to_string(), vector);
        self
    }

    pub fn encode_count(&self) -> usize {
        self.encoded.load(Ordering::SeqCst)
    }
}

impl EmbeddingModel for StubEmbeddings {
    fn model_id(&self) -> &str {
        &self.model_id
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn encode(&self, text: &str) -> Result<Vec<f32>> {
        let vector = self
            .vectors
            .get(text)
            .cloned()
            .ok_or_else(|| SearchError::Embedding(format!("no vector registered for '{}'", text)))?;
        self.encoded.fetch_add(1, Ordering::SeqCst);
        Ok(vector)
    }
}
