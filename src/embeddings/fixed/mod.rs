#[cfg(test)]
mod tests;

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::embeddings::EmbeddingModel;
use crate::{Result, SearchError};

/// An embedding model backed by a lookup table of hand-written vectors.
///
/// Useful wherever distances have to be known up front: every text the model
/// will see is registered with its vector, and anything else is rejected
/// unless a fallback vector is set.
#[derive(Debug)]
pub struct FixedEmbeddings {
    model_id: String,
    dimension: usize,
    vectors: HashMap<String, Vec<f32>>,
    fallback: Option<Vec<f32>>,
    encoded: AtomicUsize,
}

impl FixedEmbeddings {
    #[inline]
    pub fn new(model_id: impl Into<String>, dimension: usize) -> Self {
        Self {
            model_id: model_id.into(),
            dimension,
            vectors: HashMap::new(),
            fallback: None,
            encoded: AtomicUsize::new(0),
        }
    }

    /// Register the vector returned for `text`
    #[inline]
    #[must_use]
    pub fn with(mut self, text: impl Into<String>, vector: Vec<f32>) -> Self {
        self.vectors.insert(text.into(), vector);
        self
    }

    /// Vector returned for any text that was not registered
    #[inline]
    #[must_use]
    pub fn with_fallback(mut self, vector: Vec<f32>) -> Self {
        self.fallback = Some(vector);
        self
    }

    /// Number of texts encoded so far
    #[inline]
    pub fn encode_count(&self) -> usize {
        self.encoded.load(Ordering::SeqCst)
    }
}

impl EmbeddingModel for FixedEmbeddings {
    #[inline]
    fn model_id(&self) -> &str {
        &self.model_id
    }

    #[inline]
    fn dimension(&self) -> usize {
        self.dimension
    }

    #[inline]
    fn encode(&self, text: &str) -> Result<Vec<f32>> {
        let vector = self
            .vectors
            .get(text)
            .or(self.fallback.as_ref())
            .cloned()
            .ok_or_else(|| SearchError::Embedding(format!("no vector registered for '{}'", text)))?;

        self.encoded.fetch_add(1, Ordering::SeqCst);
        Ok(vector)
    }
}
