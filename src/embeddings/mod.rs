// Embeddings module
// The text-to-vector capability and its Ollama-backed implementation

#[cfg(test)]
pub(crate) mod fixed;
pub mod ollama;


#[cfg(test)]
pub(crate) use fixed::FixedEmbeddings;
pub use ollama::OllamaClient;

use crate::Result;

/// Maps text onto a fixed-length vector.
///
/// Implementations must be deterministic for a given model identity: encoding
/// the same text twice yields equal vectors. The same instance is used to build
/// a collection and to query it, so `dimension` and `model_id` are persisted
/// alongside every collection it builds.
pub trait EmbeddingModel: Send + Sync {
    /// Identity of the underlying model, e.g. `all-minilm`
    fn model_id(&self) -> &str;

    /// Length of every vector this model produces
    fn dimension(&self) -> usize;

    fn encode(&self, text: &str) -> Result<Vec<f32>>;

    /// Batch form used at build time. Output order matches input order.
    #[inline]
    fn encode_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        texts.iter().map(|text| self.encode(text)).collect()
    }
}
