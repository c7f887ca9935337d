// LanceDB vector database module
// Each collection is a LanceDB table of transcript embeddings


pub mod vector_store;

use serde::{Deserialize, Serialize};

pub use vector_store::VectorStore;

/// One embedded transcript, as stored in a collection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexRecord {
    /// Stable identifier, the document's position in the corpus it was built from
    pub id: String,
    pub vector: Vec<f32>,
    pub metadata: RecordMetadata,
    /// The text that was embedded
    pub body: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordMetadata {
    pub title: String,
    pub channel: String,
}

/// What a new collection is created with
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionSpec {
    pub dimension: usize,
    pub model: String,
}

/// An open collection and the vector shape it was built with
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionHandle {
    name: String,
    dimension: usize,
    model: Option<String>,
}

impl CollectionHandle {
    #[inline]
    pub fn new(name: impl Into<String>, dimension: usize, model: Option<String>) -> Self {
        Self {
            name: name.into(),
            dimension,
            model,
        }
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub const fn dimension(&self) -> usize {
        self.dimension
    }

    /// Model identity recorded at build time, if the collection carries one
    #[inline]
    pub fn model(&self) -> Option<&str> {
        self.model.as_deref()
    }
}

/// A nearest-neighbour match before ranking
#[derive(Debug, Clone, PartialEq)]
pub struct RawHit {
    pub id: String,
    pub distance: f32,
    pub metadata: RecordMetadata,
    pub body: String,
}

/// Result of an atomic create-with-data
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Creation {
    /// This call created and populated the collection
    Created(CollectionHandle),
    /// Someone else got there first; nothing was written
    Existing(CollectionHandle),
}

impl Creation {
    #[inline]
    pub fn into_handle(self) -> CollectionHandle {
        match self {
            Self::Created(handle) | Self::Existing(handle) => handle,
        }
    }

    #[inline]
    pub const fn was_created(&self) -> bool {
        matches!(self, Self::Created(_))
    }
}

/// Collection names map onto LanceDB table names
#[inline]
pub fn is_valid_collection_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'))
}
