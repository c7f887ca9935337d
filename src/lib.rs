use thiserror::Error;

pub type Result<T> = std::result::Result<T, SearchError>;

#[derive(Error, Debug)]
pub enum SearchError {
    /// Malformed or incomplete corpus input. Aborts a build.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Vector dimensionality disagrees with the collection. Usually model drift.
    #[error("Schema mismatch: expected {expected}-dimensional vectors, got {actual}")]
    Schema { expected: usize, actual: usize },

    #[error("Duplicate record id: {0}")]
    DuplicateId(String),

    /// The persistent medium is unreachable or a write failed. Retryable.
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Query is empty after removing punctuation and symbols")]
    EmptyQuery,

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Embedding error: {0}")]
    Embedding(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Other error: {0}")]
    Other(#[from] anyhow::Error),
}

impl SearchError {
    /// Whether an interactive caller can report this error and keep going.
    #[inline]
    pub const fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::EmptyQuery
                | Self::InvalidArgument(_)
                | Self::NotFound(_)
                | Self::Storage(_)
                | Self::Embedding(_)
        )
    }
}

pub mod commands;
pub mod config;
pub mod corpus;
pub mod database;
pub mod embeddings;
pub mod engine;
pub mod indexer;
pub mod search;
pub mod session;
