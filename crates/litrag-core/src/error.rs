use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Operation failed: {0}")]
    Operation(String),

    /// Build-time: there is nothing to index.
    #[error("Cannot build indexes from an empty corpus")]
    EmptyCorpus,

    /// Query-time: no snapshot has been published yet.
    #[error("Index not ready: build indexes before querying")]
    IndexNotReady,

    #[error("Embedding unavailable: {0}")]
    EmbeddingUnavailable(String),

    #[error("Similarity backend unavailable: {0}")]
    BackendUnavailable(String),

    #[error("Malformed chunk '{id}': {reason}")]
    MalformedChunk { id: String, reason: String },

    #[error("Operation cancelled")]
    Cancelled,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn malformed<I: Into<String>, R: Into<String>>(id: I, reason: R) -> Self {
        Error::MalformedChunk { id: id.into(), reason: reason.into() }
    }

    /// Failures of external collaborators that a single query survives by
    /// falling back to lexical-only retrieval.
    pub fn is_transient(&self) -> bool {
        matches!(self, Error::EmbeddingUnavailable(_) | Error::BackendUnavailable(_))
    }
}
