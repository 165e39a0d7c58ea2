use thiserror::Error;

/// The single error type threaded through the store, index, collection and
/// service layers. The HTTP layer maps each variant to a status code.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization/deserialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("lock acquisition error: {0}")]
    Lock(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("unknown index: {0}")]
    UnknownIndex(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("embedding provider failure: {0}")]
    EmbeddingFailure(String),
}

// Poisoned locks are treated as a plain Lock error rather than propagating
// the PoisonError's generic payload, matching the collection's single
// RwLock-per-collection discipline.
impl<T> From<std::sync::PoisonError<T>> for CoreError {
    fn from(err: std::sync::PoisonError<T>) -> Self {
        CoreError::Lock(format!("poisoned lock: {}", err))
    }
}

pub type Result<T> = std::result::Result<T, CoreError>;
