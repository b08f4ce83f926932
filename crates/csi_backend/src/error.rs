//! Backend errors

use thiserror::Error;

/// Result type for backend operations
pub type BackendResult<T> = Result<T, BackendError>;

/// Backend failures
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BackendError {
    #[error("Backend unavailable")]
    Unavailable,

    #[error("Document not found: {collection}/{id}")]
    NotFound { collection: String, id: String },

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Invalid credentials for {0}")]
    InvalidCredentials(String),
}

impl From<serde_json::Error> for BackendError {
    fn from(e: serde_json::Error) -> Self {
        Self::Serialization(e.to_string())
    }
}
