//! Error types for object-store operations.
//!
//! Absence of an object is a distinct, recoverable variant: callers that
//! treat missing evidence as data (rather than failure) match on
//! [`StoreError::NotFound`] or use `try_get_text`.

use thiserror::Error;

/// Errors that can occur during store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The object does not exist under the given key.
    #[error("object not found: {key}")]
    NotFound { key: String },

    /// Underlying I/O failure other than absence.
    #[error("I/O error for {key}: {source}")]
    Io {
        key: String,
        #[source]
        source: std::io::Error,
    },

    /// JSON serialization failure while writing a document.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A key violated the store's naming expectations.
    #[error("invalid key: {0}")]
    InvalidKey(String),
}

/// Convenience alias for results with [`StoreError`].
pub type Result<T> = std::result::Result<T, StoreError>;
