//! Error types for the record stores.

use thiserror::Error;

/// Result type for store operations.
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Errors a record store can return.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Local file could not be read or written
    #[error("I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Remote API answered with a non-success status
    #[error("API error {status}: {body}")]
    Http { status: u16, body: String },

    /// Remote API could not be reached
    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// Stored data could not be understood
    #[error("Malformed data: {0}")]
    Malformed(String),

    /// Record cannot be stored by this backend
    #[error("Invalid record: {0}")]
    InvalidRecord(String),
}

impl StoreError {
    pub(crate) fn io(path: &std::path::Path, source: std::io::Error) -> Self {
        StoreError::Io {
            path: path.display().to_string(),
            source,
        }
    }
}
