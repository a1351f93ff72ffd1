//! Error types for the file store.

use std::io;
use tandem_engine::EngineError;
use thiserror::Error;

/// Result type for file store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors that can occur in the file store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// A row could not be encoded.
    #[error("encode error: {0}")]
    Encode(String),

    /// A row file could not be decoded.
    #[error("decode error in {file}: {message}")]
    Decode {
        /// File name of the row.
        file: String,
        /// Error message.
        message: String,
    },

    /// Another process holds the store directory.
    #[error("store directory is locked by another process")]
    Locked,

    /// The store directory is missing or malformed.
    #[error("invalid store layout: {0}")]
    InvalidLayout(String),
}

impl StoreError {
    /// Creates an invalid layout error.
    pub fn invalid_layout(message: impl Into<String>) -> Self {
        Self::InvalidLayout(message.into())
    }
}

impl From<StoreError> for EngineError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Io(e) => EngineError::unavailable(e.to_string()),
            StoreError::Locked => EngineError::unavailable_fatal(StoreError::Locked.to_string()),
            StoreError::InvalidLayout(_) => EngineError::unavailable_fatal(err.to_string()),
            StoreError::Encode(_) | StoreError::Decode { .. } => {
                EngineError::WriteRejected(err.to_string())
            }
        }
    }
}
