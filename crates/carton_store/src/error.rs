//! Error types for the store contract.

use thiserror::Error;

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors that can occur in a store engine.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The requested key is absent.
    #[error("key not found")]
    KeyNotFound,

    /// A write was attempted in a read-only transaction.
    #[error("transaction is read-only")]
    ReadOnly,

    /// The transaction has already been committed or rolled back.
    #[error("transaction already finished")]
    TransactionDone,

    /// The store has been closed.
    #[error("store is closed")]
    Closed,

    /// The cursor has moved past the last entry.
    #[error("cursor exhausted")]
    CursorExhausted,

    /// Engine-specific failure.
    #[error("backend error: {message}")]
    Backend {
        /// Description of the failure.
        message: String,
    },
}

impl StoreError {
    /// Create a backend error.
    pub fn backend(message: impl Into<String>) -> Self {
        Self::Backend {
            message: message.into(),
        }
    }
}
