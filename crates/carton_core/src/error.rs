//! Error types for cartondb core.

use thiserror::Error;

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors that can occur in document and collection operations.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Codec error from normalization, denormalization or the binary form.
    #[error("codec error: {0}")]
    Codec(#[from] carton_codec::CodecError),

    /// Store engine error.
    #[error("store error: {0}")]
    Store(#[from] carton_store::StoreError),

    /// JSON rendering error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A collection with this name already exists.
    #[error("collection already exists: {name}")]
    CollectionExists {
        /// Name of the collection.
        name: String,
    },

    /// The document has no `_id` field.
    #[error("document id not found")]
    IdNotFound,

    /// The document's `_id` field is not usable as an id.
    #[error("invalid document id: {message}")]
    InvalidId {
        /// Description of the problem.
        message: String,
    },

    /// A strict update referenced a path that does not exist.
    #[error("key not found: {path}")]
    KeyNotFound {
        /// The offending dotted path.
        path: String,
    },

    /// Normalized input was not map-shaped where a document was required.
    #[error("value does not normalize to a field map")]
    Unmarshallable,

    /// The document's `_expiresAt` field is not a timestamp.
    #[error("invalid expiry: {message}")]
    InvalidExpiry {
        /// Description of the problem.
        message: String,
    },
}

impl CoreError {
    /// Creates a collection exists error.
    pub fn collection_exists(name: impl Into<String>) -> Self {
        Self::CollectionExists { name: name.into() }
    }

    /// Creates an invalid id error.
    pub fn invalid_id(message: impl Into<String>) -> Self {
        Self::InvalidId {
            message: message.into(),
        }
    }

    /// Creates a key not found error.
    pub fn key_not_found(path: impl Into<String>) -> Self {
        Self::KeyNotFound { path: path.into() }
    }

    /// Creates an invalid expiry error.
    pub fn invalid_expiry(message: impl Into<String>) -> Self {
        Self::InvalidExpiry {
            message: message.into(),
        }
    }
}
