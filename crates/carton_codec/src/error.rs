//! Error types for the codec crate.

use std::fmt;
use thiserror::Error;

/// Result type for codec operations.
pub type CodecResult<T> = Result<T, CodecError>;

/// Errors that can occur during normalization, denormalization,
/// encoding or decoding.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// A type with no mapping to the value model was encountered.
    #[error("unsupported type: {type_name}")]
    UnsupportedType {
        /// Name of the unsupported type.
        type_name: String,
    },

    /// Map keys must be text.
    #[error("map key must be text")]
    KeyMustBeText,

    /// A timestamp could not be represented.
    #[error("invalid timestamp: {message}")]
    InvalidTimestamp {
        /// Description of the problem.
        message: String,
    },

    /// Invalid UTF-8 text.
    #[error("invalid UTF-8 text")]
    InvalidUtf8,

    /// Unexpected end of input.
    #[error("unexpected end of input")]
    UnexpectedEof,

    /// Input continued past the end of the top-level value.
    #[error("trailing bytes after value")]
    TrailingBytes,

    /// Unknown type tag in the binary stream.
    #[error("invalid type tag: {tag:#04x}")]
    InvalidTag {
        /// The offending tag byte.
        tag: u8,
    },

    /// The stream violates a canonical-form rule.
    #[error("non-canonical encoding: {message}")]
    NonCanonical {
        /// Description of the violation.
        message: String,
    },

    /// A claimed length exceeds the decoder's safety ceiling.
    #[error("size limit exceeded: claimed {claimed}, max allowed {max_allowed}")]
    SizeLimitExceeded {
        /// Length claimed by the stream.
        claimed: u64,
        /// Maximum length the decoder accepts.
        max_allowed: u64,
    },

    /// Values nest deeper than the decoder allows.
    #[error("nesting depth limit exceeded")]
    DepthLimitExceeded,

    /// Free-form error raised through the serde traits.
    #[error("{message}")]
    Message {
        /// The serde-provided message.
        message: String,
    },
}

impl CodecError {
    /// Create an unsupported type error.
    pub fn unsupported_type(type_name: impl Into<String>) -> Self {
        Self::UnsupportedType {
            type_name: type_name.into(),
        }
    }

    /// Create an invalid timestamp error.
    pub fn invalid_timestamp(message: impl Into<String>) -> Self {
        Self::InvalidTimestamp {
            message: message.into(),
        }
    }

    /// Create a non-canonical encoding error.
    pub fn non_canonical(message: impl Into<String>) -> Self {
        Self::NonCanonical {
            message: message.into(),
        }
    }
}

impl serde::ser::Error for CodecError {
    fn custom<T: fmt::Display>(msg: T) -> Self {
        Self::Message {
            message: msg.to_string(),
        }
    }
}

impl serde::de::Error for CodecError {
    fn custom<T: fmt::Display>(msg: T) -> Self {
        Self::Message {
            message: msg.to_string(),
        }
    }
}
