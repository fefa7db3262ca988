//! Error types for remo-core.
//!
//! Four families: transport errors raised by the gateway and passed through
//! unmodified, protocol errors carrying the server-supplied message,
//! consistency errors (local state disagrees with the remote schema), and
//! usage errors raised synchronously at the point of violation. This layer
//! performs no retries; a failed mutating call leaves the query caches
//! invalidated rather than restoring them.

use crate::proxy::Token;
use thiserror::Error;

/// Main error type for remote-object operations.
#[derive(Debug, Error)]
pub enum RemoError {
    /// Raised by the gateway for connection, timeout, or decoding failures.
    #[error("transport error: {0}")]
    Transport(#[from] anyhow::Error),

    /// The server reported a failed command, carrying its own message.
    #[error("unsuccessful command: {message}")]
    Unsuccessful { message: String },

    // Consistency errors
    #[error("owner {owner} is not present in the identity cache")]
    MissingOwner { owner: Token },

    #[error("no symbolic name for ordinal {ordinal} in enumeration '{enum_name}'")]
    EnumDesync { enum_name: String, ordinal: i64 },

    #[error("payload constructor '{content_type}' is not registered")]
    UnknownPayloadKind { content_type: String },

    #[error("property '{name}' has no owner to re-query")]
    DetachedProperty { name: String },

    // Usage errors
    #[error("attribute '{name}' is not present")]
    NoSuchAttribute { name: String },

    #[error("index {index} out of range for collection of length {len}")]
    IndexOutOfRange { index: u64, len: u64 },

    #[error("invalid enumeration name '{name}', valid names are: {valid}")]
    UnknownEnumName { name: String, valid: String },

    #[error("phase-indexed lookup requires a phase object key")]
    PhaseKeyExpected,

    #[error("'{type_tag}' is not a collection")]
    NotACollection { type_tag: String },

    #[error("string parameter cannot be quoted for the remote command line: {0}")]
    UnquotableString(String),

    #[error("invalid argument: {message}")]
    InvalidArgument { message: String },

    // Malformed or unexpected response shapes
    #[error("malformed response: {message}")]
    Malformed {
        message: String,
        #[source]
        source: Option<serde_json::Error>,
    },
}

/// Result type alias for remote-object operations.
pub type Result<T> = std::result::Result<T, RemoError>;

impl From<serde_json::Error> for RemoError {
    fn from(err: serde_json::Error) -> Self {
        RemoError::Malformed {
            message: err.to_string(),
            source: Some(err),
        }
    }
}

impl RemoError {
    /// Shorthand for a malformed-response error without a serde source.
    pub(crate) fn malformed(message: impl Into<String>) -> Self {
        RemoError::Malformed {
            message: message.into(),
            source: None,
        }
    }

    /// True for errors caused by calling an operation incorrectly, as
    /// opposed to transport or remote-state failures.
    pub fn is_usage(&self) -> bool {
        matches!(
            self,
            RemoError::NoSuchAttribute { .. }
                | RemoError::IndexOutOfRange { .. }
                | RemoError::UnknownEnumName { .. }
                | RemoError::PhaseKeyExpected
                | RemoError::NotACollection { .. }
                | RemoError::UnquotableString(_)
                | RemoError::InvalidArgument { .. }
        )
    }

    /// True for errors that indicate the local caches disagree with the
    /// remote schema. These are not user errors.
    pub fn is_consistency(&self) -> bool {
        matches!(
            self,
            RemoError::MissingOwner { .. }
                | RemoError::EnumDesync { .. }
                | RemoError::UnknownPayloadKind { .. }
                | RemoError::DetachedProperty { .. }
        )
    }
}
