//! Error types for dimgur core.

use thiserror::Error;

/// Errors raised while decoding keys and signatures.
///
/// A well-formed signature that simply does not verify is not an error;
/// see [`crate::crypto::verify_signature`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    #[error("invalid wallet address: {0}")]
    InvalidAddress(String),

    #[error("malformed signature: {0}")]
    MalformedSignature(String),

    #[error("invalid identifier: {0}")]
    InvalidId(String),

    #[error("invalid timestamp: {0}")]
    InvalidTimestamp(String),
}

/// Validation errors for inbound mutation requests.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("missing field: {0}")]
    MissingField(&'static str),

    #[error("invalid field {field}: {reason}")]
    InvalidField { field: &'static str, reason: String },

    #[error("field {field} exceeds {max} characters")]
    TooLong { field: &'static str, max: usize },

    #[error("unknown action: {0}")]
    UnknownAction(String),

    #[error("message does not match the declared action")]
    MessageMismatch,

    #[error("message timestamp {0} is outside the accepted window")]
    StaleMessage(String),

    #[error(transparent)]
    Core(#[from] CoreError),
}

impl ValidationError {
    pub(crate) fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        ValidationError::InvalidField {
            field,
            reason: reason.into(),
        }
    }
}
