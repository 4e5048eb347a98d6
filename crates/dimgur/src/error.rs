//! Error types for the ledgers and the mutation orchestrator.

use dimgur_core::{CoreError, Subject, ValidationError};
use dimgur_store::StoreError;
use thiserror::Error;

/// Errors from a vote ledger.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// The voter already has a vote on this subject.
    #[error("already voted on {0}")]
    AlreadyVoted(Subject),

    /// The voter has no vote on this subject to remove.
    #[error("no existing vote on {0}")]
    NoExistingVote(Subject),

    /// The subject does not exist.
    #[error("{0} not found")]
    SubjectNotFound(Subject),

    /// The store failed. Nothing was changed.
    #[error("persistence error: {0}")]
    Persistence(#[from] StoreError),
}

/// Errors from the mutation orchestrator, one per wire category.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// The request is malformed.
    #[error("validation failed: {0}")]
    Validation(ValidationError),

    /// The claimed wallet address is not a valid public key.
    #[error("invalid address: {0}")]
    InvalidAddress(String),

    /// The signature does not verify for the claimed address and message.
    #[error("invalid signature")]
    InvalidSignature,

    /// The message timestamp is outside the accepted window.
    #[error("stale message: signed at {0}")]
    StaleMessage(String),

    #[error("already voted")]
    AlreadyVoted,

    #[error("no existing vote")]
    NoExistingVote,

    /// The referenced post or comment does not exist.
    #[error("{0} not found")]
    NotFound(String),

    /// The store failed.
    #[error("persistence error: {0}")]
    Persistence(StoreError),
}

impl ServiceError {
    /// Wire category reported in the `error` field.
    pub fn category(&self) -> &'static str {
        match self {
            ServiceError::Validation(_) | ServiceError::InvalidAddress(_) => "validation-failed",
            ServiceError::InvalidSignature => "invalid-signature",
            ServiceError::StaleMessage(_) => "stale-message",
            ServiceError::AlreadyVoted => "already-voted",
            ServiceError::NoExistingVote => "no-existing-vote",
            ServiceError::NotFound(_) => "not-found",
            ServiceError::Persistence(_) => "internal",
        }
    }

    /// HTTP status code for this error.
    pub fn status(&self) -> u16 {
        match self {
            ServiceError::Validation(_)
            | ServiceError::InvalidAddress(_)
            | ServiceError::AlreadyVoted
            | ServiceError::NoExistingVote => 400,
            ServiceError::InvalidSignature | ServiceError::StaleMessage(_) => 401,
            ServiceError::NotFound(_) => 404,
            ServiceError::Persistence(_) => 500,
        }
    }
}

impl From<ValidationError> for ServiceError {
    fn from(e: ValidationError) -> Self {
        match e {
            ValidationError::Core(CoreError::InvalidAddress(reason)) => {
                ServiceError::InvalidAddress(reason)
            }
            ValidationError::StaleMessage(at) => ServiceError::StaleMessage(at),
            other => ServiceError::Validation(other),
        }
    }
}

impl From<CoreError> for ServiceError {
    fn from(e: CoreError) -> Self {
        ValidationError::Core(e).into()
    }
}

impl From<LedgerError> for ServiceError {
    fn from(e: LedgerError) -> Self {
        match e {
            LedgerError::AlreadyVoted(_) => ServiceError::AlreadyVoted,
            LedgerError::NoExistingVote(_) => ServiceError::NoExistingVote,
            LedgerError::SubjectNotFound(subject) => ServiceError::NotFound(subject.to_string()),
            LedgerError::Persistence(e) => ServiceError::Persistence(e),
        }
    }
}

impl From<StoreError> for ServiceError {
    fn from(e: StoreError) -> Self {
        ServiceError::Persistence(e)
    }
}

/// Errors loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Read(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Result type for orchestrator operations.
pub type Result<T> = std::result::Result<T, ServiceError>;
