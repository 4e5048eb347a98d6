//! Error types for the store module.

use thiserror::Error;

/// Errors that can occur during store operations.
///
/// Ledger conflicts (already voted, no vote to remove) are not errors at
/// this layer; they are reported through the result enums in
/// [`crate::traits`].
#[derive(Debug, Error)]
pub enum StoreError {
    /// Database error from SQLite.
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// A row failed typed decoding.
    #[error("invalid data in {table}: {reason}")]
    InvalidData { table: &'static str, reason: String },

    /// Migration error.
    #[error("migration error: {0}")]
    Migration(String),

    /// The connection could not be used (poisoned lock, unavailable backend).
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// The blocking task running a query failed.
    #[error("blocking task failed: {0}")]
    Task(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl StoreError {
    pub(crate) fn invalid(table: &'static str, reason: impl Into<String>) -> Self {
        StoreError::InvalidData {
            table,
            reason: reason.into(),
        }
    }
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
