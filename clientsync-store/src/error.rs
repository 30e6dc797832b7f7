//! Error types for the store gateway.

use thiserror::Error;

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors that can occur in store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The database could not be opened or its connection is unusable.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// Database error from SQLite.
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// A stored row could not be decoded into a typed record.
    #[error("invalid data: {0}")]
    InvalidData(String),

    /// Another client already uses this email.
    #[error("duplicate email: {0}")]
    Duplicate(String),
}

impl StoreError {
    /// Returns true if this error means the store itself cannot be reached,
    /// as opposed to a problem with one particular row or statement.
    pub fn is_unavailable(&self) -> bool {
        match self {
            StoreError::Unavailable(_) => true,
            StoreError::Database(rusqlite::Error::SqliteFailure(err, _)) => matches!(
                err.code,
                rusqlite::ErrorCode::CannotOpen
                    | rusqlite::ErrorCode::DatabaseBusy
                    | rusqlite::ErrorCode::DatabaseLocked
                    | rusqlite::ErrorCode::NotADatabase
                    | rusqlite::ErrorCode::SystemIoFailure
                    | rusqlite::ErrorCode::DatabaseCorrupt
            ),
            _ => false,
        }
    }

    /// Returns true if the statement gave up waiting for a lock or was
    /// interrupted, i.e. it ran out of time rather than failed.
    pub fn is_timed_out(&self) -> bool {
        match self {
            StoreError::Database(rusqlite::Error::SqliteFailure(err, _)) => matches!(
                err.code,
                rusqlite::ErrorCode::DatabaseBusy
                    | rusqlite::ErrorCode::DatabaseLocked
                    | rusqlite::ErrorCode::OperationInterrupted
            ),
            _ => false,
        }
    }
}
