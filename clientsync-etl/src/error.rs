//! Error types for the ETL pipeline.

use clientsync_store::StoreError;
use clientsync_types::ClientId;
use thiserror::Error;

/// Result type for pipeline operations.
pub type EtlResult<T> = Result<T, EtlError>;

/// Errors that can occur in pipeline operations.
#[derive(Debug, Error)]
pub enum EtlError {
    /// A relational store cannot be reached. Fatal during extraction.
    #[error("store unavailable: {0}")]
    StoreUnavailable(String),

    /// Publishing, loading or marking one record failed. The record stays a
    /// candidate for the next run.
    #[error("failed to process client {id}: {reason}")]
    RecordProcessing { id: ClientId, reason: String },

    /// The event bus did not accept a request.
    #[error("event bus unreachable: {0}")]
    BusUnreachable(String),

    /// A fallback-log line could not be decoded.
    #[error("malformed message on line {line}: {reason}")]
    MalformedMessage { line: usize, reason: String },

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error (fallback log).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A store or bus call exceeded its time budget.
    #[error("operation timed out")]
    Timeout,

    /// Invalid configuration.
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl EtlError {
    /// Wraps any error as a per-record failure.
    pub fn record(id: ClientId, reason: impl std::fmt::Display) -> Self {
        EtlError::RecordProcessing {
            id,
            reason: reason.to_string(),
        }
    }
}

impl From<StoreError> for EtlError {
    fn from(err: StoreError) -> Self {
        EtlError::StoreUnavailable(err.to_string())
    }
}
