//! Core type definitions for clientsync.
//!
//! This crate defines the record types shared by the store gateway and the
//! ETL pipeline:
//! - `ClientId`, the surrogate key assigned by the primary store
//! - `ClientRecord`, a row as it lives in either relational store
//! - `TransformedRecord`, the normalized, publish-ready form of a record
//! - The fixed textual timestamp format used for persistence and transport
//!
//! Business rules (normalization, watermark handling) live in the pipeline,
//! not here. The only rule encoded in this crate is the sync-candidate
//! predicate, because both the store and the pipeline depend on it.

mod client;
mod ids;
mod record;
pub mod timestamp;

pub use client::{ClientRecord, ClientStatus, ClientUpdate, NewClient};
pub use ids::ClientId;
pub use record::TransformedRecord;

/// Country assigned to records that do not carry one.
pub const DEFAULT_COUNTRY: &str = "Burkina Faso";

/// Result type alias using the crate's error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in type operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("invalid timestamp: {0}")]
    InvalidTimestamp(String),

    #[error("invalid client status: {0}")]
    InvalidStatus(String),

    #[error("invalid client id: {0}")]
    InvalidId(String),
}
