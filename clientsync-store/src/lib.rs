//! SQLite record store gateway for clientsync.
//!
//! Provides typed access to the two relational stores the pipeline moves
//! data between. Both stores share one schema; which one is the primary and
//! which one is the secondary is decided by the caller.
//!
//! # Architecture
//!
//! - One `clients` table per database, email unique without regard to case
//! - Timestamps stored as fixed-width text so the watermark predicate is
//!   evaluated by SQLite directly
//! - Soft-deleted rows stay in the table but are never extracted
//! - No business logic: normalization happens before records reach the sink

mod client_store;
mod error;

pub use client_store::{ClientStore, DEFAULT_BUSY_TIMEOUT};
pub use error::{StoreError, StoreResult};
