//! The normalized, publish-ready form of a client record.

use crate::timestamp::serde_fixed;
use crate::{ClientId, ClientStatus, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A client record after normalization.
///
/// Ephemeral: built for one run, published to the bus, loaded into the
/// secondary store, then dropped. Field order is fixed by the struct
/// definition, so the JSON encoding of equal records is byte-identical.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransformedRecord {
    /// Primary-store id of the source row.
    pub id: ClientId,
    pub name: String,
    pub first_name: String,
    /// Always lower-cased.
    pub email: String,
    /// Digits with an optional single leading `+`.
    pub phone: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub postal_code: Option<String>,
    /// Never empty; defaulted when the source has none.
    pub country: String,
    pub status: ClientStatus,
    /// Reference time of the run that produced this record.
    #[serde(with = "serde_fixed")]
    pub synced_at: DateTime<Utc>,
    #[serde(with = "serde_fixed")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "serde_fixed")]
    pub updated_at: DateTime<Utc>,
}

impl TransformedRecord {
    /// Encodes the record as a single line of JSON (no trailing newline).
    pub fn to_json_line(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Decodes a record from one line of JSON.
    pub fn from_json_line(line: &str) -> Result<Self> {
        Ok(serde_json::from_str(line.trim())?)
    }
}
