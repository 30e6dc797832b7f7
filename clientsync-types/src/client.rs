//! Client records as stored in the relational stores.

use crate::timestamp::{serde_fixed, serde_fixed_option};
use crate::{ClientId, Error};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Lifecycle status of a client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClientStatus {
    #[default]
    Active,
    Inactive,
}

impl ClientStatus {
    /// Returns the canonical lowercase name, as persisted.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Inactive => "inactive",
        }
    }
}

impl fmt::Display for ClientStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ClientStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "active" => Ok(Self::Active),
            "inactive" => Ok(Self::Inactive),
            other => Err(Error::InvalidStatus(other.to_string())),
        }
    }
}

/// A client row, as read from the primary or secondary store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientRecord {
    pub id: ClientId,
    pub name: String,
    pub first_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub postal_code: Option<String>,
    pub country: Option<String>,
    pub status: ClientStatus,
    #[serde(with = "serde_fixed")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "serde_fixed")]
    pub updated_at: DateTime<Utc>,
    /// Watermark: when this row was last pushed to the secondary store.
    #[serde(with = "serde_fixed_option")]
    pub synced_at: Option<DateTime<Utc>>,
}

impl ClientRecord {
    /// Returns true if the row changed since its last synchronization.
    ///
    /// A row that was never synchronized is always a candidate. A row whose
    /// watermark is equal to or newer than its last modification never is.
    #[must_use]
    pub fn is_sync_candidate(&self) -> bool {
        match self.synced_at {
            None => true,
            Some(synced_at) => synced_at < self.updated_at,
        }
    }
}

/// Input for creating a client in the primary store.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct NewClient {
    pub name: String,
    pub first_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub postal_code: Option<String>,
    pub country: Option<String>,
    pub status: ClientStatus,
}

impl NewClient {
    /// Creates an active client with only the mandatory fields set.
    pub fn new(
        name: impl Into<String>,
        first_name: impl Into<String>,
        email: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            first_name: first_name.into(),
            email: email.into(),
            ..Default::default()
        }
    }

    #[must_use]
    pub fn with_phone(mut self, phone: impl Into<String>) -> Self {
        self.phone = Some(phone.into());
        self
    }

    #[must_use]
    pub fn with_address(
        mut self,
        address: impl Into<String>,
        city: impl Into<String>,
        postal_code: impl Into<String>,
    ) -> Self {
        self.address = Some(address.into());
        self.city = Some(city.into());
        self.postal_code = Some(postal_code.into());
        self
    }

    #[must_use]
    pub fn with_country(mut self, country: impl Into<String>) -> Self {
        self.country = Some(country.into());
        self
    }

    #[must_use]
    pub fn with_status(mut self, status: ClientStatus) -> Self {
        self.status = status;
        self
    }
}

/// Partial update of a primary-store client. `None` leaves a field untouched.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ClientUpdate {
    pub name: Option<String>,
    pub first_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub postal_code: Option<String>,
    pub country: Option<String>,
    pub status: Option<ClientStatus>,
}

impl ClientUpdate {
    /// Returns true if the update would not change anything.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}
