//! Fixed-width textual timestamps.
//!
//! Every timestamp is persisted and transported as RFC 3339 in UTC with
//! exactly six fractional digits and an explicit `+00:00` offset:
//!
//! ```text
//! 2024-05-01T08:30:00.000000+00:00
//! ```
//!
//! Because the width never varies, comparing two encoded values as strings
//! (as SQLite does for `TEXT` columns) agrees with chronological order. That
//! property is what lets the store evaluate the watermark predicate in SQL.

use crate::{Error, Result};
use chrono::{DateTime, SubsecRound, Utc};

/// `strftime` pattern for the wire/storage format.
pub const FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.6f+00:00";

/// Returns the current time truncated to microsecond precision.
///
/// Truncation keeps in-memory values equal to what a store round-trip
/// yields.
#[must_use]
pub fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

/// Encodes a timestamp in the fixed format.
#[must_use]
pub fn format(ts: &DateTime<Utc>) -> String {
    ts.format(FORMAT).to_string()
}

/// Decodes a timestamp. Any RFC 3339 offset is accepted and normalized to UTC.
pub fn parse(s: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| Error::InvalidTimestamp(format!("{s}: {e}")))
}

/// Serde adapter for `DateTime<Utc>` fields using the fixed format.
pub mod serde_fixed {
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(ts: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&super::format(ts))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        super::parse(&s).map_err(serde::de::Error::custom)
    }
}

/// Serde adapter for `Option<DateTime<Utc>>` fields using the fixed format.
pub mod serde_fixed_option {
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(ts: &Option<DateTime<Utc>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match ts {
            Some(ts) => serializer.serialize_some(&super::format(ts)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = Option::<String>::deserialize(deserializer)?;
        s.map(|s| super::parse(&s).map_err(serde::de::Error::custom))
            .transpose()
    }
}
