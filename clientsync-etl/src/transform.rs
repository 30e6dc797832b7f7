//! Record normalization.
//!
//! Pure functions only: the output depends on the input record and the run's
//! reference time, nothing else.

use chrono::{DateTime, Utc};
use clientsync_types::{ClientRecord, TransformedRecord, DEFAULT_COUNTRY};

/// Maps a primary-store row to its publish-ready form.
///
/// `reference` becomes the record's `synced_at`; the source watermark is
/// ignored.
pub fn transform(client: &ClientRecord, reference: DateTime<Utc>) -> TransformedRecord {
    TransformedRecord {
        id: client.id,
        name: client.name.clone(),
        first_name: client.first_name.clone(),
        email: normalize_email(&client.email),
        phone: client.phone.as_deref().and_then(normalize_phone),
        address: client.address.clone(),
        city: client.city.clone(),
        postal_code: client.postal_code.clone(),
        country: country_or_default(client.country.as_deref()),
        status: client.status,
        synced_at: reference,
        created_at: client.created_at,
        updated_at: client.updated_at,
    }
}

/// Transforms a batch with one shared reference time.
pub fn transform_all(clients: &[ClientRecord], reference: DateTime<Utc>) -> Vec<TransformedRecord> {
    clients.iter().map(|c| transform(c, reference)).collect()
}

/// Lower-cases an email after trimming surrounding whitespace.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Keeps digits and at most one `+`, and only as the first kept character.
///
/// Returns `None` when nothing but a bare `+` (or nothing at all) survives.
///
/// ```
/// use clientsync_etl::transform::normalize_phone;
///
/// assert_eq!(normalize_phone("+226 70 12-34").as_deref(), Some("+226701234"));
/// assert_eq!(normalize_phone("n/a"), None);
/// ```
pub fn normalize_phone(phone: &str) -> Option<String> {
    let mut out = String::with_capacity(phone.len());
    for c in phone.chars() {
        if c.is_ascii_digit() {
            out.push(c);
        } else if c == '+' && out.is_empty() {
            out.push(c);
        }
    }
    if out.chars().any(|c| c.is_ascii_digit()) {
        Some(out)
    } else {
        None
    }
}

/// Returns the stored country, or the default when it is missing or blank.
pub fn country_or_default(country: Option<&str>) -> String {
    match country.map(str::trim) {
        Some(c) if !c.is_empty() => c.to_string(),
        _ => DEFAULT_COUNTRY.to_string(),
    }
}
