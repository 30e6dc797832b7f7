use chrono::{DateTime, Duration, TimeZone, Utc};
use clientsync_types::{
    ClientId, ClientRecord, ClientStatus, ClientUpdate, NewClient, TransformedRecord,
};
use proptest::prelude::*;
use std::str::FromStr;

fn at(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(secs, 0).unwrap()
}

fn make_record(updated_at: DateTime<Utc>, synced_at: Option<DateTime<Utc>>) -> ClientRecord {
    ClientRecord {
        id: ClientId::new(1),
        name: "Ouedraogo".into(),
        first_name: "Amadou".into(),
        email: "amadou@example.bf".into(),
        phone: Some("+226 70 12 34 56".into()),
        address: None,
        city: Some("Ouagadougou".into()),
        postal_code: None,
        country: None,
        status: ClientStatus::Active,
        created_at: at(1_000),
        updated_at,
        synced_at,
    }
}

// ── ClientStatus ─────────────────────────────────────────────────

#[test]
fn status_defaults_to_active() {
    assert_eq!(ClientStatus::default(), ClientStatus::Active);
    assert_eq!(NewClient::new("a", "b", "c@d.e").status, ClientStatus::Active);
}

#[test]
fn status_parse_is_case_insensitive() {
    assert_eq!(ClientStatus::from_str("ACTIVE").unwrap(), ClientStatus::Active);
    assert_eq!(ClientStatus::from_str(" inactive ").unwrap(), ClientStatus::Inactive);
    assert!(ClientStatus::from_str("archived").is_err());
}

#[test]
fn status_serializes_lowercase() {
    assert_eq!(serde_json::to_string(&ClientStatus::Inactive).unwrap(), "\"inactive\"");
    assert_eq!(ClientStatus::Active.to_string(), "active");
}

// ── Sync candidacy ───────────────────────────────────────────────

#[test]
fn never_synced_is_candidate() {
    assert!(make_record(at(2_000), None).is_sync_candidate());
}

#[test]
fn synced_before_update_is_candidate() {
    assert!(make_record(at(2_000), Some(at(1_999))).is_sync_candidate());
}

#[test]
fn synced_at_update_is_not_candidate() {
    assert!(!make_record(at(2_000), Some(at(2_000))).is_sync_candidate());
}

#[test]
fn synced_after_update_is_not_candidate() {
    assert!(!make_record(at(2_000), Some(at(2_001))).is_sync_candidate());
}

proptest! {
    #[test]
    fn candidacy_follows_watermark(updated in 0i64..4_000_000_000, offset in -1_000_000i64..1_000_000) {
        let updated_at = at(updated);
        let synced_at = updated_at + Duration::seconds(offset);
        let record = make_record(updated_at, Some(synced_at));
        prop_assert_eq!(record.is_sync_candidate(), synced_at < updated_at);
        prop_assert!(make_record(updated_at, None).is_sync_candidate());
    }
}

// ── Builders ─────────────────────────────────────────────────────

#[test]
fn new_client_builder() {
    let client = NewClient::new("Sawadogo", "Fatimata", "fatimata@example.bf")
        .with_phone("+226 75 98 76 54")
        .with_address("Secteur 30", "Ouagadougou", "01 BP 5678")
        .with_country("Burkina Faso")
        .with_status(ClientStatus::Inactive);

    assert_eq!(client.phone.as_deref(), Some("+226 75 98 76 54"));
    assert_eq!(client.city.as_deref(), Some("Ouagadougou"));
    assert_eq!(client.postal_code.as_deref(), Some("01 BP 5678"));
    assert_eq!(client.country.as_deref(), Some("Burkina Faso"));
    assert_eq!(client.status, ClientStatus::Inactive);
}

#[test]
fn empty_update() {
    assert!(ClientUpdate::default().is_empty());
    let update = ClientUpdate {
        city: Some("Bobo-Dioulasso".into()),
        ..Default::default()
    };
    assert!(!update.is_empty());
}

// ── Serialization ────────────────────────────────────────────────

#[test]
fn client_record_uses_fixed_timestamps() {
    let json = serde_json::to_value(make_record(at(2_000), None)).unwrap();
    assert_eq!(json["created_at"], "1970-01-01T00:16:40.000000+00:00");
    assert!(json["synced_at"].is_null());
}

#[test]
fn transformed_record_json_line() {
    let record = TransformedRecord {
        id: ClientId::new(3),
        name: "Compaore".into(),
        first_name: "Ibrahim".into(),
        email: "ibrahim@example.bf".into(),
        phone: Some("+22671234567".into()),
        address: None,
        city: None,
        postal_code: None,
        country: "Burkina Faso".into(),
        status: ClientStatus::Active,
        synced_at: at(3_000),
        created_at: at(1_000),
        updated_at: at(2_000),
    };

    let line = record.to_json_line().unwrap();
    assert!(!line.contains('\n'));
    assert!(line.starts_with(r#"{"id":3,"name":"Compaore""#));
    assert_eq!(TransformedRecord::from_json_line(&line).unwrap(), record);
}

#[test]
fn transformed_record_rejects_malformed_line() {
    assert!(TransformedRecord::from_json_line("{not json").is_err());
    assert!(TransformedRecord::from_json_line(r#"{"id":1}"#).is_err());
}
