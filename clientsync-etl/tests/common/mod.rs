//! Shared helpers for pipeline tests.

#![allow(dead_code)]

use chrono::{DateTime, TimeZone, Utc};
use clientsync_etl::{EventPublisher, PublisherConfig, SyncOrchestrator, SyncSettings};
use clientsync_store::ClientStore;
use clientsync_types::{ClientId, ClientRecord, ClientStatus, NewClient};
use std::path::Path;

/// An address nothing listens on; connections are refused immediately.
pub const UNREACHABLE_BUS: &str = "http://127.0.0.1:1";

pub fn at(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(secs, 0).unwrap()
}

pub fn sample_client(id: i64, email: &str) -> ClientRecord {
    ClientRecord {
        id: ClientId::new(id),
        name: "Ouedraogo".into(),
        first_name: "Amadou".into(),
        email: email.into(),
        phone: Some("+226 70 12 34 56".into()),
        address: Some("Secteur 15, Avenue Kwame Nkrumah".into()),
        city: Some("Ouagadougou".into()),
        postal_code: Some("01 BP 1234".into()),
        country: None,
        status: ClientStatus::Active,
        created_at: at(1_000),
        updated_at: at(2_000),
        synced_at: None,
    }
}

pub fn new_client(email: &str) -> NewClient {
    NewClient::new("Sawadogo", "Fatimata", email).with_phone("+226 75 98-76 54")
}

/// Fast-failing publisher settings for tests.
pub fn publisher_config(bus_url: &str, fallback_dir: &Path) -> PublisherConfig {
    PublisherConfig {
        bus_url: bus_url.to_string(),
        timeout_ms: 500,
        fallback_dir: fallback_dir.to_path_buf(),
        max_retries: 0,
        retry_backoff_ms: 10,
        ..Default::default()
    }
}

pub fn make_publisher(bus_url: &str, fallback_dir: &Path) -> EventPublisher {
    EventPublisher::new(publisher_config(bus_url, fallback_dir)).unwrap()
}

pub fn make_orchestrator(
    primary: &ClientStore,
    secondary: &ClientStore,
    bus_url: &str,
    fallback_dir: &Path,
) -> SyncOrchestrator {
    SyncOrchestrator::new(
        primary.clone(),
        secondary.clone(),
        make_publisher(bus_url, fallback_dir),
        SyncSettings::default(),
    )
}

/// Returns the non-empty lines of a file, or nothing if it does not exist.
pub fn read_lines(path: &Path) -> Vec<String> {
    std::fs::read_to_string(path)
        .map(|s| s.lines().filter(|l| !l.is_empty()).map(String::from).collect())
        .unwrap_or_default()
}
