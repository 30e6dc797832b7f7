//! Pipeline configuration.
//!
//! Everything the pipeline needs is passed in through these structs. Nothing
//! below this module reads the environment.

use crate::error::{EtlError, EtlResult};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Default event-bus endpoint (a Kafka REST proxy on its usual port).
pub const DEFAULT_BUS_URL: &str = "http://localhost:8082";

/// Default topic client changes are announced on.
pub const DEFAULT_TOPIC: &str = "client-sync";

/// Configuration for the event publisher.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublisherConfig {
    /// Base URL of the event-bus HTTP endpoint.
    pub bus_url: String,
    /// Topic used by `publish_default`.
    pub topic: String,
    /// Per-request timeout for bus calls (ms).
    pub timeout_ms: u64,
    /// Directory holding one `<topic>.log` file per topic.
    pub fallback_dir: PathBuf,
    /// Additional attempts after a failed delivery.
    pub max_retries: u32,
    /// Delay before the first retry; grows linearly (ms).
    pub retry_backoff_ms: u64,
}

impl Default for PublisherConfig {
    fn default() -> Self {
        Self {
            bus_url: DEFAULT_BUS_URL.to_string(),
            topic: DEFAULT_TOPIC.to_string(),
            timeout_ms: 5_000,
            fallback_dir: PathBuf::from("logs"),
            max_retries: 2,
            retry_backoff_ms: 250,
        }
    }
}

impl PublisherConfig {
    /// Returns the per-request timeout.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Returns the delay before retry number `attempt` (1-based).
    pub fn backoff(&self, attempt: u32) -> Duration {
        Duration::from_millis(self.retry_backoff_ms.saturating_mul(u64::from(attempt)))
    }

    /// Rejects settings the publisher cannot work with.
    pub fn validate(&self) -> EtlResult<()> {
        if self.bus_url.trim().is_empty() {
            return Err(EtlError::Config("bus_url must not be empty".to_string()));
        }
        validate_topic(&self.topic)?;
        if self.timeout_ms == 0 {
            return Err(EtlError::Config("timeout_ms must be positive".to_string()));
        }
        Ok(())
    }
}

/// Configuration for the sync orchestrator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncSettings {
    /// Time budget for each store call (ms).
    pub store_timeout_ms: u64,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            store_timeout_ms: 5_000,
        }
    }
}

impl SyncSettings {
    /// Returns the per-call store timeout.
    pub fn store_timeout(&self) -> Duration {
        Duration::from_millis(self.store_timeout_ms)
    }
}

/// Topic names double as file names for the fallback log.
pub fn validate_topic(topic: &str) -> EtlResult<()> {
    let valid = !topic.is_empty()
        && topic != "."
        && topic != ".."
        && topic
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
    if valid {
        Ok(())
    } else {
        Err(EtlError::Config(format!("invalid topic name: {topic:?}")))
    }
}
