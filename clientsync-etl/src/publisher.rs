//! Event publication with a local durability backstop.
//!
//! Every record is first appended to the topic's fallback log, then posted
//! to the bus as a batch of one. Bus failures never reach the caller as
//! errors: the record is already on disk, only bus visibility is delayed.

use crate::config::{validate_topic, PublisherConfig};
use crate::error::{EtlError, EtlResult};
use crate::fallback::FallbackLog;
use clientsync_types::TransformedRecord;
use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use serde::Serialize;
use tracing::{debug, error, warn};

/// Content type of the bus's JSON produce endpoint.
pub const PRODUCE_CONTENT_TYPE: &str = "application/vnd.kafka.json.v2+json";

/// What happened to one publication.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishOutcome {
    /// The bus acknowledged the record.
    Delivered,
    /// The bus did not take the record but the fallback log did.
    FallbackWritten,
    /// Neither the bus nor the fallback log took the record.
    BothFailed,
}

impl PublishOutcome {
    /// Returns true if the record is durable somewhere.
    pub fn is_durable(&self) -> bool {
        !matches!(self, PublishOutcome::BothFailed)
    }
}

#[derive(Serialize)]
struct ProduceRequest<'a> {
    records: [ProduceRecord<'a>; 1],
}

#[derive(Serialize)]
struct ProduceRecord<'a> {
    value: &'a TransformedRecord,
}

/// A failed bus call, and whether trying again could help.
struct DeliveryFailure {
    reason: String,
    retryable: bool,
}

/// Publishes transformed records to the event bus.
pub struct EventPublisher {
    config: PublisherConfig,
    client: Client,
    fallback: FallbackLog,
}

impl EventPublisher {
    /// Creates a publisher from an explicit configuration.
    pub fn new(config: PublisherConfig) -> EtlResult<Self> {
        config.validate()?;
        let client = Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| EtlError::Config(format!("failed to create HTTP client: {e}")))?;
        let fallback = FallbackLog::new(config.fallback_dir.clone());

        Ok(Self {
            config,
            client,
            fallback,
        })
    }

    /// Returns the configured default topic.
    pub fn topic(&self) -> &str {
        &self.config.topic
    }

    /// Returns the fallback log this publisher writes to.
    pub fn fallback(&self) -> &FallbackLog {
        &self.fallback
    }

    /// Publishes to the configured default topic.
    pub async fn publish_default(&self, record: &TransformedRecord) -> PublishOutcome {
        self.publish(&self.config.topic, record).await
    }

    /// Publishes one record to `topic`.
    pub async fn publish(&self, topic: &str, record: &TransformedRecord) -> PublishOutcome {
        let line = match record.to_json_line() {
            Ok(line) => line,
            Err(e) => {
                error!(client_id = %record.id, "failed to encode record: {e}");
                return PublishOutcome::BothFailed;
            }
        };

        let logged = match self.fallback.append(topic, &line).await {
            Ok(()) => true,
            Err(e) => {
                error!(client_id = %record.id, topic, "fallback log append failed: {e}");
                false
            }
        };

        match self.deliver(topic, record).await {
            Ok(()) => {
                debug!(client_id = %record.id, topic, "record delivered to bus");
                PublishOutcome::Delivered
            }
            Err(e) if logged => {
                warn!(client_id = %record.id, topic, "{e}; record kept in fallback log");
                PublishOutcome::FallbackWritten
            }
            Err(e) => {
                error!(client_id = %record.id, topic, "{e}; fallback log unavailable too");
                PublishOutcome::BothFailed
            }
        }
    }

    /// Posts the record, retrying transport errors and 5xx responses.
    async fn deliver(&self, topic: &str, record: &TransformedRecord) -> EtlResult<()> {
        validate_topic(topic)?;
        let url = format!(
            "{}/topics/{}",
            self.config.bus_url.trim_end_matches('/'),
            topic
        );
        let body = ProduceRequest {
            records: [ProduceRecord { value: record }],
        };

        let mut last_failure = String::new();
        for attempt in 0..=self.config.max_retries {
            if attempt > 0 {
                tokio::time::sleep(self.config.backoff(attempt)).await;
                debug!(attempt, topic, "retrying bus delivery");
            }
            match self.post_once(&url, &body).await {
                Ok(()) => return Ok(()),
                Err(failure) => {
                    last_failure = failure.reason;
                    if !failure.retryable {
                        break;
                    }
                }
            }
        }
        Err(EtlError::BusUnreachable(last_failure))
    }

    async fn post_once(
        &self,
        url: &str,
        body: &ProduceRequest<'_>,
    ) -> Result<(), DeliveryFailure> {
        let response = self
            .client
            .post(url)
            .header(CONTENT_TYPE, PRODUCE_CONTENT_TYPE)
            .json(body)
            .send()
            .await
            .map_err(|e| DeliveryFailure {
                reason: format!("POST {url} failed: {e}"),
                retryable: true,
            })?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        let detail = response.text().await.unwrap_or_default();
        Err(DeliveryFailure {
            reason: format!("POST {url} returned {status}: {detail}"),
            retryable: status.is_server_error(),
        })
    }
}
