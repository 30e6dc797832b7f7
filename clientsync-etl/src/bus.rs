//! Read-side access to the event bus, for diagnostics.
//!
//! Nothing here is on the sync path. The monitor uses it to report
//! reachability and topic metadata, and operators use the consumer-group
//! read to inspect what actually reached the bus.

use crate::error::{EtlError, EtlResult};
use clientsync_types::TransformedRecord;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::{Client, Response};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info, warn};
use uuid::Uuid;

const API_CONTENT_TYPE: &str = "application/vnd.kafka.v2+json";
const JSON_RECORDS: &str = "application/vnd.kafka.json.v2+json";

/// Metadata of one topic partition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartitionInfo {
    pub partition: i32,
    #[serde(default)]
    pub leader: Option<i32>,
    #[serde(default)]
    pub replicas: Vec<serde_json::Value>,
}

/// Metadata of a topic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopicMetadata {
    pub name: String,
    #[serde(default)]
    pub partitions: Vec<PartitionInfo>,
}

/// Outcome of a reachability probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BusHealth {
    pub reachable: bool,
    pub topics: Vec<String>,
    pub error: Option<String>,
}

/// One record returned by a consumer poll.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ConsumedRecord {
    pub topic: String,
    #[serde(default)]
    pub key: Option<serde_json::Value>,
    pub value: serde_json::Value,
    pub partition: i32,
    pub offset: i64,
}

impl ConsumedRecord {
    /// Decodes the value as a client change, if it is one.
    pub fn as_client(&self) -> Option<TransformedRecord> {
        serde_json::from_value(self.value.clone()).ok()
    }
}

/// Limits for a single consumer poll.
#[derive(Debug, Clone)]
pub struct ConsumeOptions {
    /// Upper bound on the response size.
    pub max_bytes: u64,
    /// How long the bus may wait for records before answering.
    pub poll_timeout: Duration,
}

impl Default for ConsumeOptions {
    fn default() -> Self {
        Self {
            max_bytes: 1_000_000,
            poll_timeout: Duration::from_secs(3),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ConsumerInstance {
    instance_id: String,
    base_uri: String,
}

/// HTTP client for the bus's admin and consumer endpoints.
pub struct BusClient {
    base_url: String,
    client: Client,
}

impl BusClient {
    /// Creates a client with a per-request timeout.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> EtlResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| EtlError::Config(format!("failed to create HTTP client: {e}")))?;
        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
        })
    }

    /// Lists topic names.
    pub async fn list_topics(&self) -> EtlResult<Vec<String>> {
        let url = format!("{}/topics", self.base_url);
        let response = self
            .client
            .get(&url)
            .header(ACCEPT, API_CONTENT_TYPE)
            .send()
            .await
            .map_err(|e| EtlError::BusUnreachable(format!("GET {url} failed: {e}")))?;
        let response = check_status(response, &url).await?;
        response
            .json()
            .await
            .map_err(|e| EtlError::BusUnreachable(format!("failed to parse topic list: {e}")))
    }

    /// Fetches metadata, including partitions, for one topic.
    pub async fn topic_metadata(&self, topic: &str) -> EtlResult<TopicMetadata> {
        let url = format!("{}/topics/{}", self.base_url, urlencoding::encode(topic));
        let response = self
            .client
            .get(&url)
            .header(ACCEPT, API_CONTENT_TYPE)
            .send()
            .await
            .map_err(|e| EtlError::BusUnreachable(format!("GET {url} failed: {e}")))?;
        let response = check_status(response, &url).await?;
        response
            .json()
            .await
            .map_err(|e| EtlError::BusUnreachable(format!("failed to parse topic metadata: {e}")))
    }

    /// Checks reachability by listing topics. Never fails.
    pub async fn probe(&self) -> BusHealth {
        match self.list_topics().await {
            Ok(topics) => BusHealth {
                reachable: true,
                topics,
                error: None,
            },
            Err(e) => BusHealth {
                reachable: false,
                topics: Vec::new(),
                error: Some(e.to_string()),
            },
        }
    }

    /// Reads one batch of records from `topic` through a throwaway consumer
    /// instance in `group`.
    ///
    /// The instance is deleted before returning, whether or not the
    /// subscription and poll succeeded.
    pub async fn consume(
        &self,
        group: &str,
        topic: &str,
        options: &ConsumeOptions,
    ) -> EtlResult<Vec<ConsumedRecord>> {
        let instance = self.create_instance(group).await?;
        debug!(instance = %instance.instance_id, group, "created consumer instance");

        let result = match self.subscribe(&instance.base_uri, topic).await {
            Ok(()) => self.poll(&instance.base_uri, options).await,
            Err(e) => Err(e),
        };

        if let Err(e) = self.delete_instance(&instance.base_uri).await {
            warn!(instance = %instance.instance_id, "failed to delete consumer instance: {e}");
        }

        if let Ok(records) = &result {
            info!(topic, count = records.len(), "consumed records from bus");
        }
        result
    }

    async fn create_instance(&self, group: &str) -> EtlResult<ConsumerInstance> {
        let url = format!("{}/consumers/{}", self.base_url, urlencoding::encode(group));
        let body = serde_json::json!({
            "name": format!("clientsync-{}", Uuid::new_v4()),
            "format": "json",
            "auto.offset.reset": "earliest",
        });
        let response = self
            .client
            .post(&url)
            .header(CONTENT_TYPE, API_CONTENT_TYPE)
            .body(body.to_string())
            .send()
            .await
            .map_err(|e| EtlError::BusUnreachable(format!("POST {url} failed: {e}")))?;
        let response = check_status(response, &url).await?;
        response
            .json()
            .await
            .map_err(|e| EtlError::BusUnreachable(format!("failed to parse consumer instance: {e}")))
    }

    async fn subscribe(&self, base_uri: &str, topic: &str) -> EtlResult<()> {
        let url = format!("{base_uri}/subscription");
        let body = serde_json::json!({ "topics": [topic] });
        let response = self
            .client
            .post(&url)
            .header(CONTENT_TYPE, API_CONTENT_TYPE)
            .body(body.to_string())
            .send()
            .await
            .map_err(|e| EtlError::BusUnreachable(format!("POST {url} failed: {e}")))?;
        check_status(response, &url).await?;
        Ok(())
    }

    async fn poll(
        &self,
        base_uri: &str,
        options: &ConsumeOptions,
    ) -> EtlResult<Vec<ConsumedRecord>> {
        let url = format!("{base_uri}/records");
        let timeout_ms = options.poll_timeout.as_millis().to_string();
        let max_bytes = options.max_bytes.to_string();
        let response = self
            .client
            .get(&url)
            .header(ACCEPT, JSON_RECORDS)
            .query(&[("timeout", timeout_ms.as_str()), ("max_bytes", max_bytes.as_str())])
            .timeout(options.poll_timeout + Duration::from_secs(5))
            .send()
            .await
            .map_err(|e| EtlError::BusUnreachable(format!("GET {url} failed: {e}")))?;
        let response = check_status(response, &url).await?;
        response
            .json()
            .await
            .map_err(|e| EtlError::BusUnreachable(format!("failed to parse records: {e}")))
    }

    async fn delete_instance(&self, base_uri: &str) -> EtlResult<()> {
        let response = self
            .client
            .delete(base_uri)
            .header(CONTENT_TYPE, API_CONTENT_TYPE)
            .send()
            .await
            .map_err(|e| EtlError::BusUnreachable(format!("DELETE {base_uri} failed: {e}")))?;
        check_status(response, base_uri).await?;
        Ok(())
    }
}

async fn check_status(response: Response, url: &str) -> EtlResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let detail = response.text().await.unwrap_or_default();
    Err(EtlError::BusUnreachable(format!(
        "{url} returned {status}: {detail}"
    )))
}
