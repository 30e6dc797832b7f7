mod common;

use clientsync_etl::transform::transform;
use clientsync_etl::{BusClient, ConsumeOptions, EtlError};
use common::{at, sample_client, UNREACHABLE_BUS};
use serde_json::json;
use std::time::Duration;
use wiremock::matchers::{body_partial_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn bus(uri: &str) -> BusClient {
    BusClient::new(uri, Duration::from_secs(2)).unwrap()
}

fn fast_options() -> ConsumeOptions {
    ConsumeOptions {
        max_bytes: 4_096,
        poll_timeout: Duration::from_millis(100),
    }
}

async fn mount_instance(server: &MockServer, group: &str) -> String {
    let base_uri = format!("{}/consumers/{group}/instances/probe", server.uri());
    Mock::given(method("POST"))
        .and(path(format!("/consumers/{group}")))
        .and(body_partial_json(json!({ "format": "json" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "instance_id": "probe",
            "base_uri": base_uri,
        })))
        .expect(1)
        .mount(server)
        .await;
    base_uri
}

// ── Admin endpoints ──────────────────────────────────────────────

#[tokio::test]
async fn list_topics_parses_names() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/topics"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!(["client-sync", "audit"])))
        .mount(&server)
        .await;

    let topics = bus(&server.uri()).list_topics().await.unwrap();
    assert_eq!(topics, vec!["client-sync".to_string(), "audit".to_string()]);
}

#[tokio::test]
async fn topic_metadata_includes_partitions() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/topics/client-sync"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "name": "client-sync",
            "configs": { "cleanup.policy": "delete" },
            "partitions": [
                { "partition": 0, "leader": 1, "replicas": [{ "broker": 1, "leader": true, "in_sync": true }] },
                { "partition": 1, "leader": 1, "replicas": [] }
            ]
        })))
        .mount(&server)
        .await;

    let meta = bus(&server.uri()).topic_metadata("client-sync").await.unwrap();
    assert_eq!(meta.name, "client-sync");
    assert_eq!(meta.partitions.len(), 2);
    assert_eq!(meta.partitions[0].leader, Some(1));
    assert_eq!(meta.partitions[0].replicas.len(), 1);
}

#[tokio::test]
async fn unknown_topic_is_an_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/topics/missing"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "error_code": 40401,
            "message": "Topic not found."
        })))
        .mount(&server)
        .await;

    let err = bus(&server.uri()).topic_metadata("missing").await.unwrap_err();
    assert!(matches!(err, EtlError::BusUnreachable(ref msg) if msg.contains("404")));
}

#[tokio::test]
async fn probe_reports_reachable_bus() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/topics"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!(["client-sync"])))
        .mount(&server)
        .await;

    let health = bus(&server.uri()).probe().await;
    assert!(health.reachable);
    assert_eq!(health.topics, vec!["client-sync".to_string()]);
    assert!(health.error.is_none());
}

#[tokio::test]
async fn probe_never_fails_on_unreachable_bus() {
    let health = bus(UNREACHABLE_BUS).probe().await;
    assert!(!health.reachable);
    assert!(health.topics.is_empty());
    assert!(health.error.is_some());
}

// ── Consumer ─────────────────────────────────────────────────────

#[tokio::test]
async fn consume_reads_batch_and_deletes_instance() {
    let server = MockServer::start().await;
    mount_instance(&server, "clientsync-cli").await;

    let record = transform(&sample_client(1, "a@b.com"), at(5_000));
    Mock::given(method("POST"))
        .and(path("/consumers/clientsync-cli/instances/probe/subscription"))
        .and(body_partial_json(json!({ "topics": ["client-sync"] })))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/consumers/clientsync-cli/instances/probe/records"))
        .and(query_param("max_bytes", "4096"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {
                "topic": "client-sync",
                "key": null,
                "value": serde_json::to_value(&record).unwrap(),
                "partition": 0,
                "offset": 7
            },
            {
                "topic": "client-sync",
                "value": { "something": "else" },
                "partition": 0,
                "offset": 8
            }
        ])))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/consumers/clientsync-cli/instances/probe"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let records = bus(&server.uri())
        .consume("clientsync-cli", "client-sync", &fast_options())
        .await
        .unwrap();

    assert_eq!(records.len(), 2);
    assert_eq!(records[0].offset, 7);
    assert_eq!(records[0].as_client(), Some(record));
    assert_eq!(records[1].as_client(), None);
}

#[tokio::test]
async fn consume_deletes_instance_when_subscribe_fails() {
    let server = MockServer::start().await;
    mount_instance(&server, "clientsync-cli").await;

    Mock::given(method("POST"))
        .and(path("/consumers/clientsync-cli/instances/probe/subscription"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/consumers/clientsync-cli/instances/probe/records"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(0)
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/consumers/clientsync-cli/instances/probe"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let result = bus(&server.uri())
        .consume("clientsync-cli", "client-sync", &fast_options())
        .await;
    assert!(matches!(result, Err(EtlError::BusUnreachable(_))));
}

#[tokio::test]
async fn consume_deletes_instance_when_poll_fails() {
    let server = MockServer::start().await;
    mount_instance(&server, "clientsync-cli").await;

    Mock::given(method("POST"))
        .and(path("/consumers/clientsync-cli/instances/probe/subscription"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/consumers/clientsync-cli/instances/probe/records"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/consumers/clientsync-cli/instances/probe"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let result = bus(&server.uri())
        .consume("clientsync-cli", "client-sync", &fast_options())
        .await;
    assert!(result.is_err());
}

#[tokio::test]
async fn failed_teardown_does_not_hide_records() {
    let server = MockServer::start().await;
    mount_instance(&server, "clientsync-cli").await;

    Mock::given(method("POST"))
        .and(path("/consumers/clientsync-cli/instances/probe/subscription"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/consumers/clientsync-cli/instances/probe/records"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/consumers/clientsync-cli/instances/probe"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let records = bus(&server.uri())
        .consume("clientsync-cli", "client-sync", &fast_options())
        .await
        .unwrap();
    assert!(records.is_empty());
}

#[tokio::test]
async fn consume_on_unreachable_bus_fails_fast() {
    let result = bus(UNREACHABLE_BUS)
        .consume("clientsync-cli", "client-sync", &fast_options())
        .await;
    assert!(matches!(result, Err(EtlError::BusUnreachable(_))));
}
