//! Command surface for the clientsync pipeline.
//!
//! Parsing lives here rather than in `main.rs` so the flag and environment
//! handling, and the rendered output, can be tested without a process.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use clientsync_etl::{
    BusClient, BusHealth, ConsumeOptions, ConsumedRecord, EventPublisher, PublisherConfig,
    SyncOrchestrator, SyncReport, SyncSettings, TailReport, TopicMetadata, DEFAULT_BUS_URL,
    DEFAULT_TOPIC,
};
use clientsync_store::ClientStore;
use clientsync_types::{timestamp, TransformedRecord};
use tokio_util::sync::CancellationToken;
use tracing::warn;

/// Consumer group used for diagnostic reads from the bus.
pub const CONSUMER_GROUP: &str = "clientsync-cli";

#[derive(Parser, Debug)]
#[command(name = "clientsync")]
#[command(about = "Synchronize client records between two stores through an event bus")]
pub struct Cli {
    /// Primary (source) database file
    #[arg(long, env = "CLIENTSYNC_PRIMARY_DB", default_value = "primary.db", global = true)]
    pub primary_db: PathBuf,

    /// Secondary (sink) database file
    #[arg(long, env = "CLIENTSYNC_SECONDARY_DB", default_value = "secondary.db", global = true)]
    pub secondary_db: PathBuf,

    /// Event-bus base URL
    #[arg(long, env = "CLIENTSYNC_BUS_URL", default_value = DEFAULT_BUS_URL, global = true)]
    pub bus_url: String,

    /// Topic client changes are published on
    #[arg(long, env = "CLIENTSYNC_TOPIC", default_value = DEFAULT_TOPIC, global = true)]
    pub topic: String,

    /// Per-request bus timeout in milliseconds
    #[arg(long, env = "CLIENTSYNC_TIMEOUT_MS", default_value = "5000", global = true)]
    pub timeout_ms: u64,

    /// Per-call store timeout in milliseconds
    #[arg(long, env = "CLIENTSYNC_STORE_TIMEOUT_MS", default_value = "5000", global = true)]
    pub store_timeout_ms: u64,

    /// Directory for the local fallback logs
    #[arg(long, env = "CLIENTSYNC_FALLBACK_DIR", default_value = "logs", global = true)]
    pub fallback_dir: PathBuf,

    /// Extra delivery attempts after a failed bus call
    #[arg(long, env = "CLIENTSYNC_MAX_RETRIES", default_value = "2", global = true)]
    pub max_retries: u32,

    /// Enable verbose debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Run one synchronization pass
    Sync {
        /// Print the run report as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show the most recent published client changes
    Consume {
        /// Number of entries to show
        #[arg(short, long, default_value = "10")]
        limit: usize,

        /// Read one batch from the bus instead of the local log
        #[arg(long)]
        from_bus: bool,
    },
    /// Report bus reachability and topic layout
    Monitor,
}

impl Cli {
    pub fn publisher_config(&self) -> PublisherConfig {
        PublisherConfig {
            bus_url: self.bus_url.clone(),
            topic: self.topic.clone(),
            timeout_ms: self.timeout_ms,
            fallback_dir: self.fallback_dir.clone(),
            max_retries: self.max_retries,
            ..Default::default()
        }
    }

    pub fn sync_settings(&self) -> SyncSettings {
        SyncSettings {
            store_timeout_ms: self.store_timeout_ms,
        }
    }

    fn bus_client(&self) -> Result<BusClient> {
        BusClient::new(&self.bus_url, Duration::from_millis(self.timeout_ms))
            .context("failed to create bus client")
    }
}

// ── Commands ─────────────────────────────────────────────────────

/// Opens both stores and runs one pass.
///
/// The primary must already exist; the secondary is created on demand.
/// Store open failures are reported as a failed run rather than an error, so
/// the caller prints the same kind of summary either way.
pub async fn run_sync(cli: &Cli, cancel: CancellationToken) -> Result<SyncReport> {
    let publisher = EventPublisher::new(cli.publisher_config())?;
    let started = std::time::Instant::now();

    let stores = ClientStore::open_existing(&cli.primary_db)
        .and_then(|primary| Ok((primary, ClientStore::open(&cli.secondary_db)?)));
    let (primary, secondary) = match stores {
        Ok(stores) => stores,
        Err(e) => {
            warn!("failed to open stores: {e}");
            return Ok(SyncReport {
                success: false,
                message: e.to_string(),
                count: 0,
                failed: 0,
                elapsed: started.elapsed(),
            });
        }
    };

    let orchestrator = SyncOrchestrator::new(primary, secondary, publisher, cli.sync_settings());
    Ok(orchestrator.run_with_cancel(cancel).await)
}

/// Renders the last `limit` entries of the topic's fallback log.
pub async fn run_consume(cli: &Cli, limit: usize) -> Result<String> {
    let publisher = EventPublisher::new(cli.publisher_config())?;
    let fallback = publisher.fallback();
    let report = fallback
        .tail(&cli.topic, limit)
        .await
        .with_context(|| format!("failed to read {}", fallback.path_for(&cli.topic).display()))?;
    Ok(format_tail(&cli.topic, &report))
}

/// Renders one batch read from the bus through a throwaway consumer.
pub async fn run_consume_from_bus(cli: &Cli, limit: usize) -> Result<String> {
    let records = cli
        .bus_client()?
        .consume(CONSUMER_GROUP, &cli.topic, &ConsumeOptions::default())
        .await?;
    Ok(format_consumed(&cli.topic, &records, limit))
}

/// Renders reachability and, when reachable, the topic's partitions.
pub async fn run_monitor(cli: &Cli) -> Result<String> {
    let bus = cli.bus_client()?;
    let health = bus.probe().await;
    let metadata = if health.reachable {
        match bus.topic_metadata(&cli.topic).await {
            Ok(meta) => Some(meta),
            Err(e) => {
                warn!(topic = %cli.topic, "failed to fetch topic metadata: {e}");
                None
            }
        }
    } else {
        None
    };
    Ok(format_health(&cli.bus_url, &cli.topic, &health, metadata.as_ref()))
}

// ── Rendering ────────────────────────────────────────────────────

pub fn format_report(report: &SyncReport) -> String {
    if !report.success {
        return format!("Error: {}", report.message);
    }
    let mut out = format!(
        "{}\nClients synchronized: {}\nElapsed: {:.2} s",
        report.message,
        report.count,
        report.elapsed.as_secs_f64()
    );
    if report.failed > 0 {
        out.push_str(&format!(
            "\nFailed (retried next run): {}",
            report.failed
        ));
    }
    out
}

pub fn format_entry(record: &TransformedRecord) -> String {
    let mut lines = vec![
        "┌─────────────────────────────────────".to_string(),
        format!("│ Client: {} {}", record.name, record.first_name),
        format!("│ Email:  {}", record.email),
    ];
    if let Some(phone) = &record.phone {
        lines.push(format!("│ Phone:  {phone}"));
    }
    lines.push(format!("│ Status: {}", record.status.as_str()));
    lines.push(format!("│ Synced: {}", timestamp::format(&record.synced_at)));
    lines.push("└─────────────────────────────────────".to_string());
    lines.join("\n")
}

pub fn format_tail(topic: &str, report: &TailReport) -> String {
    if report.total == 0 {
        return format!("No messages logged for topic '{topic}'. Run `clientsync sync` first.");
    }

    let mut out: Vec<String> = report.entries.iter().map(format_entry).collect();
    if report.skipped > 0 {
        out.push(format!("{} malformed message(s) skipped", report.skipped));
    }
    let shown = report.entries.len() + report.skipped;
    if report.total > shown {
        out.push(format!(
            "{} messages in total (showing the last {shown})",
            report.total
        ));
    } else {
        out.push(format!("{} messages in total", report.total));
    }
    out.join("\n")
}

pub fn format_consumed(topic: &str, records: &[ConsumedRecord], limit: usize) -> String {
    if records.is_empty() {
        return format!("No records available on topic '{topic}'.");
    }

    let window = &records[records.len().saturating_sub(limit)..];
    let mut out = Vec::with_capacity(window.len() + 1);
    for record in window {
        match record.as_client() {
            Some(client) => out.push(format_entry(&client)),
            None => out.push(format!(
                "partition {} offset {}: not a client record",
                record.partition, record.offset
            )),
        }
    }
    out.push(format!(
        "{} records received (showing {})",
        records.len(),
        window.len()
    ));
    out.join("\n")
}

pub fn format_health(
    bus_url: &str,
    topic: &str,
    health: &BusHealth,
    metadata: Option<&TopicMetadata>,
) -> String {
    if !health.reachable {
        let reason = health.error.as_deref().unwrap_or("unknown error");
        return format!("Bus at {bus_url} is unreachable: {reason}");
    }

    let mut out = vec![format!("Bus at {bus_url} is reachable")];
    if health.topics.is_empty() {
        out.push("Topics: (none)".to_string());
    } else {
        out.push(format!("Topics: {}", health.topics.join(", ")));
    }
    match metadata {
        Some(meta) => {
            out.push(format!("Topic '{}': {} partition(s)", meta.name, meta.partitions.len()));
            for p in &meta.partitions {
                let leader = p
                    .leader
                    .map(|l| l.to_string())
                    .unwrap_or_else(|| "none".to_string());
                out.push(format!(
                    "  partition {}: leader {leader}, {} replica(s)",
                    p.partition,
                    p.replicas.len()
                ));
            }
        }
        None => out.push(format!("Topic '{topic}': metadata unavailable")),
    }
    out.join("\n")
}
