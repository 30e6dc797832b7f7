//! Client synchronization pipeline.
//!
//! Moves client records from an authoritative (primary) store into a
//! secondary store and announces every change on an event bus.
//!
//! # Architecture
//!
//! Change detection is watermark based: a row needs work when its
//! `synced_at` is missing or older than its `updated_at`. Nothing else is
//! remembered between runs.
//!
//! ## Components
//!
//! - **Transform**: pure normalization of a row into a publish-ready record
//! - **Fallback log**: append-only per-topic file, a superset of all events
//! - **Publisher**: posts records to the bus, never loses one to a bus outage
//! - **Bus client**: read-side diagnostics (topics, consumer-group reads)
//! - **Orchestrator**: drives a run and reports the outcome
//!
//! ## Run
//!
//! 1. **Extract**: fetch candidates from the primary store
//! 2. **Transform**: normalize each candidate with the run's reference time
//! 3. **Publish**: append to the fallback log, post to the bus
//! 4. **Load**: upsert into the secondary store by lower-cased email
//! 5. **Mark**: set the primary row's watermark to the reference time
//!
//! Delivery is at-least-once. Consumers must treat events as "this state
//! should exist" and be idempotent on email.
//!
//! # Example
//!
//! ```no_run
//! use clientsync_etl::{EventPublisher, PublisherConfig, SyncOrchestrator, SyncSettings};
//! use clientsync_store::ClientStore;
//!
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! let primary = ClientStore::open("primary.db")?;
//! let secondary = ClientStore::open("secondary.db")?;
//! let publisher = EventPublisher::new(PublisherConfig::default())?;
//!
//! let orchestrator = SyncOrchestrator::new(primary, secondary, publisher, SyncSettings::default());
//! let report = orchestrator.run().await;
//! println!("{}: {} clients", report.message, report.count);
//! # Ok(())
//! # }
//! ```

pub mod bus;
mod config;
mod error;
pub mod fallback;
mod orchestrator;
pub mod publisher;
pub mod transform;

pub use bus::{BusClient, BusHealth, ConsumeOptions, ConsumedRecord, PartitionInfo, TopicMetadata};
pub use config::{validate_topic, PublisherConfig, SyncSettings, DEFAULT_BUS_URL, DEFAULT_TOPIC};
pub use error::{EtlError, EtlResult};
pub use fallback::{FallbackLog, TailReport};
pub use orchestrator::{RunPhase, SyncOrchestrator, SyncReport};
pub use publisher::{EventPublisher, PublishOutcome};
pub use transform::{transform, transform_all};
