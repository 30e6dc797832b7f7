//! Sync orchestrator: extract, transform, publish, load, mark.
//!
//! A run keeps no state outside memory. Which records need work is derived
//! from the primary store's watermarks every time, so a crashed or cancelled
//! run is simply followed by another one.

use crate::config::SyncSettings;
use crate::error::{EtlError, EtlResult};
use crate::publisher::{EventPublisher, PublishOutcome};
use crate::transform::transform_all;
use chrono::{DateTime, Utc};
use clientsync_store::{ClientStore, StoreResult};
use clientsync_types::{timestamp, ClientRecord, TransformedRecord};
use serde::Serialize;
use std::time::{Duration, Instant};
use tokio::sync::{watch, Mutex};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Where the orchestrator currently is within a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RunPhase {
    Idle,
    Extracting,
    Transforming,
    PublishingAndLoading,
    Done,
}

/// Aggregate result of one run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    /// False only when extraction failed.
    pub success: bool,
    pub message: String,
    /// Records that were published, loaded and marked without error.
    pub count: usize,
    /// Records that failed and remain candidates.
    pub failed: usize,
    pub elapsed: Duration,
}

impl SyncReport {
    fn completed(message: &str, count: usize, failed: usize, elapsed: Duration) -> Self {
        Self {
            success: true,
            message: message.to_string(),
            count,
            failed,
            elapsed,
        }
    }

    fn failure(message: String, elapsed: Duration) -> Self {
        Self {
            success: false,
            message,
            count: 0,
            failed: 0,
            elapsed,
        }
    }
}

/// Coordinates a synchronization run between the two stores.
pub struct SyncOrchestrator {
    primary: ClientStore,
    secondary: ClientStore,
    publisher: EventPublisher,
    settings: SyncSettings,
    phase: watch::Sender<RunPhase>,
    run_lock: Mutex<()>,
}

impl SyncOrchestrator {
    /// Creates an orchestrator over a primary (source) and secondary (sink)
    /// store.
    ///
    /// Both stores get their lock wait bounded by the store timeout, so a
    /// blocked statement gives up on its own instead of outliving the call.
    pub fn new(
        primary: ClientStore,
        secondary: ClientStore,
        publisher: EventPublisher,
        settings: SyncSettings,
    ) -> Self {
        for store in [&primary, &secondary] {
            if let Err(e) = store.set_busy_timeout(settings.store_timeout()) {
                warn!("failed to apply store timeout: {e}");
            }
        }
        let (phase, _) = watch::channel(RunPhase::Idle);
        Self {
            primary,
            secondary,
            publisher,
            settings,
            phase,
            run_lock: Mutex::new(()),
        }
    }

    /// Returns the current phase.
    pub fn phase(&self) -> RunPhase {
        *self.phase.borrow()
    }

    /// Subscribes to phase changes.
    pub fn watch_phase(&self) -> watch::Receiver<RunPhase> {
        self.phase.subscribe()
    }

    pub fn primary(&self) -> &ClientStore {
        &self.primary
    }

    pub fn secondary(&self) -> &ClientStore {
        &self.secondary
    }

    pub fn publisher(&self) -> &EventPublisher {
        &self.publisher
    }

    /// Runs the pipeline to completion.
    pub async fn run(&self) -> SyncReport {
        self.run_with_cancel(CancellationToken::new()).await
    }

    /// Runs the pipeline, stopping between records once `cancel` fires.
    pub async fn run_with_cancel(&self, cancel: CancellationToken) -> SyncReport {
        let started = Instant::now();
        let Ok(_guard) = self.run_lock.try_lock() else {
            warn!("sync run requested while another run is in progress");
            return SyncReport::completed(
                "synchronization already in progress",
                0,
                0,
                started.elapsed(),
            );
        };

        let reference = timestamp::now();
        info!(reference = %timestamp::format(&reference), "sync run started");

        self.phase.send_replace(RunPhase::Extracting);
        let candidates = match self.extract().await {
            Ok(candidates) => candidates,
            Err(e) => {
                error!("extract failed: {e}");
                self.phase.send_replace(RunPhase::Done);
                return SyncReport::failure(e.to_string(), started.elapsed());
            }
        };

        if candidates.is_empty() {
            info!("no clients to synchronize");
            self.phase.send_replace(RunPhase::Done);
            return SyncReport::completed("no clients to synchronize", 0, 0, started.elapsed());
        }

        self.phase.send_replace(RunPhase::Transforming);
        let records = transform_all(&candidates, reference);
        debug!(count = records.len(), "records transformed");

        self.phase.send_replace(RunPhase::PublishingAndLoading);
        let mut count = 0;
        let mut failed = 0;
        let mut cancelled = false;
        for record in &records {
            if cancel.is_cancelled() {
                cancelled = true;
                break;
            }
            match self.process(record, reference).await {
                Ok(()) => count += 1,
                Err(e) => {
                    failed += 1;
                    warn!("{e}");
                }
            }
        }

        self.phase.send_replace(RunPhase::Done);
        let elapsed = started.elapsed();
        if cancelled {
            warn!(count, remaining = records.len() - count - failed, "sync run cancelled");
            return SyncReport::completed("synchronization cancelled", count, failed, elapsed);
        }

        info!(count, failed, elapsed_ms = elapsed.as_millis() as u64, "sync run completed");
        SyncReport::completed("synchronization completed", count, failed, elapsed)
    }

    async fn extract(&self) -> EtlResult<Vec<ClientRecord>> {
        let candidates = self
            .call_store(&self.primary, |store| store.fetch_sync_candidates())
            .await
            .map_err(|e| match e {
                EtlError::Timeout => {
                    EtlError::StoreUnavailable("primary store timed out".to_string())
                }
                other => other,
            })?;
        info!(count = candidates.len(), "extracted sync candidates");
        Ok(candidates)
    }

    /// Publishes, loads and marks one record. Any failure leaves the source
    /// watermark untouched.
    async fn process(&self, record: &TransformedRecord, reference: DateTime<Utc>) -> EtlResult<()> {
        let id = record.id;

        if self.publisher.publish_default(record).await == PublishOutcome::BothFailed {
            return Err(EtlError::record(id, "event could not be published or logged"));
        }

        let sink_record = record.clone();
        self.call_store(&self.secondary, move |store| {
            store.upsert_sink_record(&sink_record)
        })
        .await
        .map_err(|e| EtlError::record(id, format!("sink upsert failed: {e}")))?;

        let marked = self
            .call_store(&self.primary, move |store| store.mark_synced(id, reference))
            .await
            .map_err(|e| EtlError::record(id, format!("mark synced failed: {e}")))?;
        if !marked {
            debug!(client_id = %id, "source row vanished during the run");
        }
        Ok(())
    }

    /// Runs a blocking store call on the blocking pool within the store
    /// timeout.
    ///
    /// On expiry the running statement is interrupted and the call's real
    /// outcome is awaited, so a call reported as timed out never commits
    /// afterwards. A call that finished despite the interrupt is reported as
    /// it finished.
    async fn call_store<T, F>(&self, store: &ClientStore, f: F) -> EtlResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&ClientStore) -> StoreResult<T> + Send + 'static,
    {
        let handle = store.clone();
        let mut task = tokio::task::spawn_blocking(move || f(&handle));
        let joined = match tokio::time::timeout(self.settings.store_timeout(), &mut task).await {
            Ok(joined) => joined,
            Err(_) => {
                store.interrupt();
                let joined = task.await;
                if matches!(joined, Ok(Ok(_))) {
                    warn!("store call completed after its timeout");
                }
                joined
            }
        };

        match joined {
            Err(join_err) => Err(EtlError::StoreUnavailable(format!(
                "store task failed: {join_err}"
            ))),
            Ok(Err(e)) if e.is_timed_out() => Err(EtlError::Timeout),
            Ok(result) => result.map_err(EtlError::from),
        }
    }
}
