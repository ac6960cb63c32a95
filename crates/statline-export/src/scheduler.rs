//! Export scheduler — drives periodic export cycles.
//!
//! One background task owns the loop: collect a snapshot, diff it
//! against the previous one, flatten the diff to records, then fan the
//! batch out to every registered sink concurrently. Cycles are awaited
//! inline, so two cycles never overlap; a tick that fires mid-cycle
//! simply waits its turn. The previous-snapshot slot is replaced before
//! fan-out begins, under its own lock, giving the next cycle a clean
//! happens-before edge on the baseline.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::{Mutex, RwLock, watch};
use tokio::task::{JoinHandle, JoinSet};
use tracing::{debug, info, warn};

use statline_model::Snapshot;
use statline_pipeline::{Transformer, delta};

use crate::sink::{Sink, StatsSource};

/// Scheduler lifecycle. A stopped scheduler cannot be restarted —
/// construct a fresh one instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Lifecycle {
    Idle,
    Running,
    Stopped,
}

/// Periodically collects, diffs, transforms, and exports statistics.
pub struct ExportScheduler {
    interval: Duration,
    /// Bound on each sink's export call, independent of the interval.
    export_timeout: Duration,
    source: Arc<dyn StatsSource>,
    transformer: Transformer,
    /// Registered sinks. Guarded separately from the snapshot slot so
    /// registration never serializes behind delta computation.
    sinks: RwLock<Vec<Arc<dyn Sink>>>,
    /// Baseline for delta computation; replaced, never merged.
    prev_snapshot: Mutex<Option<Snapshot>>,
    lifecycle: Mutex<Lifecycle>,
    loop_handle: Mutex<Option<JoinHandle<()>>>,
    shutdown_tx: watch::Sender<bool>,
}

impl ExportScheduler {
    pub fn new(
        interval: Duration,
        export_timeout: Duration,
        source: Arc<dyn StatsSource>,
        transformer: Transformer,
    ) -> Arc<Self> {
        let (shutdown_tx, _) = watch::channel(false);
        Arc::new(Self {
            interval,
            export_timeout,
            source,
            transformer,
            sinks: RwLock::new(Vec::new()),
            prev_snapshot: Mutex::new(None),
            lifecycle: Mutex::new(Lifecycle::Idle),
            loop_handle: Mutex::new(None),
            shutdown_tx,
        })
    }

    /// Register a sink. Allowed while running; takes effect on the next
    /// cycle (the in-flight fan-out works from its own copy of the list).
    pub async fn add_sink(&self, sink: Arc<dyn Sink>) {
        let mut sinks = self.sinks.write().await;
        debug!(sink = sink.name(), "sink registered");
        sinks.push(sink);
    }

    /// Names of the registered sinks.
    pub async fn sink_names(&self) -> Vec<String> {
        let sinks = self.sinks.read().await;
        sinks.iter().map(|s| s.name().to_string()).collect()
    }

    /// Start the export loop. Returns `false` without effect if the
    /// scheduler is already running or was stopped.
    pub async fn start(self: &Arc<Self>) -> bool {
        {
            let mut lifecycle = self.lifecycle.lock().await;
            if *lifecycle != Lifecycle::Idle {
                return false;
            }
            *lifecycle = Lifecycle::Running;
        }

        let scheduler = Arc::clone(self);
        let shutdown_rx = self.shutdown_tx.subscribe();
        let handle = tokio::spawn(async move {
            scheduler.run(shutdown_rx).await;
        });
        *self.loop_handle.lock().await = Some(handle);

        let sink_count = self.sinks.read().await.len();
        info!(
            interval_secs = self.interval.as_secs(),
            sinks = sink_count,
            "export scheduler started"
        );
        true
    }

    /// Stop the loop, wait for any in-flight cycle to finish, then close
    /// every sink exactly once. A no-op unless currently running.
    pub async fn stop(&self) {
        {
            let mut lifecycle = self.lifecycle.lock().await;
            if *lifecycle != Lifecycle::Running {
                return;
            }
            *lifecycle = Lifecycle::Stopped;
        }

        let _ = self.shutdown_tx.send(true);
        if let Some(handle) = self.loop_handle.lock().await.take() {
            if let Err(e) = handle.await {
                warn!(error = %e, "export loop task failed");
            }
        }

        let sinks: Vec<Arc<dyn Sink>> = self.sinks.read().await.clone();
        for sink in sinks {
            if let Err(e) = sink.close().await {
                warn!(sink = sink.name(), error = %e, "failed to close sink");
            }
        }
        info!("export scheduler stopped");
    }

    /// The cycle loop. The shutdown signal exits after the in-flight
    /// cycle finishes, never in the middle of one.
    async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        loop {
            tokio::select! {
                _ = tokio::time::sleep(self.interval) => {
                    self.export_cycle().await;
                }
                _ = shutdown.changed() => {
                    debug!("export loop shutting down");
                    break;
                }
            }
        }
    }

    /// One export cycle: collect → delta → transform → fan out.
    async fn export_cycle(&self) {
        let started = Instant::now();

        let current = match self.source.collect().await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                // Baseline stays untouched so the next cycle diffs
                // against clean state.
                warn!(error = %e, "stats collection failed, skipping cycle");
                return;
            }
        };

        // Diff and replace the baseline in one critical section. The
        // baseline becomes the *current* snapshot, not the delta.
        let delta_snapshot = {
            let mut prev = self.prev_snapshot.lock().await;
            let delta_snapshot = delta::between(prev.as_ref(), &current);
            *prev = Some(current);
            delta_snapshot
        };

        let records = self.transformer.transform(&delta_snapshot);
        if records.is_empty() {
            debug!("no metrics to export this cycle");
            return;
        }

        let sinks: Vec<Arc<dyn Sink>> = self.sinks.read().await.clone();
        if sinks.is_empty() {
            debug!(records = records.len(), "no sinks registered, dropping batch");
            return;
        }

        let records = Arc::new(records);
        let mut exports = JoinSet::new();
        for sink in sinks {
            let records = Arc::clone(&records);
            let timeout = self.export_timeout;
            exports.spawn(async move {
                match tokio::time::timeout(timeout, sink.export(records.as_slice())).await {
                    Ok(Ok(())) => {
                        debug!(
                            sink = sink.name(),
                            records = records.len(),
                            "exported metrics"
                        );
                    }
                    Ok(Err(e)) => {
                        warn!(sink = sink.name(), error = %e, "failed to export metrics");
                    }
                    Err(_) => {
                        warn!(
                            sink = sink.name(),
                            timeout_secs = timeout.as_secs(),
                            "export timed out"
                        );
                    }
                }
            });
        }
        while exports.join_next().await.is_some() {}

        debug!(
            records = records.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "export cycle completed"
        );
    }
}
