//! The monitor: periodic fetch-and-aggregate cycles plus an independent
//! staleness check.
//!
//! A [`ClinicMonitor`] owns the published state and drives two recurring
//! tasks. The refresh task fetches all sources concurrently (each bounded
//! by its own timeout), merges the results and commits the new snapshot if
//! at least one source succeeded. The staleness task watches the age of
//! the last commit on its own timer, so a hung refresh loop is still
//! detected. Consumers read the last committed values without triggering
//! any work.

use std::sync::Arc;
use std::time::Duration;

use chrono::{Local, Utc};
use parking_lot::RwLock;
use tokio::sync::watch;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::aggregate::{Aggregator, CycleInput};
use crate::config::MonitorConfig;
use crate::snapshot::{AggregateSnapshot, SourcesOk, Staleness};
use crate::source::{DigitalSource, FetchError, FetchResult, QueueSource, ReceptionSource};

struct Sources {
    queue: Arc<dyn QueueSource>,
    reception: Arc<dyn ReceptionSource>,
    digital: Arc<dyn DigitalSource>,
}

/// State shared between the tasks and consumer reads.
///
/// The snapshot is swapped as a whole `Arc`, never mutated in place, so a
/// reader always sees one complete cycle's output.
struct Shared {
    snapshot: RwLock<Option<Arc<AggregateSnapshot>>>,
    staleness: RwLock<Staleness>,
    last_commit: RwLock<Option<Instant>>,
    last_cycle: RwLock<SourcesOk>,
}

impl Shared {
    fn new() -> Self {
        Self {
            snapshot: RwLock::new(None),
            staleness: RwLock::new(Staleness::Fresh),
            last_commit: RwLock::new(None),
            last_cycle: RwLock::new(SourcesOk::none()),
        }
    }
}

/// Unified live-queue monitor over the three upstream sources.
pub struct ClinicMonitor {
    config: MonitorConfig,
    aggregator: Aggregator,
    sources: Arc<Sources>,
    shared: Arc<Shared>,
}

impl ClinicMonitor {
    pub fn new(
        config: MonitorConfig,
        queue: Arc<dyn QueueSource>,
        reception: Arc<dyn ReceptionSource>,
        digital: Arc<dyn DigitalSource>,
    ) -> Self {
        let aggregator = Aggregator::new(&config);
        Self {
            config,
            aggregator,
            sources: Arc::new(Sources {
                queue,
                reception,
                digital,
            }),
            shared: Arc::new(Shared::new()),
        }
    }

    /// The last committed snapshot, or `None` before the first successful
    /// cycle. Non-blocking.
    pub fn snapshot(&self) -> Option<Arc<AggregateSnapshot>> {
        self.shared.snapshot.read().clone()
    }

    /// Current staleness state. Non-blocking.
    ///
    /// Before the first successful commit this is `Fresh`: a monitor that
    /// has never had data reports `snapshot() == None` rather than
    /// staleness, which only measures decay of data it once had.
    pub fn staleness(&self) -> Staleness {
        *self.shared.staleness.read()
    }

    /// Which fetchers succeeded in the most recent cycle, committed or not.
    /// All-clear bits after an all-failed cycle are the diagnostic that the
    /// pipeline is running but producing nothing.
    pub fn last_cycle_sources(&self) -> SourcesOk {
        *self.shared.last_cycle.read()
    }

    /// Run one fetch-and-aggregate cycle immediately.
    pub async fn refresh_once(&self) {
        run_cycle(
            &self.aggregator,
            &self.sources,
            &self.shared,
            self.config.fetch_timeout,
        )
        .await;
    }

    /// Start the refresh and staleness tasks.
    ///
    /// Returns a handle that stops both. The first refresh runs
    /// immediately; subsequent ones follow `refresh_interval`.
    pub fn start(&self) -> MonitorHandle {
        let (stop_tx, stop_rx) = watch::channel(false);

        let aggregator = self.aggregator.clone();
        let sources = self.sources.clone();
        let shared = self.shared.clone();
        let refresh_interval = self.config.refresh_interval;
        let fetch_timeout = self.config.fetch_timeout;
        let mut refresh_stop = stop_rx.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(refresh_interval);
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        run_cycle(&aggregator, &sources, &shared, fetch_timeout).await;
                    }
                    _ = refresh_stop.changed() => {
                        if *refresh_stop.borrow() {
                            break;
                        }
                    }
                }
            }
        });

        let shared = self.shared.clone();
        let threshold = self.config.staleness_threshold;
        let check_interval = self.config.staleness_check_interval;
        let mut staleness_stop = stop_rx;
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(check_interval);
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        check_staleness(&shared, threshold);
                    }
                    _ = staleness_stop.changed() => {
                        if *staleness_stop.borrow() {
                            break;
                        }
                    }
                }
            }
        });

        MonitorHandle { stop_tx }
    }
}

/// Handle for stopping a running monitor.
///
/// Stopping ends both periodic tasks; an in-flight fetch completes or
/// times out on its own, since fetches have no side effects to roll back.
pub struct MonitorHandle {
    stop_tx: watch::Sender<bool>,
}

impl MonitorHandle {
    /// Stop both periodic tasks.
    pub fn stop(self) {
        let _ = self.stop_tx.send(true);
    }
}

async fn bounded<T>(
    limit: Duration,
    fut: impl std::future::Future<Output = FetchResult<T>>,
) -> FetchResult<T> {
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result,
        Err(_) => Err(FetchError::Timeout),
    }
}

fn log_failure<T>(source: &'static str, result: &FetchResult<T>) {
    if let Err(error) = result {
        warn!(source, %error, "fetch failed this cycle");
    }
}

/// One fetch-and-aggregate cycle.
///
/// All four fetches run concurrently; the cycle proceeds once each has
/// returned or timed out. The new snapshot is committed only when at least
/// one source succeeded - otherwise the previous snapshot and its
/// `captured_at` are left untouched and only the diagnostic bits change.
async fn run_cycle(
    aggregator: &Aggregator,
    sources: &Sources,
    shared: &Shared,
    fetch_timeout: Duration,
) {
    let (live, completed, reception, digital) = tokio::join!(
        bounded(fetch_timeout, sources.queue.fetch_live()),
        bounded(fetch_timeout, sources.queue.fetch_completed_today()),
        bounded(fetch_timeout, sources.reception.fetch_stats()),
        bounded(fetch_timeout, sources.digital.fetch_stats()),
    );
    log_failure("live_queue", &live);
    log_failure("completed_today", &completed);
    log_failure("reception", &reception);
    log_failure("digital_channel", &digital);

    let cycle = CycleInput {
        live,
        completed,
        reception,
        digital,
    };
    let snapshot = aggregator.aggregate(&cycle, Utc::now(), Local::now().naive_local());

    *shared.last_cycle.write() = snapshot.sources_ok;

    if snapshot.sources_ok.any() {
        debug!(
            units = snapshot.units.len(),
            patients = snapshot.total_patients(),
            skipped = snapshot.skipped_records,
            "committed snapshot"
        );
        *shared.snapshot.write() = Some(Arc::new(snapshot));
        *shared.last_commit.write() = Some(Instant::now());
        *shared.staleness.write() = Staleness::Fresh;
    } else {
        warn!("all sources failed; keeping previous snapshot");
    }
}

/// Flip `Fresh` to `Stale` once the last commit is too old.
///
/// This only ever moves toward `Stale`; the way back to `Fresh` is a
/// successful commit in `run_cycle`, never the passage of time.
fn check_staleness(shared: &Shared, threshold: Duration) {
    let last_commit = *shared.last_commit.read();
    let Some(last_commit) = last_commit else {
        return; // never committed: not yet stale
    };
    if last_commit.elapsed() > threshold {
        let mut staleness = shared.staleness.write();
        if !staleness.is_stale() {
            warn!(
                elapsed_secs = last_commit.elapsed().as_secs(),
                "snapshot has gone stale"
            );
            *staleness = Staleness::Stale;
        }
    }
}
