//! Acquisition engine: the start/stop lifecycle and the polling loop.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use chrono::{DateTime, Utc};
use snapfeed_core::{FetchOptions, FetchSnapshot, ImageSource};
use snapfeed_events::{Event, EventBus};
use snapfeed_store::DirectoryStore;
use snapfeed_telemetry::Metrics;
use tracing::{debug, info, warn};

use crate::error::{FetchError, FetchResult};

/// Result of a `start` call.
#[derive(Debug)]
pub enum StartOutcome {
    /// A fresh session began; the returned store is bound to its directory.
    Started(DirectoryStore),
    /// A session was already running; nothing changed.
    AlreadyRunning,
}

/// Acquisition engine driving the fetch-and-persist loop.
///
/// The engine owns the session state: an atomic running flag written by
/// `stop` callers and polled by the loop task every iteration, and an atomic
/// success counter read by benchmark observers. The loop holds no lock shared
/// with directory observers — unique snapshot filenames are the only
/// coordination between writer and reader.
#[derive(Clone)]
pub struct FetchEngine {
    inner: Arc<EngineInner>,
}

struct EngineInner {
    events: EventBus,
    source: Arc<dyn ImageSource>,
    options: FetchOptions,
    metrics: Metrics,
    running: AtomicBool,
    success_count: AtomicU64,
    session: Mutex<SessionInfo>,
}

#[derive(Default)]
struct SessionInfo {
    started_at: Option<DateTime<Utc>>,
    directory: Option<PathBuf>,
}

impl FetchEngine {
    /// Construct an engine publishing to the shared event bus.
    #[must_use]
    pub fn new(
        events: EventBus,
        source: Arc<dyn ImageSource>,
        options: FetchOptions,
        metrics: Metrics,
    ) -> Self {
        Self {
            inner: Arc::new(EngineInner {
                events,
                source,
                options,
                metrics,
                running: AtomicBool::new(false),
                success_count: AtomicU64::new(0),
                session: Mutex::new(SessionInfo::default()),
            }),
        }
    }

    /// Begin a fetch session against the given snapshot directory.
    ///
    /// Idempotent: a second call while running is a no-op that neither resets
    /// the counter nor spawns a second loop. A fresh start resets the success
    /// counter, records the session metadata, and spawns the polling loop on
    /// the runtime; the caller is never blocked on network or disk.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::Directory`] when the snapshot directory cannot
    /// be created or accessed; the loop is not spawned and the engine is left
    /// stopped.
    pub fn start(&self, directory: &Path) -> FetchResult<StartOutcome> {
        if self.inner.running.swap(true, Ordering::AcqRel) {
            debug!(path = %directory.display(), "fetch session already running; start ignored");
            return Ok(StartOutcome::AlreadyRunning);
        }

        let store = DirectoryStore::new(directory);
        if let Err(source) = store.ensure_exists() {
            self.inner.running.store(false, Ordering::Release);
            return Err(FetchError::Directory { source });
        }

        self.inner.success_count.store(0, Ordering::Release);
        {
            let mut session = self.lock_session();
            session.started_at = Some(Utc::now());
            session.directory = Some(directory.to_path_buf());
        }
        let _ = self
            .inner
            .events
            .publish(Event::FetcherStateChanged { running: true });
        info!(path = %directory.display(), "fetch session started");

        let inner = Arc::clone(&self.inner);
        let loop_store = store.clone();
        tokio::spawn(async move {
            run_loop(inner, loop_store).await;
        });

        Ok(StartOutcome::Started(store))
    }

    /// Request the loop to stop after the current iteration.
    ///
    /// Cooperative, not preemptive: an in-flight fetch or write may still
    /// complete, so callers must tolerate one final snapshot landing after
    /// this returns. Idempotent — the state-change event fires only on an
    /// actual transition.
    pub fn stop(&self) {
        if self.inner.running.swap(false, Ordering::AcqRel) {
            let _ = self
                .inner
                .events
                .publish(Event::FetcherStateChanged { running: false });
            info!("fetch session stop requested");
        }
    }

    /// Whether the loop is accepting further iterations.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.inner.running.load(Ordering::Acquire)
    }

    /// Successful writes since the current session started.
    #[must_use]
    pub fn success_count(&self) -> u64 {
        self.inner.success_count.load(Ordering::Acquire)
    }

    /// Immutable view of the session for display.
    #[must_use]
    pub fn snapshot(&self) -> FetchSnapshot {
        let session = self.lock_session();
        FetchSnapshot {
            running: self.is_running(),
            success_count: self.success_count(),
            started_at: session.started_at,
            directory: session.directory.clone(),
        }
    }

    pub(crate) fn events(&self) -> &EventBus {
        &self.inner.events
    }

    pub(crate) fn metrics(&self) -> &Metrics {
        &self.inner.metrics
    }

    fn lock_session(&self) -> MutexGuard<'_, SessionInfo> {
        match self.inner.session.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

/// The polling loop: one fetch and one write per iteration, every failure
/// logged and skipped, never fatal.
async fn run_loop(inner: Arc<EngineInner>, store: DirectoryStore) {
    while inner.running.load(Ordering::Acquire) {
        match inner.source.fetch_image().await {
            Ok(bytes) => match store.write_image(&bytes, inner.source.extension()) {
                Ok(candidate) => {
                    let count = inner.success_count.fetch_add(1, Ordering::AcqRel) + 1;
                    inner.metrics.inc_fetch_success();
                    let _ = inner.events.publish(Event::CountChanged { count });
                    debug!(path = %candidate.path.display(), count, "snapshot landed");
                }
                Err(err) => {
                    inner.metrics.inc_fetch_failure("write");
                    warn!(error = %err, "failed to persist snapshot; skipping iteration");
                }
            },
            Err(err) => {
                inner.metrics.inc_fetch_failure("fetch");
                warn!(error = %err, "image fetch failed; skipping iteration");
            }
        }

        let interval = inner.options.interval;
        if !interval.is_zero() {
            tokio::time::sleep(interval).await;
        } else {
            // Back-to-back iterations still yield so stop() callers and the
            // selector task get scheduled between writes.
            tokio::task::yield_now().await;
        }
    }
    debug!("acquisition loop exited");
}

/// Grace period within which a stopped loop finishes its in-flight
/// iteration; callers observing quiescence should wait at least this long.
pub const STOP_GRACE: Duration = Duration::from_millis(250);
