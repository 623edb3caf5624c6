//! Control facade wiring the engine, selector, and benchmark timer.

use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use snapfeed_config::AppConfig;
use snapfeed_core::{FetchOptions, FetchSnapshot, ImageSource};
use snapfeed_events::{EventBus, EventId, EventStream};
use snapfeed_fetcher::{BenchmarkTimer, FetchEngine, HttpImageSource, StartOutcome};
use snapfeed_telemetry::Metrics;
use tokio::task::JoinHandle;
use tracing::info;

use crate::error::{AppError, AppResult};

/// Owner of the running pipeline: one engine, at most one selector task per
/// session, at most one armed benchmark window.
pub struct Snapfeed {
    events: EventBus,
    metrics: Metrics,
    engine: FetchEngine,
    session: Mutex<Option<SessionHandles>>,
    benchmark: Mutex<Option<BenchmarkTimer>>,
}

struct SessionHandles {
    selector: JoinHandle<()>,
}

impl Snapfeed {
    /// Assemble the pipeline around an injected image source.
    ///
    /// # Errors
    ///
    /// Returns an error if the metrics registry cannot be constructed.
    pub fn new(source: Arc<dyn ImageSource>, options: FetchOptions) -> AppResult<Self> {
        let events = EventBus::new();
        let metrics =
            Metrics::new().map_err(|err| AppError::telemetry("telemetry.metrics", err))?;
        let engine = FetchEngine::new(events.clone(), source, options, metrics.clone());
        Ok(Self {
            events,
            metrics,
            engine,
            session: Mutex::new(None),
            benchmark: Mutex::new(None),
        })
    }

    /// Assemble the pipeline from configuration, backed by the HTTP source.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client or metrics registry cannot be
    /// constructed.
    pub fn from_config(config: &AppConfig) -> AppResult<Self> {
        let source = HttpImageSource::new(&config.source_url)
            .map_err(|err| AppError::fetch("source.new", err))?;
        Self::new(Arc::new(source), config.fetch_options())
    }

    /// Begin acquiring into the given snapshot directory.
    ///
    /// Idempotent while a session is running. A fresh session spawns the
    /// selector worker bound to the session's store; the previous session's
    /// selector, if any, is shut down first.
    ///
    /// # Errors
    ///
    /// Returns an error when the snapshot directory cannot be created or
    /// accessed; the pipeline is left stopped.
    pub fn start(&self, directory: &Path) -> AppResult<()> {
        match self
            .engine
            .start(directory)
            .map_err(|err| AppError::fetch("engine.start", err))?
        {
            StartOutcome::Started(store) => {
                let selector =
                    snapfeed_selector::spawn(self.events.clone(), store, self.metrics.clone());
                let mut session = self.lock_session();
                if let Some(previous) = session.replace(SessionHandles { selector }) {
                    previous.selector.abort();
                }
                info!(path = %directory.display(), "pipeline session started");
                Ok(())
            }
            StartOutcome::AlreadyRunning => Ok(()),
        }
    }

    /// Request the acquisition loop to stop; cooperative and idempotent.
    ///
    /// The selector worker stays alive so a final in-flight write is still
    /// reconciled; it is shut down on the next `start` or on drop.
    pub fn stop(&self) {
        self.engine.stop();
    }

    /// Arm a fresh one-shot benchmark window, replacing (and disarming) any
    /// window armed earlier.
    pub fn arm_benchmark(&self, window: Duration) {
        let timer = BenchmarkTimer::arm(window, self.engine.clone());
        let mut guard = self.lock_benchmark();
        if let Some(previous) = guard.replace(timer) {
            previous.disarm();
        }
    }

    /// Disarm the current benchmark window, if one is armed; idempotent.
    pub fn disarm_benchmark(&self) {
        if let Some(timer) = self.lock_benchmark().take() {
            timer.disarm();
        }
    }

    /// Immutable view of the acquisition session.
    #[must_use]
    pub fn snapshot(&self) -> FetchSnapshot {
        self.engine.snapshot()
    }

    /// Subscribe to pipeline events, optionally replaying from `since`.
    #[must_use]
    pub fn subscribe(&self, since: Option<EventId>) -> EventStream {
        self.events.subscribe(since)
    }

    /// Shared metrics registry for embedders.
    #[must_use]
    pub const fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    fn lock_session(&self) -> MutexGuard<'_, Option<SessionHandles>> {
        match self.session.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn lock_benchmark(&self) -> MutexGuard<'_, Option<BenchmarkTimer>> {
        match self.benchmark.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl Drop for Snapfeed {
    fn drop(&mut self) {
        self.engine.stop();
        if let Some(session) = self.lock_session().take() {
            session.selector.abort();
        }
        if let Some(timer) = self.lock_benchmark().take() {
            timer.disarm();
        }
    }
}
