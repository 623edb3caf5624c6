//! One-shot throughput benchmark window.

use std::sync::Mutex;
use std::time::Duration;

use snapfeed_events::Event;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::{Instant, sleep};
use tracing::{debug, info};

use crate::engine::FetchEngine;

/// One-shot deadline that stops the engine and reports a windowed count.
///
/// Firing is exactly-once; re-arming requires a fresh [`BenchmarkTimer::arm`]
/// call. `disarm` is idempotent and best-effort when racing the deadline.
pub struct BenchmarkTimer {
    cancel: Mutex<Option<oneshot::Sender<()>>>,
    handle: JoinHandle<()>,
}

impl BenchmarkTimer {
    /// Arm a one-shot deadline against the given engine.
    ///
    /// The reported count is the number of successful writes observed during
    /// the window (the counter delta, not the session lifetime total), so a
    /// window armed mid-session measures only its own span.
    #[must_use]
    pub fn arm(window: Duration, engine: FetchEngine) -> Self {
        let (cancel_tx, cancel_rx) = oneshot::channel();
        let armed_at = Instant::now();
        let count_at_start = engine.success_count();

        let handle = tokio::spawn(async move {
            tokio::select! {
                () = sleep(window) => {
                    let count = engine.success_count().saturating_sub(count_at_start);
                    let elapsed = armed_at.elapsed();
                    let elapsed_ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX);
                    info!(count, elapsed_ms, "benchmark window elapsed");
                    engine
                        .metrics()
                        .set_benchmark_last_count(i64::try_from(count).unwrap_or(i64::MAX));
                    let _ = engine
                        .events()
                        .publish(Event::BenchmarkCompleted { count, elapsed_ms });
                    engine.stop();
                }
                _ = cancel_rx => {
                    debug!("benchmark disarmed before the deadline");
                }
            }
        });

        Self {
            cancel: Mutex::new(Some(cancel_tx)),
            handle,
        }
    }

    /// Prevent firing if the deadline has not been reached yet; idempotent.
    pub fn disarm(&self) {
        let sender = match self.cancel.lock() {
            Ok(mut guard) => guard.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };
        if let Some(sender) = sender {
            let _ = sender.send(());
        }
    }

    /// Whether the window has fired or been disarmed.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}
