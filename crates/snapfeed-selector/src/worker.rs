use std::path::PathBuf;

use snapfeed_events::{Event, EventBus};
use snapfeed_store::{Candidate, DirectoryStore};
use snapfeed_telemetry::Metrics;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Spawn the reconciliation worker for one snapshot directory.
///
/// A single task owns the selection state, so passes are serialized by
/// construction; bursts of change notifications coalesce through the store's
/// watch channel into one pass over the final directory state. The task runs
/// an initial pass immediately (the directory may already hold candidates)
/// and exits when the change feed closes or the handle is aborted.
pub fn spawn(events: EventBus, store: DirectoryStore, metrics: Metrics) -> JoinHandle<()> {
    let mut changes = store.subscribe();
    tokio::spawn(async move {
        let mut worker = SelectorWorker::new(events, store, metrics);
        let _ = worker.run_pass();
        while changes.changed().await.is_ok() {
            let _ = worker.run_pass();
        }
        debug!("snapshot change feed closed; selector stopping");
    })
}

/// Result of a single reconciliation pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum PassOutcome {
    /// No candidates are visible.
    Empty,
    /// The newest candidate has already been delivered.
    Unchanged,
    /// A new candidate was validated and delivered.
    Delivered {
        /// Path of the delivered candidate.
        path: PathBuf,
    },
    /// The newest candidate is not yet decodable (likely mid-write); the
    /// pass was side-effect free and the candidate stays for re-evaluation.
    NotReady {
        /// Path of the deferred candidate.
        path: PathBuf,
    },
}

const HEALTH_COMPONENT: &str = "selector";

pub(crate) struct SelectorWorker {
    events: EventBus,
    store: DirectoryStore,
    metrics: Metrics,
    last_delivered: Option<PathBuf>,
    degraded: bool,
}

impl SelectorWorker {
    pub(crate) const fn new(events: EventBus, store: DirectoryStore, metrics: Metrics) -> Self {
        Self {
            events,
            store,
            metrics,
            last_delivered: None,
            degraded: false,
        }
    }

    /// One reconciliation pass: list, select the maximum, validate, deliver,
    /// reclaim. Every failure inside the pass is non-fatal.
    pub(crate) fn run_pass(&mut self) -> PassOutcome {
        self.metrics.inc_selector_pass();

        let candidates = match self.store.list() {
            Ok(candidates) => candidates,
            Err(err) => {
                self.mark_degraded(&err.to_string());
                return PassOutcome::Empty;
            }
        };
        self.mark_recovered();
        self.metrics
            .set_candidates_visible(i64::try_from(candidates.len()).unwrap_or(i64::MAX));
        if candidates.is_empty() {
            return PassOutcome::Empty;
        }

        let winner = newest(&candidates).clone();
        if self.last_delivered.as_deref() == Some(winner.path.as_path()) {
            return PassOutcome::Unchanged;
        }

        let Some((width, height)) = self.decode(&winner) else {
            // Likely observed mid-write; the next change trigger re-lists and
            // re-evaluates, so nothing is deleted and nothing is delivered.
            self.metrics.inc_decode_failure();
            return PassOutcome::NotReady { path: winner.path };
        };

        let _ = self.events.publish(Event::ImageAvailable {
            path: winner.path.to_string_lossy().into_owned(),
            width,
            height,
            size_bytes: winner.size_bytes,
        });
        self.metrics.inc_image_delivered();
        info!(
            path = %winner.path.display(),
            width,
            height,
            "delivered new snapshot"
        );
        self.last_delivered = Some(winner.path.clone());

        for superseded in candidates
            .iter()
            .filter(|candidate| candidate.path != winner.path)
        {
            self.store.delete(&superseded.path);
            self.metrics.inc_snapshot_deleted();
        }

        PassOutcome::Delivered { path: winner.path }
    }

    fn mark_degraded(&mut self, detail: &str) {
        if self.degraded {
            warn!(
                component = HEALTH_COMPONENT,
                detail = detail,
                "snapshot listing still failing"
            );
        } else {
            self.degraded = true;
            warn!(
                component = HEALTH_COMPONENT,
                detail = detail,
                "snapshot listing failed; skipping pass"
            );
            let _ = self.events.publish(Event::HealthChanged {
                degraded: vec![HEALTH_COMPONENT.to_string()],
            });
        }
    }

    fn mark_recovered(&mut self) {
        if std::mem::take(&mut self.degraded) {
            let _ = self.events.publish(Event::HealthChanged { degraded: vec![] });
            info!(component = HEALTH_COMPONENT, "snapshot listing recovered");
        }
    }

    fn decode(&self, candidate: &Candidate) -> Option<(u32, u32)> {
        let bytes = match self.store.read(&candidate.path) {
            Ok(bytes) => bytes,
            Err(err) => {
                debug!(
                    error = %err,
                    path = %candidate.path.display(),
                    "candidate vanished before validation"
                );
                return None;
            }
        };
        match image::load_from_memory(&bytes) {
            Ok(decoded) => Some((decoded.width(), decoded.height())),
            Err(err) => {
                debug!(
                    error = %err,
                    path = %candidate.path.display(),
                    "candidate not yet decodable; deferring"
                );
                None
            }
        }
    }
}

/// Maximum by modification time, tie-broken by lexicographically greatest
/// file name so selection stays deterministic even for equal timestamps.
fn newest(candidates: &[Candidate]) -> &Candidate {
    candidates
        .iter()
        .max_by(|a, b| {
            a.modified_at
                .cmp(&b.modified_at)
                .then_with(|| a.file_name().cmp(b.file_name()))
        })
        .expect("caller guarantees a non-empty candidate list")
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use snapfeed_test_support::{encoded_png, scratch_dir, truncated};
    use std::fs;
    use std::time::Duration;
    use tempfile::TempDir;
    use tokio::time::{sleep, timeout};

    async fn next_event_with_timeout(
        stream: &mut snapfeed_events::EventStream,
        timeout_ms: u64,
    ) -> Option<Event> {
        timeout(Duration::from_millis(timeout_ms), stream.next())
            .await
            .ok()
            .flatten()
            .map(|envelope| envelope.event)
    }

    fn harness() -> Result<(TempDir, EventBus, SelectorWorker)> {
        let temp = scratch_dir()?;
        let store = DirectoryStore::new(temp.path());
        store.ensure_exists()?;
        let bus = EventBus::with_capacity(32);
        let worker = SelectorWorker::new(bus.clone(), store, Metrics::new()?);
        Ok((temp, bus, worker))
    }

    #[tokio::test]
    async fn empty_directory_emits_nothing() -> Result<()> {
        let (_temp, bus, mut worker) = harness()?;
        let mut stream = bus.subscribe(None);

        assert_eq!(worker.run_pass(), PassOutcome::Empty);
        assert!(next_event_with_timeout(&mut stream, 20).await.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn newest_candidate_wins_and_superseded_files_are_reclaimed() -> Result<()> {
        let (_temp, bus, mut worker) = harness()?;
        let mut stream = bus.subscribe(None);

        for shade in [10, 20] {
            let _ = worker.store.write_image(&encoded_png(2, 2, shade)?, "png")?;
            sleep(Duration::from_millis(10)).await;
        }
        let latest = worker.store.write_image(&encoded_png(2, 2, 30)?, "png")?;

        let outcome = worker.run_pass();
        assert_eq!(
            outcome,
            PassOutcome::Delivered {
                path: latest.path.clone()
            }
        );

        match next_event_with_timeout(&mut stream, 50).await {
            Some(Event::ImageAvailable { path, width, height, .. }) => {
                assert_eq!(path, latest.path.to_string_lossy());
                assert_eq!((width, height), (2, 2));
            }
            other => panic!("expected image available event, got {other:?}"),
        }

        let remaining = worker.store.list()?;
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].path, latest.path);
        Ok(())
    }

    #[tokio::test]
    async fn duplicate_delivery_is_suppressed() -> Result<()> {
        let (_temp, bus, mut worker) = harness()?;
        let mut stream = bus.subscribe(None);

        let only = worker.store.write_image(&encoded_png(2, 2, 40)?, "png")?;
        assert_eq!(
            worker.run_pass(),
            PassOutcome::Delivered { path: only.path }
        );
        assert!(matches!(
            next_event_with_timeout(&mut stream, 50).await,
            Some(Event::ImageAvailable { .. })
        ));

        assert_eq!(worker.run_pass(), PassOutcome::Unchanged);
        assert!(
            next_event_with_timeout(&mut stream, 20).await.is_none(),
            "repeat pass over the same winner must not re-deliver"
        );
        Ok(())
    }

    #[tokio::test]
    async fn corrupt_candidate_is_deferred_and_nothing_is_deleted() -> Result<()> {
        let (_temp, bus, mut worker) = harness()?;
        let mut stream = bus.subscribe(None);

        let delivered = worker.store.write_image(&encoded_png(2, 2, 50)?, "png")?;
        assert!(matches!(worker.run_pass(), PassOutcome::Delivered { .. }));
        let _ = next_event_with_timeout(&mut stream, 50).await;

        sleep(Duration::from_millis(10)).await;
        let payload = encoded_png(8, 8, 60)?;
        let half_written = worker.store.root().join("zz-mid-write.png");
        fs::write(&half_written, truncated(&payload, payload.len() / 2))?;

        assert_eq!(
            worker.run_pass(),
            PassOutcome::NotReady {
                path: half_written.clone()
            }
        );
        assert!(
            next_event_with_timeout(&mut stream, 20).await.is_none(),
            "a corrupt candidate must not be delivered"
        );
        assert!(
            delivered.path.exists(),
            "the delivered snapshot must survive a deferred pass"
        );
        assert!(
            half_written.exists(),
            "a corrupt candidate must not be deleted on the pass that observed it"
        );
        Ok(())
    }

    #[tokio::test]
    async fn candidate_valid_on_relist_is_delivered_exactly_once() -> Result<()> {
        let (_temp, bus, mut worker) = harness()?;
        let mut stream = bus.subscribe(None);

        let payload = encoded_png(4, 4, 70)?;
        let path = worker.store.root().join("racy.png");
        fs::write(&path, truncated(&payload, payload.len() / 2))?;
        assert_eq!(
            worker.run_pass(),
            PassOutcome::NotReady { path: path.clone() }
        );

        // The writer finishes; the next trigger re-lists and re-evaluates.
        fs::write(&path, &payload)?;
        assert_eq!(
            worker.run_pass(),
            PassOutcome::Delivered { path: path.clone() }
        );
        match next_event_with_timeout(&mut stream, 50).await {
            Some(Event::ImageAvailable { path: delivered, .. }) => {
                assert_eq!(delivered, path.to_string_lossy());
            }
            other => panic!("expected image available event, got {other:?}"),
        }

        assert_eq!(worker.run_pass(), PassOutcome::Unchanged);
        assert!(next_event_with_timeout(&mut stream, 20).await.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn previously_delivered_snapshot_is_reclaimed_after_replacement() -> Result<()> {
        let (_temp, bus, mut worker) = harness()?;
        let mut stream = bus.subscribe(None);

        let first = worker.store.write_image(&encoded_png(2, 2, 80)?, "png")?;
        assert!(matches!(worker.run_pass(), PassOutcome::Delivered { .. }));
        let _ = next_event_with_timeout(&mut stream, 50).await;

        sleep(Duration::from_millis(10)).await;
        let second = worker.store.write_image(&encoded_png(2, 2, 90)?, "png")?;
        assert_eq!(
            worker.run_pass(),
            PassOutcome::Delivered {
                path: second.path.clone()
            }
        );

        assert!(!first.path.exists(), "superseded delivery must be reclaimed");
        assert!(second.path.exists());
        Ok(())
    }

    #[tokio::test]
    async fn listing_failure_degrades_health_once_and_recovers() -> Result<()> {
        let (_temp, bus, mut worker) = harness()?;
        let mut stream = bus.subscribe(None);

        fs::remove_dir_all(worker.store.root())?;
        assert_eq!(worker.run_pass(), PassOutcome::Empty);
        match next_event_with_timeout(&mut stream, 50).await {
            Some(Event::HealthChanged { degraded }) => {
                assert_eq!(degraded, vec!["selector".to_string()]);
            }
            other => panic!("expected degradation event, got {other:?}"),
        }

        // Repeated failures stay quiet on the bus.
        assert_eq!(worker.run_pass(), PassOutcome::Empty);
        assert!(next_event_with_timeout(&mut stream, 20).await.is_none());

        worker.store.ensure_exists()?;
        assert_eq!(worker.run_pass(), PassOutcome::Empty);
        match next_event_with_timeout(&mut stream, 50).await {
            Some(Event::HealthChanged { degraded }) => assert!(degraded.is_empty()),
            other => panic!("expected recovery event, got {other:?}"),
        }
        Ok(())
    }

    #[tokio::test]
    async fn spawned_worker_reacts_to_store_changes() -> Result<()> {
        let temp = scratch_dir()?;
        let store = DirectoryStore::new(temp.path());
        store.ensure_exists()?;
        let bus = EventBus::with_capacity(32);
        let handle = spawn(bus.clone(), store.clone(), Metrics::new()?);
        let mut stream = bus.subscribe(None);

        let candidate = store.write_image(&encoded_png(2, 2, 100)?, "png")?;
        match timeout(Duration::from_secs(1), stream.next()).await {
            Ok(Some(envelope)) => match envelope.event {
                Event::ImageAvailable { path, .. } => {
                    assert_eq!(path, candidate.path.to_string_lossy());
                }
                other => panic!("expected image available event, got {other:?}"),
            },
            other => panic!("expected a delivery, got {other:?}"),
        }

        handle.abort();
        Ok(())
    }
}
