//! End-to-end pipeline tests with a stubbed image source.

use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use snapfeed_app::Snapfeed;
use snapfeed_core::{FetchOptions, ImageSource};
use snapfeed_events::Event;
use snapfeed_fetcher::STOP_GRACE;
use snapfeed_store::DirectoryStore;
use snapfeed_test_support::{encoded_png, scratch_dir};
use tokio::time::{Instant, sleep, timeout};

struct PngSource {
    payload: Vec<u8>,
    delay: Duration,
}

#[async_trait]
impl ImageSource for PngSource {
    async fn fetch_image(&self) -> anyhow::Result<Vec<u8>> {
        sleep(self.delay).await;
        Ok(self.payload.clone())
    }

    fn extension(&self) -> &'static str {
        "png"
    }
}

fn pipeline(delay_ms: u64) -> anyhow::Result<Snapfeed> {
    let source = Arc::new(PngSource {
        payload: encoded_png(3, 3, 120)?,
        delay: Duration::from_millis(delay_ms),
    });
    Ok(Snapfeed::new(
        source,
        FetchOptions::with_interval(Duration::from_millis(2)),
    )?)
}

async fn wait_for_single_candidate(directory: &Path) -> Vec<snapfeed_store::Candidate> {
    let store = DirectoryStore::new(directory);
    let deadline = Instant::now() + Duration::from_secs(3);
    loop {
        let listed = store.list().expect("list snapshot directory");
        if listed.len() == 1 {
            return listed;
        }
        assert!(
            Instant::now() < deadline,
            "directory never converged to a single candidate: {listed:?}"
        );
        sleep(Duration::from_millis(20)).await;
    }
}

#[tokio::test]
async fn directory_converges_to_one_candidate_and_deliveries_are_unique() -> anyhow::Result<()> {
    let temp = scratch_dir()?;
    let app = pipeline(1)?;
    let mut stream = app.subscribe(None);

    app.start(temp.path())?;

    let mut delivered = Vec::new();
    let deadline = Instant::now() + Duration::from_secs(5);
    loop {
        let envelope = timeout(Duration::from_secs(2), stream.next())
            .await
            .expect("event stream stalled")
            .expect("event stream closed");
        match envelope.event {
            Event::ImageAvailable { path, .. } => delivered.push(path),
            Event::CountChanged { count } if count >= 5 => break,
            _ => {}
        }
        assert!(Instant::now() < deadline, "pipeline never reached 5 writes");
    }

    app.stop();
    sleep(STOP_GRACE).await;

    // Drain any trailing deliveries from the in-flight iteration.
    while let Ok(Some(envelope)) = timeout(Duration::from_millis(200), stream.next()).await {
        if let Event::ImageAvailable { path, .. } = envelope.event {
            delivered.push(path);
        }
    }

    let survivors = wait_for_single_candidate(temp.path()).await;
    while let Ok(Some(envelope)) = timeout(Duration::from_millis(200), stream.next()).await {
        if let Event::ImageAvailable { path, .. } = envelope.event {
            delivered.push(path);
        }
    }
    assert!(
        !delivered.is_empty(),
        "at least one snapshot must have been delivered"
    );
    let distinct: HashSet<&String> = delivered.iter().collect();
    assert_eq!(
        distinct.len(),
        delivered.len(),
        "every delivery must be for a distinct snapshot: {delivered:?}"
    );
    assert_eq!(
        delivered.last().map(String::as_str),
        survivors[0].path.to_str(),
        "the surviving file must be the last delivered snapshot"
    );
    Ok(())
}

#[tokio::test]
async fn facade_start_is_idempotent() -> anyhow::Result<()> {
    let temp = scratch_dir()?;
    let app = pipeline(1)?;

    app.start(temp.path())?;
    let deadline = Instant::now() + Duration::from_secs(2);
    while app.snapshot().success_count < 2 {
        assert!(Instant::now() < deadline, "no writes landed");
        sleep(Duration::from_millis(5)).await;
    }

    let before = app.snapshot().success_count;
    app.start(temp.path())?;
    assert!(
        app.snapshot().success_count >= before,
        "an ignored start must not reset the counter"
    );
    app.stop();
    Ok(())
}

#[tokio::test]
async fn unavailable_directory_fails_facade_start() -> anyhow::Result<()> {
    let temp = scratch_dir()?;
    let blocker = temp.path().join("blocker");
    std::fs::write(&blocker, b"not a directory")?;
    let app = pipeline(1)?;

    let result = app.start(&blocker.join("snapshots"));
    assert!(result.is_err(), "start into an uncreatable directory must fail");
    assert!(!app.snapshot().running);
    Ok(())
}

#[tokio::test]
async fn benchmark_window_reports_and_stops_the_pipeline() -> anyhow::Result<()> {
    let temp = scratch_dir()?;
    let app = pipeline(1)?;
    let mut stream = app.subscribe(None);

    app.start(temp.path())?;
    app.arm_benchmark(Duration::from_millis(200));

    let mut reported = None;
    while let Ok(Some(envelope)) = timeout(Duration::from_secs(3), stream.next()).await {
        if let Event::BenchmarkCompleted { count, elapsed_ms } = envelope.event {
            reported = Some((count, elapsed_ms));
            break;
        }
    }

    let (count, elapsed_ms) = reported.expect("benchmark window must report");
    assert!(count > 0);
    assert!(elapsed_ms >= 200);

    let deadline = Instant::now() + Duration::from_secs(1);
    while app.snapshot().running {
        assert!(
            Instant::now() < deadline,
            "the benchmark window must stop the pipeline"
        );
        sleep(Duration::from_millis(10)).await;
    }
    Ok(())
}

#[tokio::test]
async fn disarmed_benchmark_leaves_the_pipeline_running() -> anyhow::Result<()> {
    let temp = scratch_dir()?;
    let app = pipeline(1)?;

    app.start(temp.path())?;
    app.arm_benchmark(Duration::from_secs(30));
    app.disarm_benchmark();
    app.disarm_benchmark();

    sleep(Duration::from_millis(50)).await;
    assert!(app.snapshot().running);
    app.stop();
    Ok(())
}
