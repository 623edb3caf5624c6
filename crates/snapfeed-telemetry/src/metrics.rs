//! Prometheus-backed metrics registry and snapshot helpers.
//!
//! # Design
//! - Encapsulates collector registration to keep the public API small.
//! - Exposes a minimal set of counters/gauges relevant to the snapshot
//!   pipeline.

use anyhow::{Context, Result};
use prometheus::{Encoder, IntCounter, IntCounterVec, IntGauge, Opts, Registry, TextEncoder};
use serde::Serialize;

/// Prometheus-backed metrics registry shared across services.
#[derive(Clone)]
pub struct Metrics {
    inner: std::sync::Arc<MetricsInner>,
}

struct MetricsInner {
    registry: Registry,
    fetch_success_total: IntCounter,
    fetch_failures_total: IntCounterVec,
    selector_passes_total: IntCounter,
    images_delivered_total: IntCounter,
    snapshots_deleted_total: IntCounter,
    decode_failures_total: IntCounter,
    candidates_visible: IntGauge,
    benchmark_last_count: IntGauge,
}

/// Snapshot of selected gauges and counters for health reporting.
#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    /// Total successful fetch-and-write iterations.
    pub fetch_success_total: u64,
    /// Total delivered images.
    pub images_delivered_total: u64,
    /// Total superseded snapshots reclaimed.
    pub snapshots_deleted_total: u64,
    /// Total candidates that failed decode validation.
    pub decode_failures_total: u64,
    /// Candidates visible at the start of the latest selector pass.
    pub candidates_visible: i64,
    /// Count reported by the most recent benchmark window.
    pub benchmark_last_count: i64,
}

impl Metrics {
    /// Construct a new metrics registry with the standard collectors
    /// registered.
    ///
    /// # Errors
    ///
    /// Returns an error if any of the Prometheus collectors cannot be
    /// registered.
    pub fn new() -> Result<Self> {
        let registry = Registry::new();

        let fetch_success_total = IntCounter::with_opts(Opts::new(
            "fetch_success_total",
            "Successful fetch-and-write iterations",
        ))?;
        let fetch_failures_total = IntCounterVec::new(
            Opts::new("fetch_failures_total", "Skipped loop iterations by reason"),
            &["reason"],
        )?;
        let selector_passes_total = IntCounter::with_opts(Opts::new(
            "selector_passes_total",
            "Reconciliation passes executed",
        ))?;
        let images_delivered_total = IntCounter::with_opts(Opts::new(
            "images_delivered_total",
            "Snapshots validated and delivered to consumers",
        ))?;
        let snapshots_deleted_total = IntCounter::with_opts(Opts::new(
            "snapshots_deleted_total",
            "Superseded snapshots reclaimed",
        ))?;
        let decode_failures_total = IntCounter::with_opts(Opts::new(
            "decode_failures_total",
            "Candidates left for re-evaluation after a failed decode",
        ))?;
        let candidates_visible = IntGauge::with_opts(Opts::new(
            "candidates_visible",
            "Candidates visible at the start of the latest selector pass",
        ))?;
        let benchmark_last_count = IntGauge::with_opts(Opts::new(
            "benchmark_last_count",
            "Count reported by the most recent benchmark window",
        ))?;

        registry.register(Box::new(fetch_success_total.clone()))?;
        registry.register(Box::new(fetch_failures_total.clone()))?;
        registry.register(Box::new(selector_passes_total.clone()))?;
        registry.register(Box::new(images_delivered_total.clone()))?;
        registry.register(Box::new(snapshots_deleted_total.clone()))?;
        registry.register(Box::new(decode_failures_total.clone()))?;
        registry.register(Box::new(candidates_visible.clone()))?;
        registry.register(Box::new(benchmark_last_count.clone()))?;

        Ok(Self {
            inner: std::sync::Arc::new(MetricsInner {
                registry,
                fetch_success_total,
                fetch_failures_total,
                selector_passes_total,
                images_delivered_total,
                snapshots_deleted_total,
                decode_failures_total,
                candidates_visible,
                benchmark_last_count,
            }),
        })
    }

    /// Increment the successful iteration counter.
    pub fn inc_fetch_success(&self) {
        self.inner.fetch_success_total.inc();
    }

    /// Increment the skipped iteration counter for the given reason
    /// (`fetch` or `write`).
    pub fn inc_fetch_failure(&self, reason: &str) {
        self.inner
            .fetch_failures_total
            .with_label_values(&[reason])
            .inc();
    }

    /// Increment the selector pass counter.
    pub fn inc_selector_pass(&self) {
        self.inner.selector_passes_total.inc();
    }

    /// Increment the delivered image counter.
    pub fn inc_image_delivered(&self) {
        self.inner.images_delivered_total.inc();
    }

    /// Increment the reclaimed snapshot counter.
    pub fn inc_snapshot_deleted(&self) {
        self.inner.snapshots_deleted_total.inc();
    }

    /// Increment the decode failure counter.
    pub fn inc_decode_failure(&self) {
        self.inner.decode_failures_total.inc();
    }

    /// Record how many candidates the latest selector pass observed.
    pub fn set_candidates_visible(&self, count: i64) {
        self.inner.candidates_visible.set(count);
    }

    /// Record the count reported by the most recent benchmark window.
    pub fn set_benchmark_last_count(&self, count: i64) {
        self.inner.benchmark_last_count.set(count);
    }

    /// Render the metrics registry using the Prometheus text exposition
    /// format.
    ///
    /// # Errors
    ///
    /// Returns an error if the metrics cannot be encoded or if the encoded
    /// buffer is not valid UTF-8.
    pub fn render(&self) -> Result<String> {
        let encoder = TextEncoder::new();
        let metric_families = self.inner.registry.gather();
        let mut buffer = Vec::new();
        encoder
            .encode(&metric_families, &mut buffer)
            .context("failed to encode Prometheus metrics")?;
        String::from_utf8(buffer).context("metrics output was not valid UTF-8")
    }

    /// Take a point-in-time snapshot of the most relevant gauges and
    /// counters.
    #[must_use]
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            fetch_success_total: self.inner.fetch_success_total.get(),
            images_delivered_total: self.inner.images_delivered_total.get(),
            snapshots_deleted_total: self.inner.snapshots_deleted_total.get(),
            decode_failures_total: self.inner.decode_failures_total.get(),
            candidates_visible: self.inner.candidates_visible.get(),
            benchmark_last_count: self.inner.benchmark_last_count.get(),
        }
    }
}
