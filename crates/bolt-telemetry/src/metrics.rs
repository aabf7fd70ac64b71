//! Prometheus-backed metrics registry and snapshot helpers.
//!
//! # Design
//! - Encapsulates collector registration to keep the public API small.
//! - Transfer outcomes share one labelled counter so new outcomes need no new collector.

use std::sync::Arc;

use prometheus::{
    Encoder, IntCounter, IntCounterVec, IntGauge, Opts, Registry, TextEncoder, core::Collector,
};
use serde::Serialize;

use crate::error::{TelemetryError, TelemetryResult};

/// Terminal or lifecycle outcome recorded for a transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferOutcome {
    /// A transfer was accepted.
    Started,
    /// A transfer was paused.
    Paused,
    /// A transfer was resumed.
    Resumed,
    /// Fetch and relay finished.
    Completed,
    /// A run failed.
    Failed,
    /// A transfer was cancelled.
    Cancelled,
}

impl TransferOutcome {
    /// Label value used in the metrics registry.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Started => "started",
            Self::Paused => "paused",
            Self::Resumed => "resumed",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        }
    }
}

/// Prometheus-backed metrics registry shared across services.
#[derive(Clone)]
pub struct Metrics {
    inner: Arc<MetricsInner>,
}

struct MetricsInner {
    registry: Registry,
    http_requests_total: IntCounterVec,
    stream_responses_total: IntCounterVec,
    events_emitted_total: IntCounterVec,
    transfers_total: IntCounterVec,
    active_transfers: IntGauge,
    bytes_fetched_total: IntCounter,
    bytes_relayed_total: IntCounter,
    host_memory_used_percent: IntGauge,
}

/// Snapshot of selected gauges and counters for health reporting.
#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    /// Transfers currently registered.
    pub active_transfers: i64,
    /// Bytes written to local staging.
    pub bytes_fetched_total: u64,
    /// Bytes pushed to the object store.
    pub bytes_relayed_total: u64,
    /// Completed transfers.
    pub transfers_completed_total: u64,
    /// Failed runs.
    pub transfers_failed_total: u64,
}

impl Metrics {
    /// Construct a new metrics registry with the standard collectors registered.
    ///
    /// # Errors
    ///
    /// Returns an error if any of the Prometheus collectors cannot be built or
    /// registered.
    pub fn new() -> TelemetryResult<Self> {
        let registry = Registry::new();

        let http_requests_total = build("http_requests_total", || {
            IntCounterVec::new(
                Opts::new("http_requests_total", "Total HTTP requests received"),
                &["route", "code"],
            )
        })?;
        let stream_responses_total = build("stream_responses_total", || {
            IntCounterVec::new(
                Opts::new(
                    "stream_responses_total",
                    "Artifact stream responses by origin and range outcome",
                ),
                &["origin", "range"],
            )
        })?;
        let events_emitted_total = build("events_emitted_total", || {
            IntCounterVec::new(
                Opts::new("events_emitted_total", "Notification events emitted by type"),
                &["type"],
            )
        })?;
        let transfers_total = build("transfers_total", || {
            IntCounterVec::new(
                Opts::new("transfers_total", "Transfer lifecycle transitions by outcome"),
                &["outcome"],
            )
        })?;
        let active_transfers = build("active_transfers", || {
            IntGauge::with_opts(Opts::new(
                "active_transfers",
                "Number of transfers in the registry",
            ))
        })?;
        let bytes_fetched_total = build("bytes_fetched_total", || {
            IntCounter::with_opts(Opts::new(
                "bytes_fetched_total",
                "Bytes written to local staging by the fetch stage",
            ))
        })?;
        let bytes_relayed_total = build("bytes_relayed_total", || {
            IntCounter::with_opts(Opts::new(
                "bytes_relayed_total",
                "Bytes pushed to the object store by the relay stage",
            ))
        })?;
        let host_memory_used_percent = build("host_memory_used_percent", || {
            IntGauge::with_opts(Opts::new(
                "host_memory_used_percent",
                "Host memory utilisation sampled by the stats task",
            ))
        })?;

        register(&registry, "http_requests_total", &http_requests_total)?;
        register(&registry, "stream_responses_total", &stream_responses_total)?;
        register(&registry, "events_emitted_total", &events_emitted_total)?;
        register(&registry, "transfers_total", &transfers_total)?;
        register(&registry, "active_transfers", &active_transfers)?;
        register(&registry, "bytes_fetched_total", &bytes_fetched_total)?;
        register(&registry, "bytes_relayed_total", &bytes_relayed_total)?;
        register(
            &registry,
            "host_memory_used_percent",
            &host_memory_used_percent,
        )?;

        Ok(Self {
            inner: Arc::new(MetricsInner {
                registry,
                http_requests_total,
                stream_responses_total,
                events_emitted_total,
                transfers_total,
                active_transfers,
                bytes_fetched_total,
                bytes_relayed_total,
                host_memory_used_percent,
            }),
        })
    }

    /// Increment the HTTP request counter for the given route and status code.
    pub fn inc_http_request(&self, route: &str, status: u16) {
        self.inner
            .http_requests_total
            .with_label_values(&[route, &status.to_string()])
            .inc();
    }

    /// Record an artifact stream response served from `origin`.
    ///
    /// The status is folded into `full`, `partial`, `unsatisfiable`, or `error`.
    pub fn inc_stream_response(&self, origin: &str, status: u16) {
        let range = match status {
            200 => "full",
            206 => "partial",
            416 => "unsatisfiable",
            _ => "error",
        };
        self.inner
            .stream_responses_total
            .with_label_values(&[origin, range])
            .inc();
    }

    /// Increment the emitted event counter for the specific event type.
    pub fn inc_event(&self, event_type: &str) {
        self.inner
            .events_emitted_total
            .with_label_values(&[event_type])
            .inc();
    }

    /// Record a transfer lifecycle outcome.
    pub fn inc_transfer(&self, outcome: TransferOutcome) {
        self.inner
            .transfers_total
            .with_label_values(&[outcome.as_str()])
            .inc();
    }

    /// Set the active transfer gauge.
    pub fn set_active_transfers(&self, count: usize) {
        self.inner
            .active_transfers
            .set(i64::try_from(count).unwrap_or(i64::MAX));
    }

    /// Add bytes written by the fetch stage.
    pub fn add_bytes_fetched(&self, bytes: u64) {
        self.inner.bytes_fetched_total.inc_by(bytes);
    }

    /// Add bytes pushed by the relay stage.
    pub fn add_bytes_relayed(&self, bytes: u64) {
        self.inner.bytes_relayed_total.inc_by(bytes);
    }

    /// Record the latest host memory utilisation percentage.
    #[allow(clippy::cast_possible_truncation)]
    pub fn set_host_memory_percent(&self, percent: f64) {
        self.inner
            .host_memory_used_percent
            .set(percent.round().clamp(0.0, 100.0) as i64);
    }

    /// Render the metrics registry using the Prometheus text exposition format.
    ///
    /// # Errors
    ///
    /// Returns an error if the metrics cannot be encoded or if the encoded
    /// buffer is not valid UTF-8.
    pub fn render(&self) -> TelemetryResult<String> {
        let encoder = TextEncoder::new();
        let metric_families = self.inner.registry.gather();
        let mut buffer = Vec::new();
        encoder
            .encode(&metric_families, &mut buffer)
            .map_err(|source| TelemetryError::MetricsEncode { source })?;
        String::from_utf8(buffer).map_err(|source| TelemetryError::MetricsUtf8 { source })
    }

    /// Take a point-in-time snapshot of the most relevant gauges and counters.
    #[must_use]
    pub fn snapshot(&self) -> MetricsSnapshot {
        let outcome = |outcome: TransferOutcome| {
            self.inner
                .transfers_total
                .with_label_values(&[outcome.as_str()])
                .get()
        };
        MetricsSnapshot {
            active_transfers: self.inner.active_transfers.get(),
            bytes_fetched_total: self.inner.bytes_fetched_total.get(),
            bytes_relayed_total: self.inner.bytes_relayed_total.get(),
            transfers_completed_total: outcome(TransferOutcome::Completed),
            transfers_failed_total: outcome(TransferOutcome::Failed),
        }
    }
}

fn build<T>(
    name: &'static str,
    factory: impl FnOnce() -> prometheus::Result<T>,
) -> TelemetryResult<T> {
    factory().map_err(|source| TelemetryError::MetricsCollector { name, source })
}

fn register<C>(registry: &Registry, name: &'static str, collector: &C) -> TelemetryResult<()>
where
    C: Collector + Clone + 'static,
{
    registry
        .register(Box::new(collector.clone()))
        .map_err(|source| TelemetryError::MetricsRegister { name, source })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metrics_snapshot_reflects_updates() -> TelemetryResult<()> {
        let metrics = Metrics::new()?;
        metrics.inc_http_request("/health", 200);
        metrics.inc_stream_response("local", 206);
        metrics.inc_stream_response("remote", 503);
        metrics.inc_event("download_progress");
        metrics.inc_transfer(TransferOutcome::Started);
        metrics.inc_transfer(TransferOutcome::Completed);
        metrics.inc_transfer(TransferOutcome::Failed);
        metrics.inc_transfer(TransferOutcome::Failed);
        metrics.set_active_transfers(3);
        metrics.add_bytes_fetched(1_024);
        metrics.add_bytes_relayed(2_048);
        metrics.set_host_memory_percent(41.6);

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.active_transfers, 3);
        assert_eq!(snapshot.bytes_fetched_total, 1_024);
        assert_eq!(snapshot.bytes_relayed_total, 2_048);
        assert_eq!(snapshot.transfers_completed_total, 1);
        assert_eq!(snapshot.transfers_failed_total, 2);

        let rendered = metrics.render()?;
        assert!(rendered.contains("http_requests_total"));
        assert!(rendered.contains("transfers_total{outcome=\"failed\"} 2"));
        assert!(rendered.contains("host_memory_used_percent 42"));
        assert!(rendered.contains("stream_responses_total{origin=\"local\",range=\"partial\"} 1"));
        assert!(rendered.contains("stream_responses_total{origin=\"remote\",range=\"error\"} 1"));
        Ok(())
    }

    #[test]
    fn registries_are_independent() -> TelemetryResult<()> {
        let first = Metrics::new()?;
        let second = Metrics::new()?;
        first.add_bytes_fetched(10);
        assert_eq!(second.snapshot().bytes_fetched_total, 0);
        Ok(())
    }
}
