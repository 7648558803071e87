//! Metrics collection with Prometheus
//!
//! - Replay outcomes (replayed, streamed)
//! - Misses by error kind
//! - Recordings by provider and outcome
//! - Upstream recording latency

use prometheus::{CounterVec, HistogramOpts, HistogramVec, Opts, Registry};
use std::sync::Arc;

/// Metrics collector for Tapedeck
#[derive(Clone)]
pub struct Metrics {
    registry: Arc<Registry>,

    /// Requests answered from a cassette
    pub replays_total: CounterVec,
    /// Requests that ended in a diagnostic error
    pub misses_total: CounterVec,
    /// Recording attempts
    pub recordings_total: CounterVec,
    /// Upstream round-trip duration while recording
    pub recording_duration_seconds: HistogramVec,
}

impl Metrics {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let replays_total = CounterVec::new(
            Opts::new(
                "tapedeck_replays_total",
                "Total number of requests answered from a cassette",
            ),
            &["outcome"],
        )?;

        let misses_total = CounterVec::new(
            Opts::new(
                "tapedeck_misses_total",
                "Total number of requests answered with a diagnostic error",
            ),
            &["kind"],
        )?;

        let recordings_total = CounterVec::new(
            Opts::new("tapedeck_recordings_total", "Total number of recording attempts"),
            &["provider", "outcome"],
        )?;

        let recording_duration_seconds = HistogramVec::new(
            HistogramOpts::new(
                "tapedeck_recording_duration_seconds",
                "Upstream round-trip duration while recording, in seconds",
            )
            .buckets(vec![0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0]),
            &["provider"],
        )?;

        registry.register(Box::new(replays_total.clone()))?;
        registry.register(Box::new(misses_total.clone()))?;
        registry.register(Box::new(recordings_total.clone()))?;
        registry.register(Box::new(recording_duration_seconds.clone()))?;

        Ok(Self {
            registry: Arc::new(registry),
            replays_total,
            misses_total,
            recordings_total,
            recording_duration_seconds,
        })
    }

    /// Get the Prometheus registry for exporting metrics
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Record a replayed interaction; `streamed` for event-stream responses
    pub fn record_replay(&self, streamed: bool) {
        let outcome = if streamed { "streamed" } else { "replayed" };
        self.replays_total.with_label_values(&[outcome]).inc();
    }

    pub fn record_miss(&self, kind: &str) {
        self.misses_total.with_label_values(&[kind]).inc();
    }

    pub fn record_recording(&self, provider: &str, outcome: &str) {
        self.recordings_total
            .with_label_values(&[provider, outcome])
            .inc();
    }

    pub fn observe_recording_latency(&self, provider: &str, duration_secs: f64) {
        self.recording_duration_seconds
            .with_label_values(&[provider])
            .observe(duration_secs);
    }
}
