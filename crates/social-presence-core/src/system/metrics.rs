//! Metrics collection for Social Presence
//!
//! Prometheus counters for the presence state machine. Everything is
//! registered once into a crate-owned registry on first use.

use once_cell::sync::Lazy;
use prometheus::{
    register_histogram_with_registry, register_int_counter_vec_with_registry,
    register_int_counter_with_registry, Histogram, IntCounter, IntCounterVec, Registry,
};
use std::time::Instant;

/// Global metrics registry
static REGISTRY: Lazy<Registry> = Lazy::new(Registry::new);

/// Counters for the presence state machine
pub struct Metrics {
    /// Committed status writes, labelled by status
    pub status_writes: IntCounterVec,
    /// Read-triggered transitions, labelled by from/to status
    pub auto_transitions: IntCounterVec,
    /// Transitions that were computed but could not be persisted
    pub transition_write_failures: IntCounter,
    /// Heartbeats, labelled by outcome
    pub heartbeats: IntCounterVec,
    /// Failed store calls, labelled by operation
    pub store_errors: IntCounterVec,
    /// Latency of individual store calls in seconds
    pub store_call_duration: Histogram,
}

impl Metrics {
    /// Create and register a new metrics instance
    fn new(registry: &Registry) -> prometheus::Result<Self> {
        Ok(Self {
            status_writes: register_int_counter_vec_with_registry!(
                "presence_status_writes_total",
                "Total number of committed status writes",
                &["status"],
                registry
            )?,
            auto_transitions: register_int_counter_vec_with_registry!(
                "presence_auto_transitions_total",
                "Total number of read-triggered status transitions",
                &["from", "to"],
                registry
            )?,
            transition_write_failures: register_int_counter_with_registry!(
                "presence_transition_write_failures_total",
                "Transitions returned to the caller but not persisted",
                registry
            )?,
            heartbeats: register_int_counter_vec_with_registry!(
                "presence_heartbeats_total",
                "Total number of heartbeats by outcome",
                &["outcome"],
                registry
            )?,
            store_errors: register_int_counter_vec_with_registry!(
                "presence_store_errors_total",
                "Total number of failed store calls",
                &["operation"],
                registry
            )?,
            store_call_duration: register_histogram_with_registry!(
                "presence_store_call_duration_seconds",
                "Duration of status store calls in seconds",
                vec![0.0005, 0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 2.0],
                registry
            )?,
        })
    }

    /// Get the global metrics instance
    pub fn global() -> &'static Metrics {
        static INSTANCE: Lazy<Metrics> = Lazy::new(|| {
            Metrics::new(&REGISTRY).expect("Failed to initialize metrics")
        });
        &INSTANCE
    }
}

/// Timer for measuring store call duration
pub struct Timer {
    /// Start time of the operation
    start: Instant,
    /// Histogram to record the duration when finished
    histogram: &'static Histogram,
}

impl Timer {
    /// Start a new timer
    pub fn start(histogram: &'static Histogram) -> Self {
        Self {
            start: Instant::now(),
            histogram,
        }
    }

    /// Record the elapsed time and consume the timer
    pub fn finish(self) {
        self.histogram.observe(self.start.elapsed().as_secs_f64());
    }
}

/// Force registration of every metric
///
/// Call once during startup so `/metrics` lists all series from the start.
pub fn init_registry() {
    let _ = Metrics::global();
}

/// Get the Prometheus registry holding presence metrics
pub fn registry() -> &'static Registry {
    &REGISTRY
}

/// Collect all metrics in the Prometheus text exposition format
pub fn collect_metrics() -> String {
    let encoder = prometheus::TextEncoder::new();
    let metric_families = registry().gather();
    encoder.encode_to_string(&metric_families).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exposes_presence_series() {
        init_registry();
        Metrics::global().heartbeats.with_label_values(&["ignored"]).inc();
        let text = collect_metrics();
        assert!(text.contains("presence_heartbeats_total"));
    }
}
