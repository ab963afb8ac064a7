//! Prometheus metrics for the Room-Chain client.
//!
//! All metrics follow the naming convention: `rc_<subsystem>_<metric>_<unit>`
//!
//! ## Metric Types
//!
//! - **Counter**: Monotonically increasing value (e.g., logs_fetched_total)
//! - **Gauge**: Value that can go up or down (e.g., entities_present)
//! - **Histogram**: Distribution of values (e.g., command_latency_seconds)

use lazy_static::lazy_static;
use prometheus::{
    exponential_buckets, Counter, CounterVec, Encoder, Gauge, GaugeVec, Histogram, HistogramOpts,
    HistogramVec, Opts, Registry, TextEncoder,
};
use std::sync::Arc;

use crate::TelemetryError;

lazy_static! {
    /// Global metrics registry
    pub static ref REGISTRY: Registry = Registry::new();

    // =========================================================================
    // EVENT SYNC METRICS (rc-01)
    // =========================================================================

    /// Raw logs returned by window queries
    pub static ref LOGS_FETCHED: CounterVec = CounterVec::new(
        Opts::new("rc_sync_logs_fetched_total", "Raw logs returned by window queries"),
        &["signature"]
    ).expect("metric creation failed");

    /// Decoded events forwarded to the dispatcher
    pub static ref EVENTS_FORWARDED: CounterVec = CounterVec::new(
        Opts::new("rc_sync_events_forwarded_total", "Decoded events forwarded downstream"),
        &["signature"]
    ).expect("metric creation failed");

    /// Logs skipped because they failed to decode
    pub static ref DECODE_FAILURES: CounterVec = CounterVec::new(
        Opts::new("rc_sync_decode_failures_total", "Logs skipped after a decode failure"),
        &["signature"]
    ).expect("metric creation failed");

    /// Poll cycles aborted by a ledger error
    pub static ref POLL_CYCLE_FAILURES: CounterVec = CounterVec::new(
        Opts::new("rc_sync_poll_cycle_failures_total", "Poll cycles aborted by a ledger error"),
        &["signature"]
    ).expect("metric creation failed");

    /// Last fully processed block per poller
    pub static ref WATERMARK: GaugeVec = GaugeVec::new(
        Opts::new("rc_sync_watermark_block", "Last block fully processed by each poller"),
        &["signature"]
    ).expect("metric creation failed");

    /// Window query duration
    pub static ref LOG_QUERY_DURATION: Histogram = Histogram::with_opts(
        HistogramOpts::new(
            "rc_sync_log_query_duration_seconds",
            "Time spent in one window log query"
        ).buckets(exponential_buckets(0.001, 2.0, 14).expect("bucket creation failed"))
    ).expect("metric creation failed");

    // =========================================================================
    // ENTITY STATE METRICS (rc-02)
    // =========================================================================

    /// Entities currently present
    pub static ref ENTITIES_PRESENT: Gauge = Gauge::new(
        "rc_state_entities_present",
        "Number of entities in the local store"
    ).expect("metric creation failed");

    /// Remote events applied, by signature and effect
    pub static ref EVENTS_APPLIED: CounterVec = CounterVec::new(
        Opts::new("rc_state_events_applied_total", "Events seen by the reconciler"),
        &["signature", "effect"]  // effect: applied/ignored/duplicate
    ).expect("metric creation failed");

    /// Self retargets triggered by sustained divergence
    pub static ref SELF_CORRECTIONS: Counter = Counter::new(
        "rc_state_self_corrections_total",
        "Times the local actor was retargeted to its confirmed position"
    ).expect("metric creation failed");

    // =========================================================================
    // COMMAND METRICS (rc-03)
    // =========================================================================

    /// Commands by outcome
    pub static ref COMMANDS: CounterVec = CounterVec::new(
        Opts::new("rc_commands_total", "Submitted commands by outcome"),
        &["command", "outcome"]  // outcome: confirmed/unconfirmed/failed
    ).expect("metric creation failed");

    /// Submit-to-receipt latency
    pub static ref COMMAND_LATENCY: HistogramVec = HistogramVec::new(
        HistogramOpts::new(
            "rc_command_latency_seconds",
            "Time from submission to receipt"
        ).buckets(exponential_buckets(0.01, 2.0, 12).expect("bucket creation failed")),
        &["command"]
    ).expect("metric creation failed");
}

/// Handle proving the collectors are registered.
pub struct MetricsHandle {
    _registry: Arc<Registry>,
}

/// Register all metrics with the global registry.
///
/// Calling this more than once is harmless.
pub fn register_metrics() -> Result<MetricsHandle, TelemetryError> {
    let metrics: Vec<Box<dyn prometheus::core::Collector>> = vec![
        // Event sync
        Box::new(LOGS_FETCHED.clone()),
        Box::new(EVENTS_FORWARDED.clone()),
        Box::new(DECODE_FAILURES.clone()),
        Box::new(POLL_CYCLE_FAILURES.clone()),
        Box::new(WATERMARK.clone()),
        Box::new(LOG_QUERY_DURATION.clone()),
        // Entity state
        Box::new(ENTITIES_PRESENT.clone()),
        Box::new(EVENTS_APPLIED.clone()),
        Box::new(SELF_CORRECTIONS.clone()),
        // Commands
        Box::new(COMMANDS.clone()),
        Box::new(COMMAND_LATENCY.clone()),
    ];

    for metric in metrics {
        match REGISTRY.register(metric) {
            Ok(()) | Err(prometheus::Error::AlreadyReg) => {}
            Err(e) => return Err(TelemetryError::MetricsInit(e.to_string())),
        }
    }

    Ok(MetricsHandle {
        _registry: Arc::new(REGISTRY.clone()),
    })
}

/// Encode all metrics as Prometheus text format.
pub fn encode_metrics() -> Result<String, TelemetryError> {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder
        .encode(&metric_families, &mut buffer)
        .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?;
    String::from_utf8(buffer).map_err(|e| TelemetryError::MetricsInit(e.to_string()))
}

/// Timer guard for automatic histogram observation.
pub struct HistogramTimer {
    histogram: Histogram,
    start: std::time::Instant,
}

impl HistogramTimer {
    /// Start a new timer for the given histogram.
    pub fn new(histogram: &Histogram) -> Self {
        Self {
            histogram: histogram.clone(),
            start: std::time::Instant::now(),
        }
    }
}

impl Drop for HistogramTimer {
    fn drop(&mut self) {
        let duration = self.start.elapsed().as_secs_f64();
        self.histogram.observe(duration);
    }
}

/// Start timing for a histogram. Observation happens on drop.
#[macro_export]
macro_rules! time_histogram {
    ($histogram:expr) => {
        $crate::metrics::HistogramTimer::new(&$histogram)
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_metrics_twice() {
        assert!(register_metrics().is_ok());
        assert!(register_metrics().is_ok());
    }

    #[test]
    fn test_encode_contains_registered_metric() {
        register_metrics().unwrap();
        LOGS_FETCHED.with_label_values(&["PlayerMoved"]).inc();
        let text = encode_metrics().unwrap();
        assert!(text.contains("rc_sync_logs_fetched_total"));
    }

    #[test]
    fn test_gauge_set() {
        WATERMARK.with_label_values(&["RoomCreated"]).set(42.0);
        assert_eq!(WATERMARK.with_label_values(&["RoomCreated"]).get(), 42.0);
    }

    #[test]
    fn test_histogram_timer() {
        let before = LOG_QUERY_DURATION.get_sample_count();
        {
            let _timer = time_histogram!(LOG_QUERY_DURATION);
        }
        assert_eq!(LOG_QUERY_DURATION.get_sample_count(), before + 1);
    }
}
