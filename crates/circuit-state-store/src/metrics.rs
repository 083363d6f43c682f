//! Prometheus metrics for circuit state operations
//!
//! Provides observability into store operations including:
//! - Operation latencies per backend
//! - Error rates by kind
//! - Circuit open/close transitions
//! - Test permit grants and denials

use lazy_static::lazy_static;
use prometheus::{CounterVec, HistogramOpts, HistogramVec, Opts, Registry};
use std::sync::Once;
use tracing::info;

lazy_static! {
    /// Global metrics registry
    pub static ref REGISTRY: Registry = Registry::new();

    /// Store operation latency
    pub static ref STORE_OP_DURATION: HistogramVec = HistogramVec::new(
        HistogramOpts::new("circuit_state_operation_seconds", "Circuit state operation duration")
            .buckets(vec![0.0005, 0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0]),
        &["operation", "backend"]
    ).unwrap();

    /// Store operation errors
    pub static ref STORE_OP_ERRORS: CounterVec = CounterVec::new(
        Opts::new("circuit_state_errors_total", "Circuit state operation errors"),
        &["operation", "backend", "error_type"]
    ).unwrap();

    /// Circuit open/close writes
    pub static ref CIRCUIT_TRANSITIONS: CounterVec = CounterVec::new(
        Opts::new("circuit_state_transitions_total", "Circuit open and close writes"),
        &["transition"]
    ).unwrap();

    /// Test permit acquisition attempts
    pub static ref TEST_PERMITS: CounterVec = CounterVec::new(
        Opts::new("circuit_state_test_permits_total", "Half-open test permit attempts"),
        &["outcome"]
    ).unwrap();
}

static INIT: Once = Once::new();

/// Register all metrics with the global registry
pub fn register_metrics() {
    INIT.call_once(|| {
        info!("Registering circuit state metrics");

        REGISTRY.register(Box::new(STORE_OP_DURATION.clone())).ok();
        REGISTRY.register(Box::new(STORE_OP_ERRORS.clone())).ok();
        REGISTRY.register(Box::new(CIRCUIT_TRANSITIONS.clone())).ok();
        REGISTRY.register(Box::new(TEST_PERMITS.clone())).ok();
    });
}

/// Helper to time a store operation
pub struct OperationTimer {
    operation: &'static str,
    backend: &'static str,
    start: std::time::Instant,
}

impl OperationTimer {
    pub fn new(operation: &'static str, backend: &'static str) -> Self {
        Self {
            operation,
            backend,
            start: std::time::Instant::now(),
        }
    }
}

impl Drop for OperationTimer {
    fn drop(&mut self) {
        let duration = self.start.elapsed().as_secs_f64();
        STORE_OP_DURATION
            .with_label_values(&[self.operation, self.backend])
            .observe(duration);
    }
}

/// Record a store error
pub fn record_store_error(operation: &str, backend: &str, error_type: &str) {
    STORE_OP_ERRORS
        .with_label_values(&[operation, backend, error_type])
        .inc();
}

/// Record a circuit open or close
pub fn record_transition(open: bool) {
    CIRCUIT_TRANSITIONS
        .with_label_values(&[if open { "open" } else { "close" }])
        .inc();
}

/// Record a test permit attempt
pub fn record_test_permit(granted: bool) {
    TEST_PERMITS
        .with_label_values(&[if granted { "granted" } else { "denied" }])
        .inc();
}

/// Get metrics as text for Prometheus scraping
pub fn gather_metrics() -> String {
    use prometheus::Encoder;
    let encoder = prometheus::TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    if encoder.encode(&metric_families, &mut buffer).is_err() {
        return String::new();
    }
    String::from_utf8(buffer).unwrap_or_default()
}
