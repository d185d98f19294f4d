//! Observability utilities: driver and echo-service metrics

use once_cell::sync::Lazy;
use prometheus::{Encoder, Histogram, IntCounter, IntCounterVec, TextEncoder};

pub static ATTEMPTS_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    prometheus::register_int_counter!("pulse_attempts_total", "HTTP call attempts issued by the driver").unwrap()
});
pub static RETRIES_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    prometheus::register_int_counter!("pulse_retries_total", "Attempts that failed and were retried").unwrap()
});
pub static OUTCOMES_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    prometheus::register_int_counter_vec!("pulse_outcomes_total", "Terminal request outcomes by kind", &["kind"]).unwrap()
});
pub static BATCH_SECONDS: Lazy<Histogram> = Lazy::new(|| {
    prometheus::register_histogram!("pulse_batch_seconds", "Wall-clock duration of one batch").unwrap()
});
pub static SINK_FAILURES_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    prometheus::register_int_counter!("pulse_sink_failures_total", "Aggregate lines that could not be written").unwrap()
});
pub static ECHO_REQUESTS_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    prometheus::register_int_counter!("pulse_echo_requests_total", "Requests answered by the echo service").unwrap()
});

static ENCODER: Lazy<TextEncoder> = Lazy::new(TextEncoder::new);

pub fn init() {
    // Touch statics so every family shows up in the first scrape.
    let _ = &*ATTEMPTS_TOTAL;
    let _ = &*RETRIES_TOTAL;
    let _ = &*OUTCOMES_TOTAL;
    let _ = &*BATCH_SECONDS;
    let _ = &*SINK_FAILURES_TOTAL;
    let _ = &*ECHO_REQUESTS_TOTAL;
}

/// Renders the default registry in the prometheus text format.
pub fn render() -> (String, Vec<u8>) {
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    if let Err(e) = ENCODER.encode(&metric_families, &mut buffer) {
        tracing::warn!(target: "obs", "failed to encode metrics: {}", e);
    }
    (ENCODER.format_type().to_string(), buffer)
}
