//! Gateway counters and histograms via the `metrics` facade.
//!
//! Nothing is exported unless a recorder is installed by the embedding
//! process; without one every call is a no-op.

use std::time::Duration;

pub fn record_request_success(operation: &'static str, latency: Duration) {
    metrics::counter!("ir_gateway_requests_total", "operation" => operation, "outcome" => "ok")
        .increment(1);
    metrics::histogram!("ir_gateway_request_latency_ms", "operation" => operation)
        .record(latency.as_secs_f64() * 1000.0);
}

pub fn record_request_failure(operation: &'static str, kind: &'static str) {
    metrics::counter!("ir_gateway_requests_total", "operation" => operation, "outcome" => kind)
        .increment(1);
}

pub fn record_model_load(latency: Duration) {
    metrics::counter!("ir_gateway_model_loads_total").increment(1);
    metrics::histogram!("ir_gateway_model_load_ms").record(latency.as_secs_f64() * 1000.0);
}

pub fn record_stream_units(units: u64) {
    metrics::counter!("ir_gateway_stream_units_total").increment(units);
}
