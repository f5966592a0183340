//! Telemetry for the gateway: structured logging, request spans and
//! metrics counters.

mod logging;
mod metrics;
mod spans;

pub use logging::{init_logging, LogConfig, LogError, LogFormat};
pub use metrics::{
    record_model_load, record_request_failure, record_request_success, record_stream_units,
};
pub use spans::{RequestSpan, SpanExt};
