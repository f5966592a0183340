//! Request span helpers.

use tracing::{info_span, Span};

/// Extension trait for recording outcomes on spans.
pub trait SpanExt {
    /// Record `status` and, on failure, `error.message`.
    fn record_result<T, E>(&self, result: &Result<T, E>)
    where
        E: std::fmt::Display;
}

impl SpanExt for Span {
    fn record_result<T, E>(&self, result: &Result<T, E>)
    where
        E: std::fmt::Display,
    {
        match result {
            Ok(_) => {
                self.record("status", "ok");
            }
            Err(e) => {
                self.record("status", "error");
                self.record("error.message", e.to_string().as_str());
            }
        }
    }
}

/// Factory for gateway request spans.
pub struct RequestSpan;

impl RequestSpan {
    /// Span for one API request.
    ///
    /// `status`, `error.message` and `latency_ms` start empty and are filled
    /// in as the request completes.
    pub fn new(request_id: &str, operation: &str, model: &str) -> Span {
        info_span!(
            "gateway_request",
            request_id = %request_id,
            operation = %operation,
            model = %model,
            stream = tracing::field::Empty,
            status = tracing::field::Empty,
            error.message = tracing::field::Empty,
            latency_ms = tracing::field::Empty,
        )
    }
}
