//! Newline-delimited JSON streaming.
//!
//! Each unit becomes one JSON record on its own line, written as soon as it
//! arrives. The body always ends with exactly one record built with
//! `done = true` and empty content, whether generation completed, failed or
//! was cut short.

use std::convert::Infallible;

use axum::body::Body;
use axum::http::header;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use tokio::sync::mpsc;

use crate::shutdown::RequestGuard;
use crate::telemetry;

pub const NDJSON_CONTENT_TYPE: &str = "application/x-ndjson";

/// Build a streaming response from a unit receiver.
///
/// `record(content, done)` shapes each line. `guard` is held until the final
/// record has been produced so shutdown waits for open streams.
pub fn ndjson_response<T, F>(
    mut units: mpsc::Receiver<String>,
    guard: RequestGuard,
    mut record: F,
) -> Response
where
    T: Serialize + Send + 'static,
    F: FnMut(String, bool) -> T + Send + 'static,
{
    let body = async_stream::stream! {
        let _guard = guard;
        let mut sent: u64 = 0;
        while let Some(unit) = units.recv().await {
            sent += 1;
            let line = encode_line(&record(unit, false));
            yield Ok::<String, Infallible>(line);
        }
        telemetry::record_stream_units(sent);
        let last = encode_line(&record(String::new(), true));
        yield Ok(last);
    };

    (
        [
            (header::CONTENT_TYPE, NDJSON_CONTENT_TYPE),
            (header::CACHE_CONTROL, "no-cache"),
        ],
        Body::from_stream(body),
    )
        .into_response()
}

fn encode_line<T: Serialize>(record: &T) -> String {
    let mut line = serde_json::to_string(record).unwrap_or_default();
    line.push('\n');
    line
}
