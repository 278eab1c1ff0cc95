//! Metrics collection.
//!
//! # Metrics
//! - `wiretrail_sink_appends_total` (counter): append attempts by outcome
//!   (`ok`, `error`, `not_ready`, `dropped`)
//! - `wiretrail_http_calls_total` (counter): intercepted calls by outcome
//!   (status class or `transport_error`)
//!
//! # Design Decisions
//! - Uses the `metrics` facade; no recorder is installed by this crate, so
//!   updates are no-ops unless the host application installs one
//! - Labels are static strings to keep updates allocation-free

/// Record one append attempt.
pub fn record_sink_append(outcome: &'static str) {
    ::metrics::counter!("wiretrail_sink_appends_total", "outcome" => outcome).increment(1);
}

/// Record one intercepted HTTP call.
pub fn record_http_call(outcome: &'static str) {
    ::metrics::counter!("wiretrail_http_calls_total", "outcome" => outcome).increment(1);
}

/// Status class label for a response status.
pub fn status_class(status: u16) -> &'static str {
    match status {
        100..=199 => "1xx",
        200..=299 => "2xx",
        300..=399 => "3xx",
        400..=499 => "4xx",
        _ => "5xx",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_classes() {
        assert_eq!(status_class(200), "2xx");
        assert_eq!(status_class(404), "4xx");
        assert_eq!(status_class(503), "5xx");
    }

    #[test]
    fn recording_without_recorder_is_noop() {
        record_sink_append("ok");
        record_http_call("transport_error");
    }
}
