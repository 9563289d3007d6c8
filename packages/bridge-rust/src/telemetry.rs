//! Metric names and recording helpers.
//!
//! Every metric carries a `bridge` label with the owning bridge's name.
//! Recording is a no-op unless the application installs a `metrics` recorder.

/// Gauge: calls currently awaiting a response.
pub const PENDING_CALLS: &str = "workerlink_pending_calls";
/// Counter: requests handed to the channel.
pub const CALLS_SENT: &str = "workerlink_calls_sent_total";
/// Counter: event occurrences that reached at least the dispatch stage.
pub const EVENTS_DISPATCHED: &str = "workerlink_events_dispatched_total";
/// Counter: transport faults that failed pending calls.
pub const TRANSPORT_FAILURES: &str = "workerlink_transport_failures_total";

#[allow(clippy::cast_precision_loss)]
pub(crate) fn pending_calls(bridge: &str, count: usize) {
    metrics::gauge!(PENDING_CALLS, "bridge" => bridge.to_string()).set(count as f64);
}

pub(crate) fn call_sent(bridge: &str) {
    metrics::counter!(CALLS_SENT, "bridge" => bridge.to_string()).increment(1);
}

pub(crate) fn event_dispatched(bridge: &str) {
    metrics::counter!(EVENTS_DISPATCHED, "bridge" => bridge.to_string()).increment(1);
}

pub(crate) fn transport_failure(bridge: &str) {
    metrics::counter!(TRANSPORT_FAILURES, "bridge" => bridge.to_string()).increment(1);
}
