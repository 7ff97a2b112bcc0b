//! Metric instrument factories for drainq.
//!
//! Uses the OTel Meter API with the globally-registered `MeterProvider`.
//! All instruments are created lazily from the `"drainq"` meter.

use opentelemetry::metrics::{Counter, Histogram, Meter};

/// Returns the shared meter for drainq instruments.
fn meter() -> Meter {
    opentelemetry::global::meter("drainq")
}

/// Counter: work items run through the processing wrapper.
/// Labels: `state` ("successful" | "retry").
pub fn items_processed() -> Counter<u64> {
    meter()
        .u64_counter("drainq.items.processed")
        .with_description("Number of work items processed")
        .build()
}

/// Counter: queue-level operations (push, pop, pop_empty).
/// Labels: `queue`, `operation`.
pub fn queue_operations() -> Counter<u64> {
    meter()
        .u64_counter("drainq.queue.operations")
        .with_description("Number of queue operations")
        .build()
}

/// Counter: notifications dropped by the single-flight guard or the
/// scheduler channel. Labels: `reason` ("draining" | "pending" | "no_worker").
pub fn notifications_dropped() -> Counter<u64> {
    meter()
        .u64_counter("drainq.notifications.dropped")
        .with_description("Queue notifications dropped instead of scheduled")
        .build()
}

/// Counter: artifact files attached to report-backs.
pub fn artifacts_captured() -> Counter<u64> {
    meter()
        .u64_counter("drainq.artifacts.captured")
        .with_description("Artifact files attached to work item report-backs")
        .build()
}

/// Histogram: drain pass duration in milliseconds.
pub fn drain_pass_duration_ms() -> Histogram<f64> {
    meter()
        .f64_histogram("drainq.drain.pass_duration_ms")
        .with_description("Drain pass duration in milliseconds")
        .with_unit("ms")
        .build()
}
