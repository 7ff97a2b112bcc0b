//! Work item span helpers.
//!
//! Provides span creation and state-transition recording for work items
//! flowing through the drain loop.

use tracing::Span;

/// Start a span for one work item's processing attempt.
///
/// The `item.state` field is declared empty and can be updated via
/// [`record_state_transition`].
pub fn start_item_span(queue: &str, item_id: &str) -> Span {
    tracing::info_span!(
        "item.process",
        "item.queue" = queue,
        "item.id" = item_id,
        "item.state" = tracing::field::Empty,
    )
}

/// Record a state transition event on the given span.
///
/// Emits a tracing `info` event scoped to the span.
pub fn record_state_transition(span: &Span, from: &str, to: &str) {
    span.record("item.state", to);
    span.in_scope(|| {
        tracing::info!(from = from, to = to, "state_transition");
    });
}
