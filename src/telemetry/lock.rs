//! Span helpers for bulk lock operations.

use tracing::Span;

/// Start a span for an administrative lock operation on a queue.
///
/// `lock.released` is declared empty and filled by [`record_released`].
pub fn start_lock_span(operation: &'static str, queue: &str) -> Span {
    tracing::info_span!(
        "lock.bulk",
        "lock.operation" = operation,
        "lock.queue" = queue,
        "lock.released" = tracing::field::Empty,
    )
}

/// Record how many locks a bulk operation released.
pub fn record_released(span: &Span, released: usize) {
    span.record("lock.released", released);
}
