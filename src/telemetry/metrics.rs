//! Metric instruments.
//!
//! Created from the global `MeterProvider`; without one installed they are
//! no-ops, so the lock path can record unconditionally.

use opentelemetry::metrics::{Counter, Meter};

fn meter() -> Meter {
    opentelemetry::global::meter("loner")
}

/// Counter: lock store mutations and lookups.
/// Labels: `queue`, `operation` ("set", "expire", "delete", "check", "cleanup").
pub fn lock_operations() -> Counter<u64> {
    meter()
        .u64_counter("loner.lock.operations")
        .with_description("Number of lock store operations")
        .build()
}

/// Counter: enqueue gate outcomes.
/// Labels: `queue`, `decision` ("proceed" | "suppressed").
pub fn enqueue_decisions() -> Counter<u64> {
    meter()
        .u64_counter("loner.enqueue.decisions")
        .with_description("Enqueue requests let through or suppressed")
        .build()
}

/// Counter: classifications that fell back to non-unique defaults.
/// Labels: `reason`.
pub fn classify_fallbacks() -> Counter<u64> {
    meter()
        .u64_counter("loner.classify.fallbacks")
        .with_description("Job types that could not be resolved during classification")
        .build()
}
