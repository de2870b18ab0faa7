//! Uniqueness classification.
//!
//! A payload is unique if its first argument carries a truthy `uniq` flag, or
//! if its type resolves to a registered type marked unique. Resolution
//! failures never escape: they yield the non-unique default so a foreign or
//! misconfigured job type cannot block ordinary queue traffic.

use crate::key;
use crate::model::{JobPayload, NO_TTL, RELEASE_IMMEDIATELY, UniquenessDescriptor};
use crate::registry::JobTypeRegistry;
use crate::telemetry::metrics;
use opentelemetry::KeyValue;
use serde_json::Value;

/// Classify a payload against the registered job types.
pub fn classify(registry: &JobTypeRegistry, payload: &JobPayload) -> UniquenessDescriptor {
    let resolved = match registry.resolve(&payload.job_type) {
        Ok(config) => Some(config),
        Err(e) => {
            tracing::trace!(job_type = %payload.job_type, error = %e, "falling back to defaults");
            metrics::classify_fallbacks().add(1, &[KeyValue::new("reason", "unresolvable_type")]);
            None
        }
    };

    let is_unique = has_uniq_flag(payload) || resolved.is_some_and(|c| c.unique);
    if !is_unique {
        return UniquenessDescriptor::not_unique();
    }

    UniquenessDescriptor {
        is_unique,
        unique_key: key::unique_key(payload).ok(),
        ttl_on_enqueue: resolved.map_or(NO_TTL, |c| c.loner_ttl),
        grace_ttl_after_completion: resolved
            .map_or(RELEASE_IMMEDIATELY, |c| c.loner_lock_after_execution_period),
    }
}

fn has_uniq_flag(payload: &JobPayload) -> bool {
    payload
        .options()
        .and_then(|opts| opts.get("uniq"))
        .is_some_and(truthy)
}

/// Only `null` and `false` are falsy, matching how queue producers
/// written in dynamic languages treat the flag.
fn truthy(value: &Value) -> bool {
    !matches!(value, Value::Null | Value::Bool(false))
}
