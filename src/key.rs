//! Lock key derivation.
//!
//! The textual key scheme is shared with every other producer that talks to
//! the same store, so it must stay byte-for-byte stable.

use crate::error::{Error, Result};
use crate::model::{JobPayload, LockKey};
use serde_json::Value;

const KEY_PREFIX: &str = "loners:queue:";
const KEY_INFIX: &str = ":job:";

/// Derive the lock key for a payload on a queue.
pub fn derive_key(queue: &str, payload: &JobPayload) -> Result<LockKey> {
    let unique_key = unique_key(payload)?;
    Ok(LockKey(format!("{}{KEY_INFIX}{unique_key}", queue_prefix(queue))))
}

/// Glob matching every lock key of a queue, for `KEYS`.
pub fn queue_pattern(queue: &str) -> String {
    format!("{}{KEY_INFIX}*", queue_prefix(queue))
}

fn queue_prefix(queue: &str) -> String {
    format!("{KEY_PREFIX}{queue}")
}

/// Extract the declared `unique_key` from the first argument.
pub fn unique_key(payload: &JobPayload) -> Result<String> {
    let args = payload.args_list().ok_or_else(|| {
        Error::MalformedPayload(format!("{}: args must be an array", payload.job_type))
    })?;
    let options = args.first().and_then(Value::as_object).ok_or_else(|| {
        Error::MalformedPayload(format!(
            "{}: first argument must be an object",
            payload.job_type
        ))
    })?;

    match options.get("unique_key") {
        None | Some(Value::Null) => Err(Error::MalformedPayload(format!(
            "{}: first argument has no unique_key",
            payload.job_type
        ))),
        Some(Value::String(s)) => Ok(s.clone()),
        Some(other) => Ok(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn numeric_unique_key_uses_its_text() {
        let payload = JobPayload::new("SyncJob", vec![json!({"unique_key": 42})]);
        assert_eq!(unique_key(&payload).unwrap(), "42");
    }

    #[test]
    fn null_unique_key_is_missing() {
        let payload = JobPayload::new("SyncJob", vec![json!({"unique_key": null})]);
        assert!(matches!(
            unique_key(&payload),
            Err(Error::MalformedPayload(_))
        ));
    }

    #[test]
    fn pattern_covers_only_one_queue() {
        assert_eq!(queue_pattern("mailers"), "loners:queue:mailers:job:*");
    }
}
