//! Core data model.
//!
//! A job payload is what the host queue stores for each pending job: a type
//! identifier plus an ordered argument list. Everything else here is derived
//! from it per call and never persisted.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Enqueue TTL meaning "lock persists until explicitly released".
pub const NO_TTL: i64 = -1;

/// Grace TTL meaning "delete the lock as soon as the job is unqueued".
pub const RELEASE_IMMEDIATELY: i64 = 0;

/// Marker value stored under a lock key. Presence is what matters.
pub const LOCK_VALUE: &str = "1";

// ---------------------------------------------------------------------------
// Job Payload
// ---------------------------------------------------------------------------

/// A job as encoded on the queue: `{"class": "...", "args": [...]}`.
///
/// `args` is kept as a raw JSON value because foreign producers push
/// payloads whose args are missing or not an array. Those still have to
/// decode so classification can fail open and key derivation can report
/// a typed error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobPayload {
    #[serde(rename = "class")]
    pub job_type: String,

    #[serde(default)]
    pub args: Value,
}

impl JobPayload {
    pub fn new(job_type: impl Into<String>, args: Vec<Value>) -> Self {
        Self {
            job_type: job_type.into(),
            args: Value::Array(args),
        }
    }

    /// Args as a slice, if they are an array.
    pub fn args_list(&self) -> Option<&[Value]> {
        self.args.as_array().map(Vec::as_slice)
    }

    /// The first argument, if it is a JSON object.
    pub fn options(&self) -> Option<&Map<String, Value>> {
        self.args_list()?.first()?.as_object()
    }
}

/// A job record handed over by the queue framework: the payload plus the
/// queue it was reserved from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueuedJob {
    pub queue: String,
    pub payload: JobPayload,
}

impl QueuedJob {
    pub fn new(queue: impl Into<String>, payload: JobPayload) -> Self {
        Self {
            queue: queue.into(),
            payload,
        }
    }
}

/// Anything that can be unwrapped to a payload: a raw payload or a job record.
pub trait AsPayload {
    fn payload(&self) -> &JobPayload;
}

impl AsPayload for JobPayload {
    fn payload(&self) -> &JobPayload {
        self
    }
}

impl AsPayload for QueuedJob {
    fn payload(&self) -> &JobPayload {
        &self.payload
    }
}

// ---------------------------------------------------------------------------
// Uniqueness Descriptor
// ---------------------------------------------------------------------------

/// Per-payload classification result. Computed on every call, never stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UniquenessDescriptor {
    pub is_unique: bool,

    /// Declared `unique_key`, if the payload carries one.
    pub unique_key: Option<String>,

    /// Seconds to keep the lock while queued. [`NO_TTL`] = no expiry.
    pub ttl_on_enqueue: i64,

    /// Seconds to keep the lock after the job leaves the queue.
    /// [`RELEASE_IMMEDIATELY`] = delete on unqueue.
    pub grace_ttl_after_completion: i64,
}

impl UniquenessDescriptor {
    /// The fail-open outcome: not unique, default TTLs.
    pub fn not_unique() -> Self {
        Self {
            is_unique: false,
            unique_key: None,
            ttl_on_enqueue: NO_TTL,
            grace_ttl_after_completion: RELEASE_IMMEDIATELY,
        }
    }
}

// ---------------------------------------------------------------------------
// Lock Key
// ---------------------------------------------------------------------------

/// Canonical lock identity: `loners:queue:<queue>:job:<unique_key>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LockKey(pub(crate) String);

impl LockKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl AsRef<str> for LockKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for LockKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// Lock State
// ---------------------------------------------------------------------------

/// Observable state of a lock key in the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockState {
    /// No lock. Initial and terminal state.
    Absent,
    /// Lock held with no expiry.
    Locked,
    /// Lock held with a running TTL (enqueue TTL or grace window).
    Expiring { ttl_secs: u64 },
}

impl LockState {
    /// Map a store `TTL` reply (-2 missing, -1 persistent, else seconds).
    pub fn from_ttl(ttl: i64) -> Self {
        match ttl {
            -1 => LockState::Locked,
            n if n >= 0 => LockState::Expiring { ttl_secs: n as u64 },
            _ => LockState::Absent,
        }
    }

    pub fn is_held(self) -> bool {
        !matches!(self, LockState::Absent)
    }
}

impl std::fmt::Display for LockState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LockState::Absent => write!(f, "absent"),
            LockState::Locked => write!(f, "locked"),
            LockState::Expiring { ttl_secs } => write!(f, "expiring ({ttl_secs}s)"),
        }
    }
}
