//! # loner
//!
//! At most one pending instance per unique job on a Redis-backed work queue.
//!
//! A job opts in through its type (registered as unique) or a `uniq` flag in
//! its first argument. While it sits in the queue, or inside its grace
//! window after leaving, a lock key in the store suppresses duplicate
//! enqueues. The lock is advisory and best-effort.

pub mod classify;
pub mod config;
pub mod error;
pub mod hooks;
pub mod key;
pub mod lock;
pub mod model;
pub mod registry;
pub mod store;
pub mod telemetry;

pub use error::{Error, Result};
pub use hooks::{EnqueueDecision, EnqueueMode, QueueHooks, ReleasePoint};
pub use lock::LockManager;
pub use model::{JobPayload, LockKey, LockState, QueuedJob, UniquenessDescriptor};
pub use registry::{JobTypeConfig, JobTypeRegistry, UniqueJob};
