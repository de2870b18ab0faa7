//! Key-value lock store and queue backlog boundaries.
//!
//! The lock manager needs only a handful of single-round-trip primitives,
//! each atomic at the store. No multi-command transactions are used.

pub mod memory;
pub mod redis;

pub use self::memory::MemoryStore;
pub use self::redis::RedisStore;

use crate::error::Result;
use async_trait::async_trait;

/// Store primitives for lock keys.
#[async_trait]
pub trait LockStore: Send + Sync {
    /// `GET key`.
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// `SET key value`. Clears any existing expiry.
    async fn set(&self, key: &str, value: &str) -> Result<()>;

    /// `SET key value NX [EX ttl]`. Returns true if the key was set.
    async fn set_if_absent(&self, key: &str, value: &str, ttl_secs: Option<i64>) -> Result<bool>;

    /// `EXPIRE key ttl`. A non-positive ttl removes the key.
    async fn expire(&self, key: &str, ttl_secs: i64) -> Result<()>;

    /// `TTL key`: -2 if missing, -1 if persistent, otherwise seconds left.
    async fn ttl(&self, key: &str) -> Result<i64>;

    /// `DEL key...`. Returns the number of keys removed.
    async fn del(&self, keys: &[String]) -> Result<u64>;

    /// `KEYS pattern` with `*` and `?` globs.
    async fn keys(&self, pattern: &str) -> Result<Vec<String>>;
}

/// Read-only view of the host queue's backing list.
#[async_trait]
pub trait QueueBacklog: Send + Sync {
    /// Raw encoded entries currently sitting in the queue, head first.
    async fn entries(&self, queue: &str) -> Result<Vec<String>>;
}
