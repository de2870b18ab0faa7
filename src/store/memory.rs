//! In-process lock store and queue backlog.
//!
//! Mirrors the Redis semantics the lock manager relies on: `SET` clears an
//! expiry, `EXPIRE` with a non-positive ttl deletes, expired keys vanish on
//! next access. Deadlines use `tokio::time::Instant`, so tests can drive
//! expiry with `tokio::time::pause` and `advance`.

use super::{LockStore, QueueBacklog};
use crate::error::{Error, Result};
use async_trait::async_trait;
use parking_lot::Mutex;
use regex::Regex;
use std::collections::HashMap;
use std::time::Duration;
use tokio::time::Instant;

#[derive(Debug, Clone)]
struct Entry {
    value: String,
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.is_none_or(|at| at > now)
    }
}

/// In-memory store. Shared state sits behind one mutex per map.
#[derive(Debug, Default)]
pub struct MemoryStore {
    keys: Mutex<HashMap<String, Entry>>,
    queues: Mutex<HashMap<String, Vec<String>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a raw encoded entry to a queue's backlog.
    pub fn push_entry(&self, queue: &str, raw: impl Into<String>) {
        self.queues
            .lock()
            .entry(queue.to_string())
            .or_default()
            .push(raw.into());
    }

    /// Number of live keys.
    pub fn len(&self) -> usize {
        let now = Instant::now();
        self.keys.lock().values().filter(|e| e.is_live(now)).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Look up a live entry, dropping it if it has expired.
    fn live<'a>(map: &'a mut HashMap<String, Entry>, key: &str) -> Option<&'a mut Entry> {
        let now = Instant::now();
        if map.get(key).is_some_and(|e| !e.is_live(now)) {
            map.remove(key);
        }
        map.get_mut(key)
    }
}

#[async_trait]
impl LockStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let mut map = self.keys.lock();
        Ok(Self::live(&mut map, key).map(|e| e.value.clone()))
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        self.keys.lock().insert(
            key.to_string(),
            Entry {
                value: value.to_string(),
                expires_at: None,
            },
        );
        Ok(())
    }

    async fn set_if_absent(&self, key: &str, value: &str, ttl_secs: Option<i64>) -> Result<bool> {
        let mut map = self.keys.lock();
        if Self::live(&mut map, key).is_some() {
            return Ok(false);
        }
        let expires_at = match ttl_secs {
            Some(ttl) if ttl <= 0 => {
                return Err(Error::Other(format!("invalid expire time in set: {ttl}")));
            }
            Some(ttl) => Some(Instant::now() + Duration::from_secs(ttl as u64)),
            None => None,
        };
        map.insert(
            key.to_string(),
            Entry {
                value: value.to_string(),
                expires_at,
            },
        );
        Ok(true)
    }

    async fn expire(&self, key: &str, ttl_secs: i64) -> Result<()> {
        let mut map = self.keys.lock();
        if ttl_secs <= 0 {
            map.remove(key);
        } else if let Some(entry) = Self::live(&mut map, key) {
            entry.expires_at = Some(Instant::now() + Duration::from_secs(ttl_secs as u64));
        }
        Ok(())
    }

    async fn ttl(&self, key: &str) -> Result<i64> {
        let mut map = self.keys.lock();
        let Some(entry) = Self::live(&mut map, key) else {
            return Ok(-2);
        };
        Ok(match entry.expires_at {
            None => -1,
            // Rounded to the nearest second, like Redis.
            Some(at) => {
                let left = at.saturating_duration_since(Instant::now());
                ((left.as_millis() + 500) / 1000) as i64
            }
        })
    }

    async fn del(&self, keys: &[String]) -> Result<u64> {
        let mut map = self.keys.lock();
        let mut removed = 0;
        for key in keys {
            if Self::live(&mut map, key).is_some() {
                map.remove(key);
                removed += 1;
            }
        }
        Ok(removed)
    }

    async fn keys(&self, pattern: &str) -> Result<Vec<String>> {
        let matcher = glob_regex(pattern)?;
        let now = Instant::now();
        let mut map = self.keys.lock();
        map.retain(|_, e| e.is_live(now));
        let mut found: Vec<String> = map.keys().filter(|k| matcher.is_match(k)).cloned().collect();
        found.sort();
        Ok(found)
    }
}

#[async_trait]
impl QueueBacklog for MemoryStore {
    async fn entries(&self, queue: &str) -> Result<Vec<String>> {
        Ok(self.queues.lock().get(queue).cloned().unwrap_or_default())
    }
}

/// Translate a `KEYS` glob (`*`, `?`) into an anchored regex.
fn glob_regex(pattern: &str) -> Result<Regex> {
    let mut expr = String::with_capacity(pattern.len() + 8);
    expr.push('^');
    for ch in pattern.chars() {
        match ch {
            '*' => expr.push_str(".*"),
            '?' => expr.push('.'),
            other => expr.push_str(&regex::escape(&other.to_string())),
        }
    }
    expr.push('$');
    Regex::new(&expr).map_err(|e| Error::Other(format!("bad key pattern {pattern}: {e}")))
}
