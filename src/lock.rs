//! Lock lifecycle: mark queued, mark unqueued, query, bulk release.
//!
//! Per lock key: Absent -> Locked -> (Absent | Expiring -> Absent). Every
//! transition is one store primitive. There are no multi-command
//! transactions, so `is_queued` followed by `mark_queued` from two callers
//! can both succeed. Callers that need a hard gate use `try_mark_queued`.

use crate::classify::classify;
use crate::error::{Error, Result};
use crate::key::{derive_key, queue_pattern};
use crate::model::{AsPayload, JobPayload, LOCK_VALUE, LockState, NO_TTL, RELEASE_IMMEDIATELY};
use crate::registry::JobTypeRegistry;
use crate::store::{LockStore, QueueBacklog};
use crate::telemetry::lock::{record_released, start_lock_span};
use crate::telemetry::metrics;
use opentelemetry::KeyValue;
use serde_json::Value;
use std::sync::Arc;
use tracing::{Instrument, debug, info, warn};

/// Owns the store handle and job type registry; holds no other state.
pub struct LockManager<S> {
    store: Arc<S>,
    registry: Arc<JobTypeRegistry>,
}

impl<S> Clone for LockManager<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            registry: Arc::clone(&self.registry),
        }
    }
}

fn count_op(queue: &str, operation: &'static str) {
    metrics::lock_operations().add(
        1,
        &[
            KeyValue::new("queue", queue.to_string()),
            KeyValue::new("operation", operation),
        ],
    );
}

impl<S: LockStore> LockManager<S> {
    pub fn new(store: Arc<S>, registry: Arc<JobTypeRegistry>) -> Self {
        Self { store, registry }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn registry(&self) -> &JobTypeRegistry {
        &self.registry
    }

    /// Is a unique job with this payload's key queued (or in its grace window)?
    ///
    /// Non-unique payloads return false without touching the store.
    pub async fn is_queued(&self, queue: &str, payload: &JobPayload) -> Result<bool> {
        if !classify(&self.registry, payload).is_unique {
            return Ok(false);
        }
        let key = derive_key(queue, payload)?;
        count_op(queue, "check");
        Ok(self.store.get(key.as_str()).await?.as_deref() == Some(LOCK_VALUE))
    }

    /// Set the lock for a unique payload, attaching the enqueue TTL if any.
    ///
    /// Re-marking an already locked key just resets the marker and TTL.
    pub async fn mark_queued(&self, queue: &str, payload: &JobPayload) -> Result<()> {
        let desc = classify(&self.registry, payload);
        if !desc.is_unique {
            return Ok(());
        }
        let key = derive_key(queue, payload)?;

        self.store.set(key.as_str(), LOCK_VALUE).await?;
        count_op(queue, "set");
        // SET already cleared any expiry, so NO_TTL needs no second round-trip.
        if desc.ttl_on_enqueue != NO_TTL {
            self.store.expire(key.as_str(), desc.ttl_on_enqueue).await?;
            count_op(queue, "expire");
        }

        debug!(%key, ttl = desc.ttl_on_enqueue, "lock set");
        Ok(())
    }

    /// Take the lock only if nobody holds it. Returns true if this caller
    /// may enqueue. Non-unique payloads always may, without store access.
    pub async fn try_mark_queued(&self, queue: &str, payload: &JobPayload) -> Result<bool> {
        let desc = classify(&self.registry, payload);
        if !desc.is_unique {
            return Ok(true);
        }
        let key = derive_key(queue, payload)?;
        let ttl = desc.ttl_on_enqueue;

        // SET ... EX rejects non-positive ttls; those go through EXPIRE like
        // `mark_queued`, which drops the lock right away.
        let ex = (ttl > 0).then_some(ttl);
        let acquired = self.store.set_if_absent(key.as_str(), LOCK_VALUE, ex).await?;
        count_op(queue, "set");
        if acquired && ttl != NO_TTL && ttl <= 0 {
            self.store.expire(key.as_str(), ttl).await?;
            count_op(queue, "expire");
        }
        debug!(%key, acquired, "conditional lock set");
        Ok(acquired)
    }

    /// Release the lock for a job leaving the queue.
    ///
    /// With a grace period the lock is left to expire after that many
    /// seconds; otherwise it is deleted now. Accepts a payload or a job record.
    pub async fn mark_unqueued<J>(&self, queue: &str, job: &J) -> Result<()>
    where
        J: AsPayload + Sync + ?Sized,
    {
        self.release(queue, job.payload()).await.map(|_| ())
    }

    /// Shared body of `mark_unqueued`. Returns whether the payload was unique.
    async fn release(&self, queue: &str, payload: &JobPayload) -> Result<bool> {
        let desc = classify(&self.registry, payload);
        if !desc.is_unique {
            return Ok(false);
        }
        let key = derive_key(queue, payload)?;

        if desc.grace_ttl_after_completion != RELEASE_IMMEDIATELY {
            self.store
                .expire(key.as_str(), desc.grace_ttl_after_completion)
                .await?;
            count_op(queue, "expire");
            debug!(%key, grace = desc.grace_ttl_after_completion, "lock entering grace window");
        } else {
            self.store.del(&[key.as_str().to_string()]).await?;
            count_op(queue, "delete");
            debug!(%key, "lock deleted");
        }
        Ok(true)
    }

    /// Inspect the lock for a payload without changing it.
    pub async fn lock_state(&self, queue: &str, payload: &JobPayload) -> Result<LockState> {
        if !classify(&self.registry, payload).is_unique {
            return Ok(LockState::Absent);
        }
        let key = derive_key(queue, payload)?;
        Ok(LockState::from_ttl(self.store.ttl(key.as_str()).await?))
    }

    /// Delete every lock under the queue's prefix, whatever its state.
    ///
    /// Only for full queue resets: jobs still sitting in the queue lose
    /// their locks too.
    pub async fn cleanup_all(&self, queue: &str) -> Result<usize> {
        let span = start_lock_span("cleanup_all", queue);
        self.delete_queue_keys(queue).instrument(span).await
    }

    async fn delete_queue_keys(&self, queue: &str) -> Result<usize> {
        let keys = self.store.keys(&queue_pattern(queue)).await?;
        let removed = if keys.is_empty() {
            0
        } else {
            count_op(queue, "cleanup");
            self.store.del(&keys).await? as usize
        };
        record_released(&tracing::Span::current(), removed);
        info!(queue, removed, "cleared queue locks");
        Ok(removed)
    }
}

impl<S: LockStore + QueueBacklog> LockManager<S> {
    /// Release locks for every backlog entry of `job_type` whose args equal
    /// `match_args` exactly (any args if `match_args` is empty).
    ///
    /// Walks the whole backing list. Entries stay in the queue; removing
    /// them is the framework's job. Returns the number of locks released.
    pub async fn destroy_matching_queued(
        &self,
        queue: &str,
        job_type: &str,
        match_args: &[Value],
    ) -> Result<usize> {
        let span = start_lock_span("destroy_matching_queued", queue);
        self.release_matching(queue, job_type, match_args)
            .instrument(span)
            .await
    }

    async fn release_matching(
        &self,
        queue: &str,
        job_type: &str,
        match_args: &[Value],
    ) -> Result<usize> {
        let mut released = 0;
        for raw in self.store.entries(queue).await? {
            let payload: JobPayload = match serde_json::from_str(&raw) {
                Ok(p) => p,
                Err(e) => {
                    warn!(queue, error = %e, "skipping undecodable queue entry");
                    continue;
                }
            };
            if payload.job_type != job_type {
                continue;
            }
            if !match_args.is_empty() && payload.args_list() != Some(match_args) {
                continue;
            }
            match self.release(queue, &payload).await {
                Ok(true) => released += 1,
                Ok(false) => {}
                Err(Error::MalformedPayload(reason)) => {
                    warn!(queue, %reason, "skipping entry without a lock key");
                }
                Err(e) => return Err(e),
            }
        }
        record_released(&tracing::Span::current(), released);
        info!(queue, job_type, released, "released matching queue locks");
        Ok(released)
    }
}
