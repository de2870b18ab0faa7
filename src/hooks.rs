//! Queue mutation hooks: the adapter a queue framework calls at enqueue,
//! reserve/finish and removal time.

use crate::error::Result;
use crate::lock::LockManager;
use crate::model::{JobPayload, QueuedJob};
use crate::store::{LockStore, QueueBacklog};
use crate::telemetry::metrics;
use opentelemetry::KeyValue;
use serde_json::Value;

/// Whether the framework should push the job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnqueueDecision {
    /// Not unique, or no lock held: push it.
    Proceed,
    /// A unique job with the same key is already queued: drop the request.
    Suppressed,
}

/// How `before_enqueue` gates a request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum EnqueueMode {
    /// `is_queued` then `mark_queued`. Two racing producers can both pass.
    #[default]
    CheckThenMark,
    /// A single conditional set decides.
    Atomic,
}

/// When a unique job gives its lock back.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ReleasePoint {
    /// As soon as a worker reserves it.
    #[default]
    OnDequeue,
    /// After it finishes, successfully or not.
    OnCompletion,
}

/// Framework-facing hooks over a [`LockManager`].
pub struct QueueHooks<S> {
    locks: LockManager<S>,
    mode: EnqueueMode,
    release: ReleasePoint,
}

impl<S> Clone for QueueHooks<S> {
    fn clone(&self) -> Self {
        Self {
            locks: self.locks.clone(),
            mode: self.mode,
            release: self.release,
        }
    }
}

impl<S: LockStore> QueueHooks<S> {
    pub fn new(locks: LockManager<S>) -> Self {
        Self {
            locks,
            mode: EnqueueMode::default(),
            release: ReleasePoint::default(),
        }
    }

    pub fn mode(mut self, mode: EnqueueMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn release_point(mut self, release: ReleasePoint) -> Self {
        self.release = release;
        self
    }

    pub fn locks(&self) -> &LockManager<S> {
        &self.locks
    }

    /// Called before a job is pushed. On `Proceed` the lock is already held.
    pub async fn before_enqueue(
        &self,
        queue: &str,
        payload: &JobPayload,
    ) -> Result<EnqueueDecision> {
        let proceed = match self.mode {
            EnqueueMode::CheckThenMark => {
                if self.locks.is_queued(queue, payload).await? {
                    false
                } else {
                    self.locks.mark_queued(queue, payload).await?;
                    true
                }
            }
            EnqueueMode::Atomic => self.locks.try_mark_queued(queue, payload).await?,
        };

        let decision = if proceed {
            EnqueueDecision::Proceed
        } else {
            tracing::info!(queue, job_type = %payload.job_type, "suppressed duplicate enqueue");
            EnqueueDecision::Suppressed
        };
        metrics::enqueue_decisions().add(
            1,
            &[
                KeyValue::new("queue", queue.to_string()),
                KeyValue::new("decision", if proceed { "proceed" } else { "suppressed" }),
            ],
        );
        Ok(decision)
    }

    /// Called when a worker reserves a job.
    pub async fn after_dequeue(&self, job: &QueuedJob) -> Result<()> {
        if self.release == ReleasePoint::OnDequeue {
            self.locks.mark_unqueued(&job.queue, job).await?;
        }
        Ok(())
    }

    /// Called when a job finished successfully.
    pub async fn after_perform(&self, job: &QueuedJob) -> Result<()> {
        self.release_on_completion(job).await
    }

    /// Called when a job raised. Without this a failed job would keep its
    /// lock until the enqueue TTL, if any.
    pub async fn on_failure(&self, job: &QueuedJob) -> Result<()> {
        self.release_on_completion(job).await
    }

    async fn release_on_completion(&self, job: &QueuedJob) -> Result<()> {
        if self.release == ReleasePoint::OnCompletion {
            self.locks.mark_unqueued(&job.queue, job).await?;
        }
        Ok(())
    }

    /// Called when the framework wipes a queue.
    pub async fn on_queue_purged(&self, queue: &str) -> Result<usize> {
        self.locks.cleanup_all(queue).await
    }
}

impl<S: LockStore + QueueBacklog> QueueHooks<S> {
    /// Called when jobs are removed by type (and optionally exact args).
    /// Must run before the framework deletes the entries from its list.
    pub async fn on_destroy(&self, queue: &str, job_type: &str, args: &[Value]) -> Result<usize> {
        self.locks.destroy_matching_queued(queue, job_type, args).await
    }
}
