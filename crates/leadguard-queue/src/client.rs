use std::time::Duration;

use chrono::Utc;
use leadguard_core::{DlqEntry, Job};
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use tracing::{info, warn};

use crate::config::QueueConfig;
use crate::error::QueueError;

/// A job handed to a worker, with enough context to ack or fail it later.
#[derive(Debug, Clone)]
pub struct LeasedJob {
    pub queue: String,
    pub job: Job,
}

/// Durable, Redis-backed queue client implementing at-least-once delivery
/// with exponential-backoff retry and DLQ routing (spec.md §4.1).
///
/// Keys follow a `bull:<queue>:...` layout: a `wait` list of ready job ids,
/// an `active` list of leased-but-unacked job ids, a `delayed` sorted set
/// (score = ready-at epoch millis) for backoff retries, and a `jobs` hash
/// holding each job's serialized envelope. The dead-letter queue reuses the
/// same layout under the queue name suffixed `-dlq`.
#[derive(Clone)]
pub struct QueueClient {
    conn: ConnectionManager,
    config: QueueConfig,
}

impl QueueClient {
    pub async fn connect(config: QueueConfig) -> Result<Self, QueueError> {
        let client = redis::Client::open(config.redis_url.clone())?;
        let conn = ConnectionManager::new(client).await?;
        Ok(Self { conn, config })
    }

    pub fn config(&self) -> &QueueConfig {
        &self.config
    }

    fn wait_key(queue: &str) -> String {
        format!("bull:{queue}:wait")
    }

    fn active_key(queue: &str) -> String {
        format!("bull:{queue}:active")
    }

    fn delayed_key(queue: &str) -> String {
        format!("bull:{queue}:delayed")
    }

    fn job_key(queue: &str, job_id: &str) -> String {
        format!("bull:{queue}:jobs:{job_id}")
    }

    fn dlq_name(queue: &str) -> String {
        format!("{queue}-dlq")
    }

    /// Enqueue `job` for immediate processing. Returns the job id.
    pub async fn enqueue(&self, queue: &str, job: &Job) -> Result<String, QueueError> {
        if queue.is_empty() {
            return Err(QueueError::EmptyQueueName);
        }
        let mut conn = self.conn.clone();
        let payload = serde_json::to_string(job)?;
        let _: () = conn.set(Self::job_key(queue, &job.job_id), payload).await?;
        let _: () = conn.rpush(Self::wait_key(queue), &job.job_id).await?;
        info!(queue, job_id = %job.job_id, lead_id = job.lead_id, "job enqueued");
        Ok(job.job_id.clone())
    }

    /// Move any delayed jobs whose backoff has elapsed back onto the wait list.
    async fn promote_delayed(&self, queue: &str) -> Result<(), QueueError> {
        let mut conn = self.conn.clone();
        let now_ms = Utc::now().timestamp_millis();
        let ready: Vec<String> = conn
            .zrangebyscore(Self::delayed_key(queue), f64::MIN, now_ms as f64)
            .await?;
        for job_id in ready {
            let _: () = conn.zrem(Self::delayed_key(queue), &job_id).await?;
            let _: () = conn.rpush(Self::wait_key(queue), &job_id).await?;
        }
        Ok(())
    }

    /// Block up to `poll_timeout` waiting for a job to become ready, atomically
    /// moving it onto the active list. Returns `None` on timeout so callers
    /// can loop and check a cancellation token between polls.
    pub async fn lease(&self, queue: &str) -> Result<Option<LeasedJob>, QueueError> {
        self.promote_delayed(queue).await?;
        let mut conn = self.conn.clone();
        let job_id: Option<String> = conn
            .blmove(
                Self::wait_key(queue),
                Self::active_key(queue),
                redis::Direction::Left,
                redis::Direction::Right,
                self.config.poll_timeout.as_secs_f64(),
            )
            .await?;
        let Some(job_id) = job_id else {
            return Ok(None);
        };
        let raw: Option<String> = conn.get(Self::job_key(queue, &job_id)).await?;
        let Some(raw) = raw else {
            // Job hash expired or was removed out from under the active list;
            // drop the dangling id rather than leasing a phantom job.
            let _: () = conn.lrem(Self::active_key(queue), 1, &job_id).await?;
            return Ok(None);
        };
        let job: Job = serde_json::from_str(&raw)?;
        Ok(Some(LeasedJob {
            queue: queue.to_string(),
            job,
        }))
    }

    /// Acknowledge successful processing: drop the job from the active list
    /// and delete its envelope.
    pub async fn ack(&self, leased: &LeasedJob) -> Result<(), QueueError> {
        let mut conn = self.conn.clone();
        let _: () = conn
            .lrem(Self::active_key(&leased.queue), 1, &leased.job.job_id)
            .await?;
        let _: () = conn.del(Self::job_key(&leased.queue, &leased.job.job_id)).await?;
        Ok(())
    }

    /// Report a failed attempt. Requeues with exponential backoff if attempts
    /// remain, otherwise routes the job to the dead-letter queue.
    pub async fn fail(&self, leased: LeasedJob, error: impl Into<String>) -> Result<FailOutcome, QueueError> {
        self.fail_with_min_delay(leased, error, Duration::ZERO).await
    }

    /// Same as [`Self::fail`], but the retry is scheduled no sooner than
    /// `min_delay` even if the computed exponential backoff would be
    /// shorter (spec.md §7: a `RATE_LIMITED` outcome "honours `retryAfter`
    /// as minimum delay"). Has no effect once attempts are exhausted —
    /// exhausted jobs go to the DLQ regardless of `min_delay`.
    pub async fn fail_with_min_delay(
        &self,
        mut leased: LeasedJob,
        error: impl Into<String>,
        min_delay: Duration,
    ) -> Result<FailOutcome, QueueError> {
        let error = error.into();
        let mut conn = self.conn.clone();
        let _: () = conn
            .lrem(Self::active_key(&leased.queue), 1, &leased.job.job_id)
            .await?;

        leased.job.attempt += 1;
        leased.job.last_error = Some(error.clone());

        if leased.job.exhausted() {
            let dlq_queue = Self::dlq_name(&leased.queue);
            let entry = DlqEntry {
                original_job_id: leased.job.job_id.clone(),
                lead_id: leased.job.lead_id,
                error,
                attempts_made: leased.job.attempt,
                failed_at: Utc::now(),
            };
            let payload = serde_json::to_string(&entry)?;
            let _: () = conn
                .set(Self::job_key(&dlq_queue, &entry.original_job_id), payload)
                .await?;
            let _: () = conn
                .rpush(Self::wait_key(&dlq_queue), &entry.original_job_id)
                .await?;
            let _: () = conn.del(Self::job_key(&leased.queue, &leased.job.job_id)).await?;
            warn!(
                queue = %leased.queue,
                job_id = %leased.job.job_id,
                lead_id = leased.job.lead_id,
                attempts = leased.job.attempt,
                "job attempts exhausted, routed to DLQ"
            );
            return Ok(FailOutcome::DeadLettered(entry));
        }

        let delay = self.backoff_delay(leased.job.attempt).max(min_delay);
        let ready_at_ms = (Utc::now() + chrono::Duration::from_std(delay).unwrap_or_default()).timestamp_millis();
        let payload = serde_json::to_string(&leased.job)?;
        let _: () = conn
            .set(Self::job_key(&leased.queue, &leased.job.job_id), payload)
            .await?;
        let _: () = conn
            .zadd(Self::delayed_key(&leased.queue), &leased.job.job_id, ready_at_ms as f64)
            .await?;
        warn!(
            queue = %leased.queue,
            job_id = %leased.job.job_id,
            attempt = leased.job.attempt,
            delay_secs = delay.as_secs(),
            "job failed, scheduled for retry"
        );
        Ok(FailOutcome::Retrying {
            attempt: leased.job.attempt,
            delay,
        })
    }

    fn backoff_delay(&self, attempt: u32) -> Duration {
        let factor = 2u64.saturating_pow(attempt.saturating_sub(1));
        let candidate = self.config.base_retry_delay.saturating_mul(factor as u32);
        candidate.min(self.config.max_retry_delay)
    }

    /// Number of jobs pending, in-flight, or scheduled for retry.
    pub async fn queue_depth(&self, queue: &str) -> Result<u64, QueueError> {
        let mut conn = self.conn.clone();
        let wait: u64 = conn.llen(Self::wait_key(queue)).await?;
        let active: u64 = conn.llen(Self::active_key(queue)).await?;
        let delayed: u64 = conn.zcard(Self::delayed_key(queue)).await?;
        Ok(wait + active + delayed)
    }

    /// Number of jobs parked in the dead-letter queue for `queue`.
    pub async fn dlq_depth(&self, queue: &str) -> Result<u64, QueueError> {
        let mut conn = self.conn.clone();
        conn.llen(Self::wait_key(&Self::dlq_name(queue)))
            .await
            .map_err(QueueError::from)
    }

    /// Block up to `poll_timeout` waiting for a dead-lettered entry on
    /// `queue`'s DLQ, atomically removing it. Used by the standalone DLQ
    /// processor, which has no further retries to offer and simply drains
    /// entries to terminal bookkeeping.
    pub async fn lease_dlq(&self, queue: &str) -> Result<Option<DlqEntry>, QueueError> {
        let dlq_queue = Self::dlq_name(queue);
        let mut conn = self.conn.clone();
        let job_id: Option<String> = conn
            .blpop(Self::wait_key(&dlq_queue), self.config.poll_timeout.as_secs_f64())
            .await?
            .map(|(_key, id): (String, String)| id);
        let Some(job_id) = job_id else {
            return Ok(None);
        };
        let raw: Option<String> = conn.get(Self::job_key(&dlq_queue, &job_id)).await?;
        let _: () = conn.del(Self::job_key(&dlq_queue, &job_id)).await?;
        match raw {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }
}

#[derive(Debug, Clone)]
pub enum FailOutcome {
    Retrying { attempt: u32, delay: Duration },
    DeadLettered(DlqEntry),
}
