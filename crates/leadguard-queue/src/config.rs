use std::time::Duration;

/// Connection and retry tuning for a [`crate::QueueClient`].
#[derive(Debug, Clone)]
pub struct QueueConfig {
    pub redis_url: String,
    /// Base delay for exponential backoff between retry attempts.
    pub base_retry_delay: Duration,
    /// Upper bound on a single backoff delay, regardless of attempt count.
    pub max_retry_delay: Duration,
    /// Default lease duration granted to a worker that dequeues a job.
    pub lease_duration: Duration,
    /// How long `lease` blocks waiting for a job before returning `None`.
    pub poll_timeout: Duration,
}

impl QueueConfig {
    pub fn from_url(redis_url: impl Into<String>) -> Self {
        Self {
            redis_url: redis_url.into(),
            base_retry_delay: Duration::from_secs(2),
            max_retry_delay: Duration::from_secs(300),
            lease_duration: Duration::from_secs(60),
            poll_timeout: Duration::from_secs(5),
        }
    }
}
