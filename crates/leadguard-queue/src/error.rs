use thiserror::Error;

#[derive(Debug, Error)]
pub enum QueueError {
    #[error("redis connection error: {0}")]
    Connection(#[from] redis::RedisError),

    #[error("failed to serialize job envelope: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("job {0} not found in active set (lease expired or already acked)")]
    UnknownLease(String),

    #[error("queue name must not be empty")]
    EmptyQueueName,
}
