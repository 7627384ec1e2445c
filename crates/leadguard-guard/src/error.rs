use thiserror::Error;

#[derive(Debug, Error)]
pub enum GuardError {
    #[error("redis backend error: {0}")]
    Backend(#[from] redis::RedisError),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
