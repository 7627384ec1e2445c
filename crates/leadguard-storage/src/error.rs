use thiserror::Error;
use leadguard_core::LeadError;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("postgres error: {0}")]
    Postgres(#[from] sqlx::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("decode error for column '{column}': {message}")]
    Decode { column: &'static str, message: String },
}

impl From<StorageError> for LeadError {
    fn from(err: StorageError) -> Self {
        LeadError::Storage(err.to_string())
    }
}
