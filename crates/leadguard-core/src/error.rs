use thiserror::Error;

/// Shared error type for the lead pipeline core domain.
#[derive(Debug, Error)]
pub enum LeadError {
    #[error("lead not found: {0}")]
    NotFound(String),

    #[error("invalid status transition: {from} -> {to}")]
    InvalidTransition { from: String, to: String },

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("persistence error: {0}")]
    Storage(String),
}

impl From<serde_json::Error> for LeadError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}
