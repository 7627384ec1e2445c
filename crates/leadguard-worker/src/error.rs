use thiserror::Error;

/// Shared error type for the worker/orchestrator crate.
#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("lead not found: {0}")]
    LeadNotFound(i64),

    #[error("AI provider failed: {0}")]
    AiProvider(String),

    #[error("enrichment provider failed: {0}")]
    Enrichment(String),

    #[error("tool execution error: {0}")]
    Tool(#[from] leadguard_tools::ToolError),

    #[error("lead domain error: {0}")]
    Lead(#[from] leadguard_core::LeadError),

    #[error("queue error: {0}")]
    Queue(#[from] leadguard_queue::QueueError),

    #[error("job timed out after {0:?}")]
    Timeout(std::time::Duration),
}
