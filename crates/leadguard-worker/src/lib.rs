//! Lead worker/orchestrator (spec.md §4.5): consumes jobs from the durable
//! queue, drives the AI collaborator and grounding validator, then executes
//! the resulting action plan through the MCP safety/quota core and tool
//! registry.

#![forbid(unsafe_code)]

pub mod config;
pub mod dlq;
pub mod error;
pub mod metrics;
pub mod orchestrator;
pub mod plan;
pub mod providers;
pub mod worker;

pub use config::WorkerConfig;
pub use dlq::DlqProcessor;
pub use error::WorkerError;
pub use orchestrator::{McpOrchestrator, McpOutcome};
pub use plan::{ActionPlanBuilder, PlannedAction};
pub use providers::{AiAnalysisRequest, AiProvider, EnrichmentProvider, MockAiProvider, StaticEnrichmentProvider};
pub use worker::Worker;
