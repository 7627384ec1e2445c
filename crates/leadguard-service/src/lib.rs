//! External-collaborator surface for the lead pipeline (spec.md §6, §9):
//! HTTP ingress, CLI, configuration, secrets, and metrics wiring. None of
//! the core domain logic lives here — this crate only assembles the
//! `leadguard-*` component crates behind a runnable binary, in the style
//! of `ibank-service`'s `ServiceState`/`build_router` split.

#![forbid(unsafe_code)]

pub mod config;
pub mod ingress;
pub mod metrics_exporter;
pub mod secrets;

use std::sync::Arc;

use leadguard_core::{LeadRepository, SyncLogRepository};
use leadguard_queue::QueueClient;
use leadguard_worker::{McpOrchestrator, WorkerConfig};

pub use config::{Cli, CrmProviderKind};
pub use ingress::{build_router, ApiError};

/// Shared application state threaded through every Axum handler.
#[derive(Clone)]
pub struct ServiceState {
    pub lead_repo: Arc<dyn LeadRepository>,
    pub sync_log: Arc<dyn SyncLogRepository>,
    pub queue: QueueClient,
    pub orchestrator: Arc<McpOrchestrator>,
    pub worker_config: WorkerConfig,
}
