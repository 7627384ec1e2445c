//! Shared data model for the lead ingestion and enrichment pipeline.
//!
//! This crate has no I/O of its own: it defines the Lead/Evidence/AnalysisResult
//! value types, the lead lifecycle state machine, and the idempotency key
//! derivation shared by every other crate in the workspace.

#![forbid(unsafe_code)]

pub mod error;
pub mod repository;
pub mod types;

pub use error::LeadError;
pub use repository::{LeadRepository, SyncLogRepository};
pub use types::{
    compute_lead_idempotency_key, AnalysisResult, ClaimType, CrmSyncLog, Decision, DlqEntry,
    EnrichmentData, Evidence, EvidenceSource, EvidenceValue, GroundingStatus, Intent, Job, Lead,
    LeadStatus,
};
