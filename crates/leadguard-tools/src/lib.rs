//! Tool Registry & Executor Layer (spec.md §4.4): registered tools with
//! schema-validated parameters, dispatched to a provider-selected executor.
//!
//! This crate owns tool metadata, parameter schemas, and the two
//! conforming executor variants (mock and a Salesforce-style real
//! implementation). It does not itself apply safety checks, rate limits,
//! circuit breakers, or idempotency — those live in `leadguard-guard` and
//! are composed around this layer by `leadguard-worker`'s orchestrator.

#![forbid(unsafe_code)]

pub mod error;
pub mod executor;
pub mod mock;
pub mod params;
pub mod registry;
pub mod salesforce;
pub mod sanitize;
pub mod schema;

pub use error::ToolError;
pub use executor::{CrmExecutor, CrmResult};
pub use mock::MockCrmExecutor;
pub use params::{ToolCategory, ToolName};
pub use registry::{ToolDefinition, ToolRegistry};
pub use salesforce::{SalesforceConfig, SalesforceExecutor};
