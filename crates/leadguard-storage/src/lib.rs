//! Explicit data-access boundary implementations for the lead pipeline
//! (spec.md §9: "Decorator-driven entity persistence -> explicit
//! data-access boundary"). The core crates depend only on
//! `leadguard_core::{LeadRepository, SyncLogRepository}`; this crate is
//! the only place that knows about SQL.

#![forbid(unsafe_code)]

pub mod codec;
pub mod error;
pub mod memory;
pub mod postgres;

pub use error::StorageError;
pub use memory::{InMemoryLeadStore, InMemorySyncLogStore};
pub use postgres::PostgresStore;
