//! Explicit data-access boundary. Downstream crates depend on these
//! traits, never on a concrete ORM or query builder; `leadguard-storage`
//! is the only crate that implements them.

use async_trait::async_trait;

use crate::error::LeadError;
use crate::types::{CrmSyncLog, Lead};

#[async_trait]
pub trait LeadRepository: Send + Sync {
    async fn find_by_id(&self, id: i64) -> Result<Option<Lead>, LeadError>;
    async fn find_by_idempotency_key(&self, key: &str) -> Result<Option<Lead>, LeadError>;
    /// Insert a new lead or update an existing one (keyed on `lead.id`,
    /// with `id == 0` meaning "not yet persisted"). Assigns and returns the
    /// persisted id.
    async fn save(&self, lead: &mut Lead) -> Result<i64, LeadError>;
}

#[async_trait]
pub trait SyncLogRepository: Send + Sync {
    /// Append one audit row. Returns the assigned row id.
    async fn record(&self, entry: CrmSyncLog) -> Result<i64, LeadError>;
}
