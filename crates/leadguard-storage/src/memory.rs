//! In-memory implementations of the data-access traits, used by tests and
//! by any deployment that hasn't configured `DATABASE_URL` yet.

use std::sync::atomic::{AtomicI64, Ordering};

use async_trait::async_trait;
use dashmap::DashMap;
use leadguard_core::{CrmSyncLog, Lead, LeadError, LeadRepository, SyncLogRepository};

#[derive(Default)]
pub struct InMemoryLeadStore {
    by_id: DashMap<i64, Lead>,
    by_key: DashMap<String, i64>,
    next_id: AtomicI64,
}

impl InMemoryLeadStore {
    pub fn new() -> Self {
        Self {
            by_id: DashMap::new(),
            by_key: DashMap::new(),
            next_id: AtomicI64::new(1),
        }
    }
}

#[async_trait]
impl LeadRepository for InMemoryLeadStore {
    async fn find_by_id(&self, id: i64) -> Result<Option<Lead>, LeadError> {
        Ok(self.by_id.get(&id).map(|entry| entry.value().clone()))
    }

    async fn find_by_idempotency_key(&self, key: &str) -> Result<Option<Lead>, LeadError> {
        let id = self.by_key.get(key).map(|entry| *entry.value());
        Ok(match id {
            Some(id) => self.by_id.get(&id).map(|entry| entry.value().clone()),
            None => None,
        })
    }

    async fn save(&self, lead: &mut Lead) -> Result<i64, LeadError> {
        if lead.id == 0 {
            if let Some(existing_id) = self.by_key.get(&lead.idempotency_key).map(|e| *e.value()) {
                // Invariant 1: duplicate ingest returns the existing record.
                lead.id = existing_id;
                return Ok(existing_id);
            }
            let id = self.next_id.fetch_add(1, Ordering::SeqCst);
            lead.id = id;
            self.by_key.insert(lead.idempotency_key.clone(), id);
        }
        self.by_id.insert(lead.id, lead.clone());
        Ok(lead.id)
    }
}

#[derive(Default)]
pub struct InMemorySyncLogStore {
    rows: DashMap<i64, CrmSyncLog>,
    next_id: AtomicI64,
}

impl InMemorySyncLogStore {
    pub fn new() -> Self {
        Self {
            rows: DashMap::new(),
            next_id: AtomicI64::new(1),
        }
    }

    pub fn all(&self) -> Vec<CrmSyncLog> {
        let mut rows: Vec<_> = self.rows.iter().map(|entry| entry.value().clone()).collect();
        rows.sort_by_key(|r| r.id);
        rows
    }

    pub fn for_execution(&self, execution_id: &str) -> Vec<CrmSyncLog> {
        self.all()
            .into_iter()
            .filter(|r| r.mcp_execution_id == execution_id)
            .collect()
    }
}

#[async_trait]
impl SyncLogRepository for InMemorySyncLogStore {
    async fn record(&self, mut entry: CrmSyncLog) -> Result<i64, LeadError> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        entry.id = id;
        self.rows.insert(id, entry);
        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use leadguard_core::Lead;

    #[tokio::test]
    async fn save_assigns_id_and_duplicate_key_returns_same_row() {
        let store = InMemoryLeadStore::new();
        let mut lead = Lead::new("a@b.com", "camp-1", None);
        let id = store.save(&mut lead).await.unwrap();
        assert_eq!(id, lead.id);

        let mut duplicate = Lead::new("a@b.com", "camp-1", None);
        let second_id = store.save(&mut duplicate).await.unwrap();
        assert_eq!(second_id, id);
    }

    #[tokio::test]
    async fn find_by_idempotency_key_round_trips() {
        let store = InMemoryLeadStore::new();
        let mut lead = Lead::new("x@y.com", "camp-2", Some("X Y".to_string()));
        store.save(&mut lead).await.unwrap();
        let found = store
            .find_by_idempotency_key(&lead.idempotency_key)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.id, lead.id);
        assert_eq!(found.email, "x@y.com");
    }
}
