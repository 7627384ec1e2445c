use async_trait::async_trait;
use leadguard_core::{CrmSyncLog, Lead, LeadError, LeadRepository, SyncLogRepository};
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Row};
use tracing::info;

use crate::codec::{from_db_str, to_db_str};
use crate::error::StorageError;

/// PostgreSQL-backed data-access boundary for `Lead` and `CrmSyncLog`
/// (spec.md §9: "Decorator-driven entity persistence -> explicit
/// data-access boundary"). Writes are single-row and transactionless, as
/// the invariants in spec.md §5 require no multi-row consistency.
#[derive(Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self, StorageError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections.max(1))
            .connect(database_url)
            .await?;
        Ok(Self { pool })
    }

    /// Create the `leads` and `crm_sync_log` tables if they do not already
    /// exist. Runtime DDL rather than a build-time `sqlx migrate` step, so
    /// a fresh checkout doesn't need a running database to compile.
    pub async fn ensure_schema(&self) -> Result<(), StorageError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS leads (
                id BIGSERIAL PRIMARY KEY,
                idempotency_key TEXT NOT NULL UNIQUE,
                email TEXT NOT NULL,
                campaign_id TEXT NOT NULL,
                name TEXT NULL,
                enrichment_data JSONB NULL,
                status TEXT NOT NULL,
                fit_score SMALLINT NULL,
                intent TEXT NULL,
                reasoning TEXT NULL,
                evidence JSONB NOT NULL DEFAULT '[]',
                grounding_status TEXT NULL,
                grounding_errors JSONB NOT NULL DEFAULT '[]',
                created_at TIMESTAMPTZ NOT NULL,
                updated_at TIMESTAMPTZ NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS crm_sync_log (
                id BIGSERIAL PRIMARY KEY,
                action TEXT NOT NULL,
                entity_type TEXT NOT NULL,
                entity_id TEXT NULL,
                params JSONB NOT NULL,
                result TEXT NOT NULL,
                mcp_execution_id TEXT NOT NULL,
                idempotency_key TEXT NULL,
                mock BOOLEAN NOT NULL,
                lead_id BIGINT NULL,
                duration_ms BIGINT NOT NULL,
                error_message TEXT NULL,
                timestamp TIMESTAMPTZ NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_crm_sync_log_execution_id ON crm_sync_log (mcp_execution_id)",
        )
        .execute(&self.pool)
        .await?;

        info!("leadguard schema ensured");
        Ok(())
    }

    fn row_to_lead(row: &sqlx::postgres::PgRow) -> Result<Lead, StorageError> {
        let status_str: String = row.try_get("status").map_err(decode_err("status"))?;
        let intent_str: Option<String> = row.try_get("intent").map_err(decode_err("intent"))?;
        let grounding_str: Option<String> =
            row.try_get("grounding_status").map_err(decode_err("grounding_status"))?;
        let fit_score: Option<i16> = row.try_get("fit_score").map_err(decode_err("fit_score"))?;
        let evidence_json: serde_json::Value = row.try_get("evidence").map_err(decode_err("evidence"))?;
        let grounding_errors_json: serde_json::Value =
            row.try_get("grounding_errors").map_err(decode_err("grounding_errors"))?;
        let enrichment_json: Option<serde_json::Value> =
            row.try_get("enrichment_data").map_err(decode_err("enrichment_data"))?;

        Ok(Lead {
            id: row.try_get("id").map_err(decode_err("id"))?,
            idempotency_key: row.try_get("idempotency_key").map_err(decode_err("idempotency_key"))?,
            email: row.try_get("email").map_err(decode_err("email"))?,
            campaign_id: row.try_get("campaign_id").map_err(decode_err("campaign_id"))?,
            name: row.try_get("name").map_err(decode_err("name"))?,
            enrichment_data: enrichment_json.map(serde_json::from_value).transpose()?,
            status: from_db_str(&status_str)?,
            fit_score: fit_score.map(|v| v as u8),
            intent: intent_str.map(|s| from_db_str(&s)).transpose()?,
            reasoning: row.try_get("reasoning").map_err(decode_err("reasoning"))?,
            evidence: serde_json::from_value(evidence_json)?,
            grounding_status: grounding_str.map(|s| from_db_str(&s)).transpose()?,
            grounding_errors: serde_json::from_value(grounding_errors_json)?,
            created_at: row.try_get("created_at").map_err(decode_err("created_at"))?,
            updated_at: row.try_get("updated_at").map_err(decode_err("updated_at"))?,
        })
    }
}

fn decode_err(column: &'static str) -> impl Fn(sqlx::Error) -> StorageError {
    move |err| StorageError::Decode {
        column,
        message: err.to_string(),
    }
}

#[async_trait]
impl LeadRepository for PostgresStore {
    async fn find_by_id(&self, id: i64) -> Result<Option<Lead>, LeadError> {
        let row = sqlx::query("SELECT * FROM leads WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(StorageError::from)?;
        row.map(|r| Self::row_to_lead(&r)).transpose().map_err(Into::into)
    }

    async fn find_by_idempotency_key(&self, key: &str) -> Result<Option<Lead>, LeadError> {
        let row = sqlx::query("SELECT * FROM leads WHERE idempotency_key = $1")
            .bind(key)
            .fetch_optional(&self.pool)
            .await
            .map_err(StorageError::from)?;
        row.map(|r| Self::row_to_lead(&r)).transpose().map_err(Into::into)
    }

    async fn save(&self, lead: &mut Lead) -> Result<i64, LeadError> {
        let status = to_db_str(&lead.status).map_err(StorageError::from)?;
        let intent = lead.intent.map(|v| to_db_str(&v)).transpose().map_err(StorageError::from)?;
        let grounding_status = lead
            .grounding_status
            .map(|v| to_db_str(&v))
            .transpose()
            .map_err(StorageError::from)?;
        let evidence = serde_json::to_value(&lead.evidence).map_err(StorageError::from)?;
        let grounding_errors = serde_json::to_value(&lead.grounding_errors).map_err(StorageError::from)?;
        let enrichment = lead
            .enrichment_data
            .as_ref()
            .map(serde_json::to_value)
            .transpose()
            .map_err(StorageError::from)?;

        if lead.id == 0 {
            let row = sqlx::query(
                r#"
                INSERT INTO leads (
                    idempotency_key, email, campaign_id, name, enrichment_data, status,
                    fit_score, intent, reasoning, evidence, grounding_status, grounding_errors,
                    created_at, updated_at
                )
                VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11,$12,$13,$14)
                ON CONFLICT (idempotency_key) DO NOTHING
                RETURNING id
                "#,
            )
            .bind(&lead.idempotency_key)
            .bind(&lead.email)
            .bind(&lead.campaign_id)
            .bind(&lead.name)
            .bind(&enrichment)
            .bind(&status)
            .bind(lead.fit_score.map(|v| v as i16))
            .bind(&intent)
            .bind(&lead.reasoning)
            .bind(&evidence)
            .bind(&grounding_status)
            .bind(&grounding_errors)
            .bind(lead.created_at)
            .bind(lead.updated_at)
            .fetch_optional(&self.pool)
            .await
            .map_err(StorageError::from)?;

            let id = match row {
                Some(row) => row.try_get::<i64, _>("id").map_err(decode_err("id")).map_err(StorageError::from)?,
                None => {
                    // Invariant 1: a second ingest of the same (email, campaignId)
                    // returns the existing record unchanged.
                    let existing = self.find_by_idempotency_key(&lead.idempotency_key).await?;
                    existing.map(|l| l.id).ok_or_else(|| {
                        LeadError::Storage("idempotency conflict but no existing row found".to_string())
                    })?
                }
            };
            lead.id = id;
            Ok(id)
        } else {
            sqlx::query(
                r#"
                UPDATE leads SET
                    name = $1, enrichment_data = $2, status = $3, fit_score = $4, intent = $5,
                    reasoning = $6, evidence = $7, grounding_status = $8, grounding_errors = $9,
                    updated_at = $10
                WHERE id = $11
                "#,
            )
            .bind(&lead.name)
            .bind(&enrichment)
            .bind(&status)
            .bind(lead.fit_score.map(|v| v as i16))
            .bind(&intent)
            .bind(&lead.reasoning)
            .bind(&evidence)
            .bind(&grounding_status)
            .bind(&grounding_errors)
            .bind(lead.updated_at)
            .bind(lead.id)
            .execute(&self.pool)
            .await
            .map_err(StorageError::from)?;
            Ok(lead.id)
        }
    }
}

#[async_trait]
impl SyncLogRepository for PostgresStore {
    async fn record(&self, entry: CrmSyncLog) -> Result<i64, LeadError> {
        let row = sqlx::query(
            r#"
            INSERT INTO crm_sync_log (
                action, entity_type, entity_id, params, result, mcp_execution_id,
                idempotency_key, mock, lead_id, duration_ms, error_message, timestamp
            )
            VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11,$12)
            RETURNING id
            "#,
        )
        .bind(&entry.action)
        .bind(&entry.entity_type)
        .bind(&entry.entity_id)
        .bind(&entry.params)
        .bind(&entry.result)
        .bind(&entry.mcp_execution_id)
        .bind(&entry.idempotency_key)
        .bind(entry.mock)
        .bind(entry.lead_id)
        .bind(entry.duration_ms as i64)
        .bind(&entry.error_message)
        .bind(entry.timestamp)
        .fetch_one(&self.pool)
        .await
        .map_err(StorageError::from)?;

        row.try_get::<i64, _>("id")
            .map_err(decode_err("id"))
            .map_err(LeadError::from)
    }
}
