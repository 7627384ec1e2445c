use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::ToolError;
use crate::params::*;

/// Result returned by every executor call (spec.md §4.4).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrmResult {
    pub success: bool,
    pub data: Option<serde_json::Value>,
    pub error: Option<String>,
    pub crm_record_id: Option<String>,
    pub warnings: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_after: Option<Duration>,
    pub mock: bool,
}

impl CrmResult {
    pub fn ok(crm_record_id: impl Into<String>, mock: bool) -> Self {
        Self {
            success: true,
            data: None,
            error: None,
            crm_record_id: Some(crm_record_id.into()),
            warnings: Vec::new(),
            retry_after: None,
            mock,
        }
    }

    pub fn with_data(mut self, data: serde_json::Value) -> Self {
        self.data = Some(data);
        self
    }

    pub fn failed(error: impl Into<String>, mock: bool) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error.into()),
            crm_record_id: None,
            warnings: Vec::new(),
            retry_after: None,
            mock,
        }
    }

    /// True if this result reflects a client (4xx) fault: non-retryable by
    /// the circuit breaker, a non-critical action failure unless the
    /// action was marked critical (spec.md §7).
    pub fn is_client_fault(&self) -> bool {
        !self.success
            && self
                .error
                .as_deref()
                .map(|e| e.starts_with("client_error:"))
                .unwrap_or(false)
    }
}

/// One method per required tool (spec.md §4.4). Every conforming executor
/// (mock or real) implements the full surface so the registry can dispatch
/// uniformly regardless of `CRM_PROVIDER`.
#[async_trait]
pub trait CrmExecutor: Send + Sync {
    /// Stable identifier for this executor, used as the circuit-breaker and
    /// CRM-bucket scope key (e.g. `"mock"`, `"salesforce"`).
    fn provider(&self) -> &'static str;

    async fn create_lead(&self, params: &CreateLeadParams) -> Result<CrmResult, ToolError>;
    async fn upsert_lead(&self, params: &UpsertLeadParams) -> Result<CrmResult, ToolError>;
    async fn convert_lead(&self, params: &ConvertLeadParams) -> Result<CrmResult, ToolError>;
    async fn update_lead_status(&self, params: &UpdateLeadStatusParams) -> Result<CrmResult, ToolError>;
    async fn update_lead_fields(&self, params: &UpdateLeadFieldsParams) -> Result<CrmResult, ToolError>;
    async fn set_lead_score(&self, params: &SetLeadScoreParams) -> Result<CrmResult, ToolError>;
    async fn match_account(&self, params: &MatchAccountParams) -> Result<CrmResult, ToolError>;
    async fn create_contact(&self, params: &CreateContactParams) -> Result<CrmResult, ToolError>;
    async fn link_contact_to_account(
        &self,
        params: &LinkContactToAccountParams,
    ) -> Result<CrmResult, ToolError>;
    async fn create_opportunity(&self, params: &CreateOpportunityParams) -> Result<CrmResult, ToolError>;
    async fn update_opportunity_stage(
        &self,
        params: &UpdateOpportunityStageParams,
    ) -> Result<CrmResult, ToolError>;
    async fn set_opportunity_value(
        &self,
        params: &SetOpportunityValueParams,
    ) -> Result<CrmResult, ToolError>;
    async fn attach_campaign(&self, params: &AttachCampaignParams) -> Result<CrmResult, ToolError>;
    async fn create_task(&self, params: &CreateTaskParams) -> Result<CrmResult, ToolError>;
    async fn log_activity(&self, params: &LogActivityParams) -> Result<CrmResult, ToolError>;
    async fn add_note(&self, params: &AddNoteParams) -> Result<CrmResult, ToolError>;
    async fn create_follow_up(&self, params: &CreateFollowUpParams) -> Result<CrmResult, ToolError>;
    async fn sync_firmographics(&self, params: &SyncFirmographicsParams) -> Result<CrmResult, ToolError>;
}
