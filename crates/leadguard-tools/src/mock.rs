//! Mock executor: simulates latency and generates synthetic record ids,
//! used for local development and tests (spec.md §4.4).

use async_trait::async_trait;
use rand::Rng;
use tokio::time::Duration;

use crate::error::ToolError;
use crate::executor::{CrmExecutor, CrmResult};
use crate::params::*;

/// Deterministic-enough mock CRM. Every call sleeps a random 100-300ms to
/// approximate real network latency, then returns a synthetic, prefixed id
/// in the style of Salesforce's object-type id prefixes.
#[derive(Debug, Clone, Default)]
pub struct MockCrmExecutor;

impl MockCrmExecutor {
    async fn simulate_latency(&self) {
        let millis = rand::thread_rng().gen_range(100..=300);
        tokio::time::sleep(Duration::from_millis(millis)).await;
    }

    fn synthetic_id(prefix: &str) -> String {
        let suffix: String = uuid::Uuid::new_v4().simple().to_string();
        format!("{prefix}{}", &suffix[..15])
    }
}

#[async_trait]
impl CrmExecutor for MockCrmExecutor {
    fn provider(&self) -> &'static str {
        "mock"
    }

    async fn create_lead(&self, _params: &CreateLeadParams) -> Result<CrmResult, ToolError> {
        self.simulate_latency().await;
        Ok(CrmResult::ok(Self::synthetic_id("00Q"), true))
    }

    async fn upsert_lead(&self, _params: &UpsertLeadParams) -> Result<CrmResult, ToolError> {
        self.simulate_latency().await;
        Ok(CrmResult::ok(Self::synthetic_id("00Q"), true))
    }

    async fn convert_lead(&self, _params: &ConvertLeadParams) -> Result<CrmResult, ToolError> {
        self.simulate_latency().await;
        Ok(CrmResult::ok(Self::synthetic_id("001"), true)
            .with_data(serde_json::json!({"account_id": Self::synthetic_id("001")})))
    }

    async fn update_lead_status(&self, params: &UpdateLeadStatusParams) -> Result<CrmResult, ToolError> {
        self.simulate_latency().await;
        Ok(CrmResult::ok(params.lead_id.clone(), true))
    }

    async fn update_lead_fields(&self, params: &UpdateLeadFieldsParams) -> Result<CrmResult, ToolError> {
        self.simulate_latency().await;
        Ok(CrmResult::ok(params.lead_id.clone(), true))
    }

    async fn set_lead_score(&self, params: &SetLeadScoreParams) -> Result<CrmResult, ToolError> {
        self.simulate_latency().await;
        Ok(CrmResult::ok(params.lead_id.clone(), true))
    }

    async fn match_account(&self, _params: &MatchAccountParams) -> Result<CrmResult, ToolError> {
        self.simulate_latency().await;
        Ok(CrmResult::ok(Self::synthetic_id("001"), true))
    }

    async fn create_contact(&self, _params: &CreateContactParams) -> Result<CrmResult, ToolError> {
        self.simulate_latency().await;
        Ok(CrmResult::ok(Self::synthetic_id("003"), true))
    }

    async fn link_contact_to_account(
        &self,
        params: &LinkContactToAccountParams,
    ) -> Result<CrmResult, ToolError> {
        self.simulate_latency().await;
        Ok(CrmResult::ok(params.contact_id.clone(), true))
    }

    async fn create_opportunity(&self, _params: &CreateOpportunityParams) -> Result<CrmResult, ToolError> {
        self.simulate_latency().await;
        Ok(CrmResult::ok(Self::synthetic_id("006"), true))
    }

    async fn update_opportunity_stage(
        &self,
        params: &UpdateOpportunityStageParams,
    ) -> Result<CrmResult, ToolError> {
        self.simulate_latency().await;
        Ok(CrmResult::ok(params.opportunity_id.clone(), true))
    }

    async fn set_opportunity_value(
        &self,
        params: &SetOpportunityValueParams,
    ) -> Result<CrmResult, ToolError> {
        self.simulate_latency().await;
        Ok(CrmResult::ok(params.opportunity_id.clone(), true))
    }

    async fn attach_campaign(&self, params: &AttachCampaignParams) -> Result<CrmResult, ToolError> {
        self.simulate_latency().await;
        Ok(CrmResult::ok(params.entity_id.clone(), true))
    }

    async fn create_task(&self, _params: &CreateTaskParams) -> Result<CrmResult, ToolError> {
        self.simulate_latency().await;
        Ok(CrmResult::ok(Self::synthetic_id("00T"), true))
    }

    async fn log_activity(&self, _params: &LogActivityParams) -> Result<CrmResult, ToolError> {
        self.simulate_latency().await;
        Ok(CrmResult::ok(Self::synthetic_id("00U"), true))
    }

    async fn add_note(&self, _params: &AddNoteParams) -> Result<CrmResult, ToolError> {
        self.simulate_latency().await;
        Ok(CrmResult::ok(Self::synthetic_id("002"), true))
    }

    async fn create_follow_up(&self, _params: &CreateFollowUpParams) -> Result<CrmResult, ToolError> {
        self.simulate_latency().await;
        Ok(CrmResult::ok(Self::synthetic_id("00T"), true))
    }

    async fn sync_firmographics(&self, params: &SyncFirmographicsParams) -> Result<CrmResult, ToolError> {
        self.simulate_latency().await;
        Ok(CrmResult::ok(params.lead_id.clone(), true))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn upsert_lead_returns_synthetic_id() {
        let executor = MockCrmExecutor;
        let result = executor
            .upsert_lead(&UpsertLeadParams {
                email: "a@b.com".to_string(),
                first_name: Some("A".to_string()),
                last_name: Some("B".to_string()),
                company: None,
            })
            .await
            .unwrap();
        assert!(result.success);
        assert!(result.mock);
        assert!(result.crm_record_id.unwrap().starts_with("00Q"));
    }
}
