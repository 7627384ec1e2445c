//! Real executor wrapping a concrete vendor REST API (spec.md §4.4). This
//! is the "real" variant referenced by `CRM_PROVIDER=SALESFORCE`; it
//! sanitises every field value, validates record ids, and builds search
//! queries through the safe builder in [`crate::sanitize`] before any
//! network call is made.

use async_trait::async_trait;
use serde_json::json;

use crate::error::ToolError;
use crate::executor::{CrmExecutor, CrmResult};
use crate::params::*;
use crate::sanitize::{sanitize_field_value, validate_record_id, SearchQueryBuilder};

/// Minimal REST client configuration for a Salesforce-style CRM.
#[derive(Debug, Clone)]
pub struct SalesforceConfig {
    pub base_url: String,
    pub access_token: String,
    pub api_version: String,
}

/// Salesforce-backed executor. Every tool call maps to one `sobjects`
/// REST request; failures distinguish 4xx client faults (non-retryable by
/// the circuit breaker) from 5xx/timeout transient failures (spec.md §7).
pub struct SalesforceExecutor {
    client: reqwest::Client,
    config: SalesforceConfig,
}

impl SalesforceExecutor {
    pub fn new(config: SalesforceConfig) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(std::time::Duration::from_secs(10))
                .build()
                .expect("reqwest client builds with a plain timeout"),
            config,
        }
    }

    fn sobjects_url(&self, object: &str) -> String {
        format!(
            "{}/services/data/{}/sobjects/{object}",
            self.config.base_url.trim_end_matches('/'),
            self.config.api_version
        )
    }

    async fn post_object(
        &self,
        object: &str,
        body: serde_json::Value,
    ) -> Result<CrmResult, ToolError> {
        let response = self
            .client
            .post(self.sobjects_url(object))
            .bearer_auth(&self.config.access_token)
            .json(&body)
            .send()
            .await
            .map_err(|err| ToolError::Transport(err.to_string()))?;

        let status = response.status();
        let payload: serde_json::Value = response
            .json()
            .await
            .unwrap_or_else(|_| json!({"message": "non-json response body"}));

        if status.is_success() {
            let crm_record_id = payload
                .get("id")
                .and_then(|v| v.as_str())
                .unwrap_or_default()
                .to_string();
            Ok(CrmResult::ok(crm_record_id, false).with_data(payload))
        } else if status.is_client_error() {
            Ok(CrmResult::failed(format!("client_error: {status} {payload}"), false))
        } else {
            Ok(CrmResult::failed(format!("server_error: {status} {payload}"), false))
        }
    }

    async fn patch_object(
        &self,
        object: &str,
        record_id: &str,
        body: serde_json::Value,
    ) -> Result<CrmResult, ToolError> {
        validate_record_id(record_id)?;
        let url = format!("{}/{}", self.sobjects_url(object), record_id);
        let response = self
            .client
            .patch(url)
            .bearer_auth(&self.config.access_token)
            .json(&body)
            .send()
            .await
            .map_err(|err| ToolError::Transport(err.to_string()))?;

        let status = response.status();
        if status.is_success() {
            Ok(CrmResult::ok(record_id.to_string(), false))
        } else if status.is_client_error() {
            Ok(CrmResult::failed(format!("client_error: {status}"), false))
        } else {
            Ok(CrmResult::failed(format!("server_error: {status}"), false))
        }
    }

    async fn search_by_email(&self, object: &str, email: &str) -> Result<CrmResult, ToolError> {
        let query = SearchQueryBuilder::new(object)
            .eq_condition("Email", email)?
            .build();
        let url = format!(
            "{}/services/data/{}/query",
            self.config.base_url.trim_end_matches('/'),
            self.config.api_version
        );
        let response = self
            .client
            .get(url)
            .bearer_auth(&self.config.access_token)
            .query(&[("q", query)])
            .send()
            .await
            .map_err(|err| ToolError::Transport(err.to_string()))?;
        let status = response.status();
        let payload: serde_json::Value = response
            .json()
            .await
            .unwrap_or_else(|_| json!({"records": []}));
        if status.is_success() {
            Ok(CrmResult::ok("", false).with_data(payload))
        } else {
            Ok(CrmResult::failed(format!("client_error: {status}"), false))
        }
    }
}

#[async_trait]
impl CrmExecutor for SalesforceExecutor {
    fn provider(&self) -> &'static str {
        "salesforce"
    }

    async fn create_lead(&self, params: &CreateLeadParams) -> Result<CrmResult, ToolError> {
        self.post_object(
            "Lead",
            json!({
                "Email": sanitize_field_value(&params.email),
                "FirstName": params.first_name.as_deref().map(sanitize_field_value),
                "LastName": params.last_name.as_deref().map(sanitize_field_value).unwrap_or_else(|| "Unknown".to_string()),
                "Company": params.company.as_deref().map(sanitize_field_value).unwrap_or_else(|| "Unknown".to_string()),
            }),
        )
        .await
    }

    async fn upsert_lead(&self, params: &UpsertLeadParams) -> Result<CrmResult, ToolError> {
        self.post_object(
            "Lead",
            json!({
                "Email": sanitize_field_value(&params.email),
                "FirstName": params.first_name.as_deref().map(sanitize_field_value),
                "LastName": params.last_name.as_deref().map(sanitize_field_value).unwrap_or_else(|| "Unknown".to_string()),
                "Company": params.company.as_deref().map(sanitize_field_value).unwrap_or_else(|| "Unknown".to_string()),
            }),
        )
        .await
    }

    async fn convert_lead(&self, params: &ConvertLeadParams) -> Result<CrmResult, ToolError> {
        validate_record_id(&params.lead_id)?;
        self.post_object(
            "LeadConvert",
            json!({
                "leadId": params.lead_id,
                "convertedStatus": "Qualified",
                "doNotCreateOpportunity": !params.create_opportunity,
            }),
        )
        .await
    }

    async fn update_lead_status(&self, params: &UpdateLeadStatusParams) -> Result<CrmResult, ToolError> {
        self.patch_object(
            "Lead",
            &params.lead_id,
            json!({"Status": sanitize_field_value(&params.status)}),
        )
        .await
    }

    async fn update_lead_fields(&self, params: &UpdateLeadFieldsParams) -> Result<CrmResult, ToolError> {
        self.patch_object("Lead", &params.lead_id, params.fields.clone()).await
    }

    async fn set_lead_score(&self, params: &SetLeadScoreParams) -> Result<CrmResult, ToolError> {
        self.patch_object(
            "Lead",
            &params.lead_id,
            json!({"Fit_Score__c": params.score, "Score_Type__c": sanitize_field_value(&params.score_type)}),
        )
        .await
    }

    async fn match_account(&self, params: &MatchAccountParams) -> Result<CrmResult, ToolError> {
        self.search_by_email("Account", &params.domain).await
    }

    async fn create_contact(&self, params: &CreateContactParams) -> Result<CrmResult, ToolError> {
        self.post_object(
            "Contact",
            json!({
                "Email": sanitize_field_value(&params.email),
                "FirstName": params.first_name.as_deref().map(sanitize_field_value),
                "LastName": params.last_name.as_deref().map(sanitize_field_value).unwrap_or_else(|| "Unknown".to_string()),
                "AccountId": params.account_id,
            }),
        )
        .await
    }

    async fn link_contact_to_account(
        &self,
        params: &LinkContactToAccountParams,
    ) -> Result<CrmResult, ToolError> {
        self.patch_object(
            "Contact",
            &params.contact_id,
            json!({"AccountId": params.account_id}),
        )
        .await
    }

    async fn create_opportunity(&self, params: &CreateOpportunityParams) -> Result<CrmResult, ToolError> {
        self.post_object(
            "Opportunity",
            json!({
                "Name": sanitize_field_value(&params.name),
                "StageName": sanitize_field_value(&params.stage),
                "AccountId": params.account_id,
            }),
        )
        .await
    }

    async fn update_opportunity_stage(
        &self,
        params: &UpdateOpportunityStageParams,
    ) -> Result<CrmResult, ToolError> {
        self.patch_object(
            "Opportunity",
            &params.opportunity_id,
            json!({"StageName": sanitize_field_value(&params.stage)}),
        )
        .await
    }

    async fn set_opportunity_value(
        &self,
        params: &SetOpportunityValueParams,
    ) -> Result<CrmResult, ToolError> {
        self.patch_object(
            "Opportunity",
            &params.opportunity_id,
            json!({"Amount": params.amount_minor, "CurrencyIsoCode": sanitize_field_value(&params.currency)}),
        )
        .await
    }

    async fn attach_campaign(&self, params: &AttachCampaignParams) -> Result<CrmResult, ToolError> {
        self.post_object(
            "CampaignMember",
            json!({"LeadId": params.entity_id, "CampaignId": params.campaign_id}),
        )
        .await
    }

    async fn create_task(&self, params: &CreateTaskParams) -> Result<CrmResult, ToolError> {
        self.post_object(
            "Task",
            json!({
                "WhoId": params.related_to_id,
                "Subject": sanitize_field_value(&params.subject),
                "ActivityDate": params.due_at,
            }),
        )
        .await
    }

    async fn log_activity(&self, params: &LogActivityParams) -> Result<CrmResult, ToolError> {
        self.post_object(
            "Task",
            json!({
                "WhoId": params.related_to_id,
                "Subject": sanitize_field_value(&params.activity_type),
                "Description": sanitize_field_value(&params.description),
            }),
        )
        .await
    }

    async fn add_note(&self, params: &AddNoteParams) -> Result<CrmResult, ToolError> {
        self.post_object(
            "Note",
            json!({"ParentId": params.related_to_id, "Body": sanitize_field_value(&params.body)}),
        )
        .await
    }

    async fn create_follow_up(&self, params: &CreateFollowUpParams) -> Result<CrmResult, ToolError> {
        self.post_object(
            "Task",
            json!({
                "WhoId": params.related_to_id,
                "ActivityDate": params.remind_at,
                "Description": params.note.as_deref().map(sanitize_field_value),
            }),
        )
        .await
    }

    async fn sync_firmographics(&self, params: &SyncFirmographicsParams) -> Result<CrmResult, ToolError> {
        self.patch_object("Lead", &params.lead_id, params.firmographics.clone()).await
    }
}
