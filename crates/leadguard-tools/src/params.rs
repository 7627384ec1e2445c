//! Typed parameter records per tool (spec.md §9: "Dynamic named parameters
//! in tool calls -> typed parameter records per tool"). Each tool has a
//! concrete request struct here; the registry validates the raw JSON form
//! against a schema before it is ever deserialized into one of these.

use serde::{Deserialize, Serialize};

/// Category a tool belongs to, used for registry bookkeeping and metrics
/// labels (spec.md §4.4).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolCategory {
    LeadLifecycle,
    FieldUpdates,
    AccountContact,
    SalesWorkflow,
    Activity,
    EnrichmentSync,
}

/// The closed set of required tools (spec.md §4.4).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolName {
    CreateLead,
    UpsertLead,
    ConvertLead,
    UpdateLeadStatus,
    UpdateLeadFields,
    SetLeadScore,
    MatchAccount,
    CreateContact,
    LinkContactToAccount,
    CreateOpportunity,
    UpdateOpportunityStage,
    SetOpportunityValue,
    AttachCampaign,
    CreateTask,
    LogActivity,
    AddNote,
    CreateFollowUp,
    SyncFirmographics,
}

impl ToolName {
    pub const ALL: [ToolName; 18] = [
        ToolName::CreateLead,
        ToolName::UpsertLead,
        ToolName::ConvertLead,
        ToolName::UpdateLeadStatus,
        ToolName::UpdateLeadFields,
        ToolName::SetLeadScore,
        ToolName::MatchAccount,
        ToolName::CreateContact,
        ToolName::LinkContactToAccount,
        ToolName::CreateOpportunity,
        ToolName::UpdateOpportunityStage,
        ToolName::SetOpportunityValue,
        ToolName::AttachCampaign,
        ToolName::CreateTask,
        ToolName::LogActivity,
        ToolName::AddNote,
        ToolName::CreateFollowUp,
        ToolName::SyncFirmographics,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ToolName::CreateLead => "create_lead",
            ToolName::UpsertLead => "upsert_lead",
            ToolName::ConvertLead => "convert_lead",
            ToolName::UpdateLeadStatus => "update_lead_status",
            ToolName::UpdateLeadFields => "update_lead_fields",
            ToolName::SetLeadScore => "set_lead_score",
            ToolName::MatchAccount => "match_account",
            ToolName::CreateContact => "create_contact",
            ToolName::LinkContactToAccount => "link_contact_to_account",
            ToolName::CreateOpportunity => "create_opportunity",
            ToolName::UpdateOpportunityStage => "update_opportunity_stage",
            ToolName::SetOpportunityValue => "set_opportunity_value",
            ToolName::AttachCampaign => "attach_campaign",
            ToolName::CreateTask => "create_task",
            ToolName::LogActivity => "log_activity",
            ToolName::AddNote => "add_note",
            ToolName::CreateFollowUp => "create_follow_up",
            ToolName::SyncFirmographics => "sync_firmographics",
        }
    }

    pub fn category(self) -> ToolCategory {
        use ToolCategory::*;
        match self {
            ToolName::CreateLead | ToolName::UpsertLead | ToolName::ConvertLead => LeadLifecycle,
            ToolName::UpdateLeadStatus | ToolName::UpdateLeadFields | ToolName::SetLeadScore => {
                FieldUpdates
            }
            ToolName::MatchAccount | ToolName::CreateContact | ToolName::LinkContactToAccount => {
                AccountContact
            }
            ToolName::CreateOpportunity
            | ToolName::UpdateOpportunityStage
            | ToolName::SetOpportunityValue
            | ToolName::AttachCampaign => SalesWorkflow,
            ToolName::CreateTask
            | ToolName::LogActivity
            | ToolName::AddNote
            | ToolName::CreateFollowUp => Activity,
            ToolName::SyncFirmographics => EnrichmentSync,
        }
    }

    /// Whether this tool is critical to a standard MCP action plan (spec.md
    /// §4.5): a critical action's failure halts the plan.
    pub fn is_plan_critical(self) -> bool {
        matches!(self, ToolName::UpsertLead)
    }
}

impl std::fmt::Display for ToolName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateLeadParams {
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub company: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpsertLeadParams {
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub company: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConvertLeadParams {
    pub lead_id: String,
    pub create_opportunity: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateLeadStatusParams {
    pub lead_id: String,
    pub status: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateLeadFieldsParams {
    pub lead_id: String,
    pub fields: serde_json::Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetLeadScoreParams {
    pub lead_id: String,
    pub score: u8,
    pub score_type: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchAccountParams {
    pub domain: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateContactParams {
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub account_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinkContactToAccountParams {
    pub contact_id: String,
    pub account_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateOpportunityParams {
    pub account_id: Option<String>,
    pub lead_id: Option<String>,
    pub name: String,
    pub stage: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateOpportunityStageParams {
    pub opportunity_id: String,
    pub stage: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetOpportunityValueParams {
    pub opportunity_id: String,
    pub amount_minor: u64,
    pub currency: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttachCampaignParams {
    pub entity_id: String,
    pub campaign_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateTaskParams {
    pub related_to_id: String,
    pub subject: String,
    pub due_at: Option<chrono::DateTime<chrono::Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogActivityParams {
    pub related_to_id: String,
    #[serde(rename = "type")]
    pub activity_type: String,
    pub description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddNoteParams {
    pub related_to_id: String,
    pub body: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateFollowUpParams {
    pub related_to_id: String,
    pub remind_at: chrono::DateTime<chrono::Utc>,
    pub note: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncFirmographicsParams {
    pub lead_id: String,
    pub firmographics: serde_json::Value,
}
