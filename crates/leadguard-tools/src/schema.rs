//! JSON Schema per tool (spec.md §4.4: "paramsSchema"). The registry
//! compiles and validates against these before any typed parameter record
//! is constructed and before any side effect runs (spec.md "Execution
//! invariants": schema validation fails the call before any side effect).

use serde_json::{json, Value};

use crate::params::ToolName;

pub fn schema_for(tool: ToolName) -> Value {
    match tool {
        ToolName::CreateLead | ToolName::UpsertLead => json!({
            "type": "object",
            "required": ["email"],
            "properties": {
                "email": {"type": "string", "minLength": 3},
                "first_name": {"type": ["string", "null"]},
                "last_name": {"type": ["string", "null"]},
                "company": {"type": ["string", "null"]}
            },
            "additionalProperties": false
        }),
        ToolName::ConvertLead => json!({
            "type": "object",
            "required": ["lead_id", "create_opportunity"],
            "properties": {
                "lead_id": {"type": "string", "minLength": 1},
                "create_opportunity": {"type": "boolean"}
            },
            "additionalProperties": false
        }),
        ToolName::UpdateLeadStatus => json!({
            "type": "object",
            "required": ["lead_id", "status"],
            "properties": {
                "lead_id": {"type": "string", "minLength": 1},
                "status": {"type": "string", "minLength": 1}
            },
            "additionalProperties": false
        }),
        ToolName::UpdateLeadFields => json!({
            "type": "object",
            "required": ["lead_id", "fields"],
            "properties": {
                "lead_id": {"type": "string", "minLength": 1},
                "fields": {"type": "object"}
            },
            "additionalProperties": false
        }),
        ToolName::SetLeadScore => json!({
            "type": "object",
            "required": ["lead_id", "score", "score_type"],
            "properties": {
                "lead_id": {"type": "string", "minLength": 1},
                "score": {"type": "integer", "minimum": 0, "maximum": 100},
                "score_type": {"type": "string", "minLength": 1}
            },
            "additionalProperties": false
        }),
        ToolName::MatchAccount => json!({
            "type": "object",
            "required": ["domain"],
            "properties": {"domain": {"type": "string", "minLength": 1}},
            "additionalProperties": false
        }),
        ToolName::CreateContact => json!({
            "type": "object",
            "required": ["email"],
            "properties": {
                "email": {"type": "string", "minLength": 3},
                "first_name": {"type": ["string", "null"]},
                "last_name": {"type": ["string", "null"]},
                "account_id": {"type": ["string", "null"]}
            },
            "additionalProperties": false
        }),
        ToolName::LinkContactToAccount => json!({
            "type": "object",
            "required": ["contact_id", "account_id"],
            "properties": {
                "contact_id": {"type": "string", "minLength": 1},
                "account_id": {"type": "string", "minLength": 1}
            },
            "additionalProperties": false
        }),
        ToolName::CreateOpportunity => json!({
            "type": "object",
            "required": ["name", "stage"],
            "properties": {
                "account_id": {"type": ["string", "null"]},
                "lead_id": {"type": ["string", "null"]},
                "name": {"type": "string", "minLength": 1},
                "stage": {"type": "string", "minLength": 1}
            },
            "additionalProperties": false
        }),
        ToolName::UpdateOpportunityStage => json!({
            "type": "object",
            "required": ["opportunity_id", "stage"],
            "properties": {
                "opportunity_id": {"type": "string", "minLength": 1},
                "stage": {"type": "string", "minLength": 1}
            },
            "additionalProperties": false
        }),
        ToolName::SetOpportunityValue => json!({
            "type": "object",
            "required": ["opportunity_id", "amount_minor", "currency"],
            "properties": {
                "opportunity_id": {"type": "string", "minLength": 1},
                "amount_minor": {"type": "integer", "minimum": 0},
                "currency": {"type": "string", "minLength": 3, "maxLength": 3}
            },
            "additionalProperties": false
        }),
        ToolName::AttachCampaign => json!({
            "type": "object",
            "required": ["entity_id", "campaign_id"],
            "properties": {
                "entity_id": {"type": "string", "minLength": 1},
                "campaign_id": {"type": "string", "minLength": 1}
            },
            "additionalProperties": false
        }),
        ToolName::CreateTask => json!({
            "type": "object",
            "required": ["related_to_id", "subject"],
            "properties": {
                "related_to_id": {"type": "string", "minLength": 1},
                "subject": {"type": "string", "minLength": 1},
                "due_at": {"type": ["string", "null"]}
            },
            "additionalProperties": false
        }),
        ToolName::LogActivity => json!({
            "type": "object",
            "required": ["related_to_id", "type", "description"],
            "properties": {
                "related_to_id": {"type": "string", "minLength": 1},
                "type": {"type": "string", "minLength": 1},
                "description": {"type": "string"}
            },
            "additionalProperties": false
        }),
        ToolName::AddNote => json!({
            "type": "object",
            "required": ["related_to_id", "body"],
            "properties": {
                "related_to_id": {"type": "string", "minLength": 1},
                "body": {"type": "string"}
            },
            "additionalProperties": false
        }),
        ToolName::CreateFollowUp => json!({
            "type": "object",
            "required": ["related_to_id", "remind_at"],
            "properties": {
                "related_to_id": {"type": "string", "minLength": 1},
                "remind_at": {"type": "string"},
                "note": {"type": ["string", "null"]}
            },
            "additionalProperties": false
        }),
        ToolName::SyncFirmographics => json!({
            "type": "object",
            "required": ["lead_id", "firmographics"],
            "properties": {
                "lead_id": {"type": "string", "minLength": 1},
                "firmographics": {"type": "object"}
            },
            "additionalProperties": false
        }),
    }
}
