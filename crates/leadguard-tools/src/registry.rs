use dashmap::DashMap;
use leadguard_guard::SafetyGuard;

use crate::error::ToolError;
use crate::params::{ToolCategory, ToolName};
use crate::schema::schema_for;

/// A registered tool's static metadata (spec.md §4.4).
#[derive(Debug, Clone)]
pub struct ToolDefinition {
    pub name: ToolName,
    pub description: &'static str,
    pub category: ToolCategory,
    pub dangerous: bool,
    pub params_schema: serde_json::Value,
}

/// Registered tools with schema-validated parameters (spec.md §4.4).
/// Registration is rejected if the tool name matches a blocked pattern
/// from the Safety Guard (spec.md §4.3.1) — the registry and the guard
/// share the same danger-pattern set by construction.
pub struct ToolRegistry {
    tools: DashMap<&'static str, ToolDefinition>,
    validators: DashMap<&'static str, jsonschema::Validator>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: DashMap::new(),
            validators: DashMap::new(),
        }
    }

    /// Build the registry with every tool named in spec.md §4.4, rejecting
    /// registration (a programming error, not a runtime condition) if the
    /// Safety Guard's blocked-pattern set somehow matches a required name.
    pub fn with_default_tools(safety: &SafetyGuard) -> Result<Self, ToolError> {
        let registry = Self::new();
        for name in ToolName::ALL {
            registry.register(safety, name, description_for(name), false)?;
        }
        Ok(registry)
    }

    pub fn register(
        &self,
        safety: &SafetyGuard,
        name: ToolName,
        description: &'static str,
        dangerous: bool,
    ) -> Result<(), ToolError> {
        safety
            .check_tool_name(name.as_str())
            .map_err(|violation| ToolError::BlockedName {
                tool: name.as_str().to_string(),
                reason: violation.to_string(),
            })?;

        let schema = schema_for(name);
        let validator = jsonschema::validator_for(&schema).map_err(|err| ToolError::SchemaCompile {
            tool: name.as_str().to_string(),
            message: err.to_string(),
        })?;

        self.tools.insert(
            name.as_str(),
            ToolDefinition {
                name,
                description,
                category: name.category(),
                dangerous,
                params_schema: schema,
            },
        );
        self.validators.insert(name.as_str(), validator);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Result<ToolDefinition, ToolError> {
        self.tools
            .get(name)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| ToolError::UnknownTool(name.to_string()))
    }

    pub fn list(&self) -> Vec<ToolDefinition> {
        self.tools.iter().map(|entry| entry.value().clone()).collect()
    }

    /// Validate raw tool-call parameters against the registered schema.
    /// Fails before any side effect runs (spec.md "Execution invariants").
    pub fn validate_params(&self, name: &str, params: &serde_json::Value) -> Result<(), ToolError> {
        let validator = self
            .validators
            .get(name)
            .ok_or_else(|| ToolError::UnknownTool(name.to_string()))?;
        let errors: Vec<String> = validator.iter_errors(params).map(|e| e.to_string()).collect();
        if errors.is_empty() {
            Ok(())
        } else {
            Err(ToolError::ParamsInvalid {
                tool: name.to_string(),
                errors: errors.join("; "),
            })
        }
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn description_for(name: ToolName) -> &'static str {
    match name {
        ToolName::CreateLead => "Create a new lead record in the CRM",
        ToolName::UpsertLead => "Create or update a lead record keyed by email",
        ToolName::ConvertLead => "Convert a qualified lead into account/contact/opportunity",
        ToolName::UpdateLeadStatus => "Update a lead's lifecycle status",
        ToolName::UpdateLeadFields => "Update arbitrary fields on a lead record",
        ToolName::SetLeadScore => "Record a fit or engagement score on a lead",
        ToolName::MatchAccount => "Find an existing account by domain",
        ToolName::CreateContact => "Create a contact record",
        ToolName::LinkContactToAccount => "Associate a contact with an account",
        ToolName::CreateOpportunity => "Create a sales opportunity",
        ToolName::UpdateOpportunityStage => "Move an opportunity to a new stage",
        ToolName::SetOpportunityValue => "Set an opportunity's monetary value",
        ToolName::AttachCampaign => "Attach a marketing campaign to an entity",
        ToolName::CreateTask => "Create a follow-up task",
        ToolName::LogActivity => "Log an activity record (e.g. the AI analysis)",
        ToolName::AddNote => "Add a free-text note to an entity",
        ToolName::CreateFollowUp => "Schedule a reminder follow-up",
        ToolName::SyncFirmographics => "Write enrichment firmographics onto a lead",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registers_all_required_tools() {
        let registry = ToolRegistry::with_default_tools(&SafetyGuard::new()).unwrap();
        assert_eq!(registry.list().len(), ToolName::ALL.len());
        for name in ToolName::ALL {
            assert!(registry.get(name.as_str()).is_ok());
        }
    }

    #[test]
    fn unknown_tool_lookup_fails() {
        let registry = ToolRegistry::with_default_tools(&SafetyGuard::new()).unwrap();
        assert!(matches!(
            registry.get("delete_everything"),
            Err(ToolError::UnknownTool(_))
        ));
    }

    #[test]
    fn validates_params_against_schema() {
        let registry = ToolRegistry::with_default_tools(&SafetyGuard::new()).unwrap();
        let ok = serde_json::json!({"lead_id": "00Q123", "score": 90, "score_type": "fit"});
        assert!(registry.validate_params("set_lead_score", &ok).is_ok());

        let bad = serde_json::json!({"lead_id": "00Q123", "score": 900, "score_type": "fit"});
        assert!(registry.validate_params("set_lead_score", &bad).is_err());
    }
}
