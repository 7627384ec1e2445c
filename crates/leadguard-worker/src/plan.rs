//! MCP action-plan builder (spec.md §4.5): turns a grounded analysis into
//! the fixed, ordered sequence of tool calls the orchestrator drives
//! through the MCP.

use leadguard_core::{EnrichmentData, Lead};
use leadguard_tools::params::{LogActivityParams, SetLeadScoreParams, SyncFirmographicsParams, UpsertLeadParams};
use leadguard_tools::ToolName;
use serde_json::Value;

/// One step of the plan: a tool, its JSON parameters (schema-validated and
/// audited as-is), and whether its failure halts the whole plan.
#[derive(Debug, Clone)]
pub struct PlannedAction {
    pub tool: ToolName,
    pub params: Value,
    pub critical: bool,
}

pub struct ActionPlanBuilder;

impl ActionPlanBuilder {
    /// Build the standard action plan for a lead whose analysis has already
    /// passed grounding (spec.md §4.5 "MCP orchestrator action-plan
    /// builder"). Order is significant: `upsert_lead` always runs first and
    /// is the only critical step.
    pub fn build(lead: &Lead, enrichment: Option<&EnrichmentData>) -> Vec<PlannedAction> {
        let mut plan = Vec::with_capacity(4);

        let (first_name, last_name) = split_name(lead.name.as_deref());
        let upsert = UpsertLeadParams {
            email: lead.email.clone(),
            first_name,
            last_name,
            company: enrichment.and_then(|e| e.name.clone()),
        };
        plan.push(PlannedAction {
            tool: ToolName::UpsertLead,
            params: serde_json::to_value(&upsert).expect("UpsertLeadParams always serializes"),
            critical: true,
        });

        if let Some(score) = lead.fit_score {
            let score_params = SetLeadScoreParams {
                lead_id: lead.id.to_string(),
                score,
                score_type: "fit".to_string(),
            };
            plan.push(PlannedAction {
                tool: ToolName::SetLeadScore,
                params: serde_json::to_value(&score_params).expect("SetLeadScoreParams always serializes"),
                critical: false,
            });
        }

        if let Some(enrichment) = enrichment {
            let firmographics = serde_json::json!({
                "industry": enrichment.industry,
                "employees": enrichment.employees,
                "geo": enrichment.geo,
                "techStack": enrichment.tech_stack,
            });
            let sync_params = SyncFirmographicsParams {
                lead_id: lead.id.to_string(),
                firmographics,
            };
            plan.push(PlannedAction {
                tool: ToolName::SyncFirmographics,
                params: serde_json::to_value(&sync_params)
                    .expect("SyncFirmographicsParams always serializes"),
                critical: false,
            });
        }

        let log_params = LogActivityParams {
            related_to_id: lead.id.to_string(),
            activity_type: "ai_analysis".to_string(),
            description: lead.reasoning.clone().unwrap_or_default(),
        };
        plan.push(PlannedAction {
            tool: ToolName::LogActivity,
            params: serde_json::to_value(&log_params).expect("LogActivityParams always serializes"),
            critical: false,
        });

        plan
    }
}

/// Split a free-text display name into `(firstName, lastName)` on
/// whitespace, joining any remaining tokens into the last name.
fn split_name(name: Option<&str>) -> (Option<String>, Option<String>) {
    let Some(name) = name else {
        return (None, None);
    };
    let mut parts = name.split_whitespace();
    let first = parts.next().map(str::to_string);
    let rest: Vec<&str> = parts.collect();
    let last = if rest.is_empty() { None } else { Some(rest.join(" ")) };
    (first, last)
}

#[cfg(test)]
mod tests {
    use super::*;
    use leadguard_core::Lead;

    #[test]
    fn plan_always_starts_with_critical_upsert() {
        let lead = Lead::new("a@b.com", "camp-1", Some("Ada Lovelace".to_string()));
        let plan = ActionPlanBuilder::build(&lead, None);
        assert_eq!(plan[0].tool, ToolName::UpsertLead);
        assert!(plan[0].critical);
        assert_eq!(plan[0].params["first_name"], "Ada");
        assert_eq!(plan[0].params["last_name"], "Lovelace");
    }

    #[test]
    fn plan_always_ends_with_log_activity() {
        let lead = Lead::new("a@b.com", "camp-1", None);
        let plan = ActionPlanBuilder::build(&lead, None);
        assert_eq!(plan.last().unwrap().tool, ToolName::LogActivity);
    }

    #[test]
    fn plan_includes_score_and_firmographics_when_available() {
        let mut lead = Lead::new("a@b.com", "camp-1", None);
        lead.fit_score = Some(80);
        let enrichment = EnrichmentData {
            industry: Some("Fintech".to_string()),
            ..Default::default()
        };
        let plan = ActionPlanBuilder::build(&lead, Some(&enrichment));
        let tools: Vec<ToolName> = plan.iter().map(|a| a.tool).collect();
        assert_eq!(
            tools,
            vec![
                ToolName::UpsertLead,
                ToolName::SetLeadScore,
                ToolName::SyncFirmographics,
                ToolName::LogActivity,
            ]
        );
    }

    #[test]
    fn plan_omits_score_and_firmographics_when_absent() {
        let lead = Lead::new("a@b.com", "camp-1", None);
        let plan = ActionPlanBuilder::build(&lead, None);
        let tools: Vec<ToolName> = plan.iter().map(|a| a.tool).collect();
        assert_eq!(tools, vec![ToolName::UpsertLead, ToolName::LogActivity]);
    }
}
