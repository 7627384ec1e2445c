//! Metric emission helpers. Names match spec.md §6 verbatim so external
//! scrape configs never need to change.

use metrics::{counter, gauge, histogram};

pub fn leads_processed(status: &'static str) {
    counter!("leads_processed_total", "status" => status).increment(1);
}

pub fn mcp_action(tool: &str, status: &'static str, crm_provider: &str) {
    counter!(
        "mcp_actions_total",
        "tool" => tool.to_string(),
        "status" => status,
        "crm_provider" => crm_provider.to_string()
    )
    .increment(1);
}

pub fn grounding_decision(status: &'static str) {
    counter!("mcp_grounding_decisions_total", "status" => status).increment(1);
}

pub fn rate_limit_violation(limit_type: &str) {
    counter!("mcp_rate_limit_violations_total", "limit_type" => limit_type.to_string()).increment(1);
}

pub fn safety_block(tool: &str, reason: &str) {
    counter!(
        "mcp_safety_blocks_total",
        "tool" => tool.to_string(),
        "reason" => reason.to_string()
    )
    .increment(1);
}

pub fn circuit_breaker_state(crm_provider: &str, operation: &str, state_value: i64) {
    gauge!(
        "mcp_circuit_breaker_state",
        "crm_provider" => crm_provider.to_string(),
        "operation" => operation.to_string()
    )
    .set(state_value as f64);
}

pub fn ai_analysis_duration(seconds: f64) {
    histogram!("ai_analysis_duration_seconds").record(seconds);
}

pub fn mcp_action_duration(tool: &str, crm_provider: &str, seconds: f64) {
    histogram!(
        "mcp_action_duration_seconds",
        "tool" => tool.to_string(),
        "crm_provider" => crm_provider.to_string()
    )
    .record(seconds);
}

pub fn mcp_crm_api_duration(crm_provider: &str, operation: &str, status: &'static str, seconds: f64) {
    histogram!(
        "mcp_crm_api_duration_seconds",
        "crm_provider" => crm_provider.to_string(),
        "operation" => operation.to_string(),
        "status" => status
    )
    .record(seconds);
}
