use chrono::{DateTime, Duration, Utc};
use leadguard_core::GroundingStatus;
use regex::RegexSet;
use serde_json::Value;

/// Everything the Safety Guard needs to know about the call it is about to
/// allow or block (spec.md §4.3.1 context checks).
#[derive(Debug, Clone)]
pub struct GuardContext {
    pub grounding_status: Option<GroundingStatus>,
    pub lead_email: Option<String>,
    pub execution_id: Option<String>,
    pub lead_id: Option<i64>,
    pub timestamp: DateTime<Utc>,
}

/// Reason a call was blocked, surfaced to `mcp_safety_blocks_total{reason}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SafetyViolation {
    BlockedToolName { tool: String, pattern: String },
    BlockedContext(String),
    BlockedParameter { path: String, pattern: String },
}

impl std::fmt::Display for SafetyViolation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SafetyViolation::BlockedToolName { tool, pattern } => {
                write!(f, "tool name '{tool}' matches blocked pattern '{pattern}'")
            }
            SafetyViolation::BlockedContext(reason) => write!(f, "blocked context: {reason}"),
            SafetyViolation::BlockedParameter { path, pattern } => {
                write!(f, "parameter at '{path}' matches blocked pattern '{pattern}'")
            }
        }
    }
}

/// Case-insensitive danger patterns applied to both tool names and every
/// string-typed parameter value (spec.md §4.3.1).
const BLOCKED_PATTERNS: &[(&str, &str)] = &[
    ("leading_delete", r"^delete_"),
    ("leading_mass", r"^mass_"),
    ("schema_change", r"schema_change"),
    ("permission_change", r"permission_change"),
    ("execute_query", r"execute.*query"),
    ("bulk_export", r"bulk_export"),
    ("leading_merge", r"^merge_"),
    ("hard_delete", r"hard_delete"),
    ("template_injection", r"\$\{.*\}"),
    ("prototype_pollution", r"__proto__|constructor|prototype"),
];

/// Rejects tool names, contexts, and parameter trees that match a blocked
/// danger pattern or fail an integrity check (spec.md §4.3.1).
pub struct SafetyGuard {
    patterns: RegexSet,
    pattern_names: Vec<&'static str>,
}

impl SafetyGuard {
    pub fn new() -> Self {
        let patterns = RegexSet::new(
            BLOCKED_PATTERNS
                .iter()
                .map(|(_, pattern)| format!("(?i){pattern}")),
        )
        .expect("blocked pattern set is a fixed, known-valid literal");
        let pattern_names = BLOCKED_PATTERNS.iter().map(|(name, _)| *name).collect();
        Self {
            patterns,
            pattern_names,
        }
    }

    fn first_match(&self, text: &str) -> Option<&'static str> {
        self.patterns
            .matches(text)
            .iter()
            .next()
            .map(|idx| self.pattern_names[idx])
    }

    /// Reject registration or invocation of a tool whose name matches a
    /// blocked pattern.
    pub fn check_tool_name(&self, tool: &str) -> Result<(), SafetyViolation> {
        match self.first_match(tool) {
            Some(pattern) => Err(SafetyViolation::BlockedToolName {
                tool: tool.to_string(),
                pattern: pattern.to_string(),
            }),
            None => Ok(()),
        }
    }

    /// Validate the execution context. All checks must hold before any
    /// execution proceeds.
    pub fn check_context(&self, ctx: &GuardContext) -> Result<(), SafetyViolation> {
        if ctx.grounding_status == Some(GroundingStatus::Rejected) {
            return Err(SafetyViolation::BlockedContext(
                "grounding_status is REJECTED".to_string(),
            ));
        }
        if ctx.lead_email.as_deref().unwrap_or("").is_empty() {
            return Err(SafetyViolation::BlockedContext("lead email missing".to_string()));
        }
        if ctx.execution_id.as_deref().unwrap_or("").is_empty() {
            return Err(SafetyViolation::BlockedContext("execution id missing".to_string()));
        }
        if ctx.lead_id.is_none() {
            return Err(SafetyViolation::BlockedContext("lead id missing".to_string()));
        }
        let now = Utc::now();
        let earliest = now - Duration::hours(1);
        let latest = now + Duration::minutes(1);
        if ctx.timestamp < earliest || ctx.timestamp > latest {
            return Err(SafetyViolation::BlockedContext(format!(
                "context timestamp {} outside allowed window [{earliest}, {latest}]",
                ctx.timestamp
            )));
        }
        Ok(())
    }

    /// Recursively walk `params`, matching every string leaf against the
    /// blocked pattern set. Returns the offending path on the first match.
    pub fn check_params(&self, params: &Value) -> Result<(), SafetyViolation> {
        self.walk(params, "$")
    }

    fn walk(&self, value: &Value, path: &str) -> Result<(), SafetyViolation> {
        match value {
            Value::String(s) => {
                if let Some(pattern) = self.first_match(s) {
                    return Err(SafetyViolation::BlockedParameter {
                        path: path.to_string(),
                        pattern: pattern.to_string(),
                    });
                }
                Ok(())
            }
            Value::Array(items) => {
                for (i, item) in items.iter().enumerate() {
                    self.walk(item, &format!("{path}[{i}]"))?;
                }
                Ok(())
            }
            Value::Object(map) => {
                for (key, val) in map {
                    if let Some(pattern) = self.first_match(key) {
                        return Err(SafetyViolation::BlockedParameter {
                            path: format!("{path}.{key}"),
                            pattern: pattern.to_string(),
                        });
                    }
                    self.walk(val, &format!("{path}.{key}"))?;
                }
                Ok(())
            }
            _ => Ok(()),
        }
    }
}

impl Default for SafetyGuard {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn valid_context() -> GuardContext {
        GuardContext {
            grounding_status: Some(GroundingStatus::Valid),
            lead_email: Some("a@b.com".to_string()),
            execution_id: Some(uuid::Uuid::new_v4().to_string()),
            lead_id: Some(42),
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn blocks_delete_prefixed_tool_names() {
        let guard = SafetyGuard::new();
        assert!(guard.check_tool_name("delete_lead").is_err());
        assert!(guard.check_tool_name("upsert_lead").is_ok());
    }

    #[test]
    fn blocks_prototype_pollution_in_tool_name() {
        let guard = SafetyGuard::new();
        assert!(guard.check_tool_name("__proto__").is_err());
    }

    #[test]
    fn rejects_context_with_rejected_grounding() {
        let guard = SafetyGuard::new();
        let mut ctx = valid_context();
        ctx.grounding_status = Some(GroundingStatus::Rejected);
        assert!(guard.check_context(&ctx).is_err());
    }

    #[test]
    fn rejects_stale_context_timestamp() {
        let guard = SafetyGuard::new();
        let mut ctx = valid_context();
        ctx.timestamp = Utc::now() - Duration::hours(2);
        assert!(guard.check_context(&ctx).is_err());
    }

    #[test]
    fn walks_nested_params_and_finds_offending_leaf() {
        let guard = SafetyGuard::new();
        let params = json!({
            "leadId": 1,
            "nested": { "note": "please run bulk_export now" }
        });
        let err = guard.check_params(&params).unwrap_err();
        match err {
            SafetyViolation::BlockedParameter { path, .. } => {
                assert_eq!(path, "$.nested.note");
            }
            other => panic!("unexpected violation: {other:?}"),
        }
    }

    #[test]
    fn allows_clean_params() {
        let guard = SafetyGuard::new();
        let params = json!({"leadId": 1, "score": 90, "notes": "looks good"});
        assert!(guard.check_params(&params).is_ok());
    }
}
