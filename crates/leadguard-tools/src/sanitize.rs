//! Field-value sanitisation and identifier/query validation used by real
//! (non-mock) executors before any value leaves the process (spec.md
//! §4.4: "Field-value sanitisation ... identifier format validation ...
//! search-query construction via a builder").

use std::sync::LazyLock;

use regex::Regex;

use crate::error::ToolError;

static FIELD_NAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("static field name pattern"));

/// Escape control characters, quotes, and backslashes so a value cannot
/// break out of a query-language string literal.
pub fn sanitize_field_value(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '\'' => out.push_str("\\'"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c.is_control() => {}
            c => out.push(c),
        }
    }
    out
}

/// A CRM record id must be 15 or 18 alphanumeric characters (spec.md
/// §4.4), matching the Salesforce-style id convention.
pub fn validate_record_id(id: &str) -> Result<(), ToolError> {
    let valid_length = id.len() == 15 || id.len() == 18;
    if valid_length && id.chars().all(|c| c.is_ascii_alphanumeric()) {
        Ok(())
    } else {
        Err(ToolError::InvalidRecordId(id.to_string()))
    }
}

/// Builds a parameterised search query, refusing any field name outside
/// `[A-Za-z_][A-Za-z0-9_]*` (spec.md §4.4).
pub struct SearchQueryBuilder {
    object: String,
    conditions: Vec<String>,
}

impl SearchQueryBuilder {
    pub fn new(object: impl Into<String>) -> Self {
        Self {
            object: object.into(),
            conditions: Vec::new(),
        }
    }

    /// Add an equality condition on `field`. Rejects disallowed field
    /// names before the value is ever sanitised or embedded.
    pub fn eq_condition(mut self, field: &str, value: &str) -> Result<Self, ToolError> {
        if !FIELD_NAME_RE.is_match(field) {
            return Err(ToolError::InvalidFieldName(field.to_string()));
        }
        let sanitized = sanitize_field_value(value);
        self.conditions.push(format!("{field} = '{sanitized}'"));
        Ok(self)
    }

    pub fn build(self) -> String {
        if self.conditions.is_empty() {
            format!("SELECT Id FROM {}", self.object)
        } else {
            format!("SELECT Id FROM {} WHERE {}", self.object, self.conditions.join(" AND "))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escapes_quotes_and_backslashes() {
        let sanitized = sanitize_field_value(r#"O'Brien \ "quoted""#);
        assert_eq!(sanitized, r#"O\'Brien \\ \"quoted\""#);
    }

    #[test]
    fn strips_control_characters() {
        let sanitized = sanitize_field_value("line1\u{0007}line2");
        assert_eq!(sanitized, "line1line2");
    }

    #[test]
    fn accepts_15_and_18_char_alphanumeric_ids() {
        assert!(validate_record_id("00Q1234567890AB").is_ok());
        assert!(validate_record_id("00Q1234567890ABCDE").is_ok());
        assert!(validate_record_id("00Q-invalid-chars!").is_err());
        assert!(validate_record_id("tooshort").is_err());
    }

    #[test]
    fn search_builder_rejects_unsafe_field_names() {
        let result = SearchQueryBuilder::new("Lead").eq_condition("Email; DROP TABLE", "a@b.com");
        assert!(matches!(result, Err(ToolError::InvalidFieldName(_))));
    }

    #[test]
    fn search_builder_produces_parameterised_condition() {
        let query = SearchQueryBuilder::new("Lead")
            .eq_condition("Email", "a@b.com")
            .unwrap()
            .build();
        assert_eq!(query, "SELECT Id FROM Lead WHERE Email = 'a@b.com'");
    }
}
