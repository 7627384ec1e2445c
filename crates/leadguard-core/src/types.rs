use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};

use crate::error::LeadError;

/// Lifecycle status of a Lead. Transitions are monotone over the allowed set
/// described in spec.md §4.5.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LeadStatus {
    Pending,
    Enriched,
    SyncedToCrm,
    AiRejected,
    McpBlocked,
    PermanentlyFailed,
}

impl LeadStatus {
    /// True if `next` is a legal transition from `self`.
    pub fn can_transition_to(self, next: LeadStatus) -> bool {
        use LeadStatus::*;
        matches!(
            (self, next),
            (Pending, Enriched)
                | (Pending, PermanentlyFailed)
                | (Enriched, SyncedToCrm)
                | (Enriched, AiRejected)
                | (Enriched, McpBlocked)
                | (Enriched, PermanentlyFailed)
                | (McpBlocked, SyncedToCrm)
                | (McpBlocked, AiRejected)
                | (McpBlocked, PermanentlyFailed)
        )
    }
}

/// Closed set of evidence sources, plus an open `Unauthorized(raw)` landing
/// zone. Any source string an AI provider cites that is not one of the five
/// authorized members deserializes into `Unauthorized` rather than failing
/// to parse, so grounding rule 1 (spec.md §4.2) has a real value to reject
/// instead of relying on deserialization to reject it first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EvidenceSource {
    Salesforce,
    Marketo,
    Product,
    Enrichment,
    Computed,
    /// A source outside the closed set, carrying the raw string an AI
    /// provider cited (e.g. `"WEB_SEARCH"`).
    Unauthorized(String),
}

impl EvidenceSource {
    pub fn is_behavioral(&self) -> bool {
        matches!(
            self,
            EvidenceSource::Product
                | EvidenceSource::Marketo
                | EvidenceSource::Computed
                | EvidenceSource::Salesforce
        )
    }

    fn as_wire_str(&self) -> &str {
        match self {
            EvidenceSource::Salesforce => "SALESFORCE",
            EvidenceSource::Marketo => "MARKETO",
            EvidenceSource::Product => "PRODUCT",
            EvidenceSource::Enrichment => "ENRICHMENT",
            EvidenceSource::Computed => "COMPUTED",
            EvidenceSource::Unauthorized(raw) => raw,
        }
    }
}

impl Serialize for EvidenceSource {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_wire_str())
    }
}

impl<'de> Deserialize<'de> for EvidenceSource {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(match raw.as_str() {
            "SALESFORCE" => EvidenceSource::Salesforce,
            "MARKETO" => EvidenceSource::Marketo,
            "PRODUCT" => EvidenceSource::Product,
            "ENRICHMENT" => EvidenceSource::Enrichment,
            "COMPUTED" => EvidenceSource::Computed,
            _ => EvidenceSource::Unauthorized(raw),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ClaimType {
    Firmographic,
    Behavior,
    Pipeline,
    Score,
}

/// Opaque evidence value: a scalar or list of scalars. Only a narrow
/// `as_comparable_string` is exposed for grounding rule 3's substring check —
/// nothing else in the system inspects the shape of this value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EvidenceValue {
    Scalar(String),
    List(Vec<String>),
}

impl EvidenceValue {
    pub fn as_comparable_string(&self) -> String {
        match self {
            EvidenceValue::Scalar(s) => s.clone(),
            EvidenceValue::List(items) => items.join(", "),
        }
    }
}

/// A tuple justifying one AI claim, scoped to a closed set of sources.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Evidence {
    pub source: EvidenceSource,
    pub field_path: String,
    pub value: EvidenceValue,
    pub claim_type: ClaimType,
}

impl Evidence {
    pub fn new(
        source: EvidenceSource,
        field_path: impl Into<String>,
        value: impl Into<String>,
        claim_type: ClaimType,
    ) -> Self {
        Self {
            source,
            field_path: field_path.into(),
            value: EvidenceValue::Scalar(value.into()),
            claim_type,
        }
    }

    /// Last dot-separated segment of `field_path`, e.g. `industry` for
    /// `enrichment.industry`.
    pub fn field_leaf(&self) -> &str {
        self.field_path.rsplit('.').next().unwrap_or(&self.field_path)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Intent {
    LowFit,
    MediumFit,
    HighFit,
    ManualReview,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Decision {
    RouteToSdr,
    Nurture,
    Ignore,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GroundingStatus {
    Valid,
    Downgraded,
    Rejected,
}

/// Transient AI provider output. Grounding fields are stamped by the
/// validator, never by the AI collaborator itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub fit_score: u8,
    pub intent: Intent,
    pub decision: Decision,
    pub reasoning: String,
    pub evidence: Vec<Evidence>,
    pub grounding_status: Option<GroundingStatus>,
    pub grounding_errors: Vec<String>,
}

impl AnalysisResult {
    pub fn new(
        fit_score: u8,
        intent: Intent,
        decision: Decision,
        reasoning: impl Into<String>,
        evidence: Vec<Evidence>,
    ) -> Self {
        Self {
            fit_score: fit_score.min(100),
            intent,
            decision,
            reasoning: reasoning.into(),
            evidence,
            grounding_status: None,
            grounding_errors: Vec::new(),
        }
    }

    /// Fallback analysis constructed when the AI provider raises an
    /// exception or grounding encounters an unrecoverable error
    /// (spec.md §4.2 Notes, §7 Unknown).
    pub fn fallback_rejected(reason: impl Into<String>) -> Self {
        let mut result = Self::new(0, Intent::ManualReview, Decision::Ignore, reason, Vec::new());
        result.grounding_status = Some(GroundingStatus::Rejected);
        result
    }
}

/// Firmographic lookup keyed by domain, indexable by field name for
/// grounding rule 3.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EnrichmentData {
    pub name: Option<String>,
    pub domain: Option<String>,
    pub employees: Option<String>,
    pub industry: Option<String>,
    pub tech_stack: Option<Vec<String>>,
    pub geo: Option<String>,
}

impl EnrichmentData {
    /// Look up a trusted firmographic field by its last-segment name
    /// (e.g. `industry`), returning a string comparable against a claim.
    pub fn field(&self, name: &str) -> Option<String> {
        match name {
            "name" => self.name.clone(),
            "domain" => self.domain.clone(),
            "employees" => self.employees.clone(),
            "industry" => self.industry.clone(),
            "tech_stack" | "techstack" => self.tech_stack.clone().map(|v| v.join(", ")),
            "geo" => self.geo.clone(),
            _ => None,
        }
    }
}

/// Persistent Lead record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Lead {
    pub id: i64,
    pub idempotency_key: String,
    pub email: String,
    pub campaign_id: String,
    pub name: Option<String>,
    pub enrichment_data: Option<EnrichmentData>,
    pub status: LeadStatus,
    pub fit_score: Option<u8>,
    pub intent: Option<Intent>,
    pub reasoning: Option<String>,
    pub evidence: Vec<Evidence>,
    pub grounding_status: Option<GroundingStatus>,
    pub grounding_errors: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Lead {
    pub fn new(email: impl Into<String>, campaign_id: impl Into<String>, name: Option<String>) -> Self {
        let email = email.into();
        let campaign_id = campaign_id.into();
        let now = Utc::now();
        Self {
            id: 0,
            idempotency_key: compute_lead_idempotency_key(&email, &campaign_id),
            email,
            campaign_id,
            name,
            enrichment_data: None,
            status: LeadStatus::Pending,
            fit_score: None,
            intent: None,
            reasoning: None,
            evidence: Vec::new(),
            grounding_status: None,
            grounding_errors: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Apply a status transition, rejecting illegal jumps (invariant 2).
    pub fn transition_to(&mut self, next: LeadStatus) -> Result<(), LeadError> {
        if !self.status.can_transition_to(next) {
            return Err(LeadError::InvalidTransition {
                from: format!("{:?}", self.status),
                to: format!("{:?}", next),
            });
        }
        self.status = next;
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Stamp the validated analysis onto the lead record (spec.md §4.5 step 4).
    pub fn apply_analysis(&mut self, analysis: &AnalysisResult) {
        self.fit_score = Some(analysis.fit_score);
        self.intent = Some(analysis.intent);
        self.reasoning = Some(analysis.reasoning.clone());
        self.evidence = analysis.evidence.clone();
        self.grounding_status = analysis.grounding_status;
        self.grounding_errors = analysis.grounding_errors.clone();
        self.updated_at = Utc::now();
    }

    /// Email domain, used for per-account rate limiting and enrichment lookups.
    pub fn email_domain(&self) -> Option<&str> {
        self.email.rsplit_once('@').map(|(_, domain)| domain)
    }
}

/// `SHA256(lowercase(email) || ":" || campaignId)`, case- and
/// whitespace-normalized on both sides (spec.md §8 round-trip property).
pub fn compute_lead_idempotency_key(email: &str, campaign_id: &str) -> String {
    let normalized_email = email.trim().to_lowercase();
    let normalized_campaign = campaign_id.trim().to_lowercase();
    let mut hasher = Sha256::new();
    hasher.update(normalized_email.as_bytes());
    hasher.update(b":");
    hasher.update(normalized_campaign.as_bytes());
    hex::encode(hasher.finalize())
}

/// Queue-resident job payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub job_id: String,
    pub lead_id: i64,
    pub attempt: u32,
    pub max_attempts: u32,
    pub first_seen_at: DateTime<Utc>,
    pub last_error: Option<String>,
}

impl Job {
    pub fn new(lead_id: i64, max_attempts: u32) -> Self {
        Self {
            job_id: uuid::Uuid::new_v4().to_string(),
            lead_id,
            attempt: 0,
            max_attempts,
            first_seen_at: Utc::now(),
            last_error: None,
        }
    }

    pub fn exhausted(&self) -> bool {
        self.attempt >= self.max_attempts
    }
}

/// Dead-letter entry recorded when a job's retries are exhausted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DlqEntry {
    pub original_job_id: String,
    pub lead_id: i64,
    pub error: String,
    pub attempts_made: u32,
    pub failed_at: DateTime<Utc>,
}

/// Append-only audit row. One is written per executed MCP tool call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrmSyncLog {
    pub id: i64,
    pub action: String,
    pub entity_type: String,
    pub entity_id: Option<String>,
    pub params: serde_json::Value,
    pub result: String,
    pub mcp_execution_id: String,
    pub idempotency_key: Option<String>,
    pub mock: bool,
    pub lead_id: Option<i64>,
    pub duration_ms: u64,
    pub error_message: Option<String>,
    pub timestamp: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn idempotency_key_is_case_and_whitespace_insensitive() {
        let a = compute_lead_idempotency_key(" Foo@Example.com ", " Campaign-1 ");
        let b = compute_lead_idempotency_key("foo@example.com", "campaign-1");
        assert_eq!(a, b);
    }

    #[test]
    fn status_transitions_are_monotone() {
        assert!(LeadStatus::Pending.can_transition_to(LeadStatus::Enriched));
        assert!(!LeadStatus::SyncedToCrm.can_transition_to(LeadStatus::Pending));
        assert!(!LeadStatus::AiRejected.can_transition_to(LeadStatus::SyncedToCrm));
    }

    #[test]
    fn lead_transition_rejects_illegal_jump() {
        let mut lead = Lead::new("a@b.com", "c1", None);
        let err = lead.transition_to(LeadStatus::SyncedToCrm).unwrap_err();
        assert!(matches!(err, LeadError::InvalidTransition { .. }));
    }

    #[test]
    fn evidence_field_leaf_strips_namespace() {
        let ev = Evidence::new(
            EvidenceSource::Enrichment,
            "enrichment.industry",
            "Fintech",
            ClaimType::Firmographic,
        );
        assert_eq!(ev.field_leaf(), "industry");
    }

    use proptest::prelude::*;

    proptest! {
        /// Two renderings of the same logical `(email, campaign)` pair —
        /// differing only in case or surrounding whitespace — always
        /// collapse to the same idempotency key (invariant 1's dedup key
        /// must not be case/whitespace sensitive).
        #[test]
        fn idempotency_key_ignores_case_and_padding(
            email in "[a-z]{3,8}@[a-z]{3,8}\\.com",
            campaign in "[a-z]{3,8}-[0-9]{1,3}",
            email_pad in "[ \t]{0,3}",
            campaign_pad in "[ \t]{0,3}",
        ) {
            let plain = compute_lead_idempotency_key(&email, &campaign);
            let padded_upper = compute_lead_idempotency_key(
                &format!("{email_pad}{}{email_pad}", email.to_uppercase()),
                &format!("{campaign_pad}{}{campaign_pad}", campaign.to_uppercase()),
            );
            prop_assert_eq!(plain, padded_upper);
        }
    }
}
