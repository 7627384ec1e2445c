//! Deterministic evidence-grounding validator.
//!
//! Applies the rule order from spec.md §4.2 to an [`AnalysisResult`]: any
//! evidence item citing a source outside the closed set, or a firmographic
//! claim that conflicts with (or lacks) the enrichment record, hard-rejects
//! the analysis before it can reach the MCP. A high-intent claim lacking
//! behavioral evidence is downgraded rather than rejected. The engine is
//! free of probabilistic side effects: identical input always yields the
//! identical `grounding_status`.

#![forbid(unsafe_code)]

use leadguard_core::{AnalysisResult, ClaimType, EnrichmentData, Evidence, GroundingStatus, Intent};
use tracing::{info, warn};

/// Tunable thresholds for the downgrade rule. Defaults match spec.md §4.2
/// rule 4 verbatim (`fitScore := min(fitScore, 70)`).
#[derive(Debug, Clone)]
pub struct GroundingConfig {
    pub high_intent_downgrade_cap: u8,
}

impl Default for GroundingConfig {
    fn default() -> Self {
        Self {
            high_intent_downgrade_cap: 70,
        }
    }
}

/// Stateless, deterministic evidence-grounding engine.
#[derive(Debug, Clone, Default)]
pub struct GroundingValidator {
    config: GroundingConfig,
}

impl GroundingValidator {
    pub fn new(config: GroundingConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &GroundingConfig {
        &self.config
    }

    /// Validate `analysis` against `enrichment`, stamping `grounding_status`
    /// and `grounding_errors` (and, on downgrade, mutating `intent`/`fit_score`).
    ///
    /// Rules run in the fixed order from spec.md §4.2; the first hard rule
    /// that fires short-circuits the rest.
    pub fn validate(
        &self,
        mut analysis: AnalysisResult,
        enrichment: Option<&EnrichmentData>,
    ) -> AnalysisResult {
        if let Some(reason) = self.check_unauthorized_source(&analysis.evidence) {
            return self.reject(analysis, reason);
        }

        if let Some(reason) = self.check_firmographic_without_enrichment(&analysis.evidence, enrichment) {
            return self.reject(analysis, reason);
        }

        if let Some(reason) =
            self.check_firmographic_conflict(&analysis.evidence, enrichment)
        {
            return self.reject(analysis, reason);
        }

        if let Some(reason) = self.check_high_intent_requires_behavior(&analysis) {
            analysis.intent = Intent::MediumFit;
            analysis.fit_score = analysis.fit_score.min(self.config.high_intent_downgrade_cap);
            analysis.grounding_status = Some(GroundingStatus::Downgraded);
            analysis.grounding_errors.push(reason.clone());
            info!(reason = %reason, "grounding downgraded analysis");
            return analysis;
        }

        analysis.grounding_status = Some(GroundingStatus::Valid);
        analysis
    }

    /// Fallback applied when the AI provider itself raised an exception
    /// (spec.md §4.2 Notes / §7 Unknown).
    pub fn reject_provider_error(&self, message: impl Into<String>) -> AnalysisResult {
        AnalysisResult::fallback_rejected(message.into())
    }

    fn reject(&self, mut analysis: AnalysisResult, reason: String) -> AnalysisResult {
        warn!(reason = %reason, "grounding rejected analysis");
        analysis.grounding_status = Some(GroundingStatus::Rejected);
        analysis.grounding_errors.push(reason);
        analysis
    }

    /// Rule 1 (hard): any evidence source outside the closed set.
    /// `EvidenceSource::Unauthorized` carries the raw string a provider cited
    /// that didn't match one of the five authorized members.
    fn check_unauthorized_source(&self, evidence: &[Evidence]) -> Option<String> {
        evidence.iter().find_map(|e| match &e.source {
            leadguard_core::EvidenceSource::Unauthorized(raw) => {
                Some(format!("unauthorized source: {raw}"))
            }
            _ => None,
        })
    }

    /// Rule 2 (hard): firmographic claims require an available enrichment record.
    fn check_firmographic_without_enrichment(
        &self,
        evidence: &[Evidence],
        enrichment: Option<&EnrichmentData>,
    ) -> Option<String> {
        let has_firmographic = evidence.iter().any(|e| e.claim_type == ClaimType::Firmographic);
        if has_firmographic && enrichment.is_none() {
            return Some("firmographic claims without available enrichment".to_string());
        }
        None
    }

    /// Rule 3 (hard): enrichment-sourced firmographic claims must not
    /// contradict the trusted enrichment record. Uses case-insensitive
    /// substring containment in either direction so minor lexical variants
    /// ("Fintech" vs "FinTech Services") do not false-reject. A missing
    /// trusted field is skipped, not fatal (spec.md Open Question — fixed as
    /// "skip" per the reference behaviour).
    fn check_firmographic_conflict(
        &self,
        evidence: &[Evidence],
        enrichment: Option<&EnrichmentData>,
    ) -> Option<String> {
        let enrichment = enrichment?;
        for e in evidence {
            if e.claim_type != ClaimType::Firmographic {
                continue;
            }
            if !matches!(&e.source, leadguard_core::EvidenceSource::Enrichment) {
                continue;
            }
            let Some(trusted) = enrichment.field(e.field_leaf()) else {
                continue;
            };
            let claimed = e.value.as_comparable_string();
            if !contains_ci(&trusted, &claimed) && !contains_ci(&claimed, &trusted) {
                return Some(format!(
                    "Hallucination detected: claimed '{}' for {} does not match trusted value '{}'",
                    claimed, e.field_path, trusted
                ));
            }
        }
        None
    }

    /// Rule 4 (soft): HIGH_FIT intent requires at least one behavioral/computed
    /// evidence item.
    fn check_high_intent_requires_behavior(&self, analysis: &AnalysisResult) -> Option<String> {
        if analysis.intent != Intent::HighFit {
            return None;
        }
        let has_behavioral = analysis.evidence.iter().any(|e| e.source.is_behavioral());
        if has_behavioral {
            return None;
        }
        Some("High Intent requires at least one behavioral/computed evidence item.".to_string())
    }
}

fn contains_ci(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;
    use leadguard_core::{AnalysisResult, Decision, EvidenceSource};

    fn enrichment_with_industry(industry: &str) -> EnrichmentData {
        EnrichmentData {
            industry: Some(industry.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn valid_high_fit_with_behavioral_evidence() {
        let validator = GroundingValidator::default();
        let analysis = AnalysisResult::new(
            90,
            Intent::HighFit,
            Decision::RouteToSdr,
            "strong fit",
            vec![
                Evidence::new(
                    EvidenceSource::Enrichment,
                    "enrichment.industry",
                    "Fintech",
                    ClaimType::Firmographic,
                ),
                Evidence::new(
                    EvidenceSource::Marketo,
                    "marketo.campaign_id",
                    "launch",
                    ClaimType::Behavior,
                ),
            ],
        );
        let result = validator.validate(analysis, Some(&enrichment_with_industry("Fintech")));
        assert_eq!(result.grounding_status, Some(GroundingStatus::Valid));
        assert_eq!(result.intent, Intent::HighFit);
    }

    #[test]
    fn unauthorized_source_is_rejected() {
        let validator = GroundingValidator::default();
        let analysis = AnalysisResult::new(
            60,
            Intent::MediumFit,
            Decision::RouteToSdr,
            "cites a web search",
            vec![Evidence::new(
                EvidenceSource::Unauthorized("WEB_SEARCH".to_string()),
                "web.result",
                "looks promising",
                ClaimType::Behavior,
            )],
        );
        let result = validator.validate(analysis, None);
        assert_eq!(result.grounding_status, Some(GroundingStatus::Rejected));
        assert!(result.grounding_errors[0].contains("unauthorized source"));
        assert!(result.grounding_errors[0].contains("WEB_SEARCH"));
    }

    #[test]
    fn firmographic_conflict_is_rejected() {
        let validator = GroundingValidator::default();
        let analysis = AnalysisResult::new(
            80,
            Intent::MediumFit,
            Decision::RouteToSdr,
            "claims healthcare",
            vec![Evidence::new(
                EvidenceSource::Enrichment,
                "enrichment.industry",
                "Healthcare",
                ClaimType::Firmographic,
            )],
        );
        let result = validator.validate(analysis, Some(&enrichment_with_industry("Fintech")));
        assert_eq!(result.grounding_status, Some(GroundingStatus::Rejected));
        assert!(result.grounding_errors[0].contains("Hallucination detected"));
    }

    #[test]
    fn firmographic_without_enrichment_is_rejected() {
        let validator = GroundingValidator::default();
        let analysis = AnalysisResult::new(
            70,
            Intent::MediumFit,
            Decision::RouteToSdr,
            "claims software",
            vec![Evidence::new(
                EvidenceSource::Enrichment,
                "enrichment.industry",
                "Software",
                ClaimType::Firmographic,
            )],
        );
        let result = validator.validate(analysis, None);
        assert_eq!(result.grounding_status, Some(GroundingStatus::Rejected));
        assert!(result.grounding_errors[0].contains("firmographic claims without available enrichment"));
    }

    #[test]
    fn high_fit_without_behavior_is_downgraded() {
        let validator = GroundingValidator::default();
        let analysis = AnalysisResult::new(
            95,
            Intent::HighFit,
            Decision::RouteToSdr,
            "claims fintech only",
            vec![Evidence::new(
                EvidenceSource::Enrichment,
                "enrichment.industry",
                "Fintech",
                ClaimType::Firmographic,
            )],
        );
        let result = validator.validate(analysis, Some(&enrichment_with_industry("Fintech")));
        assert_eq!(result.grounding_status, Some(GroundingStatus::Downgraded));
        assert_eq!(result.intent, Intent::MediumFit);
        assert!(result.fit_score <= 70);
    }

    #[test]
    fn missing_trusted_field_is_skipped_not_fatal() {
        let validator = GroundingValidator::default();
        let analysis = AnalysisResult::new(
            60,
            Intent::MediumFit,
            Decision::Nurture,
            "claims employee count",
            vec![Evidence::new(
                EvidenceSource::Enrichment,
                "enrichment.employees",
                "500",
                ClaimType::Firmographic,
            )],
        );
        // enrichment record has no `employees` field populated.
        let result = validator.validate(analysis, Some(&enrichment_with_industry("Fintech")));
        assert_eq!(result.grounding_status, Some(GroundingStatus::Valid));
    }

    #[test]
    fn provider_error_falls_back_to_manual_review() {
        let validator = GroundingValidator::default();
        let result = validator.reject_provider_error("provider timeout");
        assert_eq!(result.grounding_status, Some(GroundingStatus::Rejected));
        assert_eq!(result.intent, Intent::ManualReview);
        assert_eq!(result.decision, Decision::Ignore);
        assert_eq!(result.fit_score, 0);
    }
}
