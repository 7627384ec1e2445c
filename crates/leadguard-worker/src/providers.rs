//! External-collaborator interfaces (spec.md §6): the AI model and the
//! enrichment provider. Both are out of scope as concrete integrations;
//! this crate defines the interface and a mock conforming to it, in the
//! style of `ibank-core::connectors::SettlementConnector`.

use async_trait::async_trait;
use leadguard_core::{AnalysisResult, Decision, EnrichmentData, Evidence, Intent};

use crate::error::WorkerError;

/// Everything the AI collaborator needs to analyze one lead.
#[derive(Debug, Clone)]
pub struct AiAnalysisRequest {
    pub email: String,
    pub name: Option<String>,
    pub campaign_id: String,
    pub enrichment: Option<EnrichmentData>,
}

/// `analyzeLead(partialLead, enrichment?) -> AnalysisResult` (spec.md §6).
/// Implementations must honour the evidence-schema contract; any error
/// returned here is absorbed by the caller as a grounding rejection, never
/// propagated raw to the job queue.
#[async_trait]
pub trait AiProvider: Send + Sync {
    fn name(&self) -> &'static str;

    async fn analyze_lead(&self, request: &AiAnalysisRequest) -> Result<AnalysisResult, WorkerError>;
}

/// `getCompanyByDomain(domain) -> CompanyData?` (spec.md §6).
#[async_trait]
pub trait EnrichmentProvider: Send + Sync {
    fn name(&self) -> &'static str;

    async fn get_company_by_domain(&self, domain: &str) -> Result<Option<EnrichmentData>, WorkerError>;
}

/// Deterministic mock AI provider for local development and tests. Scores
/// a lead `HIGH_FIT` with a single firmographic claim when enrichment is
/// present (citing it honestly, never inventing a value), otherwise
/// `MEDIUM_FIT` on computed evidence only.
#[derive(Debug, Clone, Default)]
pub struct MockAiProvider;

#[async_trait]
impl AiProvider for MockAiProvider {
    fn name(&self) -> &'static str {
        "mock"
    }

    async fn analyze_lead(&self, request: &AiAnalysisRequest) -> Result<AnalysisResult, WorkerError> {
        match &request.enrichment {
            Some(enrichment) => {
                let mut evidence = vec![];
                if let Some(industry) = &enrichment.industry {
                    evidence.push(Evidence::new(
                        leadguard_core::EvidenceSource::Enrichment,
                        "enrichment.industry",
                        industry.clone(),
                        leadguard_core::ClaimType::Firmographic,
                    ));
                }
                evidence.push(Evidence::new(
                    leadguard_core::EvidenceSource::Computed,
                    "computed.signup_velocity",
                    "high",
                    leadguard_core::ClaimType::Behavior,
                ));
                Ok(AnalysisResult::new(
                    85,
                    Intent::HighFit,
                    Decision::RouteToSdr,
                    "Enriched firmographics and elevated signup velocity indicate a strong ICP fit.",
                    evidence,
                ))
            }
            None => Ok(AnalysisResult::new(
                40,
                Intent::MediumFit,
                Decision::Nurture,
                "No firmographic enrichment available; scored on behavioural signal alone.",
                vec![Evidence::new(
                    leadguard_core::EvidenceSource::Computed,
                    "computed.signup_velocity",
                    "moderate",
                    leadguard_core::ClaimType::Behavior,
                )],
            )),
        }
    }
}

/// In-memory enrichment provider keyed by domain, for local development and
/// tests. A production deployment swaps this for a real vendor client
/// behind the same trait.
#[derive(Debug, Clone, Default)]
pub struct StaticEnrichmentProvider {
    records: std::collections::HashMap<String, EnrichmentData>,
}

impl StaticEnrichmentProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_record(mut self, domain: impl Into<String>, record: EnrichmentData) -> Self {
        self.records.insert(domain.into(), record);
        self
    }
}

#[async_trait]
impl EnrichmentProvider for StaticEnrichmentProvider {
    fn name(&self) -> &'static str {
        "static"
    }

    async fn get_company_by_domain(&self, domain: &str) -> Result<Option<EnrichmentData>, WorkerError> {
        Ok(self.records.get(domain).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn mock_ai_provider_cites_enrichment_honestly() {
        let provider = MockAiProvider;
        let request = AiAnalysisRequest {
            email: "a@acme.com".to_string(),
            name: Some("Ada Lovelace".to_string()),
            campaign_id: "camp-1".to_string(),
            enrichment: Some(EnrichmentData {
                industry: Some("Fintech".to_string()),
                ..Default::default()
            }),
        };
        let result = provider.analyze_lead(&request).await.unwrap();
        assert_eq!(result.intent, Intent::HighFit);
        assert!(result
            .evidence
            .iter()
            .any(|e| e.field_leaf() == "industry" && e.value.as_comparable_string() == "Fintech"));
    }

    #[tokio::test]
    async fn static_enrichment_provider_looks_up_by_domain() {
        let provider = StaticEnrichmentProvider::new().with_record(
            "acme.com",
            EnrichmentData {
                industry: Some("Fintech".to_string()),
                ..Default::default()
            },
        );
        let found = provider.get_company_by_domain("acme.com").await.unwrap();
        assert!(found.is_some());
        assert!(provider.get_company_by_domain("other.com").await.unwrap().is_none());
    }
}
