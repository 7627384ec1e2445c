//! Lead worker (spec.md §4.5): the consumer loop that leases jobs, drives
//! them through AI analysis, grounding, and the MCP, and reports the
//! outcome back to the queue.

use std::sync::Arc;
use std::time::{Duration, Instant};

use leadguard_core::{GroundingStatus, LeadRepository, LeadStatus};
use leadguard_grounding::GroundingValidator;
use leadguard_queue::{LeasedJob, QueueClient};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn, Instrument};

use crate::config::WorkerConfig;
use crate::error::WorkerError;
use crate::metrics;
use crate::orchestrator::{McpOrchestrator, McpOutcome};
use crate::plan::ActionPlanBuilder;
use crate::providers::{AiAnalysisRequest, AiProvider, EnrichmentProvider};

/// Consumes `config.queue_name` with `config.concurrency` parallel tasks
/// (spec.md §5 "Scheduling model"). Each leased job runs end-to-end on a
/// single task; the orchestrator itself has no internal parallelism, so
/// per-lead action order stays deterministic.
#[derive(Clone)]
pub struct Worker {
    queue: QueueClient,
    lead_repo: Arc<dyn LeadRepository>,
    ai_provider: Arc<dyn AiProvider>,
    enrichment_provider: Arc<dyn EnrichmentProvider>,
    grounding: GroundingValidator,
    orchestrator: Arc<McpOrchestrator>,
    config: WorkerConfig,
}

impl Worker {
    pub fn new(
        queue: QueueClient,
        lead_repo: Arc<dyn LeadRepository>,
        ai_provider: Arc<dyn AiProvider>,
        enrichment_provider: Arc<dyn EnrichmentProvider>,
        grounding: GroundingValidator,
        orchestrator: Arc<McpOrchestrator>,
        config: WorkerConfig,
    ) -> Self {
        Self {
            queue,
            lead_repo,
            ai_provider,
            enrichment_provider,
            grounding,
            orchestrator,
            config,
        }
    }

    /// Run `config.concurrency` lease loops until `cancellation` fires, then
    /// let in-flight jobs finish (spec.md §5 "Cancellation").
    pub async fn run(&self, cancellation: CancellationToken) {
        info!(
            queue = %self.config.queue_name,
            concurrency = self.config.concurrency,
            "worker starting"
        );
        let mut tasks = tokio::task::JoinSet::new();
        for worker_idx in 0..self.config.concurrency {
            let worker = self.clone();
            let cancellation = cancellation.clone();
            tasks.spawn(async move { worker.lease_loop(worker_idx, cancellation).await });
        }
        while tasks.join_next().await.is_some() {}
        info!("worker stopped");
    }

    async fn lease_loop(&self, worker_idx: usize, cancellation: CancellationToken) {
        loop {
            if cancellation.is_cancelled() {
                info!(worker_idx, "lease loop stopping: cancellation requested");
                return;
            }
            match self.queue.lease(&self.config.queue_name).await {
                Ok(Some(leased)) => self.process_leased_job(leased).await,
                Ok(None) => {}
                Err(err) => {
                    warn!(worker_idx, error = %err, "queue lease failed, backing off");
                    tokio::time::sleep(Duration::from_secs(1)).await;
                }
            }
        }
    }

    async fn process_leased_job(&self, leased: LeasedJob) {
        let job_id = leased.job.job_id.clone();
        let lead_id = leased.job.lead_id;
        let attempt = leased.job.attempt;
        let fallback = leased.clone();
        let span = tracing::info_span!("process_job", lead_id, job_id = %job_id, attempt);

        let outcome = tokio::time::timeout(self.config.wall_clock_cap, self.process_job(leased).instrument(span)).await;
        match outcome {
            Ok(Ok(())) => {}
            Ok(Err(err)) => {
                warn!(lead_id, error = %err, "job processing failed before disposition, requeueing");
                if let Err(fail_err) = self.queue.fail(fallback, err.to_string()).await {
                    warn!(error = %fail_err, "failed to requeue failed job");
                }
            }
            Err(_) => {
                warn!(
                    lead_id,
                    cap_secs = self.config.wall_clock_cap.as_secs(),
                    "job exceeded wall-clock cap"
                );
                if let Err(fail_err) = self.queue.fail(fallback, "wall-clock cap exceeded").await {
                    warn!(error = %fail_err, "failed to requeue timed-out job");
                }
            }
        }
    }

    /// Process one job to disposition. Every business outcome (ack or
    /// retry) is applied to the queue directly here and the function
    /// returns `Ok(())`; `Err` is reserved for failures that occur before
    /// any disposition has been made (so the caller's fallback-clone
    /// `fail` is the only queue mutation for that job).
    async fn process_job(&self, leased: LeasedJob) -> Result<(), WorkerError> {
        let lead_id = leased.job.lead_id;

        let mut lead = match self.lead_repo.find_by_id(lead_id).await? {
            Some(lead) => lead,
            None => {
                warn!(lead_id, "lead not found, dropping job (non-retryable)");
                metrics::leads_processed("lead_not_found");
                self.queue.ack(&leased).await?;
                return Ok(());
            }
        };

        if lead.status == LeadStatus::Pending {
            let enrichment = match lead.email_domain() {
                Some(domain) => match self.enrichment_provider.get_company_by_domain(domain).await {
                    Ok(record) => record,
                    Err(err) => {
                        warn!(lead_id, error = %err, "enrichment lookup failed, treating as absent");
                        None
                    }
                },
                None => None,
            };

            let request = AiAnalysisRequest {
                email: lead.email.clone(),
                name: lead.name.clone(),
                campaign_id: lead.campaign_id.clone(),
                enrichment: enrichment.clone(),
            };
            let started = Instant::now();
            let provider_result = self.ai_provider.analyze_lead(&request).await;
            metrics::ai_analysis_duration(started.elapsed().as_secs_f64());

            // A provider exception is itself a terminal grounding fallback
            // (spec.md §4.2 Notes) and must not be run back through
            // `validate`: the fallback has no evidence, so the rule chain
            // would fall through to the final `Valid` branch and silently
            // erase the rejection.
            let validated = match provider_result {
                Ok(analysis) => self.grounding.validate(analysis, enrichment.as_ref()),
                Err(err) => {
                    warn!(lead_id, error = %err, "AI provider failed, falling back to manual review");
                    self.grounding.reject_provider_error(err.to_string())
                }
            };
            metrics::grounding_decision(grounding_status_label(validated.grounding_status));

            lead.apply_analysis(&validated);
            lead.enrichment_data = enrichment;
            lead.transition_to(LeadStatus::Enriched)?;
            self.lead_repo.save(&mut lead).await?;
        }

        if lead.grounding_status == Some(GroundingStatus::Rejected) {
            if lead.status != LeadStatus::AiRejected {
                lead.transition_to(LeadStatus::AiRejected)?;
                self.lead_repo.save(&mut lead).await?;
            }
            metrics::leads_processed("ai_rejected");
            self.queue.ack(&leased).await?;
            return Ok(());
        }

        let plan = ActionPlanBuilder::build(&lead, lead.enrichment_data.clone().as_ref());
        let outcome = self.orchestrator.execute(&lead, plan).await;

        match outcome {
            McpOutcome::Completed { errors, .. } => {
                if !errors.is_empty() {
                    warn!(lead_id, ?errors, "MCP completed with non-critical action errors");
                }
                lead.transition_to(LeadStatus::SyncedToCrm)?;
                self.lead_repo.save(&mut lead).await?;
                metrics::leads_processed("synced_to_crm");
                self.queue.ack(&leased).await?;
            }
            McpOutcome::RateLimited { retry_after, violated_tiers } => {
                warn!(lead_id, ?violated_tiers, retry_after_secs = retry_after.as_secs(), "MCP rate limited");
                if lead.status != LeadStatus::McpBlocked {
                    lead.transition_to(LeadStatus::McpBlocked)?;
                    self.lead_repo.save(&mut lead).await?;
                }
                metrics::leads_processed("rate_limited");
                self.queue
                    .fail_with_min_delay(
                        leased,
                        format!("rate limited: {}", violated_tiers.join(", ")),
                        retry_after,
                    )
                    .await?;
            }
            McpOutcome::Blocked { errors, non_retryable, .. } => {
                warn!(lead_id, ?errors, non_retryable, "MCP blocked");
                if lead.status != LeadStatus::McpBlocked {
                    lead.transition_to(LeadStatus::McpBlocked)?;
                    self.lead_repo.save(&mut lead).await?;
                }
                metrics::leads_processed("mcp_blocked");
                if non_retryable {
                    // Safety-guard and schema-validation rejections are a
                    // pure function of this lead and plan (spec.md §7
                    // "Validation ... no retry"); retrying would only burn
                    // every configured attempt before landing in the DLQ
                    // for a verdict that can never change.
                    self.queue.ack(&leased).await?;
                } else {
                    self.queue.fail(leased, errors.join("; ")).await?;
                }
            }
        }

        Ok(())
    }
}

fn grounding_status_label(status: Option<GroundingStatus>) -> &'static str {
    match status {
        Some(GroundingStatus::Valid) => "valid",
        Some(GroundingStatus::Downgraded) => "downgraded",
        Some(GroundingStatus::Rejected) => "rejected",
        None => "unknown",
    }
}
