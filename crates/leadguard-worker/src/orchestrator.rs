//! MCP orchestrator (spec.md §4.5): drives an action plan through the
//! Safety Guard, the tiered rate limiter, the circuit breaker registry, the
//! idempotency store, and the tool registry/executor, writing one audit row
//! per executed action.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use leadguard_core::{CrmSyncLog, Lead, SyncLogRepository};
use leadguard_guard::{
    CallOutcome, CircuitBreakerRegistry, GuardContext, IdempotencyStore, KeyMode, PiiRedactor, RateLimiterConfig,
    SafetyGuard, TieredRateLimiter,
};
use leadguard_tools::params::*;
use leadguard_tools::{CrmExecutor, CrmResult, ToolName, ToolRegistry};
use tracing::{info, warn};
use uuid::Uuid;

use crate::metrics;
use crate::plan::PlannedAction;

/// Result of driving one action plan through the MCP.
#[derive(Debug)]
pub enum McpOutcome {
    /// The plan ran to completion. `errors` holds any non-critical action
    /// failures collected along the way (spec.md §7 "Propagation").
    Completed { execution_id: String, errors: Vec<String> },
    /// A tier of the rate limiter was violated before any action executed
    /// for this invocation; the caller should re-queue honouring
    /// `retry_after` as a minimum delay.
    RateLimited { retry_after: Duration, violated_tiers: Vec<String> },
    /// A safety violation, or a critical action's failure, halted the plan.
    Blocked {
        execution_id: String,
        halt: bool,
        errors: Vec<String>,
        /// `true` for a Safety Guard or schema-validation rejection: a pure
        /// function of this same lead and plan, so retrying it can never
        /// succeed (spec.md §7 "Validation ... no retry"). `false` for a
        /// transient critical-executor failure, which is retryable until
        /// attempts exhaust.
        non_retryable: bool,
    },
}

/// Composes the MCP's components around a single pluggable executor
/// (spec.md §4.3 + §4.4). One orchestrator instance is built per configured
/// `CRM_PROVIDER` and shared across worker tasks.
pub struct McpOrchestrator {
    safety: SafetyGuard,
    rate_limiter: TieredRateLimiter,
    circuit_breakers: CircuitBreakerRegistry,
    idempotency: IdempotencyStore,
    registry: ToolRegistry,
    executor: Arc<dyn CrmExecutor>,
    redactor: PiiRedactor,
    sync_log: Arc<dyn SyncLogRepository>,
    idempotency_ttl_hours: u32,
}

impl McpOrchestrator {
    pub fn new(
        executor: Arc<dyn CrmExecutor>,
        sync_log: Arc<dyn SyncLogRepository>,
        rate_limiter: TieredRateLimiter,
        idempotency: IdempotencyStore,
        idempotency_ttl_hours: u32,
    ) -> Result<Self, leadguard_tools::ToolError> {
        let safety = SafetyGuard::new();
        let registry = ToolRegistry::with_default_tools(&safety)?;
        Ok(Self {
            safety,
            rate_limiter,
            circuit_breakers: CircuitBreakerRegistry::new(Default::default()),
            idempotency,
            registry,
            executor,
            redactor: PiiRedactor::default(),
            sync_log,
            idempotency_ttl_hours,
        })
    }

    pub fn provider(&self) -> &'static str {
        self.executor.provider()
    }

    /// Drive `plan` for `lead` through the full MCP pipeline in order.
    /// Assumes the caller has already confirmed `lead.grounding_status !=
    /// REJECTED` (invariant 3: a rejected lead never reaches the MCP).
    ///
    /// The per-lead/per-account/global rate-limiter tiers gate the whole
    /// invocation once, up front; only the per-provider tier is checked
    /// again for each dispatched executor call (spec.md §4.4).
    pub async fn execute(&self, lead: &Lead, plan: Vec<PlannedAction>) -> McpOutcome {
        let execution_id = Uuid::new_v4().to_string();
        let account_key = lead.email_domain().unwrap_or("unknown").to_string();
        let mut errors = Vec::new();

        let decision = self.rate_limiter.check_invocation(lead.id, &account_key).await;
        if !decision.allowed {
            return rate_limited_outcome(&decision);
        }

        for action in plan {
            let tool_name = action.tool.as_str();

            let ctx = GuardContext {
                grounding_status: lead.grounding_status,
                lead_email: Some(lead.email.clone()),
                execution_id: Some(execution_id.clone()),
                lead_id: Some(lead.id),
                timestamp: Utc::now(),
            };
            if let Err(violation) = self.safety.check_context(&ctx) {
                metrics::safety_block(tool_name, &violation.to_string());
                warn!(tool = tool_name, %violation, "MCP context rejected by safety guard");
                return McpOutcome::Blocked {
                    execution_id,
                    halt: true,
                    errors: vec![violation.to_string()],
                    non_retryable: true,
                };
            }
            if let Err(violation) = self.safety.check_tool_name(tool_name) {
                metrics::safety_block(tool_name, &violation.to_string());
                return McpOutcome::Blocked {
                    execution_id,
                    halt: true,
                    errors: vec![violation.to_string()],
                    non_retryable: true,
                };
            }
            if let Err(violation) = self.safety.check_params(&action.params) {
                metrics::safety_block(tool_name, &violation.to_string());
                return McpOutcome::Blocked {
                    execution_id,
                    halt: true,
                    errors: vec![violation.to_string()],
                    non_retryable: true,
                };
            }

            if let Err(err) = self.registry.validate_params(tool_name, &action.params) {
                errors.push(err.to_string());
                if action.critical {
                    return McpOutcome::Blocked {
                        execution_id,
                        halt: true,
                        errors,
                        non_retryable: true,
                    };
                }
                continue;
            }

            let breaker = self.circuit_breakers.get_or_create(self.provider(), tool_name);
            metrics::circuit_breaker_state(self.provider(), tool_name, breaker.state().as_gauge_value());
            if !breaker.allow_request() {
                let message = format!("circuit breaker open for {}:{}", self.provider(), tool_name);
                errors.push(message.clone());
                self.record_audit(
                    &execution_id,
                    lead,
                    &action,
                    None,
                    None,
                    Some(message),
                    false,
                    Duration::ZERO,
                )
                .await;
                metrics::mcp_action(tool_name, "breaker_open", self.provider());
                if action.critical {
                    return McpOutcome::Blocked {
                        execution_id,
                        halt: true,
                        errors,
                        non_retryable: false,
                    };
                }
                continue;
            }

            let key_mode = if action.tool == ToolName::UpsertLead {
                KeyMode::Stable
            } else {
                KeyMode::Windowed { window_minutes: 60 }
            };
            let idempotency_key =
                IdempotencyStore::compute_key(&lead.email, Some(&lead.campaign_id), tool_name, key_mode);
            let processed = self.idempotency.is_processed(&idempotency_key).await;

            let started = Instant::now();
            let result = if processed.processed {
                info!(tool = tool_name, %idempotency_key, "idempotent replay, skipping executor call");
                processed
                    .result
                    .and_then(|v| serde_json::from_value::<CrmResult>(v).ok())
                    .unwrap_or_else(|| CrmResult::ok("cached", true))
            } else {
                let provider_decision = self.rate_limiter.check_provider(self.provider()).await;
                if !provider_decision.allowed {
                    return rate_limited_outcome(&provider_decision);
                }

                match tokio::time::timeout(breaker.timeout(), self.dispatch(action.tool, &action.params)).await {
                    Ok(Ok(result)) => result,
                    Ok(Err(err)) => CrmResult::failed(err.to_string(), false),
                    Err(_) => CrmResult::failed(
                        format!("executor call timed out after {:?}", breaker.timeout()),
                        false,
                    ),
                }
            };
            let elapsed = started.elapsed();

            let outcome = if result.success {
                CallOutcome::Success
            } else if result.is_client_fault() {
                CallOutcome::ClientError
            } else {
                CallOutcome::Failure
            };
            breaker.record(outcome);

            let status_label = if result.success { "success" } else { "failure" };
            metrics::mcp_action(tool_name, status_label, self.provider());
            metrics::mcp_action_duration(tool_name, self.provider(), elapsed.as_secs_f64());
            metrics::mcp_crm_api_duration(self.provider(), tool_name, status_label, elapsed.as_secs_f64());

            if !processed.processed && result.success {
                if let Ok(value) = serde_json::to_value(&result) {
                    self.idempotency
                        .store_result(&idempotency_key, value, self.idempotency_ttl_hours)
                        .await;
                }
            }

            self.record_audit(
                &execution_id,
                lead,
                &action,
                Some(idempotency_key.clone()),
                result.crm_record_id.clone(),
                result.error.clone(),
                result.mock,
                elapsed,
            )
            .await;

            if !result.success {
                errors.push(result.error.clone().unwrap_or_else(|| "unknown executor error".to_string()));
                if action.critical {
                    return McpOutcome::Blocked {
                        execution_id,
                        halt: true,
                        errors,
                        non_retryable: false,
                    };
                }
            }
        }

        McpOutcome::Completed { execution_id, errors }
    }

    #[allow(clippy::too_many_arguments)]
    async fn record_audit(
        &self,
        execution_id: &str,
        lead: &Lead,
        action: &PlannedAction,
        idempotency_key: Option<String>,
        entity_id: Option<String>,
        error_message: Option<String>,
        mock: bool,
        elapsed: Duration,
    ) {
        let entry = CrmSyncLog {
            id: 0,
            action: action.tool.as_str().to_string(),
            entity_type: entity_type_for(action.tool).to_string(),
            entity_id,
            params: self.redactor.redact_json(&action.params),
            result: if error_message.is_some() { "failure".to_string() } else { "success".to_string() },
            mcp_execution_id: execution_id.to_string(),
            idempotency_key,
            mock,
            lead_id: Some(lead.id),
            duration_ms: elapsed.as_millis() as u64,
            error_message,
            timestamp: Utc::now(),
        };
        if let Err(err) = self.sync_log.record(entry).await {
            warn!(error = %err, "failed to persist CRM sync log row");
        }
    }

    async fn dispatch(&self, tool: ToolName, params: &serde_json::Value) -> Result<CrmResult, leadguard_tools::ToolError> {
        macro_rules! call {
            ($variant:ident, $method:ident) => {{
                let typed: $variant = serde_json::from_value(params.clone())
                    .map_err(|e| leadguard_tools::ToolError::ParamsInvalid {
                        tool: tool.as_str().to_string(),
                        errors: e.to_string(),
                    })?;
                self.executor.$method(&typed).await
            }};
        }
        match tool {
            ToolName::CreateLead => call!(CreateLeadParams, create_lead),
            ToolName::UpsertLead => call!(UpsertLeadParams, upsert_lead),
            ToolName::ConvertLead => call!(ConvertLeadParams, convert_lead),
            ToolName::UpdateLeadStatus => call!(UpdateLeadStatusParams, update_lead_status),
            ToolName::UpdateLeadFields => call!(UpdateLeadFieldsParams, update_lead_fields),
            ToolName::SetLeadScore => call!(SetLeadScoreParams, set_lead_score),
            ToolName::MatchAccount => call!(MatchAccountParams, match_account),
            ToolName::CreateContact => call!(CreateContactParams, create_contact),
            ToolName::LinkContactToAccount => call!(LinkContactToAccountParams, link_contact_to_account),
            ToolName::CreateOpportunity => call!(CreateOpportunityParams, create_opportunity),
            ToolName::UpdateOpportunityStage => call!(UpdateOpportunityStageParams, update_opportunity_stage),
            ToolName::SetOpportunityValue => call!(SetOpportunityValueParams, set_opportunity_value),
            ToolName::AttachCampaign => call!(AttachCampaignParams, attach_campaign),
            ToolName::CreateTask => call!(CreateTaskParams, create_task),
            ToolName::LogActivity => call!(LogActivityParams, log_activity),
            ToolName::AddNote => call!(AddNoteParams, add_note),
            ToolName::CreateFollowUp => call!(CreateFollowUpParams, create_follow_up),
            ToolName::SyncFirmographics => call!(SyncFirmographicsParams, sync_firmographics),
        }
    }
}

fn entity_type_for(tool: ToolName) -> &'static str {
    match tool {
        ToolName::CreateLead
        | ToolName::UpsertLead
        | ToolName::ConvertLead
        | ToolName::UpdateLeadStatus
        | ToolName::UpdateLeadFields
        | ToolName::SetLeadScore
        | ToolName::SyncFirmographics => "lead",
        ToolName::MatchAccount => "account",
        ToolName::CreateContact | ToolName::LinkContactToAccount => "contact",
        ToolName::CreateOpportunity | ToolName::UpdateOpportunityStage | ToolName::SetOpportunityValue => {
            "opportunity"
        }
        ToolName::AttachCampaign => "campaign",
        ToolName::CreateTask | ToolName::CreateFollowUp => "task",
        ToolName::LogActivity => "activity",
        ToolName::AddNote => "note",
    }
}

/// Default rate limiter tuning, re-exported for callers assembling an
/// [`McpOrchestrator`] without overriding the defaults.
pub fn default_rate_limiter_config() -> RateLimiterConfig {
    RateLimiterConfig::default()
}

fn rate_limited_outcome(decision: &leadguard_guard::RateLimitDecision) -> McpOutcome {
    for tier in decision.tiers.iter().filter(|t| t.violated) {
        metrics::rate_limit_violation(tier.tier);
    }
    let retry_after = decision
        .tiers
        .iter()
        .filter(|t| t.violated)
        .map(|t| (t.reset_at - Utc::now()).to_std().unwrap_or(Duration::from_secs(1)))
        .max()
        .unwrap_or(Duration::from_secs(60));
    McpOutcome::RateLimited {
        retry_after,
        violated_tiers: decision.violated_tiers.clone(),
    }
}
