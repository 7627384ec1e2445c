//! End-to-end coverage of the MCP orchestrator driving a full action plan
//! against a mock executor, with a real Redis-backed rate limiter and
//! idempotency store. Requires a reachable `REDIS_URL` (defaults to
//! `redis://127.0.0.1:6379`), so these are `#[ignore]`d by default.

use std::sync::Arc;

use leadguard_core::{Lead, SyncLogRepository};
use leadguard_guard::{IdempotencyStore, RateLimiterConfig, TierLimit, TieredRateLimiter};
use leadguard_storage::InMemorySyncLogStore;
use leadguard_tools::MockCrmExecutor;
use leadguard_worker::{ActionPlanBuilder, McpOrchestrator, McpOutcome};

fn redis_url() -> String {
    std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://127.0.0.1:6379".to_string())
}

async fn connection() -> redis::aio::ConnectionManager {
    let client = redis::Client::open(redis_url()).expect("valid redis url");
    redis::aio::ConnectionManager::new(client)
        .await
        .expect("redis reachable for integration test")
}

#[tokio::test]
#[ignore] // Requires a running Redis instance
async fn full_plan_executes_in_order_against_mock_crm() {
    let sync_log: Arc<dyn SyncLogRepository> = Arc::new(InMemorySyncLogStore::new());
    let rate_limiter = TieredRateLimiter::new(connection().await, RateLimiterConfig::default());
    let idempotency = IdempotencyStore::new(connection().await);

    let orchestrator = McpOrchestrator::new(
        Arc::new(MockCrmExecutor),
        sync_log.clone(),
        rate_limiter,
        idempotency,
        48,
    )
    .expect("default tool registry builds cleanly");

    let mut lead = Lead::new("ada@example.com", "launch-campaign", Some("Ada Lovelace".to_string()));
    lead.id = 1;
    lead.fit_score = Some(85);

    let plan = ActionPlanBuilder::build(&lead, None);
    assert_eq!(plan.len(), 3, "upsert_lead, set_lead_score, log_activity");

    match orchestrator.execute(&lead, plan).await {
        McpOutcome::Completed { errors, .. } => assert!(errors.is_empty()),
        other => panic!("expected the full plan to complete, got {other:?}"),
    }
}

#[tokio::test]
#[ignore] // Requires a running Redis instance
async fn repeated_execution_is_idempotent_per_lead() {
    let sync_log: Arc<dyn SyncLogRepository> = Arc::new(InMemorySyncLogStore::new());
    let rate_limiter = TieredRateLimiter::new(connection().await, RateLimiterConfig::default());
    let idempotency = IdempotencyStore::new(connection().await);

    let orchestrator = McpOrchestrator::new(
        Arc::new(MockCrmExecutor),
        sync_log,
        rate_limiter,
        idempotency,
        48,
    )
    .expect("default tool registry builds cleanly");

    let mut lead = Lead::new("repeat@example.com", "launch-campaign", None);
    lead.id = 2;

    for _ in 0..2 {
        let plan = ActionPlanBuilder::build(&lead, None);
        let outcome = orchestrator.execute(&lead, plan).await;
        assert!(matches!(outcome, McpOutcome::Completed { .. }));
    }
}

/// Seed scenario 6: `leadLimit:2, window:60s`, three consecutive
/// invocations against the same lead. The first two invocations each
/// consume one per-lead token and complete; the third finds the bucket
/// exhausted and is rejected before any action dispatches, not the
/// second (the per-lead tier gates the whole invocation once, not each
/// planned action).
#[tokio::test]
#[ignore] // Requires a running Redis instance
async fn third_consecutive_invocation_is_rate_limited_not_the_second() {
    let sync_log: Arc<dyn SyncLogRepository> = Arc::new(InMemorySyncLogStore::new());
    let config = RateLimiterConfig {
        per_lead: TierLimit { limit: 2, window_secs: 60 },
        ..RateLimiterConfig::default()
    };
    let rate_limiter = TieredRateLimiter::new(connection().await, config);
    let idempotency = IdempotencyStore::new(connection().await);

    let orchestrator = McpOrchestrator::new(
        Arc::new(MockCrmExecutor),
        sync_log,
        rate_limiter,
        idempotency,
        48,
    )
    .expect("default tool registry builds cleanly");

    let mut lead = Lead::new("limited@example.com", "launch-campaign", None);
    lead.id = 3;

    for invocation in 1..=2 {
        let plan = ActionPlanBuilder::build(&lead, None);
        let outcome = orchestrator.execute(&lead, plan).await;
        assert!(
            matches!(outcome, McpOutcome::Completed { .. }),
            "invocation {invocation} expected to complete, got {outcome:?}"
        );
    }

    let plan = ActionPlanBuilder::build(&lead, None);
    match orchestrator.execute(&lead, plan).await {
        McpOutcome::RateLimited { violated_tiers, .. } => {
            assert!(violated_tiers.iter().any(|t| t.contains("Per-lead")));
        }
        other => panic!("expected the third invocation to be rate limited, got {other:?}"),
    }
}
