use std::sync::Arc;

use clap::Parser;
use leadguard_core::{LeadRepository, SyncLogRepository};
use leadguard_grounding::{GroundingConfig, GroundingValidator};
use leadguard_guard::{IdempotencyStore, TieredRateLimiter};
use leadguard_queue::QueueClient;
use leadguard_service::config::CrmProviderKind;
use leadguard_service::secrets::{EnvSecretsSource, SecretsSource};
use leadguard_service::{build_router, Cli, ServiceState};
use leadguard_storage::{InMemoryLeadStore, InMemorySyncLogStore, PostgresStore};
use leadguard_tools::{CrmExecutor, MockCrmExecutor, SalesforceConfig, SalesforceExecutor};
use leadguard_worker::{DlqProcessor, McpOrchestrator, Worker};
use tokio_util::sync::CancellationToken;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(std::env::var("RUST_LOG").unwrap_or_else(|_| "leadguard_service=info,info".to_string()))
        .init();

    let cli = Cli::parse();

    leadguard_service::metrics_exporter::install(cli.metrics_listen)?;

    let (lead_repo, sync_log): (Arc<dyn LeadRepository>, Arc<dyn SyncLogRepository>) =
        if let Some(database_url) = &cli.database_url {
            let store = PostgresStore::connect(database_url, cli.pg_max_connections).await?;
            store.ensure_schema().await?;
            let store = Arc::new(store);
            (store.clone(), store)
        } else {
            info!("DATABASE_URL not set, using in-memory lead/audit storage");
            (Arc::new(InMemoryLeadStore::new()), Arc::new(InMemorySyncLogStore::new()))
        };

    let queue = QueueClient::connect(cli.queue_config()).await?;

    let redis_client = redis::Client::open(cli.redis_url.clone())?;
    let rate_limiter_conn = redis::aio::ConnectionManager::new(redis_client.clone()).await?;
    let idempotency_conn = redis::aio::ConnectionManager::new(redis_client).await?;

    let rate_limiter = TieredRateLimiter::new(rate_limiter_conn, cli.rate_limiter_config());
    let idempotency = IdempotencyStore::new(idempotency_conn);

    let executor: Arc<dyn CrmExecutor> = match cli.crm_provider {
        CrmProviderKind::Mock => Arc::new(MockCrmExecutor),
        CrmProviderKind::Salesforce => {
            let base_url = cli
                .salesforce_base_url
                .clone()
                .ok_or_else(|| anyhow::anyhow!("crm_provider=salesforce requires --salesforce-base-url"))?;
            let secrets = EnvSecretsSource;
            let access_token = secrets.get(&cli.salesforce_access_token_secret).ok_or_else(|| {
                anyhow::anyhow!(
                    "secret '{}' not found for Salesforce access token",
                    cli.salesforce_access_token_secret
                )
            })?;
            Arc::new(SalesforceExecutor::new(SalesforceConfig {
                base_url,
                access_token,
                api_version: cli.salesforce_api_version.clone(),
            }))
        }
    };

    let orchestrator = Arc::new(McpOrchestrator::new(
        executor,
        sync_log.clone(),
        rate_limiter,
        idempotency,
        cli.idempotency_ttl_hours,
    )?);

    let worker_config = cli.worker_config();
    let grounding = GroundingValidator::new(GroundingConfig::default());

    let worker = Worker::new(
        queue.clone(),
        lead_repo.clone(),
        Arc::new(leadguard_worker::MockAiProvider),
        Arc::new(leadguard_worker::StaticEnrichmentProvider::new()),
        grounding,
        orchestrator.clone(),
        worker_config.clone(),
    );

    let cancellation = CancellationToken::new();

    let mut tasks = tokio::task::JoinSet::new();

    {
        let worker = worker.clone();
        let cancellation = cancellation.clone();
        tasks.spawn(async move {
            worker.run(cancellation).await;
        });
    }

    if cli.run_dlq_processor {
        let dlq = DlqProcessor::new(queue.clone(), lead_repo.clone(), worker_config.queue_name.clone());
        let cancellation = cancellation.clone();
        tasks.spawn(async move {
            dlq.run(cancellation).await;
        });
    }

    let state = ServiceState {
        lead_repo,
        sync_log,
        queue,
        orchestrator,
        worker_config,
    };
    let app = build_router(state);
    let listener = tokio::net::TcpListener::bind(cli.listen).await?;
    info!(addr = %listener.local_addr()?, "leadguard-service REST listening");

    let shutdown_grace = cli.shutdown_grace();
    let server_cancellation = cancellation.clone();
    let rest_task = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                server_cancellation.cancelled().await;
            })
            .await
    });

    tokio::signal::ctrl_c().await?;
    info!("shutdown signal received, cancelling worker and DLQ loops");
    cancellation.cancel();

    rest_task.await??;

    tokio::select! {
        _ = async {
            while tasks.join_next().await.is_some() {}
        } => {}
        _ = tokio::time::sleep(shutdown_grace) => {
            tracing::warn!("shutdown grace period elapsed with tasks still running");
        }
    }

    Ok(())
}
