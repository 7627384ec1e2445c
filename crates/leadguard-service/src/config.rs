//! Environment/CLI-sourced configuration (spec.md §6 "CLI / env surface",
//! SPEC_FULL.md A.3). Defaults match the values fixed in spec.md §4.3.

use std::net::SocketAddr;
use std::time::Duration;

use clap::{Parser, ValueEnum};
use leadguard_guard::RateLimiterConfig;
use leadguard_queue::QueueConfig;
use leadguard_worker::WorkerConfig;

/// `CRM_PROVIDER` selects a concrete executor at startup (spec.md §6, §9
/// "interface-keyed strategy selection"). Additional real providers are
/// added here as they're implemented; an unrecognized value is a
/// configuration error rather than a silent fallback to mock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
#[value(rename_all = "UPPER")]
pub enum CrmProviderKind {
    Mock,
    Salesforce,
}

#[derive(Debug, Parser)]
#[command(name = "leadguardd", version, about = "Lead ingestion and enrichment pipeline")]
pub struct Cli {
    /// REST socket address to bind, e.g. 127.0.0.1:8080.
    #[arg(long, default_value = "127.0.0.1:8080", env = "LEADGUARD_LISTEN")]
    pub listen: SocketAddr,

    /// Prometheus scrape socket address, e.g. 127.0.0.1:9090.
    #[arg(long, default_value = "127.0.0.1:9090", env = "LEADGUARD_METRICS_LISTEN")]
    pub metrics_listen: SocketAddr,

    /// Which CRM executor to dispatch MCP actions to.
    #[arg(long, value_enum, default_value_t = CrmProviderKind::Mock, env = "CRM_PROVIDER")]
    pub crm_provider: CrmProviderKind,

    /// Redis connection string backing the queue, rate limiter, and
    /// idempotency store.
    #[arg(long, default_value = "redis://127.0.0.1:6379", env = "REDIS_URL")]
    pub redis_url: String,

    /// PostgreSQL connection string. When absent the service falls back to
    /// an in-memory lead/audit store, suitable for local development only.
    #[arg(long, env = "DATABASE_URL")]
    pub database_url: Option<String>,

    /// Max PostgreSQL pool connections, when `database_url` is configured.
    #[arg(long, default_value_t = 10, env = "LEADGUARD_PG_MAX_CONNECTIONS")]
    pub pg_max_connections: u32,

    /// Salesforce REST base URL, required when `crm_provider=salesforce`.
    #[arg(long, env = "SALESFORCE_BASE_URL")]
    pub salesforce_base_url: Option<String>,

    /// Salesforce API version, e.g. `v59.0`.
    #[arg(long, default_value = "v59.0", env = "SALESFORCE_API_VERSION")]
    pub salesforce_api_version: String,

    /// Name of the secret holding the Salesforce access token, looked up
    /// through the configured [`crate::secrets::SecretsSource`].
    #[arg(long, default_value = "SALESFORCE_ACCESS_TOKEN", env = "SALESFORCE_ACCESS_TOKEN_SECRET_NAME")]
    pub salesforce_access_token_secret: String,

    /// Queue name jobs are enqueued under; its DLQ is `<name>-dlq`.
    #[arg(long, default_value = "leads", env = "LEADGUARD_QUEUE_NAME")]
    pub queue_name: String,

    /// Number of jobs one worker process leases and processes concurrently.
    #[arg(long, default_value_t = 4, env = "LEADGUARD_WORKER_CONCURRENCY")]
    pub worker_concurrency: usize,

    /// Outer wall-clock cap, in seconds, on a single job (spec.md §5).
    #[arg(long, default_value_t = 60, env = "LEADGUARD_JOB_WALL_CLOCK_CAP_SECONDS")]
    pub job_wall_clock_cap_seconds: u64,

    /// Max delivery attempts before a job is routed to the DLQ.
    #[arg(long, default_value_t = 5, env = "LEADGUARD_MAX_ATTEMPTS")]
    pub max_attempts: u32,

    /// TTL, in hours, for idempotency records stamped after a successful
    /// tool call (spec.md §4.3.5 default 48).
    #[arg(long, default_value_t = 48, env = "LEADGUARD_IDEMPOTENCY_TTL_HOURS")]
    pub idempotency_ttl_hours: u32,

    /// Override for every rate-limit tier's request count (spec.md §6
    /// `CRM_RATE_LIMIT_REQUESTS`). When set, overrides the per-provider
    /// CRM-bucket limit only; the per-lead/per-account/global tiers keep
    /// their fixed spec defaults.
    #[arg(long, env = "CRM_RATE_LIMIT_REQUESTS")]
    pub crm_rate_limit_requests: Option<u32>,

    /// Override for the CRM-provider bucket's window, in seconds (spec.md
    /// §6 `CRM_RATE_LIMIT_WINDOW_SECONDS`).
    #[arg(long, env = "CRM_RATE_LIMIT_WINDOW_SECONDS")]
    pub crm_rate_limit_window_seconds: Option<u64>,

    /// Run the DLQ processor in-process alongside the worker and ingress
    /// server. Disable to run it as a separate deployment unit.
    #[arg(long, default_value_t = true, env = "LEADGUARD_RUN_DLQ_PROCESSOR")]
    pub run_dlq_processor: bool,

    /// Grace period allowed for in-flight jobs to finish on shutdown
    /// (spec.md §5 "Cancellation").
    #[arg(long, default_value_t = 30, env = "LEADGUARD_SHUTDOWN_GRACE_SECONDS")]
    pub shutdown_grace_seconds: u64,
}

impl Cli {
    pub fn queue_config(&self) -> QueueConfig {
        QueueConfig::from_url(self.redis_url.clone())
    }

    pub fn worker_config(&self) -> WorkerConfig {
        WorkerConfig {
            queue_name: self.queue_name.clone(),
            concurrency: self.worker_concurrency.max(1),
            wall_clock_cap: Duration::from_secs(self.job_wall_clock_cap_seconds),
            max_attempts: self.max_attempts,
            idempotency_ttl_hours: self.idempotency_ttl_hours,
        }
    }

    pub fn rate_limiter_config(&self) -> RateLimiterConfig {
        let mut config = RateLimiterConfig::default();
        if let Some(requests) = self.crm_rate_limit_requests {
            config.per_provider.limit = requests;
        }
        if let Some(window) = self.crm_rate_limit_window_seconds {
            config.per_provider.window_secs = window;
        }
        config
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_secs(self.shutdown_grace_seconds)
    }
}
