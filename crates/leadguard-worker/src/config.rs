use std::time::Duration;

/// Tuning for one worker instance (spec.md §5 "Scheduling model").
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    pub queue_name: String,
    /// Number of jobs this process leases and processes concurrently.
    pub concurrency: usize,
    /// Outer wall-clock cap on a single job (spec.md §5 "Suspension points").
    pub wall_clock_cap: Duration,
    pub max_attempts: u32,
    /// TTL for idempotency records stamped after a successful tool call.
    pub idempotency_ttl_hours: u32,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            queue_name: "leads".to_string(),
            concurrency: 4,
            wall_clock_cap: Duration::from_secs(60),
            max_attempts: 5,
            idempotency_ttl_hours: 48,
        }
    }
}
