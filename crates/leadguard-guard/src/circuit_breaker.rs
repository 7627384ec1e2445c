use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::RwLock;
use std::time::Duration;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use tracing::{info, warn};

/// Circuit breaker state, numbered to match `mcp_circuit_breaker_state`
/// (0=closed, 1=half-open, 2=open).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    Closed,
    HalfOpen,
    Open,
}

impl CircuitState {
    pub fn as_gauge_value(self) -> i64 {
        match self {
            CircuitState::Closed => 0,
            CircuitState::HalfOpen => 1,
            CircuitState::Open => 2,
        }
    }
}

impl std::fmt::Display for CircuitState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CircuitState::Closed => write!(f, "closed"),
            CircuitState::HalfOpen => write!(f, "half-open"),
            CircuitState::Open => write!(f, "open"),
        }
    }
}

/// Outcome of one call through the breaker, as reported by the caller.
/// 4xx-class client faults are excluded from the failure count — they are
/// not a reliability signal about the executor (spec.md §4.3.4).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallOutcome {
    Success,
    Failure,
    ClientError,
}

#[derive(Debug, Clone)]
pub struct CircuitBreakerConfig {
    /// Per-call deadline; a call that doesn't complete within this window
    /// counts as a `Failure` against the breaker (spec.md §4.3.4 "timeout
    /// 10 s"). Enforced by the caller around the dispatched executor call,
    /// not by the breaker itself.
    pub timeout: Duration,
    pub error_rate_threshold: f64,
    pub volume_threshold: u32,
    pub reset_timeout: Duration,
    pub half_open_max_requests: u32,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
            error_rate_threshold: 0.5,
            volume_threshold: 10,
            reset_timeout: Duration::from_secs(30),
            half_open_max_requests: 1,
        }
    }
}

/// One named operation's breaker (scoped by executor + method).
///
/// Tracks a rolling count of requests and non-client failures since the
/// last state transition. Once at least `volume_threshold` requests have
/// been observed and the failure rate meets `error_rate_threshold`, the
/// circuit opens; it stays open for `reset_timeout` before allowing a
/// single half-open probe through.
pub struct CircuitBreaker {
    name: String,
    state: RwLock<CircuitState>,
    config: CircuitBreakerConfig,
    request_count: AtomicU32,
    failure_count: AtomicU32,
    half_open_requests: AtomicU32,
    opened_at_ms: AtomicU64,
}

impl CircuitBreaker {
    pub fn new(name: impl Into<String>, config: CircuitBreakerConfig) -> Self {
        Self {
            name: name.into(),
            state: RwLock::new(CircuitState::Closed),
            config,
            request_count: AtomicU32::new(0),
            failure_count: AtomicU32::new(0),
            half_open_requests: AtomicU32::new(0),
            opened_at_ms: AtomicU64::new(0),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Per-call deadline configured for this breaker (spec.md §4.3.4).
    pub fn timeout(&self) -> Duration {
        self.config.timeout
    }

    pub fn state(&self) -> CircuitState {
        self.check_timeout();
        *self.state.read().expect("circuit breaker state lock poisoned")
    }

    /// Whether a call should be allowed through right now.
    pub fn allow_request(&self) -> bool {
        self.check_timeout();
        let state = self.state.read().expect("circuit breaker state lock poisoned");
        match *state {
            CircuitState::Closed => true,
            CircuitState::Open => false,
            CircuitState::HalfOpen => {
                let current = self.half_open_requests.fetch_add(1, Ordering::SeqCst);
                current < self.config.half_open_max_requests
            }
        }
    }

    /// Record the outcome of a call that was allowed through.
    pub fn record(&self, outcome: CallOutcome) {
        match outcome {
            CallOutcome::ClientError => {
                // Not a reliability signal: does not move the breaker.
            }
            CallOutcome::Success => self.record_success(),
            CallOutcome::Failure => self.record_failure(),
        }
    }

    fn record_success(&self) {
        let mut state = self.state.write().expect("circuit breaker state lock poisoned");
        match *state {
            CircuitState::Closed => {
                self.request_count.fetch_add(1, Ordering::SeqCst);
            }
            CircuitState::HalfOpen => {
                info!(breaker = %self.name, "circuit breaker closing after successful probe");
                self.transition_to(&mut state, CircuitState::Closed);
            }
            CircuitState::Open => {}
        }
    }

    fn record_failure(&self) {
        let mut state = self.state.write().expect("circuit breaker state lock poisoned");
        match *state {
            CircuitState::Closed => {
                let requests = self.request_count.fetch_add(1, Ordering::SeqCst) + 1;
                let failures = self.failure_count.fetch_add(1, Ordering::SeqCst) + 1;
                if requests >= self.config.volume_threshold
                    && (failures as f64 / requests as f64) >= self.config.error_rate_threshold
                {
                    warn!(
                        breaker = %self.name,
                        requests,
                        failures,
                        "circuit breaker opening: error rate threshold exceeded"
                    );
                    self.transition_to(&mut state, CircuitState::Open);
                }
            }
            CircuitState::HalfOpen => {
                warn!(breaker = %self.name, "circuit breaker re-opening after failed probe");
                self.transition_to(&mut state, CircuitState::Open);
            }
            CircuitState::Open => {}
        }
    }

    fn check_timeout(&self) {
        let is_open = *self.state.read().expect("circuit breaker state lock poisoned") == CircuitState::Open;
        if !is_open {
            return;
        }
        let opened_at_ms = self.opened_at_ms.load(Ordering::SeqCst);
        if opened_at_ms == 0 {
            return;
        }
        let elapsed_ms = (Utc::now().timestamp_millis() as u64).saturating_sub(opened_at_ms);
        if elapsed_ms >= self.config.reset_timeout.as_millis() as u64 {
            let mut state = self.state.write().expect("circuit breaker state lock poisoned");
            if *state == CircuitState::Open {
                info!(breaker = %self.name, "circuit breaker transitioning to half-open after reset timeout");
                self.transition_to(&mut state, CircuitState::HalfOpen);
            }
        }
    }

    fn transition_to(&self, state: &mut CircuitState, new_state: CircuitState) {
        *state = new_state;
        match new_state {
            CircuitState::Closed => {
                self.request_count.store(0, Ordering::SeqCst);
                self.failure_count.store(0, Ordering::SeqCst);
                self.opened_at_ms.store(0, Ordering::SeqCst);
            }
            CircuitState::Open => {
                self.half_open_requests.store(0, Ordering::SeqCst);
                self.opened_at_ms
                    .store(Utc::now().timestamp_millis() as u64, Ordering::SeqCst);
            }
            CircuitState::HalfOpen => {
                self.half_open_requests.store(0, Ordering::SeqCst);
            }
        }
    }

    pub fn stats(&self) -> CircuitBreakerStats {
        CircuitBreakerStats {
            name: self.name.clone(),
            state: self.state(),
            request_count: self.request_count.load(Ordering::SeqCst),
            failure_count: self.failure_count.load(Ordering::SeqCst),
            observed_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CircuitBreakerStats {
    pub name: String,
    pub state: CircuitState,
    pub request_count: u32,
    pub failure_count: u32,
    pub observed_at: DateTime<Utc>,
}

/// Per-process registry of breakers keyed by `executor:method`. Circuit
/// breaker state is intentionally not shared across a worker fleet
/// (spec.md §5): an open breaker isolates one process's recent failures.
#[derive(Default)]
pub struct CircuitBreakerRegistry {
    breakers: DashMap<String, std::sync::Arc<CircuitBreaker>>,
    config: CircuitBreakerConfig,
}

impl CircuitBreakerRegistry {
    pub fn new(config: CircuitBreakerConfig) -> Self {
        Self {
            breakers: DashMap::new(),
            config,
        }
    }

    fn key(executor: &str, method: &str) -> String {
        format!("{executor}:{method}")
    }

    pub fn get_or_create(&self, executor: &str, method: &str) -> std::sync::Arc<CircuitBreaker> {
        let key = Self::key(executor, method);
        self.breakers
            .entry(key.clone())
            .or_insert_with(|| std::sync::Arc::new(CircuitBreaker::new(key, self.config.clone())))
            .clone()
    }

    pub fn all_stats(&self) -> Vec<CircuitBreakerStats> {
        self.breakers.iter().map(|entry| entry.value().stats()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> CircuitBreakerConfig {
        CircuitBreakerConfig {
            timeout: Duration::from_secs(10),
            error_rate_threshold: 0.5,
            volume_threshold: 4,
            reset_timeout: Duration::from_millis(50),
            half_open_max_requests: 1,
        }
    }

    #[test]
    fn opens_after_volume_and_error_rate_threshold() {
        let breaker = CircuitBreaker::new("salesforce:create_lead", test_config());
        assert_eq!(breaker.state(), CircuitState::Closed);
        assert!(breaker.allow_request());

        breaker.record(CallOutcome::Failure);
        breaker.record(CallOutcome::Failure);
        breaker.record(CallOutcome::Success);
        assert_eq!(breaker.state(), CircuitState::Closed);

        breaker.record(CallOutcome::Failure);
        assert_eq!(breaker.state(), CircuitState::Open);
        assert!(!breaker.allow_request());
    }

    #[test]
    fn client_errors_do_not_count_toward_failure_rate() {
        let breaker = CircuitBreaker::new("hubspot:update_lead_fields", test_config());
        for _ in 0..10 {
            breaker.record(CallOutcome::ClientError);
        }
        assert_eq!(breaker.state(), CircuitState::Closed);
    }

    #[test]
    fn half_open_probe_failure_reopens_circuit() {
        let breaker = CircuitBreaker::new("mock:create_task", test_config());
        breaker.record(CallOutcome::Failure);
        breaker.record(CallOutcome::Failure);
        breaker.record(CallOutcome::Failure);
        breaker.record(CallOutcome::Failure);
        assert_eq!(breaker.state(), CircuitState::Open);

        std::thread::sleep(Duration::from_millis(60));
        assert_eq!(breaker.state(), CircuitState::HalfOpen);
        assert!(breaker.allow_request());

        breaker.record(CallOutcome::Failure);
        assert_eq!(breaker.state(), CircuitState::Open);
    }

    #[test]
    fn registry_reuses_breaker_per_executor_method_pair() {
        let registry = CircuitBreakerRegistry::new(test_config());
        let a = registry.get_or_create("salesforce", "create_lead");
        let b = registry.get_or_create("salesforce", "create_lead");
        assert!(std::sync::Arc::ptr_eq(&a, &b));
        let c = registry.get_or_create("salesforce", "update_lead_fields");
        assert!(!std::sync::Arc::ptr_eq(&a, &c));
    }
}
