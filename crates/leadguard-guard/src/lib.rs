//! MCP Safety & Quota Core (spec.md §4.3): the guard layer sitting between
//! a grounded AI analysis and the CRM executor layer. Every tool
//! invocation passes through, in order: the Safety Guard, the tiered rate
//! limiter, the circuit breaker for its executor+method, and the
//! idempotency store. The PII Redactor is used independently, by anything
//! that logs or persists a tool call's parameters.

#![forbid(unsafe_code)]

pub mod circuit_breaker;
pub mod error;
pub mod idempotency;
pub mod rate_limit;
pub mod redactor;
pub mod safety;

pub use circuit_breaker::{CallOutcome, CircuitBreaker, CircuitBreakerConfig, CircuitBreakerRegistry, CircuitState};
pub use error::GuardError;
pub use idempotency::{IdempotencyStore, KeyMode, ProcessedCheck};
pub use rate_limit::{RateLimitDecision, RateLimiterConfig, TierLimit, TierOutcome, TieredRateLimiter};
pub use redactor::{PiiRedactor, RedactionStrategy};
pub use safety::{GuardContext, SafetyGuard, SafetyViolation};
