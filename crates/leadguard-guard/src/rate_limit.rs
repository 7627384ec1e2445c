use chrono::{DateTime, Utc};
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use tracing::warn;

/// One bucket's verdict: how many calls remain in the current window and
/// when the window resets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TierOutcome {
    pub tier: &'static str,
    pub limit: u32,
    pub remaining: u32,
    pub reset_at: DateTime<Utc>,
    pub window_secs: u64,
    pub violated: bool,
}

/// Combined verdict across every tier checked for one call.
#[derive(Debug, Clone)]
pub struct RateLimitDecision {
    pub allowed: bool,
    pub violated_tiers: Vec<String>,
    pub tiers: Vec<TierOutcome>,
}

#[derive(Debug, Clone, Copy)]
pub struct TierLimit {
    pub limit: u32,
    pub window_secs: u64,
}

/// Tuning for the three always-on tiers and the per-provider bucket
/// (spec.md §4.3.3).
#[derive(Debug, Clone)]
pub struct RateLimiterConfig {
    pub per_lead: TierLimit,
    pub per_account: TierLimit,
    pub global: TierLimit,
    pub per_provider: TierLimit,
}

impl Default for RateLimiterConfig {
    fn default() -> Self {
        Self {
            per_lead: TierLimit {
                limit: 10,
                window_secs: 60,
            },
            per_account: TierLimit {
                limit: 100,
                window_secs: 60,
            },
            global: TierLimit {
                limit: 1000,
                window_secs: 60,
            },
            per_provider: TierLimit {
                limit: 1000,
                window_secs: 60,
            },
        }
    }
}

/// Fixed-window token-bucket limiter backed by Redis `INCR`/`EXPIRE`.
///
/// Checks per-lead, per-account, global, and per-CRM-provider buckets for
/// a single call. On backend outage the limiter fails open: the call is
/// allowed and the outage logged, so a transient Redis loss never halts
/// the worker (spec.md §4.3.3, §7).
#[derive(Clone)]
pub struct TieredRateLimiter {
    conn: ConnectionManager,
    config: RateLimiterConfig,
}

impl TieredRateLimiter {
    pub fn new(conn: ConnectionManager, config: RateLimiterConfig) -> Self {
        Self { conn, config }
    }

    /// Evaluate the per-lead, per-account, and global tiers once for a whole
    /// MCP invocation (spec.md §4.4: these three tiers gate the call, not
    /// each individual action). `account_key` is the email domain, or a
    /// resolved account id when known. Fails open if the backend is
    /// unreachable.
    pub async fn check_invocation(&self, lead_id: i64, account_key: &str) -> RateLimitDecision {
        let checks: [(&'static str, String, TierLimit); 3] = [
            ("per_lead", format!("bull:limiter:lead:{lead_id}"), self.config.per_lead),
            (
                "per_account",
                format!("bull:limiter:account:{account_key}"),
                self.config.per_account,
            ),
            ("global", "bull:limiter:global".to_string(), self.config.global),
        ];
        self.run_checks(&checks).await
    }

    /// Evaluate the CRM-provider bucket for a single dispatched executor
    /// call (spec.md §4.4: "each executor call ... consumes one CRM-bucket
    /// token"). Fails open if the backend is unreachable.
    pub async fn check_provider(&self, provider: &str) -> RateLimitDecision {
        let checks: [(&'static str, String, TierLimit); 1] = [(
            "per_provider",
            format!("bull:limiter:provider:{provider}"),
            self.config.per_provider,
        )];
        self.run_checks(&checks).await
    }

    async fn run_checks(&self, checks: &[(&'static str, String, TierLimit)]) -> RateLimitDecision {
        let mut tiers = Vec::with_capacity(checks.len());
        let mut violated_tiers = Vec::new();

        for (name, base_key, tier_limit) in checks {
            let outcome = self.check_tier(name, base_key, *tier_limit).await;
            if outcome.violated {
                violated_tiers.push(violation_message(name));
            }
            tiers.push(outcome);
        }

        RateLimitDecision {
            allowed: violated_tiers.is_empty(),
            violated_tiers,
            tiers,
        }
    }

    /// `incr(key:⌊now/window⌋); expire(window); allowed = count ≤ limit`
    /// against a single tier's bucket. Fails open (not violated, full
    /// remaining reported) if Redis is unreachable.
    async fn check_tier(&self, tier: &'static str, base_key: &str, limit: TierLimit) -> TierOutcome {
        let now = Utc::now();
        let window_index = now.timestamp() as u64 / limit.window_secs;
        let key = format!("{base_key}:{window_index}");
        let window_elapsed = now.timestamp() as u64 % limit.window_secs;
        let reset_at = now + chrono::Duration::seconds((limit.window_secs - window_elapsed) as i64);

        let mut conn = self.conn.clone();
        let result: Result<u64, redis::RedisError> = async {
            let count: u64 = conn.incr(&key, 1u64).await?;
            if count == 1 {
                let _: () = conn.expire(&key, limit.window_secs as i64).await?;
            }
            Ok(count)
        }
        .await;

        match result {
            Ok(count) => outcome_for_count(tier, limit, count, reset_at),
            Err(err) => {
                warn!(tier, error = %err, "rate limiter backend unreachable, failing open");
                TierOutcome {
                    tier,
                    limit: limit.limit,
                    remaining: limit.limit,
                    reset_at,
                    window_secs: limit.window_secs,
                    violated: false,
                }
            }
        }
    }
}

/// Pure arithmetic behind one tier's verdict, split out from
/// [`TieredRateLimiter::check_tier`] so the monotonicity of `remaining` in
/// `count` can be property-tested without a Redis backend.
fn outcome_for_count(tier: &'static str, limit: TierLimit, count: u64, reset_at: DateTime<Utc>) -> TierOutcome {
    let violated = count > limit.limit as u64;
    let remaining = limit.limit.saturating_sub(count.min(u64::from(limit.limit)) as u32);
    TierOutcome {
        tier,
        limit: limit.limit,
        remaining,
        reset_at,
        window_secs: limit.window_secs,
        violated,
    }
}

fn violation_message(tier: &str) -> String {
    match tier {
        "per_lead" => "Per-lead rate limit exceeded".to_string(),
        "per_account" => "Per-account rate limit exceeded".to_string(),
        "global" => "Global rate limit exceeded".to_string(),
        "per_provider" => "Per-provider rate limit exceeded".to_string(),
        other => format!("{other} rate limit exceeded"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_tiers_match_spec_limits() {
        let config = RateLimiterConfig::default();
        assert_eq!(config.per_lead.limit, 10);
        assert_eq!(config.per_account.limit, 100);
        assert_eq!(config.global.limit, 1000);
        assert_eq!(config.per_provider.limit, 1000);
    }

    use proptest::prelude::*;

    proptest! {
        /// `remaining` never increases, and `violated` never flips back to
        /// false, as `count` climbs within a fixed window.
        #[test]
        fn remaining_is_monotonically_non_increasing(limit in 1u32..1000, counts in proptest::collection::vec(1u64..2000, 1..50)) {
            let tier_limit = TierLimit { limit, window_secs: 60 };
            let reset_at = Utc::now();
            let mut sorted = counts;
            sorted.sort_unstable();

            let mut prev_remaining = u32::MAX;
            let mut seen_violation = false;
            for count in sorted {
                let outcome = outcome_for_count("per_lead", tier_limit, count, reset_at);
                prop_assert!(outcome.remaining <= prev_remaining);
                if seen_violation {
                    prop_assert!(outcome.violated);
                }
                seen_violation |= outcome.violated;
                prev_remaining = outcome.remaining;
            }
        }
    }
}
