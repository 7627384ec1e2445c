use chrono::{DateTime, Utc};
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::warn;

/// Key-derivation mode for [`IdempotencyStore::compute_key`] (spec.md §4.3.5).
#[derive(Debug, Clone, Copy)]
pub enum KeyMode {
    /// Collapses retries within the same time bucket to one effect.
    Windowed { window_minutes: i64 },
    /// Omits the time term entirely; used for upserts where identity is
    /// intrinsic to `(email, campaignId, action)`.
    Stable,
}

impl Default for KeyMode {
    fn default() -> Self {
        KeyMode::Windowed { window_minutes: 60 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredResult {
    result: serde_json::Value,
    timestamp: DateTime<Utc>,
}

/// Outcome of an `isProcessed` lookup.
#[derive(Debug, Clone)]
pub struct ProcessedCheck {
    pub processed: bool,
    pub result: Option<serde_json::Value>,
    pub timestamp: Option<DateTime<Utc>>,
}

/// Redis-backed idempotency cache. Prevents a retried call from producing
/// a second side effect on the downstream CRM.
///
/// On backend outage, lookups fail open (treated as not-yet-processed) so
/// a Redis blip degrades to "may double-send" rather than "cannot proceed
/// at all" (spec.md §4.3.5, §7).
#[derive(Clone)]
pub struct IdempotencyStore {
    conn: ConnectionManager,
}

impl IdempotencyStore {
    pub fn new(conn: ConnectionManager) -> Self {
        Self { conn }
    }

    /// `SHA256(lower.trim(email) :: lower.trim(campaignId?|"none") :: lower(action)[:: floor(now/window)])`.
    pub fn compute_key(email: &str, campaign_id: Option<&str>, action: &str, mode: KeyMode) -> String {
        let normalized_email = email.trim().to_lowercase();
        let normalized_campaign = campaign_id
            .map(|c| c.trim().to_lowercase())
            .unwrap_or_else(|| "none".to_string());
        let normalized_action = action.trim().to_lowercase();
        let mut material = format!("{normalized_email}::{normalized_campaign}::{normalized_action}");
        if let KeyMode::Windowed { window_minutes } = mode {
            let window_index = Utc::now().timestamp() / (window_minutes.max(1) * 60);
            material.push_str(&format!("::{window_index}"));
        }
        let mut hasher = Sha256::new();
        hasher.update(material.as_bytes());
        hex::encode(hasher.finalize())
    }

    fn redis_key(key: &str) -> String {
        format!("bull:idempotency:{key}")
    }

    pub async fn is_processed(&self, key: &str) -> ProcessedCheck {
        let mut conn = self.conn.clone();
        let raw: Result<Option<String>, redis::RedisError> = conn.get(Self::redis_key(key)).await;
        match raw {
            Ok(Some(raw)) => match serde_json::from_str::<StoredResult>(&raw) {
                Ok(stored) => ProcessedCheck {
                    processed: true,
                    result: Some(stored.result),
                    timestamp: Some(stored.timestamp),
                },
                Err(err) => {
                    warn!(error = %err, "idempotency record corrupt, treating as not processed");
                    ProcessedCheck {
                        processed: false,
                        result: None,
                        timestamp: None,
                    }
                }
            },
            Ok(None) => ProcessedCheck {
                processed: false,
                result: None,
                timestamp: None,
            },
            Err(err) => {
                warn!(error = %err, "idempotency store unreachable, failing open");
                ProcessedCheck {
                    processed: false,
                    result: None,
                    timestamp: None,
                }
            }
        }
    }

    pub async fn store_result(&self, key: &str, value: serde_json::Value, ttl_hours: u32) {
        let stored = StoredResult {
            result: value,
            timestamp: Utc::now(),
        };
        let payload = match serde_json::to_string(&stored) {
            Ok(payload) => payload,
            Err(err) => {
                warn!(error = %err, "failed to serialize idempotency result, skipping store");
                return;
            }
        };
        let mut conn = self.conn.clone();
        let ttl_secs = (ttl_hours as u64).saturating_mul(3600);
        let result: Result<(), redis::RedisError> = conn.set_ex(Self::redis_key(key), payload, ttl_secs).await;
        if let Err(err) = result {
            warn!(error = %err, "idempotency store unreachable, result not cached");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stable_key_is_deterministic_and_ignores_time() {
        let a = IdempotencyStore::compute_key("Foo@Bar.com", Some("Camp-1"), "UPSERT_LEAD", KeyMode::Stable);
        let b = IdempotencyStore::compute_key(" foo@bar.com ", Some(" camp-1 "), "upsert_lead", KeyMode::Stable);
        assert_eq!(a, b);
    }

    #[test]
    fn missing_campaign_id_normalizes_to_none() {
        let a = IdempotencyStore::compute_key("foo@bar.com", None, "create_lead", KeyMode::Stable);
        let b = IdempotencyStore::compute_key("foo@bar.com", Some("none"), "create_lead", KeyMode::Stable);
        assert_eq!(a, b);
    }

    #[test]
    fn windowed_and_stable_keys_differ() {
        let stable = IdempotencyStore::compute_key("foo@bar.com", Some("c1"), "create_task", KeyMode::Stable);
        let windowed = IdempotencyStore::compute_key(
            "foo@bar.com",
            Some("c1"),
            "create_task",
            KeyMode::Windowed { window_minutes: 60 },
        );
        assert_ne!(stable, windowed);
    }
}
