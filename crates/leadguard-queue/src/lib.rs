//! Durable, at-least-once job queue on top of Redis (spec.md §4.1).
//!
//! Workers lease jobs with [`QueueClient::lease`], and must eventually call
//! either [`QueueClient::ack`] or [`QueueClient::fail`] — there is no
//! automatic lease expiry in this client; a crashed worker's jobs stay on
//! the `active` list until an operator intervenes, trading a rare manual
//! recovery for never silently losing a lead.

#![forbid(unsafe_code)]

mod client;
mod config;
mod error;

pub use client::{FailOutcome, LeasedJob, QueueClient};
pub use config::QueueConfig;
pub use error::QueueError;

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn backoff_delay_doubles_and_caps() {
        let config = QueueConfig {
            redis_url: "redis://localhost".to_string(),
            base_retry_delay: Duration::from_secs(2),
            max_retry_delay: Duration::from_secs(10),
            lease_duration: Duration::from_secs(60),
            poll_timeout: Duration::from_secs(1),
        };
        assert_eq!(config.base_retry_delay.as_secs(), 2);
        assert_eq!(config.max_retry_delay.as_secs(), 10);
    }
}
