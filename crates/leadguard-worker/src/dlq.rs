//! Dead-letter finalizer (spec.md §4.1 "Dead-letter queue"): drains
//! `queue_name-dlq` entries and makes the exhausted-retries outcome durable
//! on the lead record. This is the single writer for the
//! `PERMANENTLY_FAILED` transition, so a worker crash between
//! [`QueueClient::fail`](leadguard_queue::QueueClient::fail) DLQ-routing a
//! job and updating the lead's status cannot leave the lead stuck looking
//! retryable.

use std::sync::Arc;
use std::time::Duration;

use leadguard_core::{LeadRepository, LeadStatus};
use leadguard_queue::QueueClient;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::metrics;

pub struct DlqProcessor {
    queue: QueueClient,
    lead_repo: Arc<dyn LeadRepository>,
    queue_name: String,
}

impl DlqProcessor {
    pub fn new(queue: QueueClient, lead_repo: Arc<dyn LeadRepository>, queue_name: impl Into<String>) -> Self {
        Self {
            queue,
            lead_repo,
            queue_name: queue_name.into(),
        }
    }

    /// Drain the dead-letter queue until `cancellation` fires.
    pub async fn run(&self, cancellation: CancellationToken) {
        info!(queue = %self.queue_name, "DLQ processor starting");
        loop {
            if cancellation.is_cancelled() {
                info!("DLQ processor stopping: cancellation requested");
                return;
            }
            match self.queue.lease_dlq(&self.queue_name).await {
                Ok(Some(entry)) => self.finalize(entry).await,
                Ok(None) => {}
                Err(err) => {
                    warn!(error = %err, "DLQ lease failed, backing off");
                    tokio::time::sleep(Duration::from_secs(1)).await;
                }
            }
        }
    }

    async fn finalize(&self, entry: leadguard_core::DlqEntry) {
        error!(
            lead_id = entry.lead_id,
            job_id = %entry.original_job_id,
            attempts = entry.attempts_made,
            error = %entry.error,
            "lead permanently failed after exhausting retries"
        );
        metrics::leads_processed("permanently_failed");

        let lead = match self.lead_repo.find_by_id(entry.lead_id).await {
            Ok(Some(lead)) => lead,
            Ok(None) => {
                warn!(lead_id = entry.lead_id, "DLQ entry references a lead that no longer exists");
                return;
            }
            Err(err) => {
                warn!(lead_id = entry.lead_id, error = %err, "failed to load lead for DLQ finalization");
                return;
            }
        };

        if lead.status == LeadStatus::PermanentlyFailed {
            return;
        }

        let mut lead = lead;
        if let Err(err) = lead.transition_to(LeadStatus::PermanentlyFailed) {
            warn!(lead_id = entry.lead_id, error = %err, "lead in unexpected status at DLQ finalization");
            return;
        }
        if let Err(err) = self.lead_repo.save(&mut lead).await {
            warn!(lead_id = entry.lead_id, error = %err, "failed to persist permanently-failed status");
        }
    }
}
