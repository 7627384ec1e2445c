//! Ingress contract (spec.md §6): accepts a webhook-submitted lead,
//! computes its idempotency key, persists it, and enqueues a job for the
//! worker. A duplicate `(email, campaignId)` ingest returns the existing
//! record unchanged (invariant 1).

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use leadguard_core::{Job, Lead, LeadRepository};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use crate::ServiceState;

#[derive(Debug, Deserialize)]
pub struct IngestRequest {
    pub email: String,
    pub campaign_id: String,
    pub name: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct IngestResponse {
    pub id: i64,
    pub status: leadguard_core::LeadStatus,
    pub created: bool,
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{message}")]
    Http { status: StatusCode, message: String },
    #[error(transparent)]
    Lead(#[from] leadguard_core::LeadError),
    #[error(transparent)]
    Queue(#[from] leadguard_queue::QueueError),
}

impl ApiError {
    fn bad_request(message: impl Into<String>) -> Self {
        Self::Http {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }

    fn not_found(message: impl Into<String>) -> Self {
        Self::Http {
            status: StatusCode::NOT_FOUND,
            message: message.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::Http { status, .. } => *status,
            ApiError::Lead(_) | ApiError::Queue(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(serde_json::json!({ "error": self.to_string() }))).into_response()
    }
}

pub fn build_router(state: ServiceState) -> Router {
    Router::new()
        .route("/v1/health", get(health))
        .route("/v1/leads", post(ingest_lead))
        .route("/v1/leads/:id", get(get_lead))
        .with_state(state)
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    service: &'static str,
    crm_provider: &'static str,
}

async fn health(State(state): State<ServiceState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        service: "leadguard-service",
        crm_provider: state.orchestrator.provider(),
    })
}

/// `POST /v1/leads`: the ingress collaborator named in spec.md §6.
/// Validates the payload, inserts (or finds) the Lead, and enqueues
/// `{leadId}` for the worker to process.
async fn ingest_lead(
    State(state): State<ServiceState>,
    Json(request): Json<IngestRequest>,
) -> Result<Json<IngestResponse>, ApiError> {
    validate_email(&request.email)?;
    if request.campaign_id.trim().is_empty() {
        return Err(ApiError::bad_request("campaign_id must not be empty"));
    }

    let mut lead = Lead::new(request.email, request.campaign_id, request.name);
    if let Some(existing) = state.lead_repo.find_by_idempotency_key(&lead.idempotency_key).await? {
        info!(lead_id = existing.id, "duplicate ingest, returning existing lead unchanged");
        return Ok(Json(IngestResponse {
            id: existing.id,
            status: existing.status,
            created: false,
        }));
    }

    let id = state.lead_repo.save(&mut lead).await?;
    let job = Job::new(id, state.worker_config.max_attempts);
    state.queue.enqueue(&state.worker_config.queue_name, &job).await?;

    Ok(Json(IngestResponse {
        id,
        status: lead.status,
        created: true,
    }))
}

async fn get_lead(
    State(state): State<ServiceState>,
    Path(id): Path<i64>,
) -> Result<Json<Lead>, ApiError> {
    state
        .lead_repo
        .find_by_id(id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found(format!("lead {id} not found")))
}

fn validate_email(email: &str) -> Result<(), ApiError> {
    if email.contains('@') && !email.trim().is_empty() {
        Ok(())
    } else {
        Err(ApiError::bad_request("email must be a valid address"))
    }
}
