//! v1 REST API: document generation jobs.
//!
//! Submitting a document returns immediately with a job ID; clients poll
//! `GET /v1/documents/{id}` until the status is `success` or `error`.

use axum::{
    Router,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::get,
};
use docforge_agent::JobRegistry;
use docforge_core::{DocumentRequest, JobId, JobSnapshot, JobStatus, ModelProvider};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

/// State shared by all v1 handlers.
pub struct ApiV1State {
    pub registry: Arc<JobRegistry>,
    /// Used when a request does not name a provider
    pub default_provider: ModelProvider,
}

pub type SharedApiState = Arc<ApiV1State>;

pub fn v1_router(state: SharedApiState) -> Router {
    Router::new()
        .route(
            "/documents",
            get(list_documents_handler).post(create_document_handler),
        )
        .route("/documents/{id}", get(get_document_handler))
        .with_state(state)
}

// ── Errors ────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

fn error_response(status: StatusCode, error: impl Into<String>) -> Response {
    (status, Json(ErrorResponse { error: error.into() })).into_response()
}

// ── Documents ─────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct CreateDocumentBody {
    #[serde(default)]
    topic: String,
    #[serde(default)]
    subtopic: Option<String>,
    #[serde(default)]
    key_points: Vec<String>,
    #[serde(default)]
    model_provider: Option<ModelProvider>,
    #[serde(default)]
    enable_research: bool,
    #[serde(default)]
    output_file: Option<String>,
}

impl CreateDocumentBody {
    fn into_request(self, default_provider: ModelProvider) -> DocumentRequest {
        DocumentRequest {
            topic: self.topic,
            subtopic: self.subtopic,
            key_points: self.key_points,
            model_provider: self.model_provider.unwrap_or(default_provider),
            enable_research: self.enable_research,
            output_file: self.output_file,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CreateDocumentResponse {
    pub job_id: JobId,
    pub status: JobStatus,
}

async fn create_document_handler(
    State(state): State<SharedApiState>,
    payload: Result<Json<CreateDocumentBody>, JsonRejection>,
) -> Response {
    let body = match payload {
        Ok(Json(body)) => body,
        Err(rejection) => {
            warn!(error = %rejection.body_text(), "Rejected document request body");
            return error_response(StatusCode::BAD_REQUEST, rejection.body_text());
        }
    };

    match state
        .registry
        .create(body.into_request(state.default_provider))
        .await
    {
        Ok(job_id) => {
            info!(job_id = %job_id, "Document job accepted");
            (
                StatusCode::ACCEPTED,
                Json(CreateDocumentResponse {
                    job_id,
                    status: JobStatus::Pending,
                }),
            )
                .into_response()
        }
        Err(e) => error_response(StatusCode::BAD_REQUEST, e.to_string()),
    }
}

async fn get_document_handler(
    State(state): State<SharedApiState>,
    Path(id): Path<String>,
) -> Result<Json<JobSnapshot>, Response> {
    state
        .registry
        .get_status(&JobId::from(&id))
        .await
        .map(Json)
        .ok_or_else(|| error_response(StatusCode::NOT_FOUND, format!("job not found: {id}")))
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DocumentListResponse {
    pub jobs: Vec<JobSnapshot>,
    pub count: usize,
}

async fn list_documents_handler(State(state): State<SharedApiState>) -> Json<DocumentListResponse> {
    let jobs = state.registry.list().await;
    let count = jobs.len();
    Json(DocumentListResponse { jobs, count })
}
