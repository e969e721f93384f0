// src/server/handlers.rs
// =============================================================================
// Route handlers. Errors come back as `(StatusCode, Json<ErrorBody>)` with a
// short machine-readable `error` string.
// =============================================================================

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use super::AppState;
use crate::audit::AuditResult;
use crate::events::sse::sse_response;
use crate::jobs::{CreateJobError, JobId, JobSnapshot};

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    error: String,
}

type ApiError = (StatusCode, Json<ErrorBody>);

fn api_error(status: StatusCode, error: impl Into<String>) -> ApiError {
    (status, Json(ErrorBody { error: error.into() }))
}

fn not_found() -> ApiError {
    api_error(StatusCode::NOT_FOUND, "not_found")
}

// Anything that doesn't parse as a job id can't name a job
fn parse_job_id(raw: &str) -> Result<JobId, ApiError> {
    Uuid::parse_str(raw).map_err(|_| not_found())
}

#[derive(Debug, Serialize)]
pub struct Health {
    status: &'static str,
}

pub async fn healthz() -> Json<Health> {
    Json(Health { status: "ok" })
}

#[derive(Debug, Deserialize)]
pub struct RunParams {
    #[serde(default)]
    country: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunResponse {
    job_id: JobId,
    mode: &'static str,
}

pub async fn run_bulk(
    State(state): State<AppState>,
    Query(params): Query<RunParams>,
) -> Result<Json<RunResponse>, ApiError> {
    let country = params.country.unwrap_or_default();
    match state.jobs.create_job(&country) {
        Ok(job_id) => Ok(Json(RunResponse {
            job_id,
            mode: "bulk",
        })),
        Err(CreateJobError::MissingCountry) => {
            Err(api_error(StatusCode::BAD_REQUEST, "missing_country"))
        }
    }
}

pub async fn bulk_status(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<JobSnapshot>, ApiError> {
    let id = parse_job_id(&id)?;
    state.jobs.status(&id).map(Json).ok_or_else(not_found)
}

pub async fn bulk_stream(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let id = parse_job_id(&id)?;
    let subscription = state.jobs.subscribe(&id).ok_or_else(not_found)?;
    info!(job_id = %id, "stream subscriber attached");
    Ok(sse_response(subscription, state.heartbeat).into_response())
}

#[derive(Debug, Deserialize)]
pub struct AuditRequest {
    #[serde(default)]
    url: Option<String>,
}

pub async fn audit_post(
    State(state): State<AppState>,
    body: Result<Json<AuditRequest>, JsonRejection>,
) -> Result<Json<AuditResult>, ApiError> {
    // No body, wrong content type and unparseable JSON all mean "no url"
    let url = body.ok().and_then(|Json(request)| request.url);
    audit_one(&state, url).await
}

pub async fn audit_get(
    State(state): State<AppState>,
    Query(request): Query<AuditRequest>,
) -> Result<Json<AuditResult>, ApiError> {
    audit_one(&state, request.url).await
}

async fn audit_one(state: &AppState, url: Option<String>) -> Result<Json<AuditResult>, ApiError> {
    let url = url
        .map(|u| u.trim().to_string())
        .filter(|u| !u.is_empty())
        .ok_or_else(|| api_error(StatusCode::BAD_REQUEST, "Missing url"))?;

    let auditor = state
        .jobs
        .page_auditor()
        .map_err(|e| api_error(StatusCode::INTERNAL_SERVER_ERROR, format!("{e:#}")))?;

    match auditor.audit(&url).await {
        Ok(result) => Ok(Json(result)),
        Err(e) => {
            warn!(%url, error = %format!("{e:#}"), "single-page audit failed");
            Err(api_error(StatusCode::BAD_REQUEST, format!("{e:#}")))
        }
    }
}
