//! JSON API for manpower requests and their approval workflow.
//!
//! - `POST /api/requests`                : submit a new request
//! - `GET  /api/requests`                : every request, newest first
//! - `GET  /api/requests/{id}`           : one request
//! - `GET  /api/requests/{id}/history`   : audit trail of one request
//! - `POST /api/requests/{id}/decide`    : approve, reject or return
//! - `GET  /api/approvals/pending`       : requests waiting on the caller
//!
//! The caller's identity comes from headers set by the trusted gateway.

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, FromRequestParts, Path, State},
    http::{request::Parts, HeaderMap, StatusCode},
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};
use uuid::Uuid;

use manpower_core::audit::ApprovalHistoryEntry;
use manpower_core::config::WorkflowConfig;
use manpower_core::domain::actor::{Actor, EmployeeId};
use manpower_core::domain::request::{
    DepartmentId, HrStatus, ManagementStatus, ManpowerRequest, NewManpowerRequest, OriginStatus,
    OverallStatus, PositionId, RequestId, Requirement, SectionId,
};
use manpower_core::errors::{ApplicationError, InterfaceError};
use manpower_core::workflow::{DecisionAction, Lane, WorkflowEngine};
use manpower_db::{
    DbPool, HistoryRepository, RepositoryError, RequestRepository, SqlHistoryRepository,
    SqlRequestRepository, SubmitPolicy,
};

pub const EMPLOYEE_ID_HEADER: &str = "x-employee-id";
pub const DEPARTMENT_ID_HEADER: &str = "x-department-id";
pub const SECTION_ID_HEADER: &str = "x-section-id";
pub const POSITION_ID_HEADER: &str = "x-position-id";
pub const ROLE_NAME_HEADER: &str = "x-role-name";
pub const CORRELATION_ID_HEADER: &str = "x-correlation-id";

#[derive(Clone)]
pub struct ApiState {
    requests: Arc<dyn RequestRepository>,
    history: Arc<dyn HistoryRepository>,
    engine: Arc<WorkflowEngine>,
}

impl ApiState {
    pub fn new(
        requests: Arc<dyn RequestRepository>,
        history: Arc<dyn HistoryRepository>,
        engine: Arc<WorkflowEngine>,
    ) -> Self {
        Self { requests, history, engine }
    }

    pub fn sql(db_pool: DbPool, workflow: &WorkflowConfig, engine: Arc<WorkflowEngine>) -> Self {
        Self::new(
            Arc::new(SqlRequestRepository::with_policy(
                db_pool.clone(),
                SubmitPolicy::from_config(workflow),
            )),
            Arc::new(SqlHistoryRepository::new(db_pool)),
            engine,
        )
    }
}

pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/api/requests", post(submit_request).get(list_requests))
        .route("/api/requests/{id}", get(get_request))
        .route("/api/requests/{id}/history", get(request_history))
        .route("/api/requests/{id}/decide", post(decide_request))
        .route("/api/approvals/pending", get(pending_approvals))
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    pub message: String,
    pub correlation_id: String,
}

pub type ApiError = (StatusCode, Json<ErrorBody>);

fn status_for(error: &InterfaceError) -> StatusCode {
    match error {
        InterfaceError::BadRequest { .. } => StatusCode::BAD_REQUEST,
        InterfaceError::Forbidden { .. } => StatusCode::FORBIDDEN,
        InterfaceError::NotFound { .. } => StatusCode::NOT_FOUND,
        InterfaceError::Conflict { .. } => StatusCode::CONFLICT,
        InterfaceError::ServiceUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
        InterfaceError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn interface_error(error: InterfaceError) -> ApiError {
    (
        status_for(&error),
        Json(ErrorBody {
            error: error.category().to_string(),
            message: error.user_message(),
            correlation_id: error.correlation_id().to_string(),
        }),
    )
}

fn bad_request(message: impl Into<String>, correlation_id: &CorrelationId) -> ApiError {
    interface_error(InterfaceError::BadRequest {
        message: message.into(),
        correlation_id: correlation_id.0.clone(),
    })
}

/// Maps a failure to its response, logging infrastructure faults.
fn application_error(application: ApplicationError, correlation_id: &CorrelationId) -> ApiError {
    if matches!(application, ApplicationError::Persistence(_) | ApplicationError::Configuration(_)) {
        error!(
            event_name = "api.request.failed",
            correlation_id = %correlation_id.0,
            category = application.category(),
            error = %application,
            "request failed on the persistence boundary"
        );
    }
    interface_error(application.into_interface(correlation_id.0.clone()))
}

fn repository_error(error: RepositoryError, correlation_id: &CorrelationId) -> ApiError {
    application_error(ApplicationError::from(error), correlation_id)
}

// ---------------------------------------------------------------------------
// Extractors
// ---------------------------------------------------------------------------

/// Per-request correlation id. Taken from `x-correlation-id` when the gateway
/// supplies one, otherwise generated, and shared by every extractor.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CorrelationId(pub String);

impl CorrelationId {
    fn from_parts(parts: &mut Parts) -> Self {
        if let Some(existing) = parts.extensions.get::<CorrelationId>() {
            return existing.clone();
        }
        let id = parts
            .headers
            .get(CORRELATION_ID_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(ToString::to_string)
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        let correlation_id = CorrelationId(id);
        parts.extensions.insert(correlation_id.clone());
        correlation_id
    }
}

impl<S: Send + Sync> FromRequestParts<S> for CorrelationId {
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self::from_parts(parts))
    }
}

/// The calling employee, built from gateway identity headers.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AuthenticatedActor(pub Actor);

impl<S: Send + Sync> FromRequestParts<S> for AuthenticatedActor {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let correlation_id = CorrelationId::from_parts(parts);
        actor_from_headers(&parts.headers).map(AuthenticatedActor).map_err(|message| {
            warn!(
                event_name = "api.identity.rejected",
                correlation_id = %correlation_id.0,
                reason = %message,
                "request carried no usable identity"
            );
            (
                StatusCode::UNAUTHORIZED,
                Json(ErrorBody {
                    error: "unauthorized".to_string(),
                    message,
                    correlation_id: correlation_id.0,
                }),
            )
        })
    }
}

fn header_text<'h>(headers: &'h HeaderMap, name: &str) -> Option<&'h str> {
    headers.get(name).and_then(|value| value.to_str().ok()).map(str::trim).filter(|v| !v.is_empty())
}

fn header_id(headers: &HeaderMap, name: &str) -> Result<Option<i64>, String> {
    header_text(headers, name)
        .map(|raw| raw.parse::<i64>().map_err(|_| format!("header `{name}` must be an integer")))
        .transpose()
}

fn actor_from_headers(headers: &HeaderMap) -> Result<Actor, String> {
    let required = |name: &str| -> Result<i64, String> {
        match header_id(headers, name)? {
            Some(id) if id > 0 => Ok(id),
            _ => Err(format!("missing identity header `{name}`")),
        }
    };

    let employee_id = header_text(headers, EMPLOYEE_ID_HEADER)
        .ok_or_else(|| format!("missing identity header `{EMPLOYEE_ID_HEADER}`"))?;

    Ok(Actor {
        employee_id: EmployeeId(employee_id.to_string()),
        department_id: DepartmentId(required(DEPARTMENT_ID_HEADER)?),
        section_id: header_id(headers, SECTION_ID_HEADER)?.map(SectionId),
        position_id: PositionId(required(POSITION_ID_HEADER)?),
        role_name: header_text(headers, ROLE_NAME_HEADER).unwrap_or_default().to_string(),
    })
}

// ---------------------------------------------------------------------------
// Request / Response types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct SubmitBody {
    pub department_id: i64,
    pub section_id: Option<i64>,
    pub position_id: i64,
    #[serde(flatten)]
    pub requirement: Requirement,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SubmitResponse {
    pub request_id: i64,
    pub doc_number: String,
    pub doc_date: NaiveDate,
    pub created_at: DateTime<Utc>,
    pub origin_status: OriginStatus,
    pub hr_status: HrStatus,
    pub management_status: ManagementStatus,
    pub overall_status: OverallStatus,
}

#[derive(Debug, Deserialize)]
pub struct DecideBody {
    pub action: String,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DecideResponse {
    pub request_id: i64,
    pub doc_number: String,
    pub lane: Lane,
    pub step: u8,
    pub origin_status: OriginStatus,
    pub hr_status: HrStatus,
    pub management_status: ManagementStatus,
    pub overall_status: OverallStatus,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RequestView {
    pub request_id: i64,
    pub doc_number: String,
    pub doc_date: NaiveDate,
    pub department_id: i64,
    pub section_id: Option<i64>,
    pub position_id: i64,
    pub employee_id: String,
    #[serde(flatten)]
    pub requirement: Requirement,
    pub origin_status: OriginStatus,
    pub hr_status: HrStatus,
    pub management_status: ManagementStatus,
    pub overall_status: OverallStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<ManpowerRequest> for RequestView {
    fn from(request: ManpowerRequest) -> Self {
        Self {
            request_id: request.id.0,
            doc_number: request.doc_number.0,
            doc_date: request.doc_date,
            department_id: request.department_id.0,
            section_id: request.section_id.map(|section| section.0),
            position_id: request.position_id.0,
            employee_id: request.employee_id.0,
            requirement: request.requirement,
            origin_status: request.status.origin,
            hr_status: request.status.hr,
            management_status: request.status.management,
            overall_status: request.status.overall,
            created_at: request.created_at,
            updated_at: request.updated_at,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PendingResponse {
    pub lane: Option<Lane>,
    pub requests: Vec<RequestView>,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

fn parse_request_id(
    raw: Result<Path<i64>, axum::extract::rejection::PathRejection>,
    correlation_id: &CorrelationId,
) -> Result<RequestId, ApiError> {
    raw.map(|Path(id)| RequestId(id))
        .map_err(|_| bad_request("request id must be an integer", correlation_id))
}

async fn submit_request(
    State(state): State<ApiState>,
    correlation_id: CorrelationId,
    AuthenticatedActor(actor): AuthenticatedActor,
    payload: Result<Json<SubmitBody>, JsonRejection>,
) -> Result<(StatusCode, Json<SubmitResponse>), ApiError> {
    let Json(body) =
        payload.map_err(|rejection| bad_request(rejection.body_text(), &correlation_id))?;

    let request = NewManpowerRequest {
        department_id: DepartmentId(body.department_id),
        section_id: body.section_id.map(SectionId),
        position_id: PositionId(body.position_id),
        employee_id: actor.employee_id,
        requirement: body.requirement,
    };

    let created = state
        .requests
        .submit(request)
        .await
        .map_err(|error| repository_error(error, &correlation_id))?;

    info!(
        event_name = "workflow.request.submitted",
        correlation_id = %correlation_id.0,
        request_id = created.id.0,
        doc_number = %created.doc_number,
        employee_id = %created.employee_id.0,
        "manpower request submitted"
    );

    Ok((
        StatusCode::CREATED,
        Json(SubmitResponse {
            request_id: created.id.0,
            doc_number: created.doc_number.0,
            doc_date: created.doc_date,
            created_at: created.created_at,
            origin_status: created.status.origin,
            hr_status: created.status.hr,
            management_status: created.status.management,
            overall_status: created.status.overall,
        }),
    ))
}

async fn list_requests(
    State(state): State<ApiState>,
    correlation_id: CorrelationId,
    AuthenticatedActor(_actor): AuthenticatedActor,
) -> Result<Json<Vec<RequestView>>, ApiError> {
    let requests =
        state.requests.list_all().await.map_err(|error| repository_error(error, &correlation_id))?;
    Ok(Json(requests.into_iter().map(RequestView::from).collect()))
}

async fn get_request(
    State(state): State<ApiState>,
    correlation_id: CorrelationId,
    AuthenticatedActor(_actor): AuthenticatedActor,
    id: Result<Path<i64>, axum::extract::rejection::PathRejection>,
) -> Result<Json<RequestView>, ApiError> {
    let id = parse_request_id(id, &correlation_id)?;
    state
        .requests
        .find_by_id(id)
        .await
        .map_err(|error| repository_error(error, &correlation_id))?
        .map(|request| Json(RequestView::from(request)))
        .ok_or_else(|| repository_error(RepositoryError::NotFound(id), &correlation_id))
}

async fn request_history(
    State(state): State<ApiState>,
    correlation_id: CorrelationId,
    AuthenticatedActor(_actor): AuthenticatedActor,
    id: Result<Path<i64>, axum::extract::rejection::PathRejection>,
) -> Result<Json<Vec<ApprovalHistoryEntry>>, ApiError> {
    let id = parse_request_id(id, &correlation_id)?;
    let entries = state
        .history
        .list_for_request(id)
        .await
        .map_err(|error| repository_error(error, &correlation_id))?;
    Ok(Json(entries))
}

async fn decide_request(
    State(state): State<ApiState>,
    correlation_id: CorrelationId,
    AuthenticatedActor(actor): AuthenticatedActor,
    id: Result<Path<i64>, axum::extract::rejection::PathRejection>,
    payload: Result<Json<DecideBody>, JsonRejection>,
) -> Result<Json<DecideResponse>, ApiError> {
    let id = parse_request_id(id, &correlation_id)?;
    let Json(body) =
        payload.map_err(|rejection| bad_request(rejection.body_text(), &correlation_id))?;
    let action = DecisionAction::parse(&body.action)
        .map_err(|error| application_error(ApplicationError::from(error), &correlation_id))?;
    let notes = body.notes.unwrap_or_default();

    match state.requests.apply_decision(id, &state.engine, &actor, action, notes.trim()).await {
        Ok(record) => {
            info!(
                event_name = "workflow.decision.applied",
                correlation_id = %correlation_id.0,
                request_id = id.0,
                doc_number = %record.request.doc_number,
                lane = %record.outcome.lane,
                action = record.outcome.action.as_str(),
                step = record.outcome.step,
                employee_id = %actor.employee_id.0,
                overall_status = record.request.status.overall.as_str(),
                "approval decision applied"
            );

            Ok(Json(DecideResponse {
                request_id: record.request.id.0,
                doc_number: record.request.doc_number.0,
                lane: record.outcome.lane,
                step: record.outcome.step,
                origin_status: record.request.status.origin,
                hr_status: record.request.status.hr,
                management_status: record.request.status.management,
                overall_status: record.request.status.overall,
            }))
        }
        Err(error) => {
            let application = ApplicationError::from(error);
            warn!(
                event_name = "workflow.decision.rejected",
                correlation_id = %correlation_id.0,
                request_id = id.0,
                action = action.as_str(),
                employee_id = %actor.employee_id.0,
                category = application.category(),
                error = %application,
                "approval decision rejected"
            );
            Err(application_error(application, &correlation_id))
        }
    }
}

async fn pending_approvals(
    State(state): State<ApiState>,
    correlation_id: CorrelationId,
    AuthenticatedActor(actor): AuthenticatedActor,
) -> Result<Json<PendingResponse>, ApiError> {
    let Some(filter) = state.engine.pending_filter(&actor) else {
        return Ok(Json(PendingResponse { lane: None, requests: Vec::new() }));
    };

    let requests = state
        .requests
        .list_pending(&filter)
        .await
        .map_err(|error| repository_error(error, &correlation_id))?;

    Ok(Json(PendingResponse {
        lane: Some(filter.lane),
        requests: requests.into_iter().map(RequestView::from).collect(),
    }))
}
