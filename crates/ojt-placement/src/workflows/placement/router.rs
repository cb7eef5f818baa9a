use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::json;

use super::domain::{Actor, ApplicantRef, JobId};
use super::error::PlacementError;
use super::service::PlacementService;
use super::status::TransitionRequest;

pub const ACTOR_ID_HEADER: &str = "x-actor-id";
pub const ACTOR_ROLE_HEADER: &str = "x-actor-role";
pub const ACTOR_ORG_HEADER: &str = "x-actor-org";

/// Router builder exposing the placement workflow over HTTP.
pub fn placement_router(service: Arc<PlacementService>) -> Router {
    Router::new()
        .route(
            "/api/v1/placements/jobs/:job_id/applicants",
            post(apply_handler).get(list_handler),
        )
        .route(
            "/api/v1/placements/jobs/:job_id/applicants/:student_id",
            get(view_handler),
        )
        .route(
            "/api/v1/placements/jobs/:job_id/applicants/:student_id/status",
            post(status_handler),
        )
        .route(
            "/api/v1/placements/jobs/:job_id/applicants/:student_id/signatures",
            post(signature_handler),
        )
        .route(
            "/api/v1/placements/jobs/:job_id/applicants/:student_id/moa",
            get(agreement_handler),
        )
        .route("/api/v1/placements/term", post(term_preview_handler))
        .with_state(service)
}

#[derive(Debug, Deserialize)]
pub struct SignatureRequest {
    pub signature_image: String,
}

#[derive(Debug, Deserialize)]
pub struct TermPreviewRequest {
    pub start_date: NaiveDate,
    pub duration: String,
}

pub(crate) async fn apply_handler(
    State(service): State<Arc<PlacementService>>,
    Path(job_id): Path<String>,
    headers: HeaderMap,
) -> Response {
    let actor = match actor_from_headers(&headers) {
        Ok(actor) => actor,
        Err(response) => return response,
    };

    match service.apply(&actor, &JobId(job_id)).await {
        Ok(record) => (StatusCode::CREATED, axum::Json(record.view())).into_response(),
        Err(err) => err.into_response(),
    }
}

pub(crate) async fn list_handler(
    State(service): State<Arc<PlacementService>>,
    Path(job_id): Path<String>,
    headers: HeaderMap,
) -> Response {
    let actor = match actor_from_headers(&headers) {
        Ok(actor) => actor,
        Err(response) => return response,
    };

    match service.list(&actor, &JobId(job_id)).await {
        Ok(records) => {
            let views: Vec<_> = records.iter().map(|record| record.view()).collect();
            (StatusCode::OK, axum::Json(views)).into_response()
        }
        Err(err) => err.into_response(),
    }
}

pub(crate) async fn view_handler(
    State(service): State<Arc<PlacementService>>,
    Path((job_id, student_id)): Path<(String, String)>,
    headers: HeaderMap,
) -> Response {
    let actor = match actor_from_headers(&headers) {
        Ok(actor) => actor,
        Err(response) => return response,
    };

    let applicant = ApplicantRef::new(job_id, student_id);
    match service.get(&actor, &applicant).await {
        Ok(record) => (StatusCode::OK, axum::Json(record.view())).into_response(),
        Err(err) => err.into_response(),
    }
}

pub(crate) async fn status_handler(
    State(service): State<Arc<PlacementService>>,
    Path((job_id, student_id)): Path<(String, String)>,
    headers: HeaderMap,
    axum::Json(request): axum::Json<TransitionRequest>,
) -> Response {
    let actor = match actor_from_headers(&headers) {
        Ok(actor) => actor,
        Err(response) => return response,
    };

    let applicant = ApplicantRef::new(job_id, student_id);
    match service.transition(&actor, &applicant, request).await {
        Ok(outcome) => {
            let payload = json!({
                "applicant": outcome.applicant,
                "kind": outcome.kind,
                "notification": outcome.notification,
                "partially_applied": outcome.partially_applied(),
                "message": outcome.summary(),
            });
            (StatusCode::OK, axum::Json(payload)).into_response()
        }
        Err(err) => err.into_response(),
    }
}

pub(crate) async fn signature_handler(
    State(service): State<Arc<PlacementService>>,
    Path((job_id, student_id)): Path<(String, String)>,
    headers: HeaderMap,
    axum::Json(request): axum::Json<SignatureRequest>,
) -> Response {
    let actor = match actor_from_headers(&headers) {
        Ok(actor) => actor,
        Err(response) => return response,
    };

    let applicant = ApplicantRef::new(job_id, student_id);
    match service
        .record_signature(&actor, &applicant, &request.signature_image)
        .await
    {
        Ok(outcome) => (StatusCode::OK, axum::Json(outcome)).into_response(),
        Err(err) => err.into_response(),
    }
}

pub(crate) async fn agreement_handler(
    State(service): State<Arc<PlacementService>>,
    Path((job_id, student_id)): Path<(String, String)>,
    headers: HeaderMap,
) -> Response {
    let actor = match actor_from_headers(&headers) {
        Ok(actor) => actor,
        Err(response) => return response,
    };

    let applicant = ApplicantRef::new(job_id, student_id);
    match service.ensure_agreement(&actor, &applicant).await {
        Ok(Some(document)) => (StatusCode::OK, axum::Json(document)).into_response(),
        Ok(None) => {
            let payload = json!({
                "error": "agreement is waiting for both signatures",
                "job_id": applicant.job_id,
                "student_id": applicant.student_id,
            });
            (StatusCode::NOT_FOUND, axum::Json(payload)).into_response()
        }
        Err(err) => err.into_response(),
    }
}

pub(crate) async fn term_preview_handler(
    axum::Json(request): axum::Json<TermPreviewRequest>,
) -> Response {
    match PlacementService::term_preview(request.start_date, &request.duration) {
        Ok(term) => (StatusCode::OK, axum::Json(term)).into_response(),
        Err(err) => {
            let payload = json!({ "error": err.to_string() });
            (StatusCode::UNPROCESSABLE_ENTITY, axum::Json(payload)).into_response()
        }
    }
}

/// Build the acting principal from the `x-actor-*` headers.
pub(crate) fn actor_from_headers(headers: &HeaderMap) -> Result<Actor, Response> {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|value| !value.is_empty())
    };

    let unauthorized = |detail: &str| {
        let payload = json!({ "error": detail });
        (StatusCode::UNAUTHORIZED, axum::Json(payload)).into_response()
    };

    let Some(user_id) = header(ACTOR_ID_HEADER) else {
        return Err(unauthorized("missing x-actor-id header"));
    };
    let role = header(ACTOR_ROLE_HEADER).map(str::to_ascii_lowercase);

    match role.as_deref() {
        Some("student") => Ok(Actor::student(user_id)),
        Some("company") => match header(ACTOR_ORG_HEADER) {
            Some(org) => Ok(Actor::company(user_id, org)),
            None => Err(unauthorized("company actors must send x-actor-org")),
        },
        Some("academy") => match header(ACTOR_ORG_HEADER) {
            Some(org) => Ok(Actor::academy(user_id, org)),
            None => Err(unauthorized("academy actors must send x-actor-org")),
        },
        _ => Err(unauthorized(
            "x-actor-role must be one of student, company, academy",
        )),
    }
}

impl PlacementError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            PlacementError::NotFound(_) => StatusCode::NOT_FOUND,
            PlacementError::InvalidTransition(_) => StatusCode::UNPROCESSABLE_ENTITY,
            PlacementError::AlreadySigned { .. }
            | PlacementError::AlreadyApplied
            | PlacementError::StaleRecord => StatusCode::CONFLICT,
            PlacementError::Forbidden { .. } => StatusCode::FORBIDDEN,
            PlacementError::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
            PlacementError::Calendar(_) => StatusCode::BAD_GATEWAY,
            PlacementError::Store(_)
            | PlacementError::Lookup(_)
            | PlacementError::AgreementPending { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for PlacementError {
    fn into_response(self) -> Response {
        let payload = json!({
            "error": self.to_string(),
            "message": self.user_message(),
            "scope": self.scope(),
            "retry_safe": self.retry_safe(),
        });
        (self.status_code(), axum::Json(payload)).into_response()
    }
}
