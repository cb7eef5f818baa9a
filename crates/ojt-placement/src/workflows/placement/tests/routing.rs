use super::common::*;
use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::{header, HeaderMap, HeaderValue, Request, StatusCode};
use chrono::{Days, NaiveDate};
use serde_json::{json, Value};
use tower::ServiceExt;

use crate::workflows::placement::router::{
    placement_router, ACTOR_ID_HEADER, ACTOR_ORG_HEADER, ACTOR_ROLE_HEADER,
};

const APPLICANTS: &str = "/api/v1/placements/jobs/job-1/applicants";

fn request(
    method: &str,
    uri: &str,
    actor: Option<(&str, &str, Option<&str>)>,
    body: Option<Value>,
) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some((id, role, org)) = actor {
        builder = builder
            .header(ACTOR_ID_HEADER, id)
            .header(ACTOR_ROLE_HEADER, role);
        if let Some(org) = org {
            builder = builder.header(ACTOR_ORG_HEADER, org);
        }
    }
    match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(serde_json::to_vec(&body).expect("json")))
            .expect("request"),
        None => builder.body(Body::empty()).expect("request"),
    }
}

const STUDENT_ACTOR: Option<(&str, &str, Option<&str>)> = Some(("stu-1", "student", None));
const COMPANY_ACTOR: Option<(&str, &str, Option<&str>)> = Some(("hr-1", "company", Some("co-1")));
const ACADEMY_ACTOR: Option<(&str, &str, Option<&str>)> =
    Some(("dean-1", "academy", Some("acad-1")));

#[tokio::test]
async fn apply_route_creates_applicants_once() {
    let harness = harness();
    let router = placement_router(harness.service.clone());

    let response = router
        .clone()
        .oneshot(request("POST", APPLICANTS, STUDENT_ACTOR, None))
        .await
        .expect("route executes");
    assert_eq!(response.status(), StatusCode::CREATED);
    let payload = read_json_body(response).await;
    assert_eq!(payload["status"], "applied");
    assert_eq!(payload["student_id"], "stu-1");

    let response = router
        .oneshot(request("POST", APPLICANTS, STUDENT_ACTOR, None))
        .await
        .expect("route executes");
    assert_eq!(response.status(), StatusCode::CONFLICT);
    let payload = read_json_body(response).await;
    assert_eq!(payload["scope"], "nothing_applied");
    assert_eq!(payload["retry_safe"], false);
}

#[tokio::test]
async fn requests_without_actor_headers_are_unauthorized() {
    let harness = harness();
    let router = placement_router(harness.service.clone());

    let response = router
        .oneshot(request("POST", APPLICANTS, None, None))
        .await
        .expect("route executes");
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let mut headers = HeaderMap::new();
    headers.insert(ACTOR_ID_HEADER, HeaderValue::from_static("hr-1"));
    headers.insert(ACTOR_ROLE_HEADER, HeaderValue::from_static("company"));
    let response = crate::workflows::placement::router::apply_handler(
        State(harness.service.clone()),
        Path(JOB.to_string()),
        headers,
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn status_route_reports_transition_and_notification() {
    let harness = harness();
    let router = placement_router(harness.service.clone());
    router
        .clone()
        .oneshot(request("POST", APPLICANTS, STUDENT_ACTOR, None))
        .await
        .expect("apply");

    let body = json!({
        "status": "shortlisted",
        "interview": { "date": "2025-03-01", "time": "14:00" }
    });
    let response = router
        .clone()
        .oneshot(request(
            "POST",
            &format!("{APPLICANTS}/stu-1/status"),
            COMPANY_ACTOR,
            Some(body),
        ))
        .await
        .expect("route executes");
    assert_eq!(response.status(), StatusCode::OK);
    let payload = read_json_body(response).await;
    assert_eq!(payload["applicant"]["status"], "shortlisted");
    assert_eq!(payload["kind"], "advance");
    assert_eq!(payload["notification"]["state"], "sent");
    assert_eq!(payload["partially_applied"], false);

    let response = router
        .oneshot(request(
            "POST",
            &format!("{APPLICANTS}/stu-1/status"),
            COMPANY_ACTOR,
            Some(json!({ "status": "applied" })),
        ))
        .await
        .expect("route executes");
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn status_route_forbids_other_companies() {
    let harness = harness();
    let router = placement_router(harness.service.clone());
    router
        .clone()
        .oneshot(request("POST", APPLICANTS, STUDENT_ACTOR, None))
        .await
        .expect("apply");

    let response = router
        .oneshot(request(
            "POST",
            &format!("{APPLICANTS}/stu-1/status"),
            Some(("hr-9", "company", Some("co-other"))),
            Some(json!({ "status": "rejected" })),
        ))
        .await
        .expect("route executes");
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn signatures_route_and_moa_route_complete_the_agreement() {
    let harness = harness();
    harness.selected_applicant().await;
    let router = placement_router(harness.service.clone());
    let moa_uri = format!("{APPLICANTS}/stu-1/moa");

    let response = router
        .clone()
        .oneshot(request("GET", &moa_uri, STUDENT_ACTOR, None))
        .await
        .expect("route executes");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    for actor in [COMPANY_ACTOR, ACADEMY_ACTOR] {
        let response = router
            .clone()
            .oneshot(request(
                "POST",
                &format!("{APPLICANTS}/stu-1/signatures"),
                actor,
                Some(json!({ "signature_image": "data:image/png;base64,AAAA" })),
            ))
            .await
            .expect("route executes");
        assert_eq!(response.status(), StatusCode::OK);
    }

    let response = router
        .oneshot(request("GET", &moa_uri, ACADEMY_ACTOR, None))
        .await
        .expect("route executes");
    assert_eq!(response.status(), StatusCode::OK);
    let payload = read_json_body(response).await;
    assert_eq!(payload["document_id"], "moa-000001");
    assert_eq!(payload["term"]["total_hours"], 424);
}

#[tokio::test]
async fn term_route_previews_and_validates_durations() {
    let harness = harness();
    let router = placement_router(harness.service.clone());

    let response = router
        .clone()
        .oneshot(request(
            "POST",
            "/api/v1/placements/term",
            None,
            Some(json!({ "start_date": "2025-04-01", "duration": "2 months" })),
        ))
        .await
        .expect("route executes");
    assert_eq!(response.status(), StatusCode::OK);
    let payload = read_json_body(response).await;
    assert_eq!(payload["end_date"], "2025-06-01");
    assert_eq!(payload["total_hours"], 424);

    let response = router
        .oneshot(request(
            "POST",
            "/api/v1/placements/term",
            None,
            Some(json!({ "start_date": "2025-04-01", "duration": "a fortnight" })),
        ))
        .await
        .expect("route executes");
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn term_route_handles_terms_ending_on_the_last_calendar_day() {
    let harness = harness();
    let router = placement_router(harness.service.clone());
    let start = NaiveDate::MAX
        .checked_sub_days(Days::new(6))
        .expect("in range");

    let response = router
        .oneshot(request(
            "POST",
            "/api/v1/placements/term",
            None,
            Some(json!({ "start_date": start, "duration": "6 days" })),
        ))
        .await
        .expect("route executes");
    assert_eq!(response.status(), StatusCode::OK);
    let payload = read_json_body(response).await;
    assert_eq!(payload["total_hours"], 48);
}

#[tokio::test]
async fn agreement_and_applicant_reads_require_a_participant() {
    let harness = harness();
    harness.selected_applicant().await;
    for actor in [hiring_company(), enrolled_academy()] {
        harness
            .service
            .record_signature(&actor, &applicant(), "data:image/png;base64,SECRET")
            .await
            .expect("signs");
    }
    let router = placement_router(harness.service.clone());
    let moa_uri = format!("{APPLICANTS}/stu-1/moa");

    let response = router
        .clone()
        .oneshot(request("GET", &moa_uri, None, None))
        .await
        .expect("route executes");
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let payload = read_json_body(response).await;
    assert!(!payload.to_string().contains("SECRET"));

    for outsider in [
        Some(("hr-9", "company", Some("co-other"))),
        Some(("dean-9", "academy", Some("acad-other"))),
        Some(("stu-9", "student", None)),
    ] {
        let response = router
            .clone()
            .oneshot(request("GET", &moa_uri, outsider, None))
            .await
            .expect("route executes");
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        let payload = read_json_body(response).await;
        assert!(!payload.to_string().contains("SECRET"));
    }

    let response = router
        .clone()
        .oneshot(request("GET", &format!("{APPLICANTS}/stu-1"), None, None))
        .await
        .expect("route executes");
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = router
        .oneshot(request("GET", APPLICANTS, STUDENT_ACTOR, None))
        .await
        .expect("route executes");
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn store_outages_map_to_server_errors() {
    let router = placement_router(unavailable_service());

    let response = router
        .oneshot(request("GET", &format!("{APPLICANTS}/stu-1"), STUDENT_ACTOR, None))
        .await
        .expect("route executes");
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let payload = read_json_body(response).await;
    assert_eq!(payload["scope"], "nothing_applied");
    assert_eq!(payload["retry_safe"], true);
    assert!(payload["message"]
        .as_str()
        .expect("message")
        .contains("safe to try again"));
}

#[tokio::test]
async fn list_route_returns_views_without_signature_images() {
    let harness = harness();
    harness.selected_applicant().await;
    harness
        .service
        .record_signature(&hiring_company(), &applicant(), "data:image/png;base64,SECRET")
        .await
        .expect("company signs");
    let router = placement_router(harness.service.clone());

    let response = router
        .oneshot(request("GET", APPLICANTS, COMPANY_ACTOR, None))
        .await
        .expect("route executes");
    assert_eq!(response.status(), StatusCode::OK);
    let payload = read_json_body(response).await;
    let applicants = payload.as_array().expect("array");
    assert_eq!(applicants.len(), 1);
    assert_eq!(applicants[0]["company_signed"], true);
    assert!(!payload.to_string().contains("SECRET"));
}
