//! HTTP surface tests: intake validation, result endpoint, progress stream

mod helpers;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use std::sync::Arc;
use tower::util::ServiceExt;

use helpers::{ScriptedModel, ScriptedStt, TestHarness};
use tribunal_common::Phase;
use tribunal_grader::providers::Unconfigured;
use tribunal_grader::{build_router, AppState};

const BOUNDARY: &str = "X-TRIBUNAL-TEST-BOUNDARY";

/// Build a multipart/form-data body from (name, filename+mime, bytes) parts
fn multipart_body(parts: &[(&str, Option<(&str, &str)>, &[u8])]) -> Vec<u8> {
    let mut body = Vec::new();
    for (name, file, bytes) in parts {
        body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
        match file {
            Some((filename, mime)) => {
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{name}\"; filename=\"{filename}\"\r\n\
                         Content-Type: {mime}\r\n\r\n"
                    )
                    .as_bytes(),
                );
            }
            None => {
                body.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n").as_bytes(),
                );
            }
        }
        body.extend_from_slice(bytes);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}

fn intake_request(body: Vec<u8>) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/api/submissions")
        .header(
            "content-type",
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap()
}

/// Full valid form for the seeded url-shortener problem
fn valid_parts<'a>() -> Vec<(&'a str, Option<(&'a str, &'a str)>, &'a [u8])> {
    vec![
        ("problem_id", None, b"url-shortener".as_slice()),
        (
            "phase_times",
            None,
            br#"{"clarify":180,"estimate":240,"design":480,"explain":300}"#.as_slice(),
        ),
        ("canvas_clarify", Some(("c.png", "image/png")), b"png1".as_slice()),
        ("canvas_estimate", Some(("c.png", "image/png")), b"png2".as_slice()),
        ("canvas_design", Some(("c.png", "image/png")), b"png3".as_slice()),
        ("canvas_explain", Some(("c.png", "image/png")), b"png4".as_slice()),
    ]
}

async fn app(harness: &TestHarness) -> axum::Router {
    let driver = harness.driver(Arc::new(Unconfigured), Arc::new(Unconfigured));
    build_router(AppState::new(
        harness.db.clone(),
        harness.config.clone(),
        harness.storage.clone(),
        driver,
    ))
}

async fn submission_count(harness: &TestHarness) -> i64 {
    sqlx::query_scalar("SELECT COUNT(*) FROM submissions")
        .fetch_one(&harness.db)
        .await
        .unwrap()
}

#[tokio::test]
async fn intake_accepts_a_valid_submission() {
    let harness = TestHarness::new().await;
    let app = app(&harness).await;

    let response = app
        .oneshot(intake_request(multipart_body(&valid_parts())))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = response.into_body().collect().await.unwrap().to_bytes();
    let parsed: serde_json::Value = serde_json::from_slice(&body).unwrap();
    let id: uuid::Uuid = parsed["submission_id"].as_str().unwrap().parse().unwrap();

    let submission = tribunal_grader::db::submissions::get_submission(&harness.db, id)
        .await
        .unwrap()
        .expect("row created");
    assert_eq!(submission.problem_id, "url-shortener");
    assert_eq!(submission.phase_times[&Phase::Design], 480);

    let artifacts = tribunal_grader::db::artifacts::get_artifacts(&harness.db, id)
        .await
        .unwrap();
    assert_eq!(artifacts.len(), 4);

    let events = tribunal_grader::db::events::get_events(&harness.db, id)
        .await
        .unwrap();
    assert_eq!(events[0].status, tribunal_common::StreamStatus::Queued);
}

#[tokio::test]
async fn unknown_problem_is_rejected_without_a_row() {
    let harness = TestHarness::new().await;
    let app = app(&harness).await;

    let mut parts = valid_parts();
    parts[0] = ("problem_id", None, b"nope".as_slice());

    let response = app
        .oneshot(intake_request(multipart_body(&parts)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(submission_count(&harness).await, 0);
}

#[tokio::test]
async fn missing_phase_key_is_rejected_without_a_row() {
    let harness = TestHarness::new().await;
    let app = app(&harness).await;

    let mut parts = valid_parts();
    // explain key missing
    parts[1] = (
        "phase_times",
        None,
        br#"{"clarify":180,"estimate":240,"design":480}"#.as_slice(),
    );

    let response = app
        .oneshot(intake_request(multipart_body(&parts)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(submission_count(&harness).await, 0);
}

#[tokio::test]
async fn empty_canvas_is_rejected() {
    let harness = TestHarness::new().await;
    let app = app(&harness).await;

    let mut parts = valid_parts();
    parts[2] = ("canvas_clarify", Some(("c.png", "image/png")), b"".as_slice());

    let response = app
        .oneshot(intake_request(multipart_body(&parts)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(submission_count(&harness).await, 0);
}

#[tokio::test]
async fn wrong_canvas_type_is_rejected() {
    let harness = TestHarness::new().await;
    let app = app(&harness).await;

    let mut parts = valid_parts();
    parts[3] = (
        "canvas_estimate",
        Some(("c.gif", "image/gif")),
        b"gif89a".as_slice(),
    );

    let response = app
        .oneshot(intake_request(multipart_body(&parts)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(submission_count(&harness).await, 0);
}

#[tokio::test]
async fn result_endpoint_is_not_found_until_complete() {
    let harness = TestHarness::new().await;
    let app = app(&harness).await;

    // Unknown id
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri(format!("/api/submissions/{}", uuid::Uuid::new_v4()))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    // Known but not terminal
    let id = harness.create_submission(&[]).await;
    let response = app
        .oneshot(
            Request::builder()
                .uri(format!("/api/submissions/{id}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn result_endpoint_serves_the_cached_document_when_complete() {
    let harness = TestHarness::new().await;
    let driver = harness.driver(
        Arc::new(ScriptedModel::with_scores([8.0, 7.5, 8.5, 7.0])),
        Arc::new(ScriptedStt),
    );
    let id = harness.create_submission(&[]).await;
    driver.run(id).await;

    let app = app(&harness).await;
    let response = app
        .oneshot(
            Request::builder()
                .uri(format!("/api/submissions/{id}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = response.into_body().collect().await.unwrap().to_bytes();
    let result: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(result["result_version"], 2);
    assert_eq!(result["phase_scores"].as_array().unwrap().len(), 4);
    assert_eq!(result["verdict"], "hire");
}

#[tokio::test]
async fn stream_replays_the_full_trace_and_terminates() {
    let harness = TestHarness::new().await;
    let driver = harness.driver(
        Arc::new(ScriptedModel::with_scores([7.0; 4])),
        Arc::new(ScriptedStt),
    );
    let id = harness.create_submission(&[]).await;
    driver.run(id).await;

    let app = app(&harness).await;
    let response = app
        .oneshot(
            Request::builder()
                .uri(format!("/api/submissions/{id}/stream"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    // The run is terminal, so the stream replays everything and closes
    let body = response.into_body().collect().await.unwrap().to_bytes();
    let text = String::from_utf8(body.to_vec()).unwrap();

    let payloads: Vec<serde_json::Value> = text
        .lines()
        .filter_map(|line| line.strip_prefix("data: "))
        .map(|data| serde_json::from_str(data).unwrap())
        .collect();

    assert!(!payloads.is_empty());
    assert_eq!(payloads[0]["status"], "queued");

    let statuses: Vec<&str> = payloads
        .iter()
        .map(|p| p["status"].as_str().unwrap())
        .collect();
    for expected in ["processing", "clarify", "estimate", "design", "explain", "synthesizing", "complete"] {
        assert!(statuses.contains(&expected), "missing status {expected}");
    }

    // Terminal event carries the full result document
    let last = payloads.last().unwrap();
    assert_eq!(last["status"], "complete");
    assert_eq!(last["result"]["result_version"], 2);
}

#[tokio::test]
async fn stream_for_unknown_submission_is_not_found() {
    let harness = TestHarness::new().await;
    let app = app(&harness).await;

    let response = app
        .oneshot(
            Request::builder()
                .uri(format!("/api/submissions/{}/stream", uuid::Uuid::new_v4()))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn problem_catalog_endpoints_serve_the_seeded_problem() {
    let harness = TestHarness::new().await;
    let app = app(&harness).await;

    let response = app
        .clone()
        .oneshot(Request::builder().uri("/api/problems").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = response.into_body().collect().await.unwrap().to_bytes();
    let list: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(list.as_array().unwrap().len(), 1);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/problems/url-shortener")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = response.into_body().collect().await.unwrap().to_bytes();
    let problem: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(problem["id"], "url-shortener");
    assert_eq!(problem["rubric_definition"].as_array().unwrap().len(), 4);
}
