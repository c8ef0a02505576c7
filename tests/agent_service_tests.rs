use httpmock::prelude::*;
use kpilens_app_lib::error::AgentErrorCode;
use kpilens_app_lib::services::agent_service::testing::{
    analyze_via_http, map_http_error, ping_via_http,
};
use reqwest::StatusCode;
use serde_json::json;
use std::time::Duration as StdDuration;

#[test]
fn agent_http_error_mapping_exposes_retry_semantics() {
    let (error, retryable) = map_http_error(StatusCode::UNAUTHORIZED);
    assert!(!retryable);
    assert_eq!(error.agent_code(), Some(AgentErrorCode::MissingApiKey));
    assert_eq!(error.agent_correlation_id(), Some("test-correlation-id"));

    let (error, retryable) = map_http_error(StatusCode::FORBIDDEN);
    assert!(!retryable);
    assert_eq!(error.agent_code(), Some(AgentErrorCode::Forbidden));

    let (error, retryable) = map_http_error(StatusCode::TOO_MANY_REQUESTS);
    assert!(retryable);
    assert_eq!(error.agent_code(), Some(AgentErrorCode::RateLimited));

    let (error, retryable) = map_http_error(StatusCode::from_u16(503).unwrap());
    assert!(retryable);
    assert_eq!(error.agent_code(), Some(AgentErrorCode::AgentUnavailable));
    assert!(error.to_string().contains("status 503"));

    let (error, retryable) = map_http_error(StatusCode::NOT_FOUND);
    assert!(!retryable);
    assert_eq!(error.agent_code(), Some(AgentErrorCode::InvalidRequest));

    let (error, retryable) = map_http_error(StatusCode::BAD_REQUEST);
    assert!(!retryable);
    assert_eq!(error.agent_code(), Some(AgentErrorCode::InvalidRequest));
}

#[tokio::test]
async fn analyze_parses_structured_result() {
    let server = MockServer::start_async().await;

    let mock = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/v1/agents/test-agent/analyze")
                .header("authorization", "Bearer test-key")
                .json_body_partial(r#"{ "message": "How is the team doing?" }"#);
            then.status(200)
                .header("content-type", "application/json")
                .json_body(json!({
                    "result": {
                        "summary": "Strong overall quarter.",
                        "topPerformers": [
                            {"name": "Meera Reddy", "rank": 1, "finalPoints": 95.0,
                             "highlight": "Best final score"}
                        ],
                        "recommendations": ["Coach the bottom quartile"]
                    },
                    "message": "ok"
                }));
        })
        .await;

    let reply = analyze_via_http(
        &server.base_url(),
        StdDuration::from_secs(2),
        "How is the team doing?",
    )
    .await
    .expect("analyze succeeds");

    mock.assert_async().await;
    let insights = reply.insights.as_ref().expect("structured insights present");
    assert_eq!(insights.summary.as_deref(), Some("Strong overall quarter."));
    assert_eq!(insights.top_performers.len(), 1);
    assert_eq!(insights.top_performers[0].name, "Meera Reddy");
    assert_eq!(insights.top_performers[0].rank, Some(1));
    assert_eq!(insights.recommendations.len(), 1);
    assert!(insights.bottom_performers.is_empty());
    assert_eq!(reply.message.as_deref(), Some("ok"));
    assert_eq!(reply.summary_or("fallback"), "Strong overall quarter.");
}

#[tokio::test]
async fn analyze_tolerates_message_only_reply() {
    let server = MockServer::start_async().await;

    let _mock = server
        .mock_async(|when, then| {
            when.method(POST).path("/v1/agents/test-agent/analyze");
            then.status(200)
                .header("content-type", "application/json")
                .json_body(json!({ "message": "Plain prose answer." }));
        })
        .await;

    let reply = analyze_via_http(&server.base_url(), StdDuration::from_secs(2), "question")
        .await
        .expect("analyze succeeds");

    assert!(reply.insights.is_none());
    assert_eq!(reply.summary_or("fallback"), "Plain prose answer.");
}

#[tokio::test]
async fn analyze_drops_result_that_is_not_an_object() {
    let server = MockServer::start_async().await;

    let _mock = server
        .mock_async(|when, then| {
            when.method(POST).path("/v1/agents/test-agent/analyze");
            then.status(200)
                .header("content-type", "application/json")
                .json_body(json!({ "result": "not an object", "message": "still usable" }));
        })
        .await;

    let reply = analyze_via_http(&server.base_url(), StdDuration::from_secs(2), "question")
        .await
        .expect("reply should not fail on a malformed result");

    assert!(reply.insights.is_none());
    assert_eq!(reply.summary_or("fallback"), "still usable");
}

#[tokio::test]
async fn analyze_empty_reply_falls_back_to_caller_text() {
    let server = MockServer::start_async().await;

    let _mock = server
        .mock_async(|when, then| {
            when.method(POST).path("/v1/agents/test-agent/analyze");
            then.status(200)
                .header("content-type", "application/json")
                .json_body(json!({}));
        })
        .await;

    let reply = analyze_via_http(&server.base_url(), StdDuration::from_secs(2), "question")
        .await
        .expect("empty reply is still valid");

    assert!(reply.insights.is_none());
    assert!(reply.message.is_none());
    assert_eq!(reply.summary_or("fallback"), "fallback");
}

#[tokio::test]
async fn analyze_reports_unreadable_body() {
    let server = MockServer::start_async().await;

    let _mock = server
        .mock_async(|when, then| {
            when.method(POST).path("/v1/agents/test-agent/analyze");
            then.status(200)
                .header("content-type", "application/json")
                .body("not-json");
        })
        .await;

    let error = analyze_via_http(&server.base_url(), StdDuration::from_secs(2), "question")
        .await
        .expect_err("non-JSON body should fail");

    assert_eq!(error.agent_code(), Some(AgentErrorCode::InvalidResponse));
    assert!(error.agent_correlation_id().is_some());
}

#[tokio::test]
async fn analyze_does_not_retry_unauthorized() {
    let server = MockServer::start_async().await;

    let mock = server
        .mock_async(|when, then| {
            when.method(POST).path("/v1/agents/test-agent/analyze");
            then.status(401);
        })
        .await;

    let error = analyze_via_http(&server.base_url(), StdDuration::from_secs(2), "question")
        .await
        .expect_err("unauthorized should fail immediately");

    assert_eq!(error.agent_code(), Some(AgentErrorCode::MissingApiKey));
    mock.assert_hits_async(1).await;
}

#[tokio::test]
async fn analyze_retries_server_errors_until_schedule_exhausted() {
    let server = MockServer::start_async().await;

    let mock = server
        .mock_async(|when, then| {
            when.method(POST).path("/v1/agents/test-agent/analyze");
            then.status(503);
        })
        .await;

    let error = analyze_via_http(&server.base_url(), StdDuration::from_secs(2), "question")
        .await
        .expect_err("persistent 503 should fail after retries");

    assert_eq!(error.agent_code(), Some(AgentErrorCode::AgentUnavailable));
    mock.assert_hits_async(4).await;
}

#[tokio::test]
async fn ping_reports_latency_on_success() {
    let server = MockServer::start_async().await;

    let _mock = server
        .mock_async(|when, then| {
            when.method(GET).path("/v1/agents/test-agent");
            then.status(200)
                .header("content-type", "application/json")
                .json_body(json!({ "id": "test-agent", "status": "ready" }));
        })
        .await;

    let metadata = ping_via_http(&server.base_url(), StdDuration::from_secs(2))
        .await
        .expect("ping succeeds");

    assert_eq!(metadata.agent_id.as_deref(), Some("test-agent"));
    assert!(metadata.latency_ms.is_some());
}

#[tokio::test]
async fn ping_maps_failure_status() {
    let server = MockServer::start_async().await;

    let _mock = server
        .mock_async(|when, then| {
            when.method(GET).path("/v1/agents/test-agent");
            then.status(403);
        })
        .await;

    let error = ping_via_http(&server.base_url(), StdDuration::from_secs(2))
        .await
        .expect_err("forbidden ping should fail");

    assert_eq!(error.agent_code(), Some(AgentErrorCode::Forbidden));
}
