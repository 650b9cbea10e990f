//! Gateway HTTP behavior against in-memory providers.

mod support;

use axum::http::StatusCode;
use cacheflow::models::EventEnvelope;
use cacheflow::registry::EndpointRegistry;

use support::{event_json, get, post, Stack, EXAMPLE_EVENT};

#[tokio::test]
async fn test_submit_event_publishes_keyed_by_user() {
    let stack = Stack::new(4);
    let app = stack.gateway();

    let (status, body) = post(&app, "/v1/events", EXAMPLE_EVENT).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");

    let messages = stack.broker.messages("cache_access_logs");
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].key_str().as_deref(), Some("u1"));
    assert_eq!(messages[0].position.partition, stack.broker.partition_for(b"u1"));

    let envelope = EventEnvelope::from_bytes(messages[0].payload_bytes()).unwrap();
    assert_eq!(envelope.submitter_id.as_deref(), Some("u1"));
    assert_eq!(envelope.event.resource_id, "r42");
}

#[tokio::test]
async fn test_legacy_log_path_is_accepted() {
    let stack = Stack::new(1);
    let (status, _) = post(&stack.gateway(), "/log", EXAMPLE_EVENT).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(stack.broker.messages("cache_access_logs").len(), 1);
}

#[tokio::test]
async fn test_invalid_submissions_are_rejected_with_400() {
    let stack = Stack::new(1);
    let app = stack.gateway();

    let cases = [
        ("not json", "{not json".to_string()),
        (
            "missing field",
            r#"{"user_id":"u1","resource_id":"r1","hit":true,"timestamp":"2024-01-01T00:00:00Z"}"#
                .to_string(),
        ),
        ("empty user", event_json("", "r1", "read", true, "2024-01-01T00:00:00Z")),
        ("empty resource", event_json("u1", "", "read", true, "2024-01-01T00:00:00Z")),
        ("naive timestamp", event_json("u1", "r1", "read", true, "2024-01-01 00:00:00")),
        ("garbage timestamp", event_json("u1", "r1", "read", true, "yesterday")),
    ];

    for (name, body) in cases {
        let (status, error) = post(&app, "/v1/events", &body).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "case: {name}");
        assert_eq!(error["error"], "bad_request", "case: {name}");
        assert!(error["message"].is_string(), "case: {name}");
        assert!(error["timestamp"].is_string(), "case: {name}");
    }

    assert!(stack.broker.messages("cache_access_logs").is_empty());
}

#[tokio::test]
async fn test_publish_failure_returns_500() {
    let stack = Stack::new(1);
    stack.broker.fail_next_publishes(1);

    let (status, error) = post(&stack.gateway(), "/v1/events", EXAMPLE_EVENT).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(error["error"], "internal_error");
}

#[tokio::test]
async fn test_registration_writes_endpoint() {
    let stack = Stack::new(1);
    let app = stack.gateway();

    let (status, body) = post(
        &app,
        "/v1/registrations",
        r#"{"user_id":"u1","redis_host":"10.0.0.5","redis_port":6379,"redis_password":"s3cret"}"#,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");

    let endpoint = stack.registry.lookup("u1").await.unwrap().unwrap();
    assert_eq!(endpoint.host, "10.0.0.5");
    assert_eq!(endpoint.port, 6379);
    assert_eq!(endpoint.credential, "s3cret");
}

#[tokio::test]
async fn test_legacy_init_path_overwrites_registration() {
    let stack = Stack::new(1);
    let app = stack.gateway();

    for port in [6379, 6380] {
        let body = format!(r#"{{"user_id":"u1","redis_host":"cache","redis_port":{port}}}"#);
        let (status, _) = post(&app, "/init", &body).await;
        assert_eq!(status, StatusCode::OK);
    }

    let endpoint = stack.registry.lookup("u1").await.unwrap().unwrap();
    assert_eq!(endpoint.port, 6380);
    assert_eq!(endpoint.credential, "");
}

#[tokio::test]
async fn test_bad_registrations_are_rejected() {
    let stack = Stack::new(1);
    let app = stack.gateway();

    for body in [
        r#"{"user_id":"u1","redis_host":"cache"}"#,
        r#"{"user_id":"u1","redis_host":"cache","redis_port":70000}"#,
        r#"{"user_id":"u1","redis_host":"cache","redis_port":"6379"}"#,
        r#"{"user_id":"","redis_host":"cache","redis_port":6379}"#,
    ] {
        let (status, _) = post(&app, "/v1/registrations", body).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "body: {body}");
    }
    assert!(stack.registry.is_empty());
}

#[tokio::test]
async fn test_registry_failure_returns_500() {
    let stack = Stack::new(1);
    stack.registry.set_unavailable(true);

    let (status, _) = post(
        &stack.gateway(),
        "/v1/registrations",
        r#"{"user_id":"u1","redis_host":"cache","redis_port":6379}"#,
    )
    .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn test_health_and_readiness() {
    let stack = Stack::new(1);
    let app = stack.gateway();

    let (status, body) = get(&app, "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");

    let (status, body) = get(&app, "/health/ready").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ready");

    stack.broker.disconnect();
    let (status, body) = get(&app, "/health/ready").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["status"], "not_ready");
}
