//! Network integration tests for the HTTP operation handler
//!
//! Uses `wiremock` to stand in for the remote system of record:
//! - Request shape (endpoint, idempotency header, JSON body)
//! - Status code classification into outcomes and failure classes
//! - Client-side timeout handling
//! - A full enqueue, transient failure and retry cycle through the sync manager

#![allow(dead_code)]

#[path = "support.rs"]
mod support;

use std::time::Duration;

use brewops_core::{DispatchOutcome, FailureClass, OperationHandler, SyncError};
use brewops_domain::{FermentationReading, OutboxStatus};
use brewops_infra::remote::{HttpHandlerConfig, HttpOperationHandler, IDEMPOTENCY_KEY_HEADER};
use brewops_infra::sync::DrainOutcome;
use serde_json::json;
use support::{reading, scope, TestHarness, T0};
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const ENDPOINT: &str = "/operations/fermentation_reading";

fn sample_reading() -> FermentationReading {
    FermentationReading {
        batch_id: "batch-42".into(),
        gravity: 1.012,
        temperature_c: 18.5,
        ph: Some(4.3),
        recorded_at: T0,
        notes: Some("krausen dropping".into()),
    }
}

fn handler_for(server: &MockServer) -> HttpOperationHandler<FermentationReading> {
    HttpOperationHandler::new(HttpHandlerConfig::new(server.uri())).expect("client builds")
}

async fn respond_with(status: u16, body: serde_json::Value) -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(ENDPOINT))
        .respond_with(ResponseTemplate::new(status).set_body_json(body))
        .mount(&server)
        .await;
    server
}

#[tokio::test]
async fn posts_payload_with_idempotency_header() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(ENDPOINT))
        .and(header(IDEMPOTENCY_KEY_HEADER, "key-123"))
        .and(body_partial_json(json!({
            "workspace_id": "brewery-1",
            "user_id": "brewer-1",
            "payload": { "batch_id": "batch-42", "gravity": 1.012 }
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({ "id": "remote-1" })))
        .expect(1)
        .mount(&server)
        .await;

    let handler = handler_for(&server);
    assert!(handler.endpoint().ends_with(ENDPOINT));

    let outcome = handler.apply(sample_reading(), "key-123", &scope()).await;
    assert_eq!(outcome, Ok(DispatchOutcome::Applied));
}

#[tokio::test]
async fn bearer_token_is_sent_when_configured() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(header("Authorization", "Bearer brew-token"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let config = HttpHandlerConfig {
        bearer_token: Some("brew-token".into()),
        ..HttpHandlerConfig::new(server.uri())
    };
    let handler =
        HttpOperationHandler::<FermentationReading>::new(config).expect("client builds");

    let outcome = handler.apply(sample_reading(), "key-auth", &scope()).await;
    assert_eq!(outcome, Ok(DispatchOutcome::Applied));
}

#[tokio::test]
async fn conflict_status_means_already_applied() {
    let server = respond_with(409, json!({ "error": "duplicate idempotency key" })).await;

    let outcome = handler_for(&server).apply(sample_reading(), "key-dup", &scope()).await;

    assert_eq!(outcome, Ok(DispatchOutcome::AlreadyApplied));
}

#[tokio::test]
async fn unavailable_is_transient() {
    let server = respond_with(503, json!({ "error": "maintenance" })).await;

    let err = handler_for(&server)
        .apply(sample_reading(), "key-503", &scope())
        .await
        .expect_err("503 is a failure");

    assert!(matches!(err, SyncError::Unavailable(_)));
    assert_eq!(err.category(), FailureClass::Transient);
}

#[tokio::test]
async fn unprocessable_payload_is_permanent() {
    let server = respond_with(422, json!({ "error": "gravity out of range" })).await;

    let err = handler_for(&server)
        .apply(sample_reading(), "key-422", &scope())
        .await
        .expect_err("422 is a failure");

    assert!(matches!(&err, SyncError::InvalidPayload(msg) if msg.contains("gravity out of range")));
    assert_eq!(err.category(), FailureClass::Permanent);
}

#[tokio::test]
async fn precondition_failed_reports_versions() {
    let server = respond_with(412, json!({ "local_version": 3, "remote_version": 5 })).await;

    let err = handler_for(&server)
        .apply(sample_reading(), "key-412", &scope())
        .await
        .expect_err("412 is a failure");

    assert_eq!(err, SyncError::Conflict { local_version: 3, remote_version: 5 });
    assert_eq!(err.category(), FailureClass::Conflict);
}

#[tokio::test]
async fn slow_server_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(201).set_delay(Duration::from_secs(5)))
        .mount(&server)
        .await;

    let config = HttpHandlerConfig {
        timeout: Duration::from_millis(200),
        ..HttpHandlerConfig::new(server.uri())
    };
    let handler =
        HttpOperationHandler::<FermentationReading>::new(config).expect("client builds");

    let err = handler
        .apply(sample_reading(), "key-slow", &scope())
        .await
        .expect_err("request should time out");

    assert_eq!(err, SyncError::Timeout(Duration::from_millis(200)));
    assert_eq!(err.category(), FailureClass::Transient);
}

#[tokio::test]
async fn unreachable_server_is_network_error() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind ephemeral port");
    let uri = format!("http://{}", listener.local_addr().expect("local addr"));
    drop(listener);

    let handler = HttpOperationHandler::<FermentationReading>::new(HttpHandlerConfig::new(uri))
        .expect("client builds");

    let err = handler
        .apply(sample_reading(), "key-down", &scope())
        .await
        .expect_err("closed port should fail");

    assert_eq!(err.category(), FailureClass::Transient);
}

#[tokio::test(flavor = "multi_thread")]
async fn sync_manager_retries_through_http_handler() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(ENDPOINT))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .with_priority(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(ENDPOINT))
        .respond_with(ResponseTemplate::new(201))
        .mount(&server)
        .await;

    let harness = TestHarness::online();
    harness.dispatcher.register(handler_for(&server));
    let id = harness.manager.enqueue(reading("batch-http")).await.expect("enqueue");

    let first = harness.manager.drain_once().await;
    assert_eq!(first.report().map(|r| r.retried), Some(1));
    let item = harness.db.store.outbox().get(&id).await.expect("get").expect("item kept");
    assert_eq!(item.retry_count, 1);
    assert_eq!(item.status, OutboxStatus::Pending);

    harness.advance(Duration::from_secs(1));
    let second = harness.manager.drain_once().await;
    assert!(matches!(second, DrainOutcome::Completed(report) if report.removed == 1));
    assert!(harness.db.store.outbox().get(&id).await.expect("get").is_none());

    let requests = server.received_requests().await.expect("request recording enabled");
    assert_eq!(requests.len(), 2);
    let keys: Vec<_> = requests
        .iter()
        .map(|request| {
            request
                .headers
                .get(IDEMPOTENCY_KEY_HEADER)
                .and_then(|value| value.to_str().ok())
                .map(str::to_owned)
        })
        .collect();
    assert!(keys[0].is_some());
    assert_eq!(keys[0], keys[1]);
}
