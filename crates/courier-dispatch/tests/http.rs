//! Dispatcher over the real HTTP transport against a mock server.

use courier_common_http::{FieldMap, HttpTransport};
use courier_dispatch::{Backoff, Dispatcher, ResultEvent, RetryPolicy};
use courier_test_utils::temp_file;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use wiremock::matchers::{body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn dispatcher(max_attempts: u32) -> Dispatcher {
    let transport = Arc::new(HttpTransport::new().expect("Failed to create transport"));
    let policy = RetryPolicy::new(max_attempts, Backoff::Fixed(Duration::from_millis(10))).unwrap();
    Dispatcher::new(transport, policy).unwrap()
}

async fn terminal(mut rx: mpsc::UnboundedReceiver<ResultEvent>) -> ResultEvent {
    let mut last = None;
    while let Some(event) = rx.recv().await {
        last = Some(event);
    }
    last.expect("no events delivered")
}

#[tokio::test]
async fn test_server_errors_are_retried_until_success() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/flaky"))
        .respond_with(ResponseTemplate::new(500))
        .up_to_n_times(2)
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/flaky"))
        .respond_with(ResponseTemplate::new(200).set_body_string("recovered"))
        .expect(1)
        .mount(&server)
        .await;

    let (tx, rx) = mpsc::unbounded_channel();
    dispatcher(3).get(&format!("{}/flaky", server.uri()), tx);

    match terminal(rx).await {
        ResultEvent::Success(response) => {
            assert_eq!(response.text().await.unwrap(), "recovered");
        }
        other => panic!("expected success, got {other:?}"),
    }
}

#[tokio::test]
async fn test_exhausted_retries_surface_last_status() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/down"))
        .respond_with(ResponseTemplate::new(503).set_body_string("maintenance"))
        .expect(2)
        .mount(&server)
        .await;

    let (tx, rx) = mpsc::unbounded_channel();
    dispatcher(2).post_form(&format!("{}/down", server.uri()), tx);

    match terminal(rx).await {
        ResultEvent::Failure(err) => {
            assert_eq!(err.attempts(), Some(2));
            assert_eq!(err.last_transport_error().and_then(|e| e.status()), Some(503));
        }
        other => panic!("expected failure, got {other:?}"),
    }
}

#[tokio::test]
async fn test_json_post_with_headers() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/profile"))
        .and(header("authorization", "Bearer t0ken"))
        .and(header("content-type", "application/json; charset=utf-8"))
        .and(body_string_contains("\"nick\":\"neo\""))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&server)
        .await;

    let headers: FieldMap = [("authorization".to_string(), "Bearer t0ken".to_string())]
        .into_iter()
        .collect();
    let (tx, rx) = mpsc::unbounded_channel();
    dispatcher(1).post_json_with_headers(
        &format!("{}/profile", server.uri()),
        Some(&headers),
        "{\"nick\":\"neo\"}",
        tx,
    );

    match terminal(rx).await {
        ResultEvent::Success(response) => assert_eq!(response.status, 201),
        other => panic!("expected success, got {other:?}"),
    }
}

#[tokio::test]
async fn test_upload_rereads_file_on_retry() {
    let (_dir, file) = temp_file("PNGDATA");

    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/avatar"))
        .and(body_string_contains("name=\"headimg\""))
        .respond_with(ResponseTemplate::new(502))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/avatar"))
        .and(body_string_contains("PNGDATA"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let (tx, rx) = mpsc::unbounded_channel();
    dispatcher(2).upload_single_file(&format!("{}/avatar", server.uri()), &file, tx);

    assert!(matches!(terminal(rx).await, ResultEvent::Success(_)));
}
