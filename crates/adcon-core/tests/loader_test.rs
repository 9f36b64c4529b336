//! End-to-end loader tests against a mock SSE backend.

#![allow(clippy::unwrap_used)]

use std::time::Duration;

use pretty_assertions::assert_eq;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use adcon_core::loader::ComputerListLoader;
use adcon_core::{LoadState, LoaderSnapshot};

fn sse_response(body: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_raw(body.to_owned(), "text/event-stream")
}

fn loader_for(server: &MockServer, idle_timeout: Duration) -> ComputerListLoader {
    let client = reqwest::Client::new();
    let endpoint = url::Url::parse(&format!("{}/api/computers/stream", server.uri())).unwrap();
    ComputerListLoader::new(client, endpoint, idle_timeout)
}

async fn wait_terminal(loader: &ComputerListLoader) -> LoaderSnapshot {
    let mut rx = loader.subscribe();
    let snapshot = tokio::time::timeout(
        Duration::from_secs(5),
        rx.wait_for(LoaderSnapshot::is_terminal),
    )
    .await
    .expect("loader did not reach a terminal state")
    .expect("snapshot channel closed");
    snapshot.clone()
}

#[tokio::test]
async fn full_stream_completes_in_order() {
    let server = MockServer::start().await;
    let body = concat!(
        "data: {\"type\":\"total\",\"count\":3}\n\n",
        "data: {\"type\":\"computer\",\"data\":{\"name\":\"PC1\",\"enabled\":true}}\n\n",
        "data: {\"type\":\"computer\",\"data\":{\"name\":\"PC2\",\"enabled\":false}}\n\n",
        "data: {\"type\":\"computer\",\"data\":{\"name\":\"PC3\",\"enabled\":true}}\n\n",
        "data: {\"type\":\"done\"}\n\n",
    );
    Mock::given(method("GET"))
        .and(path("/api/computers/stream"))
        .respond_with(sse_response(body))
        .mount(&server)
        .await;

    let loader = loader_for(&server, Duration::from_secs(5));
    loader.start();
    let snapshot = wait_terminal(&loader).await;

    assert_eq!(snapshot.state, LoadState::Completed);
    assert_eq!(snapshot.received, 3);
    assert_eq!(snapshot.expected_total, Some(3));
    assert_eq!(snapshot.progress_percent(), Some(100));
    let names: Vec<&str> = snapshot.computers.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, ["PC1", "PC2", "PC3"]);
    assert!(!snapshot.computers[1].enabled);
}

#[tokio::test]
async fn server_error_fails_with_partial_list() {
    let server = MockServer::start().await;
    let body = concat!(
        "data: {\"type\":\"computer\",\"data\":{\"name\":\"PC1\",\"enabled\":true}}\n\n",
        "data: {\"type\":\"error\",\"message\":\"Erreur inconnue\"}\n\n",
    );
    Mock::given(method("GET"))
        .and(path("/api/computers/stream"))
        .respond_with(sse_response(body))
        .mount(&server)
        .await;

    let loader = loader_for(&server, Duration::from_secs(5));
    loader.start();
    let snapshot = wait_terminal(&loader).await;

    assert_eq!(snapshot.state, LoadState::Failed);
    assert_eq!(snapshot.last_error.as_deref(), Some("Erreur inconnue"));
    // The partial list stays visible alongside the failure.
    assert_eq!(snapshot.received, 1);
    assert_eq!(snapshot.computers[0].name, "PC1");
}

#[tokio::test]
async fn frames_after_done_do_not_mutate_snapshot() {
    let server = MockServer::start().await;
    // The server keeps talking after `done`; none of it may land.
    let body = concat!(
        "data: {\"type\":\"total\",\"count\":1}\n\n",
        "data: {\"type\":\"computer\",\"data\":{\"name\":\"PC1\",\"enabled\":true}}\n\n",
        "data: {\"type\":\"done\"}\n\n",
        "data: {\"type\":\"computer\",\"data\":{\"name\":\"LATE\",\"enabled\":true}}\n\n",
        "data: {\"type\":\"error\",\"message\":\"late failure\"}\n\n",
    );
    Mock::given(method("GET"))
        .and(path("/api/computers/stream"))
        .respond_with(sse_response(body))
        .mount(&server)
        .await;

    let loader = loader_for(&server, Duration::from_secs(5));
    loader.start();
    let snapshot = wait_terminal(&loader).await;
    assert_eq!(snapshot.state, LoadState::Completed);

    // Give the session task time to (wrongly) consume the trailing frames.
    tokio::time::sleep(Duration::from_millis(100)).await;
    let after = loader.snapshot();

    assert_eq!(after.state, LoadState::Completed);
    assert_eq!(after.received, 1);
    assert_eq!(after.computers[0].name, "PC1");
    assert_eq!(after.last_error, None);
}

#[tokio::test]
async fn eof_without_done_fails() {
    let server = MockServer::start().await;
    let body = "data: {\"type\":\"computer\",\"data\":{\"name\":\"PC1\",\"enabled\":true}}\n\n";
    Mock::given(method("GET"))
        .and(path("/api/computers/stream"))
        .respond_with(sse_response(body))
        .mount(&server)
        .await;

    let loader = loader_for(&server, Duration::from_secs(5));
    loader.start();
    let snapshot = wait_terminal(&loader).await;

    assert_eq!(snapshot.state, LoadState::Failed);
    assert_eq!(
        snapshot.last_error.as_deref(),
        Some("stream closed before completion")
    );
    assert_eq!(snapshot.received, 1);
}

#[tokio::test]
async fn connect_failure_surfaces_in_snapshot() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/computers/stream"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let loader = loader_for(&server, Duration::from_secs(5));
    loader.start();
    let snapshot = wait_terminal(&loader).await;

    assert_eq!(snapshot.state, LoadState::Failed);
    assert!(snapshot.last_error.is_some());
    assert_eq!(snapshot.received, 0);
}

#[tokio::test]
async fn idle_timeout_fails_hung_stream() {
    let server = MockServer::start().await;
    // Response delayed well past the idle watchdog.
    Mock::given(method("GET"))
        .and(path("/api/computers/stream"))
        .respond_with(sse_response("data: {\"type\":\"done\"}\n\n").set_delay(Duration::from_secs(30)))
        .mount(&server)
        .await;

    let loader = loader_for(&server, Duration::from_millis(200));
    loader.start();
    let snapshot = wait_terminal(&loader).await;

    assert_eq!(snapshot.state, LoadState::Failed);
    assert!(snapshot.last_error.unwrap().contains("no data received"));
}

#[tokio::test]
async fn restart_supersedes_active_session() {
    let server = MockServer::start().await;
    // First session hangs; the second completes immediately.
    Mock::given(method("GET"))
        .and(path("/api/computers/stream"))
        .respond_with(
            sse_response(
                "data: {\"type\":\"computer\",\"data\":{\"name\":\"STALE\",\"enabled\":true}}\n\n",
            )
            .set_delay(Duration::from_secs(30)),
        )
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/computers/stream"))
        .respond_with(sse_response(concat!(
            "data: {\"type\":\"computer\",\"data\":{\"name\":\"FRESH\",\"enabled\":true}}\n\n",
            "data: {\"type\":\"done\"}\n\n",
        )))
        .mount(&server)
        .await;

    let loader = loader_for(&server, Duration::from_secs(5));
    loader.start();
    // Give the first session time to issue its request before superseding.
    tokio::time::sleep(Duration::from_millis(100)).await;
    loader.start();

    let snapshot = wait_terminal(&loader).await;
    assert_eq!(snapshot.state, LoadState::Completed);
    assert_eq!(snapshot.received, 1);
    assert_eq!(snapshot.computers[0].name, "FRESH");
}

#[tokio::test]
async fn cancel_keeps_last_snapshot_visible() {
    let server = MockServer::start().await;
    let body = "data: {\"type\":\"computer\",\"data\":{\"name\":\"PC1\",\"enabled\":true}}\n\n";
    Mock::given(method("GET"))
        .and(path("/api/computers/stream"))
        .respond_with(sse_response(body).set_delay(Duration::from_millis(50)))
        .mount(&server)
        .await;

    let loader = loader_for(&server, Duration::from_secs(5));
    loader.start();
    loader.cancel();
    // Idempotent.
    loader.cancel();

    let snapshot = loader.snapshot();
    // Cancellation is not a failure; the session just stops where it was.
    assert_ne!(snapshot.state, LoadState::Failed);
}

#[tokio::test]
async fn start_resets_snapshot_before_connecting() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/computers/stream"))
        .respond_with(sse_response("data: {\"type\":\"done\"}\n\n").set_delay(Duration::from_secs(1)))
        .mount(&server)
        .await;

    let loader = loader_for(&server, Duration::from_secs(5));
    loader.start();
    let snapshot = loader.snapshot();
    assert_eq!(snapshot.state, LoadState::Connecting);
    assert_eq!(snapshot.received, 0);
    loader.cancel();
}
