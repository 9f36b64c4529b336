// Integration tests for `RestClient` using wiremock.
#![allow(clippy::unwrap_used)]

use std::time::Duration;

use secrecy::SecretString;
use serde_json::json;
use wiremock::matchers::{body_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use adcon_api::rest::RestClient;
use adcon_api::transport::TransportConfig;
use adcon_api::Error;

// ── Helpers ─────────────────────────────────────────────────────────

async fn setup() -> (MockServer, RestClient) {
    let server = MockServer::start().await;
    let base = server.uri().parse().expect("mock server URI");
    let client = RestClient::new(base, &TransportConfig::default()).expect("client");
    (server, client)
}

// ── Authentication ──────────────────────────────────────────────────

#[tokio::test]
async fn test_login_success() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/api/login"))
        .and(body_json(json!({ "username": "jdoe", "password": "hunter2" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "ok": true })))
        .mount(&server)
        .await;

    client
        .login("jdoe", &SecretString::from("hunter2".to_owned()))
        .await
        .expect("login should succeed");
}

#[tokio::test]
async fn test_login_rejected() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/api/login"))
        .respond_with(
            ResponseTemplate::new(401).set_body_json(json!({ "message": "Bad credentials" })),
        )
        .mount(&server)
        .await;

    let result = client
        .login("jdoe", &SecretString::from("wrong".to_owned()))
        .await;

    match result {
        Err(Error::Authentication { message }) => assert_eq!(message, "Bad credentials"),
        other => panic!("expected Authentication error, got: {other:?}"),
    }
}

// ── User lookups ────────────────────────────────────────────────────

#[tokio::test]
async fn test_search_users() {
    let (server, client) = setup().await;

    let body = json!([
        {
            "account_name": "jdoe",
            "display_name": "Jane Doe",
            "distinguished_name": "CN=Jane Doe,OU=Staff,DC=corp,DC=example",
            "enabled": true,
            "locked": false,
            "mail": "jdoe@corp.example"
        },
        {
            "account_name": "jdoe2",
            "distinguished_name": "CN=John Doe,OU=Staff,DC=corp,DC=example",
            "enabled": false
        }
    ]);

    Mock::given(method("GET"))
        .and(path("/api/users"))
        .and(query_param("q", "doe"))
        .respond_with(ResponseTemplate::new(200).set_body_json(&body))
        .mount(&server)
        .await;

    let users = client.search_users("doe").await.expect("search");

    assert_eq!(users.len(), 2);
    assert_eq!(users[0].account_name, "jdoe");
    assert_eq!(users[0].display_name.as_deref(), Some("Jane Doe"));
    assert!(users[0].enabled);
    assert!(!users[1].enabled);
    assert!(users[1].mail.is_none());
}

#[tokio::test]
async fn test_get_user_not_found() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/users/ghost"))
        .respond_with(
            ResponseTemplate::new(404).set_body_json(json!({ "message": "User not found" })),
        )
        .mount(&server)
        .await;

    let result = client.get_user("ghost").await;

    match result {
        Err(Error::Api { status, ref message }) => {
            assert_eq!(status, 404);
            assert_eq!(message, "User not found");
        }
        other => panic!("expected Api 404 error, got: {other:?}"),
    }
    assert!(result.unwrap_err().is_not_found());
}

// ── LAPS ────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_laps_password() {
    use secrecy::ExposeSecret;

    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/computers/PC-042/laps"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "password": "xK9$mmQ2",
            "expires_at": "2026-09-01T00:00:00Z"
        })))
        .mount(&server)
        .await;

    let laps = client.laps_password("PC-042").await.expect("laps");

    assert_eq!(laps.password.expose_secret(), "xK9$mmQ2");
    assert!(laps.expires_at.is_some());
}

#[tokio::test]
async fn test_session_expired_maps_to_error() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let result = client.laps_password("PC-042").await;

    assert!(
        matches!(result, Err(Error::SessionExpired)),
        "expected SessionExpired, got: {result:?}"
    );
    assert!(result.unwrap_err().is_auth_expired());
}

#[tokio::test]
async fn test_server_error_with_plain_body() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;

    let result = client.get_user("jdoe").await;

    match result {
        Err(Error::Api { status, ref message }) => {
            assert_eq!(status, 500);
            assert_eq!(message, "boom");
        }
        other => panic!("expected Api 500 error, got: {other:?}"),
    }
}

#[tokio::test]
async fn test_slow_response_surfaces_as_timeout() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(10)))
        .mount(&server)
        .await;

    let config = TransportConfig {
        timeout: Duration::from_millis(200),
        ..TransportConfig::default()
    };
    let client = RestClient::new(server.uri().parse().unwrap(), &config).expect("client");

    let err = client.get_user("jdoe").await.expect_err("should time out");

    assert!(
        matches!(err, Error::Timeout { .. }),
        "expected Timeout, got: {err:?}"
    );
    assert!(err.is_transient());
}

#[tokio::test]
async fn test_deserialization_error_keeps_body() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/users/jdoe"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>not json</html>"))
        .mount(&server)
        .await;

    let result = client.get_user("jdoe").await;

    match result {
        Err(Error::Deserialization { ref body, .. }) => {
            assert!(body.contains("not json"));
        }
        other => panic!("expected Deserialization error, got: {other:?}"),
    }
}
