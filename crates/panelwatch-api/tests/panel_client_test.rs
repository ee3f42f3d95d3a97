#![allow(clippy::unwrap_used)]
// Integration tests for `PanelClient` and `WebhookClient` using wiremock.

use serde_json::json;
use url::Url;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use panelwatch_api::{Error, PanelClient, TransportConfig, WebhookClient};

// ── Helpers ─────────────────────────────────────────────────────────

async fn setup(web_base_path: &str) -> (MockServer, PanelClient) {
    let server = MockServer::start().await;
    let base_url = Url::parse(&server.uri()).unwrap();
    let client = PanelClient::with_client(reqwest::Client::new(), base_url, web_base_path);
    (server, client)
}

// ── Authentication tests ────────────────────────────────────────────

#[tokio::test]
async fn test_login_success() {
    let (server, client) = setup("").await;

    Mock::given(method("POST"))
        .and(path("/login"))
        .and(body_json(json!({"username": "admin", "password": "pw"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"success": true})))
        .mount(&server)
        .await;

    let secret: secrecy::SecretString = "pw".to_string().into();
    client.login("admin", &secret).await.unwrap();
}

#[tokio::test]
async fn test_login_rejected_by_envelope() {
    let (server, client) = setup("").await;

    Mock::given(method("POST"))
        .and(path("/login"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"success": false, "msg": "wrong password"})),
        )
        .mount(&server)
        .await;

    let secret: secrecy::SecretString = "nope".to_string().into();
    let result = client.login("admin", &secret).await;

    match result {
        Err(Error::Authentication { message }) => assert_eq!(message, "wrong password"),
        other => panic!("expected Authentication error, got: {other:?}"),
    }
}

#[tokio::test]
async fn test_login_http_failure() {
    let (server, client) = setup("").await;

    Mock::given(method("POST"))
        .and(path("/login"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;

    let secret: secrecy::SecretString = "pw".to_string().into();
    let result = client.login("admin", &secret).await;
    assert!(
        matches!(result, Err(Error::Authentication { .. })),
        "expected Authentication error, got: {result:?}"
    );
}

#[tokio::test]
async fn test_session_cookie_is_sent_after_login() {
    let server = MockServer::start().await;
    let base_url = Url::parse(&server.uri()).unwrap();
    let client = PanelClient::new(base_url, "", &TransportConfig::default()).unwrap();

    Mock::given(method("POST"))
        .and(path("/login"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("set-cookie", "3x-ui=s3ss; Path=/")
                .set_body_json(json!({"success": true})),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/panel/api/inbounds/list"))
        .and(header("cookie", "3x-ui=s3ss"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"success": true, "obj": []})))
        .expect(1)
        .mount(&server)
        .await;

    let secret: secrecy::SecretString = "pw".to_string().into();
    client.login("admin", &secret).await.unwrap();
    assert!(client.list_inbounds().await.unwrap().is_empty());
}

// ── Inbound tests ───────────────────────────────────────────────────

#[tokio::test]
async fn test_list_inbounds_under_base_path() {
    let (server, client) = setup("secret/").await;

    Mock::given(method("GET"))
        .and(path("/secret/panel/api/inbounds/list"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "msg": "",
            "obj": [
                {"id": 1, "up": 10, "down": 20, "total": 0, "clientStats": []},
                {"id": 2, "up": 0, "down": 0, "total": 1024}
            ]
        })))
        .mount(&server)
        .await;

    let inbounds = client.list_inbounds().await.unwrap();
    assert_eq!(inbounds.len(), 2);
    assert_eq!(inbounds[0]["id"], 1);
    assert_eq!(inbounds[1]["total"], 1024);
}

#[tokio::test]
async fn test_list_inbounds_null_obj_is_empty() {
    let (server, client) = setup("").await;

    Mock::given(method("GET"))
        .and(path("/panel/api/inbounds/list"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"success": true, "obj": null})))
        .mount(&server)
        .await;

    assert!(client.list_inbounds().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_list_inbounds_envelope_failure() {
    let (server, client) = setup("").await;

    Mock::given(method("GET"))
        .and(path("/panel/api/inbounds/list"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"success": false, "msg": "denied"})),
        )
        .mount(&server)
        .await;

    let result = client.list_inbounds().await;
    assert!(
        matches!(result, Err(Error::PanelApi { ref message }) if message == "denied"),
        "expected PanelApi error, got: {result:?}"
    );
}

#[tokio::test]
async fn test_login_page_means_session_expired() {
    let (server, client) = setup("").await;

    Mock::given(method("GET"))
        .and(path("/panel/api/inbounds/list"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<!DOCTYPE html><html></html>"))
        .mount(&server)
        .await;

    let result = client.list_inbounds().await;
    assert!(
        matches!(result, Err(Error::SessionExpired)),
        "expected SessionExpired, got: {result:?}"
    );
}

// ── Online clients ──────────────────────────────────────────────────

#[tokio::test]
async fn test_online_clients_comma_string() {
    let (server, client) = setup("").await;

    Mock::given(method("POST"))
        .and(path("/panel/api/inbounds/onlines"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"success": true, "obj": "a@x,b@x"})),
        )
        .mount(&server)
        .await;

    assert_eq!(client.online_clients().await.unwrap(), vec!["a@x", "b@x"]);
}

#[tokio::test]
async fn test_online_clients_server_error() {
    let (server, client) = setup("").await;

    Mock::given(method("POST"))
        .and(path("/panel/api/inbounds/onlines"))
        .respond_with(ResponseTemplate::new(502))
        .mount(&server)
        .await;

    let err = client.online_clients().await.unwrap_err();
    assert!(err.is_transient(), "expected transient error, got: {err:?}");
}

// ── Webhook ─────────────────────────────────────────────────────────

#[tokio::test]
async fn test_webhook_posts_json_with_bearer() {
    let server = MockServer::start().await;
    let url = Url::parse(&format!("{}/hook", server.uri())).unwrap();

    Mock::given(method("POST"))
        .and(path("/hook"))
        .and(header("authorization", "Bearer t0k"))
        .and(body_json(json!({"kind": "ping"})))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let hook = WebhookClient::with_client(
        reqwest::Client::new(),
        url,
        Some("t0k".to_string().into()),
    );
    hook.post_json(&json!({"kind": "ping"})).await.unwrap();
}

#[tokio::test]
async fn test_webhook_gone_destination() {
    let server = MockServer::start().await;
    let url = Url::parse(&format!("{}/hook", server.uri())).unwrap();

    Mock::given(method("POST"))
        .and(path("/hook"))
        .respond_with(ResponseTemplate::new(410).set_body_string("gone"))
        .mount(&server)
        .await;

    let hook = WebhookClient::with_client(reqwest::Client::new(), url, None);
    let err = hook.post_json(&json!({})).await.unwrap_err();
    assert!(err.is_gone(), "expected gone destination, got: {err:?}");
}

#[tokio::test]
async fn test_webhook_does_not_follow_redirects() {
    let server = MockServer::start().await;
    let url = Url::parse(&format!("{}/hook", server.uri())).unwrap();

    Mock::given(method("POST"))
        .and(path("/hook"))
        .respond_with(ResponseTemplate::new(302).insert_header("location", "/elsewhere"))
        .mount(&server)
        .await;
    Mock::given(path("/elsewhere"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let hook = WebhookClient::new(url, None, &TransportConfig::default()).unwrap();
    let err = hook.post_json(&json!({})).await.unwrap_err();
    assert!(
        matches!(err, Error::Status { status: 302, .. }),
        "expected the redirect itself, got: {err:?}"
    );
}
