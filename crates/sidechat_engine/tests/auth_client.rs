use std::sync::Arc;

use pretty_assertions::assert_eq;
use serde_json::json;
use sidechat_engine::{
    ApiFailureKind, AuthClient, AuthSettings, LoginStatus, MemoryTokenStore, TokenStore,
};
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client_for(server: &MockServer, tokens: Arc<MemoryTokenStore>) -> AuthClient {
    AuthClient::new(
        AuthSettings {
            api_prefix: server.uri(),
            ..AuthSettings::default()
        },
        tokens,
    )
}

#[tokio::test]
async fn current_unwraps_the_envelope_into_user_info() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/current"))
        .and(header("content-type", "application/json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "data": { "name": "Song", "privacy_completed": true, "department": "support" },
            "code": "0",
            "message": "ok",
        })))
        .mount(&server)
        .await;

    let user = client_for(&server, Arc::new(MemoryTokenStore::new()))
        .current()
        .await
        .expect("current ok");
    assert_eq!(user.name.as_deref(), Some("Song"));
    assert!(user.privacy_completed);
    assert_eq!(user.extra["department"], "support");
}

#[tokio::test]
async fn stored_token_is_sent_and_rotated_from_the_response_header() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/current"))
        .and(header("authorization", "token-1"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("authorization", "token-2")
                .set_body_json(json!({ "success": true, "data": {} })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let tokens = Arc::new(MemoryTokenStore::new());
    tokens.set("token-1");
    client_for(&server, tokens.clone())
        .current()
        .await
        .expect("current ok");
    assert_eq!(tokens.get().as_deref(), Some("token-2"));
}

#[tokio::test]
async fn http_401_evicts_the_token() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/current"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({ "error": "登录已过期" })))
        .mount(&server)
        .await;

    let tokens = Arc::new(MemoryTokenStore::new());
    tokens.set("stale");
    let err = client_for(&server, tokens.clone())
        .current()
        .await
        .unwrap_err();
    assert_eq!(err.kind, ApiFailureKind::Unauthorized);
    assert_eq!(err.message, "登录已过期");
    assert_eq!(tokens.get(), None);
}

#[tokio::test]
async fn envelope_code_401_also_evicts_the_token() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/current"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": false,
            "code": 401,
            "error": "登录已过期",
        })))
        .mount(&server)
        .await;

    let tokens = Arc::new(MemoryTokenStore::new());
    tokens.set("stale");
    let err = client_for(&server, tokens.clone())
        .current()
        .await
        .unwrap_err();
    assert_eq!(err.kind, ApiFailureKind::Unauthorized);
    assert_eq!(tokens.get(), None);
}

#[tokio::test]
async fn envelope_code_401_as_string_counts_too() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/current"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": false,
            "code": "401",
        })))
        .mount(&server)
        .await;

    let tokens = Arc::new(MemoryTokenStore::new());
    tokens.set("stale");
    let err = client_for(&server, tokens.clone())
        .current()
        .await
        .unwrap_err();
    assert_eq!(err.kind, ApiFailureKind::Unauthorized);
    assert_eq!(err.message, "未授权，请重新登录");
    assert_eq!(tokens.get(), None);
}

#[tokio::test]
async fn unsuccessful_envelopes_surface_their_message() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/current"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": false,
            "message": "服务暂不可用",
        })))
        .mount(&server)
        .await;

    let err = client_for(&server, Arc::new(MemoryTokenStore::new()))
        .current()
        .await
        .unwrap_err();
    assert_eq!(err.kind, ApiFailureKind::Api);
    assert_eq!(err.message, "服务暂不可用");
}

#[tokio::test]
async fn auth_url_request_carries_login_state() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/workweixin/auth/url"))
        .and(body_json(json!({ "state": "login" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "data": { "url": "https://login.example.com/oauth" },
        })))
        .mount(&server)
        .await;

    let url = client_for(&server, Arc::new(MemoryTokenStore::new()))
        .workweixin_auth_url()
        .await
        .expect("auth url");
    assert_eq!(url, "https://login.example.com/oauth");
}

#[tokio::test]
async fn privacy_url_request_carries_profile_state() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/workweixin/auth/oauth-url"))
        .and(body_json(json!({ "state": "complete_profile" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "data": { "url": "https://login.example.com/privacy" },
        })))
        .mount(&server)
        .await;

    let url = client_for(&server, Arc::new(MemoryTokenStore::new()))
        .workweixin_oauth_url()
        .await
        .expect("privacy url");
    assert_eq!(url, "https://login.example.com/privacy");
}

#[tokio::test]
async fn check_login_without_token_asks_for_the_login_url() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/workweixin/auth/url"))
        .and(body_json(json!({ "state": "login" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "data": { "url": "https://login.example.com/oauth" },
        })))
        .mount(&server)
        .await;

    let status = client_for(&server, Arc::new(MemoryTokenStore::new()))
        .check_login()
        .await
        .expect("login check");
    assert_eq!(
        status,
        LoginStatus::LoginRequired {
            url: "https://login.example.com/oauth".to_owned(),
        }
    );
}

#[tokio::test]
async fn check_login_with_token_fetches_the_profile() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/current"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "data": { "name": "Song", "privacy_completed": true },
        })))
        .mount(&server)
        .await;

    let tokens = Arc::new(MemoryTokenStore::new());
    tokens.set("valid");
    let status = client_for(&server, tokens)
        .check_login()
        .await
        .expect("login check");
    match status {
        LoginStatus::LoggedIn(user) => assert_eq!(user.name.as_deref(), Some("Song")),
        other => panic!("unexpected status: {other:?}"),
    }
}

#[tokio::test]
async fn check_login_still_succeeds_when_privacy_is_incomplete() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/current"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "data": { "name": "Song", "privacy_completed": false },
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/workweixin/auth/oauth-url"))
        .and(body_json(json!({ "state": "complete_profile" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "data": { "url": "https://login.example.com/privacy" },
        })))
        .expect(1)
        .mount(&server)
        .await;

    let tokens = Arc::new(MemoryTokenStore::new());
    tokens.set("valid");
    let status = client_for(&server, tokens)
        .check_login()
        .await
        .expect("login check");
    assert!(matches!(status, LoginStatus::LoggedIn(_)));
}

#[tokio::test]
async fn missing_url_in_data_is_an_api_failure() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/workweixin/auth/url"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "data": {},
        })))
        .mount(&server)
        .await;

    let err = client_for(&server, Arc::new(MemoryTokenStore::new()))
        .workweixin_auth_url()
        .await
        .unwrap_err();
    assert_eq!(err.kind, ApiFailureKind::Api);
    assert_eq!(err.message, "获取登录地址失败");
}
