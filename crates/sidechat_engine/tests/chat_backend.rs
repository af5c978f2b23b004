use std::time::Duration;

use pretty_assertions::assert_eq;
use serde_json::json;
use sidechat_engine::{ApiFailureKind, ChatBackend, ChatSettings, ReqwestChatBackend};
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn backend_for(server: &MockServer) -> ReqwestChatBackend {
    ReqwestChatBackend::new(ChatSettings {
        base_url: server.uri(),
        api_key: Some("test-key".to_owned()),
        ..ChatSettings::default()
    })
}

#[tokio::test]
async fn completes_against_an_openai_style_endpoint() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(header("authorization", "Bearer test-key"))
        .and(body_partial_json(json!({
            "model": "gpt-4o-mini",
            "messages": [
                { "role": "system", "content": "你是有帮助的助手。" },
                { "role": "user", "content": "hello" },
            ],
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [ { "message": { "role": "assistant", "content": "hi there" } } ],
        })))
        .expect(1)
        .mount(&server)
        .await;

    let token = CancellationToken::new();
    let reply = backend_for(&server)
        .complete("hello", &token)
        .await
        .expect("completion ok");
    assert_eq!(reply.text, "hi there");
}

#[tokio::test]
async fn missing_choices_fall_back_to_the_raw_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "unexpected": true })))
        .mount(&server)
        .await;

    let token = CancellationToken::new();
    let reply = backend_for(&server)
        .complete("hello", &token)
        .await
        .expect("completion ok");
    assert!(reply.text.contains("unexpected"));
}

#[tokio::test]
async fn error_bodies_surface_their_message() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({
            "error": { "message": "model melted" },
        })))
        .mount(&server)
        .await;

    let token = CancellationToken::new();
    let err = backend_for(&server)
        .complete("hello", &token)
        .await
        .unwrap_err();
    assert_eq!(err.kind, ApiFailureKind::HttpStatus(500));
    assert_eq!(err.message, "model melted");
}

#[tokio::test]
async fn plain_text_error_bodies_are_used_verbatim() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(502).set_body_string("bad gateway"))
        .mount(&server)
        .await;

    let token = CancellationToken::new();
    let err = backend_for(&server)
        .complete("hello", &token)
        .await
        .unwrap_err();
    assert_eq!(err.kind, ApiFailureKind::HttpStatus(502));
    assert_eq!(err.message, "bad gateway");
}

#[tokio::test]
async fn empty_error_bodies_get_the_generic_status_text() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({})))
        .mount(&server)
        .await;

    let token = CancellationToken::new();
    let err = backend_for(&server)
        .complete("hello", &token)
        .await
        .unwrap_err();
    assert_eq!(err.message, "请求失败（404）");
}

#[tokio::test]
async fn whitespace_input_is_rejected_before_any_request() {
    let server = MockServer::start().await;
    // No mock mounted: a request would fail loudly.
    let token = CancellationToken::new();
    let err = backend_for(&server)
        .complete("   \n", &token)
        .await
        .unwrap_err();
    assert_eq!(err.kind, ApiFailureKind::InvalidInput);
    assert_eq!(err.message, "输入内容不能为空");
}

#[tokio::test]
async fn cancelling_mid_flight_reports_cancelled() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_delay(Duration::from_millis(500))
                .set_body_json(json!({
                    "choices": [ { "message": { "content": "too late" } } ],
                })),
        )
        .mount(&server)
        .await;

    let backend = backend_for(&server);
    let token = CancellationToken::new();
    let task = tokio::spawn({
        let backend = backend.clone();
        let token = token.clone();
        async move { backend.complete("hello", &token).await }
    });

    tokio::time::sleep(Duration::from_millis(50)).await;
    token.cancel();

    let err = task.await.expect("join").unwrap_err();
    assert_eq!(err.kind, ApiFailureKind::Cancelled);
    assert_eq!(err.message, "请求已取消");
}

#[tokio::test]
async fn requests_without_a_key_send_no_auth_header() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [ { "message": { "content": "ok" } } ],
        })))
        .mount(&server)
        .await;

    let backend = ReqwestChatBackend::new(ChatSettings {
        base_url: server.uri(),
        api_key: None,
        ..ChatSettings::default()
    });
    let token = CancellationToken::new();
    let reply = backend.complete("hello", &token).await.expect("ok");
    assert_eq!(reply.text, "ok");

    let requests = server.received_requests().await.expect("requests recorded");
    assert!(requests
        .iter()
        .all(|r| !r.headers.contains_key("authorization")));
}
