use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::response::Response;
use http_body_util::BodyExt;
use sidechat_server::{collect_app_config, inject_config, router, sanitize_request_path, ServerConfig};
use tower::util::ServiceExt;

fn test_config(dist: &Path) -> ServerConfig {
    let mut app_config = BTreeMap::new();
    app_config.insert("API_PREFIX".to_owned(), "/api".to_owned());
    app_config.insert("VITE_CHAT_MODEL".to_owned(), "glm<4".to_owned());
    ServerConfig {
        port: 0,
        dist_dir: dist.to_path_buf(),
        app_config,
    }
}

async fn get(dist: &Path, uri: &str) -> Response {
    router(test_config(dist))
        .oneshot(Request::builder().uri(uri).body(Body::empty()).expect("request"))
        .await
        .expect("response")
}

async fn body_string(response: Response) -> String {
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("body")
        .to_bytes();
    String::from_utf8(bytes.to_vec()).expect("utf8 body")
}

#[tokio::test]
async fn root_serves_index_with_injected_config() {
    let dist = tempfile::tempdir().expect("tempdir");
    fs::write(
        dist.path().join("index.html"),
        "<html><head><title>chat</title></head><body></body></html>",
    )
    .expect("write index");

    let response = get(dist.path(), "/").await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_string(response).await;

    assert!(body.contains("window.APP_CONFIG"));
    assert!(body.contains("\"API_PREFIX\":\"/api\""));
    // The script lands before </head> and angle brackets are escaped.
    let script_at = body.find("window.APP_CONFIG").expect("script present");
    assert!(script_at < body.find("</head>").expect("head still present"));
    assert!(body.contains("glm\\u003c4"));
    assert!(!body.contains("glm<4"));
}

#[tokio::test]
async fn html_without_a_head_is_injected_before_the_body() {
    let dist = tempfile::tempdir().expect("tempdir");
    fs::write(
        dist.path().join("bare.html"),
        "<html><body><p>bare</p></body></html>",
    )
    .expect("write html");

    let response = get(dist.path(), "/bare.html").await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_string(response).await;
    let script_at = body.find("window.APP_CONFIG").expect("script present");
    assert!(script_at < body.find("<body>").expect("body tag"));
}

#[tokio::test]
async fn static_assets_pass_through_untouched() {
    let dist = tempfile::tempdir().expect("tempdir");
    fs::write(dist.path().join("app.js"), "console.log('app');").expect("write js");

    let response = get(dist.path(), "/app.js").await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_string(response).await;
    assert_eq!(body, "console.log('app');");
}

#[tokio::test]
async fn path_traversal_is_forbidden() {
    let dist = tempfile::tempdir().expect("tempdir");
    fs::write(dist.path().join("index.html"), "<html></html>").expect("write index");

    let response = get(dist.path(), "/../secret.txt").await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn missing_html_files_fall_through_to_404() {
    let dist = tempfile::tempdir().expect("tempdir");
    let response = get(dist.path(), "/nope.html").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[test]
fn request_paths_are_sanitized() {
    assert_eq!(sanitize_request_path("/").as_deref(), Some("index.html"));
    assert_eq!(
        sanitize_request_path("/assets/app.js").as_deref(),
        Some("assets/app.js")
    );
    assert_eq!(sanitize_request_path("/../etc/passwd"), None);
    assert_eq!(sanitize_request_path("/a\0b"), None);
}

#[test]
fn app_config_collection_filters_empty_values() {
    let config = collect_app_config(|key| match key {
        "API_HOST" => Some(String::new()),
        "VITE_CHAT_MODEL" => Some("glm-4".to_owned()),
        _ => None,
    });
    assert_eq!(config.get("VITE_CHAT_MODEL").map(String::as_str), Some("glm-4"));
    assert!(!config.contains_key("API_HOST"));
    // API_PREFIX always rides along with its default.
    assert_eq!(config.get("API_PREFIX").map(String::as_str), Some("/api"));
}

#[test]
fn documents_without_injection_points_are_left_alone() {
    let config = BTreeMap::new();
    assert_eq!(inject_config("just text", &config), "just text");
}
