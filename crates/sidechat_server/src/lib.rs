//! Static file server for the built chat UI.
//!
//! Serves the dist bundle and splices runtime configuration into every
//! HTML document as a `window.APP_CONFIG` global, so the same image can
//! be pointed at different backends without a rebuild. Non-HTML assets
//! fall through to gzip-compressed static serving.

use std::collections::BTreeMap;
use std::env;
use std::path::PathBuf;
use std::sync::Arc;

use axum::extract::{Request, State};
use axum::http::{header, StatusCode};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::Router;
use tower_http::compression::CompressionLayer;
use tower_http::services::ServeDir;

/// Environment keys forwarded to the web UI.
const INJECTED_KEYS: [&str; 6] = [
    "API_HOST",
    "API_PREFIX",
    "VITE_CHAT_API_BASE_URL",
    "VITE_CHAT_API_KEY",
    "VITE_CHAT_MODEL",
    "VITE_API_PREFIX",
];

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub port: u16,
    pub dist_dir: PathBuf,
    pub app_config: BTreeMap<String, String>,
}

impl ServerConfig {
    pub fn from_env() -> Self {
        let port = env::var("PORT")
            .ok()
            .and_then(|value| value.parse().ok())
            .unwrap_or(4173);
        let dist_dir = env::var("SIDECHAT_DIST_DIR")
            .ok()
            .filter(|value| !value.is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("dist"));
        Self {
            port,
            dist_dir,
            app_config: collect_app_config(|key| env::var(key).ok()),
        }
    }
}

/// Gather the injectable keys from the environment. Unset and empty
/// values are dropped, except `API_PREFIX` which defaults to `/api`.
pub fn collect_app_config(lookup: impl Fn(&str) -> Option<String>) -> BTreeMap<String, String> {
    let mut config = BTreeMap::new();
    for key in INJECTED_KEYS {
        let mut value = lookup(key).unwrap_or_default();
        if value.is_empty() && key == "API_PREFIX" {
            value = "/api".to_owned();
        }
        if !value.is_empty() {
            config.insert(key.to_owned(), value);
        }
    }
    config
}

/// The `<script>` block exposing the config to the page. `<` is escaped
/// so config values can never close the script tag.
pub fn config_script(config: &BTreeMap<String, String>) -> String {
    let json = serde_json::to_string(config)
        .unwrap_or_else(|_| "{}".to_owned())
        .replace('<', "\\u003c");
    format!("\n    <script>\n      window.APP_CONFIG = {json};\n    </script>\n  ")
}

/// Splice the config script into an HTML document: before `</head>` when
/// present, else before `<body>`, else not at all.
pub fn inject_config(html: &str, config: &BTreeMap<String, String>) -> String {
    let script = config_script(config);
    let insert_at = html.find("</head>").or_else(|| html.find("<body>"));
    match insert_at {
        Some(pos) => {
            let mut out = String::with_capacity(html.len() + script.len() + 1);
            out.push_str(&html[..pos]);
            out.push_str(&script);
            out.push('\n');
            out.push_str(&html[pos..]);
            out
        }
        None => html.to_owned(),
    }
}

/// Map a request path onto a dist-relative file path. `/` becomes
/// `index.html`; traversal attempts are rejected.
pub fn sanitize_request_path(path: &str) -> Option<String> {
    let trimmed = path.trim_start_matches('/');
    let candidate = if trimmed.is_empty() { "index.html" } else { trimmed };
    if candidate.contains("..") || candidate.contains('\0') {
        return None;
    }
    Some(candidate.to_owned())
}

/// Build the router: the HTML-injection middleware in front of plain
/// static serving.
pub fn router(config: ServerConfig) -> Router {
    let state = Arc::new(config);
    Router::new()
        .fallback_service(ServeDir::new(state.dist_dir.clone()))
        .layer(middleware::from_fn_with_state(state, inject_app_config))
        .layer(CompressionLayer::new())
}

async fn inject_app_config(
    State(config): State<Arc<ServerConfig>>,
    request: Request,
    next: Next,
) -> Response {
    let Some(relative) = sanitize_request_path(request.uri().path()) else {
        return (StatusCode::FORBIDDEN, "Forbidden").into_response();
    };
    let file_path = config.dist_dir.join(&relative);
    if !file_path.starts_with(&config.dist_dir) {
        return (StatusCode::FORBIDDEN, "Forbidden").into_response();
    }

    if file_path.extension().and_then(|ext| ext.to_str()) == Some("html") {
        match tokio::fs::read_to_string(&file_path).await {
            Ok(html) => {
                let body = inject_config(&html, &config.app_config);
                return (
                    [(header::CONTENT_TYPE, "text/html; charset=utf-8")],
                    body,
                )
                    .into_response();
            }
            // Fall through to the 404 the static service produces.
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
            Err(err) => log::error!("error reading html file {file_path:?}: {err}"),
        }
    }

    next.run(request).await
}
