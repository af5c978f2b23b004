use std::time::Duration;

use reqwest::header::CONTENT_TYPE;
use serde_json::{json, Value};
use tokio_util::sync::CancellationToken;

use crate::types::{map_reqwest_error, ApiError, ApiFailureKind, ChatReply};

/// Settings for the chat completion backend.
#[derive(Debug, Clone)]
pub struct ChatSettings {
    /// Base URL of an OpenAI-compatible API, without trailing slash.
    pub base_url: String,
    /// Bearer token; requests go out unauthenticated when absent.
    pub api_key: Option<String>,
    pub model: String,
    pub system_prompt: String,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
}

impl Default for ChatSettings {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com".to_owned(),
            api_key: None,
            model: "gpt-4o-mini".to_owned(),
            system_prompt: "你是有帮助的助手。".to_owned(),
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(60),
        }
    }
}

#[async_trait::async_trait]
pub trait ChatBackend: Send + Sync {
    /// Run a single completion. Cancelling the token aborts the request
    /// and reports [`ApiFailureKind::Cancelled`].
    async fn complete(
        &self,
        input: &str,
        cancel: &CancellationToken,
    ) -> Result<ChatReply, ApiError>;
}

#[derive(Debug, Clone)]
pub struct ReqwestChatBackend {
    settings: ChatSettings,
}

impl ReqwestChatBackend {
    pub fn new(settings: ChatSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &ChatSettings {
        &self.settings
    }

    fn build_client(&self) -> Result<reqwest::Client, ApiError> {
        reqwest::Client::builder()
            .connect_timeout(self.settings.connect_timeout)
            .timeout(self.settings.request_timeout)
            .build()
            .map_err(|err| ApiError::new(ApiFailureKind::Network, err.to_string()))
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1/chat/completions",
            self.settings.base_url.trim_end_matches('/')
        )
    }
}

#[async_trait::async_trait]
impl ChatBackend for ReqwestChatBackend {
    async fn complete(
        &self,
        input: &str,
        cancel: &CancellationToken,
    ) -> Result<ChatReply, ApiError> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(ApiError::new(ApiFailureKind::InvalidInput, "输入内容不能为空"));
        }

        let client = self.build_client()?;
        let body = json!({
            "model": self.settings.model,
            "messages": [
                { "role": "system", "content": self.settings.system_prompt },
                { "role": "user", "content": trimmed },
            ],
        });
        let mut request = client.post(self.endpoint()).json(&body);
        if let Some(key) = self.settings.api_key.as_deref().filter(|k| !k.is_empty()) {
            request = request.bearer_auth(key);
        }

        let response = tokio::select! {
            () = cancel.cancelled() => return Err(cancelled()),
            result = request.send() => result.map_err(map_reqwest_error)?,
        };

        let status = response.status();
        let is_json = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .is_some_and(|value| value.contains("application/json"));

        let body_text = tokio::select! {
            () = cancel.cancelled() => return Err(cancelled()),
            text = response.text() => text.map_err(map_reqwest_error)?,
        };
        let raw = if is_json {
            serde_json::from_str(&body_text)
                .map_err(|err| ApiError::new(ApiFailureKind::MalformedResponse, err.to_string()))?
        } else {
            Value::String(body_text)
        };

        if !status.is_success() {
            return Err(ApiError::new(
                ApiFailureKind::HttpStatus(status.as_u16()),
                error_message(&raw, status.as_u16()),
            ));
        }

        let text = raw
            .pointer("/choices/0/message/content")
            .and_then(Value::as_str)
            .map(str::to_owned)
            .unwrap_or_else(|| match &raw {
                Value::String(text) => text.clone(),
                other => serde_json::to_string_pretty(other).unwrap_or_default(),
            });
        Ok(ChatReply { text, raw })
    }
}

fn cancelled() -> ApiError {
    ApiError::new(ApiFailureKind::Cancelled, "请求已取消")
}

/// Best message an error body offers: `error.message`, then `message`,
/// then a generic text carrying the status code. A plain-text body is
/// used verbatim.
fn error_message(raw: &Value, status: u16) -> String {
    if let Value::String(text) = raw {
        return text.clone();
    }
    raw.pointer("/error/message")
        .and_then(Value::as_str)
        .or_else(|| raw.get("message").and_then(Value::as_str))
        .map(str::to_owned)
        .unwrap_or_else(|| format!("请求失败（{status}）"))
}
