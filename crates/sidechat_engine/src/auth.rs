use std::sync::{Arc, Mutex};
use std::time::Duration;

use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use reqwest::Method;
use serde::Deserialize;
use serde_json::{json, Map, Value};

use crate::types::{map_reqwest_error, ApiError, ApiFailureKind};

/// Envelope every auth API response is wrapped in.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiEnvelope<T> {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub data: Option<T>,
    /// The backend sends this as either a number or a string.
    #[serde(default)]
    pub code: Option<Value>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

impl<T> ApiEnvelope<T> {
    /// True when the envelope itself reports an expired login.
    pub fn is_unauthorized(&self) -> bool {
        match &self.code {
            Some(Value::Number(code)) => code.as_i64() == Some(401),
            Some(Value::String(code)) => code == "401",
            _ => false,
        }
    }
}

/// Fields of `/current` the UI acts on; everything else rides along.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct UserInfo {
    #[serde(default)]
    pub privacy_completed: bool,
    #[serde(default)]
    pub channel_code_permission: bool,
    #[serde(default)]
    pub member_permission: bool,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub avatar: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Storage for the login token the auth API rotates via headers.
pub trait TokenStore: Send + Sync {
    fn get(&self) -> Option<String>;
    fn set(&self, token: &str);
    fn remove(&self);
}

/// In-memory token store for tests and ephemeral sessions.
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    token: Mutex<Option<String>>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TokenStore for MemoryTokenStore {
    fn get(&self) -> Option<String> {
        self.token.lock().expect("token lock").clone()
    }

    fn set(&self, token: &str) {
        *self.token.lock().expect("token lock") = Some(token.to_owned());
    }

    fn remove(&self) {
        *self.token.lock().expect("token lock") = None;
    }
}

#[derive(Debug, Clone)]
pub struct AuthSettings {
    /// Absolute base of the auth API, e.g. `https://backend.example/api`.
    pub api_prefix: String,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
}

impl Default for AuthSettings {
    fn default() -> Self {
        Self {
            api_prefix: "/api".to_owned(),
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(30),
        }
    }
}

/// Outcome of a login probe.
#[derive(Debug, Clone, PartialEq)]
pub enum LoginStatus {
    /// Token accepted; the profile came back.
    LoggedIn(UserInfo),
    /// No token stored; the user has to visit this URL first.
    LoginRequired { url: String },
}

/// Client for the login backend. Every call runs through the shared
/// envelope handling: token header attached, rotated token captured,
/// 401 (status or envelope code) evicting the stored credential.
pub struct AuthClient {
    settings: AuthSettings,
    tokens: Arc<dyn TokenStore>,
}

impl AuthClient {
    pub fn new(settings: AuthSettings, tokens: Arc<dyn TokenStore>) -> Self {
        Self { settings, tokens }
    }

    pub fn has_token(&self) -> bool {
        self.tokens.get().is_some()
    }

    /// Resolve the login state: without a stored token the caller gets
    /// the authorization URL to visit; with one, the profile. A profile
    /// missing privacy consent still logs in, the consent URL is only
    /// noted in the log.
    pub async fn check_login(&self) -> Result<LoginStatus, ApiError> {
        if !self.has_token() {
            let url = self.workweixin_auth_url().await?;
            return Ok(LoginStatus::LoginRequired { url });
        }
        let user = self.current().await?;
        if !user.privacy_completed {
            if let Ok(url) = self.workweixin_oauth_url().await {
                relay_logging::relay_warn!("需要隐私授权: {url}");
            }
        }
        Ok(LoginStatus::LoggedIn(user))
    }

    /// Current login's user profile.
    pub async fn current(&self) -> Result<UserInfo, ApiError> {
        let envelope = self.request(Method::GET, "/current", None).await?;
        let data = envelope.data.unwrap_or(Value::Null);
        serde_json::from_value(data)
            .map_err(|err| ApiError::new(ApiFailureKind::MalformedResponse, err.to_string()))
    }

    /// WeCom login authorization URL to redirect the user to.
    pub async fn workweixin_auth_url(&self) -> Result<String, ApiError> {
        let envelope = self
            .request(
                Method::POST,
                "/workweixin/auth/url",
                Some(json!({ "state": "login" })),
            )
            .await?;
        extract_url(envelope).ok_or_else(|| ApiError::new(ApiFailureKind::Api, "获取登录地址失败"))
    }

    /// WeCom privacy authorization URL.
    pub async fn workweixin_oauth_url(&self) -> Result<String, ApiError> {
        let envelope = self
            .request(
                Method::POST,
                "/workweixin/auth/oauth-url",
                Some(json!({ "state": "complete_profile" })),
            )
            .await?;
        extract_url(envelope).ok_or_else(|| ApiError::new(ApiFailureKind::Api, "获取登录地址失败"))
    }

    async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> Result<ApiEnvelope<Value>, ApiError> {
        let client = reqwest::Client::builder()
            .connect_timeout(self.settings.connect_timeout)
            .timeout(self.settings.request_timeout)
            .build()
            .map_err(|err| ApiError::new(ApiFailureKind::Network, err.to_string()))?;

        let url = format!("{}{path}", self.settings.api_prefix.trim_end_matches('/'));
        let mut request = client
            .request(method, url)
            .header(CONTENT_TYPE, "application/json");
        if let Some(token) = self.tokens.get() {
            request = request.header(AUTHORIZATION, token);
        }
        if let Some(body) = &body {
            request = request.json(body);
        }

        let response = request.send().await.map_err(map_reqwest_error)?;

        // The backend rotates tokens through the response header.
        if let Some(rotated) = response
            .headers()
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
        {
            self.tokens.set(rotated);
        }

        if response.status() == reqwest::StatusCode::UNAUTHORIZED {
            let envelope = response.json::<ApiEnvelope<Value>>().await.ok();
            self.tokens.remove();
            let message = envelope
                .and_then(|e| e.error)
                .unwrap_or_else(|| "未授权，请重新登录".to_owned());
            return Err(ApiError::new(ApiFailureKind::Unauthorized, message));
        }

        let envelope: ApiEnvelope<Value> = response
            .json()
            .await
            .map_err(|err| ApiError::new(ApiFailureKind::MalformedResponse, err.to_string()))?;

        if envelope.is_unauthorized() {
            self.tokens.remove();
            let message = envelope
                .error
                .unwrap_or_else(|| "未授权，请重新登录".to_owned());
            return Err(ApiError::new(ApiFailureKind::Unauthorized, message));
        }
        if !envelope.success {
            let message = envelope
                .error
                .or(envelope.message)
                .unwrap_or_else(|| "请求失败".to_owned());
            return Err(ApiError::new(ApiFailureKind::Api, message));
        }
        Ok(envelope)
    }
}

fn extract_url(envelope: ApiEnvelope<Value>) -> Option<String> {
    envelope
        .data?
        .get("url")?
        .as_str()
        .map(str::to_owned)
}
