use std::env;
use std::path::PathBuf;

use sidechat_core::host::HostConfig;
use sidechat_engine::{AuthSettings, ChatSettings};

/// Default UI origin during development.
const DEFAULT_IFRAME_URL: &str = "http://localhost:5173/";
/// Where the login token lives between runs.
const TOKEN_FILENAME: &str = ".sidechat_token";

/// Everything the shell needs, resolved from the environment with the
/// same keys the served web bundle understands.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: HostConfig,
    pub chat: ChatSettings,
    pub auth: AuthSettings,
    pub token_path: PathBuf,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Testable form taking the variable lookup as a function.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let iframe_url =
            non_empty(lookup("VITE_IFRAME_URL")).unwrap_or_else(|| DEFAULT_IFRAME_URL.to_owned());
        let allowed_origins = lookup("VITE_IFRAME_ALLOWED_ORIGINS")
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|origin| !origin.is_empty())
                    .map(str::to_owned)
                    .collect()
            })
            .unwrap_or_default();

        let mut chat = ChatSettings::default();
        if let Some(base) = non_empty(lookup("VITE_CHAT_API_BASE_URL")) {
            chat.base_url = base.trim_end_matches('/').to_owned();
        }
        chat.api_key = non_empty(lookup("VITE_CHAT_API_KEY"));
        if let Some(model) = non_empty(lookup("VITE_CHAT_MODEL")) {
            chat.model = model;
        }

        let mut auth = AuthSettings::default();
        // VITE_API_PREFIX overrides; otherwise API_HOST + API_PREFIX
        // compose the auth base.
        auth.api_prefix = non_empty(lookup("VITE_API_PREFIX")).unwrap_or_else(|| {
            let host = lookup("API_HOST").unwrap_or_default();
            let prefix = non_empty(lookup("API_PREFIX")).unwrap_or_else(|| "/api".to_owned());
            format!("{host}{prefix}")
        });

        let token_path = env::current_dir()
            .unwrap_or_else(|_| PathBuf::from("."))
            .join(TOKEN_FILENAME);

        Self {
            host: HostConfig {
                iframe_url,
                allowed_origins,
            },
            chat,
            auth,
            token_path,
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_owned())
        .filter(|v| !v.is_empty())
}
