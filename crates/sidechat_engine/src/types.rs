use std::fmt;

/// Correlates an engine command with its completion event.
pub type RequestId = u64;

/// A successful chat completion: the assistant text plus the raw body for
/// callers that want more than the first choice.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatReply {
    pub text: String,
    pub raw: serde_json::Value,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct ApiError {
    pub kind: ApiFailureKind,
    pub message: String,
}

impl ApiError {
    pub(crate) fn new(kind: ApiFailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiFailureKind {
    /// Rejected locally before any request went out.
    InvalidInput,
    HttpStatus(u16),
    Timeout,
    Network,
    /// HTTP 401 or an envelope carrying code 401; the stored token has
    /// been evicted by the time this surfaces.
    Unauthorized,
    /// The backend answered but reported failure in its envelope.
    Api,
    Cancelled,
    MalformedResponse,
}

impl fmt::Display for ApiFailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiFailureKind::InvalidInput => write!(f, "invalid input"),
            ApiFailureKind::HttpStatus(code) => write!(f, "http status {code}"),
            ApiFailureKind::Timeout => write!(f, "timeout"),
            ApiFailureKind::Network => write!(f, "network error"),
            ApiFailureKind::Unauthorized => write!(f, "unauthorized"),
            ApiFailureKind::Api => write!(f, "api failure"),
            ApiFailureKind::Cancelled => write!(f, "cancelled"),
            ApiFailureKind::MalformedResponse => write!(f, "malformed response"),
        }
    }
}

/// Event emitted by the engine when a request settles.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    ChatCompleted {
        request_id: RequestId,
        result: Result<ChatReply, ApiError>,
    },
    LoginChecked {
        result: Result<crate::auth::LoginStatus, ApiError>,
    },
}

pub(crate) fn map_reqwest_error(err: reqwest::Error) -> ApiError {
    if err.is_timeout() {
        return ApiError::new(ApiFailureKind::Timeout, err.to_string());
    }
    ApiError::new(ApiFailureKind::Network, err.to_string())
}
