//! Sidechat engine: HTTP clients and effect execution.
mod auth;
mod chat;
mod engine;
mod persist;
mod types;

pub use auth::{
    ApiEnvelope, AuthClient, AuthSettings, LoginStatus, MemoryTokenStore, TokenStore, UserInfo,
};
pub use chat::{ChatBackend, ChatSettings, ReqwestChatBackend};
pub use engine::EngineHandle;
pub use persist::FileTokenStore;
pub use types::{ApiError, ApiFailureKind, ChatReply, EngineEvent, RequestId};
