use serde_json::{Map, Value};

use crate::msg::TabId;

/// Channel marker every bridge message must carry.
pub const BRIDGE_CHANNEL: &str = "ai-chat-iframe-bridge";

pub const IFRAME_READY: &str = "AI_CHAT_IFRAME_READY";
pub const HOST_READY: &str = "AI_CHAT_HOST_READY";
pub const PREFILL_REQUEST: &str = "AI_CHAT_PREFILL_REQUEST";
pub const PREFILL_EVENT: &str = "AI_CHAT_PREFILL_EVENT";
pub const OPEN_OPTIONS: &str = "AI_CHAT_OPEN_OPTIONS";

/// Messages crossing the host<->iframe window channel.
///
/// Wire shape is `{channel, type, payload?}`. There is no integrity check
/// beyond channel equality; trust comes from the origin and source-window
/// checks the receiving side performs before decoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BridgeMessage {
    IframeReady { source: Option<String> },
    HostReady { tab_id: Option<TabId> },
    PrefillRequest,
    PrefillEvent {
        text: String,
        auto_send: Option<bool>,
    },
    OpenOptions,
}

/// Which side of the bridge a message travels from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BridgeDirection {
    IframeToHost,
    HostToIframe,
}

impl BridgeMessage {
    pub fn type_tag(&self) -> &'static str {
        match self {
            Self::IframeReady { .. } => IFRAME_READY,
            Self::HostReady { .. } => HOST_READY,
            Self::PrefillRequest => PREFILL_REQUEST,
            Self::PrefillEvent { .. } => PREFILL_EVENT,
            Self::OpenOptions => OPEN_OPTIONS,
        }
    }

    pub fn direction(&self) -> BridgeDirection {
        match self {
            Self::IframeReady { .. } | Self::PrefillRequest | Self::OpenOptions => {
                BridgeDirection::IframeToHost
            }
            Self::HostReady { .. } | Self::PrefillEvent { .. } => BridgeDirection::HostToIframe,
        }
    }

    /// Decode a window message. The channel marker must equal
    /// [`BRIDGE_CHANNEL`] and the type must be a known string tag;
    /// everything else yields `None` and is dropped by the caller.
    pub fn from_value(value: &Value) -> Option<Self> {
        let obj = value.as_object()?;
        if obj.get("channel")?.as_str()? != BRIDGE_CHANNEL {
            return None;
        }
        let tag = obj.get("type")?.as_str()?;
        let payload = obj.get("payload").and_then(Value::as_object);
        match tag {
            IFRAME_READY => Some(Self::IframeReady {
                source: string_field(payload, "source"),
            }),
            HOST_READY => Some(Self::HostReady {
                tab_id: payload
                    .and_then(|p| p.get("tabId"))
                    .and_then(Value::as_u64),
            }),
            PREFILL_REQUEST => Some(Self::PrefillRequest),
            PREFILL_EVENT => {
                let payload = payload?;
                Some(Self::PrefillEvent {
                    text: payload.get("text")?.as_str()?.to_owned(),
                    auto_send: payload.get("autoSend").and_then(Value::as_bool),
                })
            }
            OPEN_OPTIONS => Some(Self::OpenOptions),
            _ => None,
        }
    }

    pub fn to_value(&self) -> Value {
        let mut obj = Map::new();
        obj.insert("channel".to_owned(), Value::from(BRIDGE_CHANNEL));
        obj.insert("type".to_owned(), Value::from(self.type_tag()));
        match self {
            Self::IframeReady { source } => {
                let mut payload = Map::new();
                if let Some(source) = source {
                    payload.insert("source".to_owned(), Value::from(source.as_str()));
                }
                obj.insert("payload".to_owned(), Value::Object(payload));
            }
            Self::HostReady { tab_id } => {
                let mut payload = Map::new();
                if let Some(tab) = tab_id {
                    payload.insert("tabId".to_owned(), Value::from(*tab));
                }
                obj.insert("payload".to_owned(), Value::Object(payload));
            }
            Self::PrefillEvent { text, auto_send } => {
                let mut payload = Map::new();
                payload.insert("text".to_owned(), Value::from(text.as_str()));
                if let Some(auto) = auto_send {
                    payload.insert("autoSend".to_owned(), Value::from(*auto));
                }
                obj.insert("payload".to_owned(), Value::Object(payload));
            }
            Self::PrefillRequest | Self::OpenOptions => {}
        }
        Value::Object(obj)
    }
}

fn string_field(payload: Option<&Map<String, Value>>, key: &str) -> Option<String> {
    payload
        .and_then(|p| p.get(key))
        .and_then(Value::as_str)
        .map(str::to_owned)
}
