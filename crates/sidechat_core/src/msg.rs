use serde_json::{Map, Value};

/// Prefill push: a content script hands selected page text to the panel.
pub const MSG_PREFILL: &str = "MSG_PREFILL";
/// Generation trigger: the panel submits user input for processing.
pub const MSG_GENERATE: &str = "MSG_GENERATE";
/// Prefill completion notice back to the originating page.
pub const MSG_PREFILL_DONE: &str = "MSG_PREFILL_DONE";
/// Prefill pull: the panel asks for cached selection content.
pub const MSG_PREFILL_REQUEST: &str = "MSG_PREFILL_REQUEST";
/// Panel visibility notice: the panel reports it has opened.
pub const MSG_PANEL_OPENED: &str = "MSG_PANEL_OPENED";
/// Panel toggle request: open or close the side panel.
pub const MSG_TOGGLE_PANEL: &str = "MSG_TOGGLE_PANEL";
/// Name of the long-lived connection whose disconnect means the panel closed.
pub const PORT_PANEL_CLOSED: &str = "PORT_PANEL_CLOSED";

pub type TabId = u64;

/// Union of every message exchanged on the extension bus.
///
/// Wire shape is a JSON object `{type, text?, tabId?, autoSend?, input?}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BusMessage {
    Prefill {
        text: String,
        tab_id: Option<TabId>,
        auto_send: Option<bool>,
    },
    PrefillRequest {
        tab_id: Option<TabId>,
    },
    Generate {
        input: String,
    },
    PrefillDone,
    PanelOpened,
    TogglePanel,
}

impl BusMessage {
    pub fn type_tag(&self) -> &'static str {
        match self {
            Self::Prefill { .. } => MSG_PREFILL,
            Self::PrefillRequest { .. } => MSG_PREFILL_REQUEST,
            Self::Generate { .. } => MSG_GENERATE,
            Self::PrefillDone => MSG_PREFILL_DONE,
            Self::PanelOpened => MSG_PANEL_OPENED,
            Self::TogglePanel => MSG_TOGGLE_PANEL,
        }
    }

    /// Decode an untyped bus value. Anything that does not match the
    /// vocabulary yields `None`; every consumption point drops such
    /// values without logging or surfacing an error.
    pub fn from_value(value: &Value) -> Option<Self> {
        let obj = value.as_object()?;
        let tag = obj.get("type")?.as_str()?;
        match tag {
            MSG_PREFILL => Some(Self::Prefill {
                text: obj.get("text")?.as_str()?.to_owned(),
                tab_id: tab_id_field(obj),
                auto_send: obj.get("autoSend").and_then(Value::as_bool),
            }),
            MSG_PREFILL_REQUEST => Some(Self::PrefillRequest {
                tab_id: tab_id_field(obj),
            }),
            MSG_GENERATE => Some(Self::Generate {
                input: obj.get("input")?.as_str()?.to_owned(),
            }),
            MSG_PREFILL_DONE => Some(Self::PrefillDone),
            MSG_PANEL_OPENED => Some(Self::PanelOpened),
            MSG_TOGGLE_PANEL => Some(Self::TogglePanel),
            _ => None,
        }
    }

    /// Encode for the bus. Absent optionals are omitted from the object.
    pub fn to_value(&self) -> Value {
        let mut obj = Map::new();
        obj.insert("type".to_owned(), Value::from(self.type_tag()));
        match self {
            Self::Prefill {
                text,
                tab_id,
                auto_send,
            } => {
                obj.insert("text".to_owned(), Value::from(text.as_str()));
                if let Some(tab) = tab_id {
                    obj.insert("tabId".to_owned(), Value::from(*tab));
                }
                if let Some(auto) = auto_send {
                    obj.insert("autoSend".to_owned(), Value::from(*auto));
                }
            }
            Self::PrefillRequest { tab_id } => {
                if let Some(tab) = tab_id {
                    obj.insert("tabId".to_owned(), Value::from(*tab));
                }
            }
            Self::Generate { input } => {
                obj.insert("input".to_owned(), Value::from(input.as_str()));
            }
            Self::PrefillDone | Self::PanelOpened | Self::TogglePanel => {}
        }
        Value::Object(obj)
    }
}

fn tab_id_field(obj: &Map<String, Value>) -> Option<TabId> {
    obj.get("tabId").and_then(Value::as_u64)
}
