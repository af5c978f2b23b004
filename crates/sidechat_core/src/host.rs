use std::collections::BTreeSet;

use serde_json::Value;
use url::Url;

use crate::bridge::{BridgeDirection, BridgeMessage};
use crate::msg::{BusMessage, TabId};

/// Opaque identity of a window object, standing in for reference equality
/// on `event.source`.
pub type WindowRef = u64;

/// What the host needs to know before it can build its iframe.
#[derive(Debug, Clone)]
pub struct HostConfig {
    pub iframe_url: String,
    pub allowed_origins: Vec<String>,
}

/// A prefill waiting for the bridge to come up. Single slot: a newer
/// payload replaces an unflushed older one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BufferedPrefill {
    pub text: String,
    pub auto_send: Option<bool>,
}

/// State of the panel host document. This is the global-panel variant:
/// one panel per browser, tracking whichever tab is active, accepting
/// prefills for any tab.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostState {
    current_tab: Option<TabId>,
    bridge_ready: bool,
    pending: Option<BufferedPrefill>,
    iframe_window: Option<WindowRef>,
    allowed_origins: BTreeSet<String>,
    iframe_origin: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostEvent {
    /// Answer to a [`HostEffect::QueryActiveTab`] probe.
    ActiveTabResolved { tab_id: Option<TabId> },
    /// Another tab became active; the host re-resolves, nothing more.
    TabActivated,
    /// The iframe finished loading and exposed its content window.
    IframeLoaded { window: WindowRef },
    /// A message arrived on the window channel.
    WindowMessage {
        source: WindowRef,
        origin: String,
        value: Value,
    },
    /// A raw value arrived on the extension bus.
    BusMessage { value: Value },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostEffect {
    /// Fire-and-forget send toward the background relay.
    SendBus(BusMessage),
    /// Open the dedicated connection whose disconnect means "panel closed".
    OpenPanelClosedPort,
    QueryActiveTab,
    LoadIframe { url: String },
    /// Post a message into the iframe at the verified target origin.
    PostToIframe {
        window: WindowRef,
        message: BridgeMessage,
        target_origin: String,
    },
    HideLoading,
    OpenOptionsPage,
}

impl HostState {
    /// Build the host and its startup effects: announce the panel, open
    /// the closed-detection port, resolve the active tab and point the
    /// iframe at the chat UI.
    pub fn new(config: &HostConfig) -> (Self, Vec<HostEffect>) {
        let iframe_url = build_iframe_url(&config.iframe_url, None);
        let iframe_origin = origin_of(&iframe_url);
        let mut allowed_origins: BTreeSet<String> = config
            .allowed_origins
            .iter()
            .filter(|origin| !origin.is_empty())
            .cloned()
            .collect();
        if let Some(origin) = &iframe_origin {
            allowed_origins.insert(origin.clone());
        }

        let state = Self {
            current_tab: None,
            bridge_ready: false,
            pending: None,
            iframe_window: None,
            allowed_origins,
            iframe_origin,
        };
        let effects = vec![
            HostEffect::SendBus(BusMessage::PanelOpened),
            HostEffect::OpenPanelClosedPort,
            HostEffect::QueryActiveTab,
            HostEffect::LoadIframe { url: iframe_url },
        ];
        (state, effects)
    }

    pub fn current_tab(&self) -> Option<TabId> {
        self.current_tab
    }

    pub fn bridge_ready(&self) -> bool {
        self.bridge_ready
    }

    pub fn pending(&self) -> Option<&BufferedPrefill> {
        self.pending.as_ref()
    }

    pub fn allowed_origins(&self) -> &BTreeSet<String> {
        &self.allowed_origins
    }

    pub fn iframe_origin(&self) -> Option<&str> {
        self.iframe_origin.as_deref()
    }

    fn apply_window_message(
        &mut self,
        source: WindowRef,
        origin: &str,
        value: &Value,
    ) -> Vec<HostEffect> {
        // Only the embedded iframe's own window may talk to this host,
        // and only from an allow-listed origin. Everything else is
        // dropped silently, well-formed or not.
        if self.iframe_window != Some(source) {
            return Vec::new();
        }
        if !self.allowed_origins.contains(origin) {
            return Vec::new();
        }
        let Some(message) = BridgeMessage::from_value(value) else {
            return Vec::new();
        };
        if message.direction() != BridgeDirection::IframeToHost {
            return Vec::new();
        }

        match message {
            BridgeMessage::IframeReady { .. } => {
                self.bridge_ready = true;
                let mut effects = vec![HostEffect::HideLoading];
                effects.extend(self.post_to_iframe(BridgeMessage::HostReady {
                    tab_id: self.current_tab,
                }));
                effects.extend(self.flush_prefill());
                effects
            }
            BridgeMessage::PrefillRequest => vec![HostEffect::SendBus(BusMessage::PrefillRequest {
                tab_id: self.current_tab,
            })],
            BridgeMessage::OpenOptions => vec![HostEffect::OpenOptionsPage],
            BridgeMessage::HostReady { .. } | BridgeMessage::PrefillEvent { .. } => Vec::new(),
        }
    }

    fn apply_bus_message(&mut self, value: &Value) -> Vec<HostEffect> {
        let Some(BusMessage::Prefill {
            text, auto_send, ..
        }) = BusMessage::from_value(value)
        else {
            return Vec::new();
        };
        // Global panel: prefills from every tab are relevant.
        self.pending = Some(BufferedPrefill { text, auto_send });
        self.flush_prefill()
    }

    /// Post the buffered prefill into the iframe and clear the slot. Waits
    /// (by doing nothing) until the iframe has reported ready.
    fn flush_prefill(&mut self) -> Vec<HostEffect> {
        if !self.bridge_ready {
            return Vec::new();
        }
        let Some(pending) = self.pending.take() else {
            return Vec::new();
        };
        self.post_to_iframe(BridgeMessage::PrefillEvent {
            text: pending.text,
            auto_send: pending.auto_send,
        })
        .into_iter()
        .collect()
    }

    fn post_to_iframe(&self, message: BridgeMessage) -> Option<HostEffect> {
        let window = self.iframe_window?;
        let target_origin = self
            .iframe_origin
            .clone()
            .unwrap_or_else(|| "*".to_owned());
        Some(HostEffect::PostToIframe {
            window,
            message,
            target_origin,
        })
    }
}

/// Pure update function for the host document.
pub fn update(mut state: HostState, event: HostEvent) -> (HostState, Vec<HostEffect>) {
    let effects = match event {
        HostEvent::ActiveTabResolved { tab_id } => {
            if tab_id.is_some() {
                state.current_tab = tab_id;
            }
            Vec::new()
        }
        HostEvent::TabActivated => vec![HostEffect::QueryActiveTab],
        HostEvent::IframeLoaded { window } => {
            state.iframe_window = Some(window);
            Vec::new()
        }
        HostEvent::WindowMessage {
            source,
            origin,
            value,
        } => state.apply_window_message(source, &origin, &value),
        HostEvent::BusMessage { value } => state.apply_bus_message(&value),
    };
    (state, effects)
}

/// Embed the owning tab in the iframe URL as a `tabId` query parameter.
/// An unparseable base is passed through untouched.
pub fn build_iframe_url(base: &str, tab_id: Option<TabId>) -> String {
    match Url::parse(base) {
        Ok(mut url) => {
            if let Some(tab) = tab_id {
                url.query_pairs_mut()
                    .append_pair("tabId", &tab.to_string());
            }
            url.into()
        }
        Err(_) => base.to_owned(),
    }
}

/// Origin of a URL the way the web platform serializes it
/// (`scheme://host:port`, or `null` for opaque origins).
pub fn origin_of(url: &str) -> Option<String> {
    Url::parse(url)
        .ok()
        .map(|parsed| parsed.origin().ascii_serialization())
}
