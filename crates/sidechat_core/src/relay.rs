use std::collections::HashMap;

use serde_json::Value;

use crate::msg::{BusMessage, TabId};

pub type WindowId = u64;
pub type DocumentId = String;
/// Stamp distinguishing successive cached payloads for the same tab.
pub type Revision = u64;

/// Sender information the transport attaches to a bus message.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BusSender {
    pub tab_id: Option<TabId>,
    pub document_id: Option<DocumentId>,
}

/// A cached prefill payload awaiting delivery to the panel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingPrefill {
    pub text: String,
    pub tab_id: TabId,
    pub auto_send: Option<bool>,
    pub revision: Revision,
}

/// Broker state. Rebuilt fresh on every relay start; nothing survives a
/// restart, tabs are re-learned from live navigation events.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RelayState {
    pending_prefill: HashMap<TabId, PendingPrefill>,
    document_tabs: HashMap<DocumentId, TabId>,
    panel_opened: bool,
    current_window: Option<WindowId>,
    next_revision: Revision,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelayEvent {
    /// A raw value arrived on the extension bus.
    BusMessage { value: Value, sender: BusSender },
    /// A document committed inside a tab.
    NavigationCommitted {
        document_id: DocumentId,
        tab_id: TabId,
    },
    /// A tab closed.
    TabRemoved { tab_id: TabId },
    /// Focus moved to a window, or left the browser entirely (`None`).
    WindowFocusChanged { window_id: Option<WindowId> },
    WindowCreated,
    WindowRemoved,
    /// Answer to a [`RelayEffect::RefreshCurrentWindow`] probe.
    CurrentWindowResolved { window_id: Option<WindowId> },
    /// The toolbar icon was clicked.
    ActionClicked,
    /// The panel's dedicated port disconnected, so the panel is gone.
    PanelPortDisconnected,
    /// Result of an attempted [`RelayEffect::Broadcast`].
    DeliveryOutcome {
        tab_id: TabId,
        revision: Revision,
        drop_after_send: bool,
        delivered: bool,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelayEffect {
    OpenPanel { window_id: Option<WindowId> },
    ClosePanel,
    /// Best-effort broadcast of a prefill payload to whichever panel is
    /// listening. The runtime reports back via
    /// [`RelayEvent::DeliveryOutcome`]; a failed broadcast is swallowed
    /// and the cache entry stays for a later request.
    Broadcast {
        message: BusMessage,
        tab_id: TabId,
        revision: Revision,
        drop_after_send: bool,
    },
    /// Re-query which window is current.
    RefreshCurrentWindow,
}

/// Pure update function: applies an event to the relay state and returns
/// any effects for the runtime to execute.
pub fn update(mut state: RelayState, event: RelayEvent) -> (RelayState, Vec<RelayEffect>) {
    let effects = match event {
        RelayEvent::BusMessage { value, sender } => match BusMessage::from_value(&value) {
            Some(message) => state.apply_bus_message(message, &sender),
            // Not a recognized bus message; dropped without a trace.
            None => Vec::new(),
        },
        RelayEvent::NavigationCommitted {
            document_id,
            tab_id,
        } => {
            state.document_tabs.insert(document_id, tab_id);
            Vec::new()
        }
        RelayEvent::TabRemoved { tab_id } => {
            state.pending_prefill.remove(&tab_id);
            state.document_tabs.retain(|_, mapped| *mapped != tab_id);
            Vec::new()
        }
        RelayEvent::WindowFocusChanged { window_id } => {
            if window_id.is_some() {
                state.current_window = window_id;
            }
            Vec::new()
        }
        RelayEvent::WindowCreated | RelayEvent::WindowRemoved => {
            vec![RelayEffect::RefreshCurrentWindow]
        }
        RelayEvent::CurrentWindowResolved { window_id } => {
            state.current_window = window_id;
            Vec::new()
        }
        RelayEvent::ActionClicked => state.toggle_panel(),
        RelayEvent::PanelPortDisconnected => {
            state.panel_opened = false;
            Vec::new()
        }
        RelayEvent::DeliveryOutcome {
            tab_id,
            revision,
            drop_after_send,
            delivered,
        } => {
            if delivered
                && drop_after_send
                && state
                    .pending_prefill
                    .get(&tab_id)
                    .is_some_and(|p| p.revision == revision)
            {
                state.pending_prefill.remove(&tab_id);
            }
            Vec::new()
        }
    };
    (state, effects)
}

impl RelayState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pending_for(&self, tab_id: TabId) -> Option<&PendingPrefill> {
        self.pending_prefill.get(&tab_id)
    }

    pub fn document_tab(&self, document_id: &str) -> Option<TabId> {
        self.document_tabs.get(document_id).copied()
    }

    pub fn panel_opened(&self) -> bool {
        self.panel_opened
    }

    pub fn current_window(&self) -> Option<WindowId> {
        self.current_window
    }

    fn apply_bus_message(&mut self, message: BusMessage, sender: &BusSender) -> Vec<RelayEffect> {
        match message {
            BusMessage::Prefill {
                text,
                tab_id,
                auto_send,
            } => {
                let Some(tab_id) = self.resolve_tab_id(tab_id, sender) else {
                    // No routable tab; the message is ignored.
                    return Vec::new();
                };
                self.cache_and_deliver(text, tab_id, auto_send)
            }
            BusMessage::PrefillRequest { tab_id } => {
                let Some(tab_id) = self.resolve_tab_id(tab_id, sender) else {
                    return Vec::new();
                };
                self.deliver_cached(tab_id)
            }
            BusMessage::PanelOpened => {
                self.panel_opened = true;
                Vec::new()
            }
            BusMessage::TogglePanel => self.toggle_panel(),
            // Part of the vocabulary, but the relay has no work for them.
            BusMessage::Generate { .. } | BusMessage::PrefillDone => Vec::new(),
        }
    }

    /// Effective tab of a message: explicit id, else the sender's own tab,
    /// else a lookup through the document map by the sender's document id.
    fn resolve_tab_id(&self, explicit: Option<TabId>, sender: &BusSender) -> Option<TabId> {
        explicit.or(sender.tab_id).or_else(|| {
            sender
                .document_id
                .as_deref()
                .and_then(|doc| self.document_tab(doc))
        })
    }

    fn cache_and_deliver(
        &mut self,
        text: String,
        tab_id: TabId,
        auto_send: Option<bool>,
    ) -> Vec<RelayEffect> {
        self.next_revision += 1;
        let payload = PendingPrefill {
            text,
            tab_id,
            auto_send,
            revision: self.next_revision,
        };
        self.pending_prefill.insert(tab_id, payload.clone());

        let mut effects = Vec::new();
        if !self.panel_opened {
            effects.extend(self.toggle_panel());
        }
        effects.push(broadcast_effect(&payload, false));
        effects
    }

    fn deliver_cached(&mut self, tab_id: TabId) -> Vec<RelayEffect> {
        match self.pending_prefill.get(&tab_id) {
            Some(payload) => vec![broadcast_effect(payload, true)],
            None => Vec::new(),
        }
    }

    fn toggle_panel(&mut self) -> Vec<RelayEffect> {
        self.panel_opened = !self.panel_opened;
        if self.panel_opened {
            vec![RelayEffect::OpenPanel {
                window_id: self.current_window,
            }]
        } else {
            vec![RelayEffect::ClosePanel]
        }
    }
}

fn broadcast_effect(payload: &PendingPrefill, drop_after_send: bool) -> RelayEffect {
    RelayEffect::Broadcast {
        message: BusMessage::Prefill {
            text: payload.text.clone(),
            tab_id: Some(payload.tab_id),
            auto_send: payload.auto_send,
        },
        tab_id: payload.tab_id,
        revision: payload.revision,
        drop_after_send,
    }
}
