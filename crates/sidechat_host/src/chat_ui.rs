use std::sync::mpsc;

use relay_logging::{relay_info, relay_warn};
use serde_json::Value;
use sidechat_core::bridge::{BridgeDirection, BridgeMessage};
use sidechat_core::conversation::{
    self, CompletionOutcome, Conversation, ConversationEffect, ConversationEvent,
};
use sidechat_core::host::WindowRef;
use sidechat_engine::{ApiFailureKind, EngineEvent, EngineHandle, LoginStatus};

/// A window-channel message as the host receives it: source identity,
/// origin, payload.
#[derive(Debug, Clone)]
pub struct WindowEnvelope {
    pub source: WindowRef,
    pub origin: String,
    pub value: Value,
}

/// The chat UI running on the iframe side of the bridge: conversation
/// state plus the engine doing the network work.
///
/// The first message accepted from the host pins the host's origin;
/// later posts from any other origin are dropped.
pub struct ChatUi {
    conversation: Conversation,
    engine: EngineHandle,
    window: WindowRef,
    origin: String,
    host_origin: Option<String>,
    to_host: mpsc::Sender<WindowEnvelope>,
}

impl ChatUi {
    pub fn new(
        engine: EngineHandle,
        window: WindowRef,
        origin: String,
        to_host: mpsc::Sender<WindowEnvelope>,
    ) -> Self {
        let ui = Self {
            conversation: Conversation::new(),
            engine,
            window,
            origin,
            host_origin: None,
            to_host,
        };
        // Announce ourselves so the host can finish its handshake.
        ui.post_to_host(BridgeMessage::IframeReady {
            source: Some("remote-ui".to_owned()),
        });
        ui
    }

    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    pub fn check_login(&self) {
        self.engine.check_login();
    }

    pub fn input_changed(&mut self, text: String) {
        self.apply(ConversationEvent::InputChanged(text));
    }

    pub fn send_clicked(&mut self) {
        self.apply(ConversationEvent::SendClicked);
    }

    pub fn cancel_clicked(&mut self) {
        self.apply(ConversationEvent::CancelClicked);
    }

    pub fn open_options(&self) {
        self.post_to_host(BridgeMessage::OpenOptions);
    }

    /// A postMessage from the embedding host document.
    pub fn on_host_post(&mut self, origin: &str, value: &Value) {
        let Some(message) = BridgeMessage::from_value(value) else {
            return;
        };
        if message.direction() != BridgeDirection::HostToIframe {
            return;
        }
        if let Some(pinned) = &self.host_origin {
            if pinned != origin {
                return;
            }
        }
        self.host_origin = Some(origin.to_owned());

        match message {
            BridgeMessage::HostReady { .. } => self.apply(ConversationEvent::HostReady),
            BridgeMessage::PrefillEvent { text, auto_send } => {
                self.apply(ConversationEvent::Prefill {
                    text,
                    auto_send: auto_send.unwrap_or(false),
                });
            }
            BridgeMessage::IframeReady { .. }
            | BridgeMessage::PrefillRequest
            | BridgeMessage::OpenOptions => {}
        }
    }

    /// Drain settled engine work into the transcript. Returns whether the
    /// conversation changed.
    pub fn pump_engine(&mut self) -> bool {
        let mut changed = false;
        while let Some(event) = self.engine.try_recv() {
            match event {
                EngineEvent::ChatCompleted { request_id, result } => {
                    let outcome = match result {
                        Ok(reply) => CompletionOutcome::Success(reply.text),
                        Err(err) if err.kind == ApiFailureKind::Cancelled => {
                            CompletionOutcome::Cancelled
                        }
                        Err(err) => CompletionOutcome::Failed(err.message),
                    };
                    self.apply(ConversationEvent::CompletionFinished {
                        request_id,
                        outcome,
                    });
                    changed = true;
                }
                EngineEvent::LoginChecked { result } => match result {
                    Ok(LoginStatus::LoggedIn(user)) => {
                        relay_info!("已登录: {}", user.name.as_deref().unwrap_or("未知用户"));
                    }
                    Ok(LoginStatus::LoginRequired { url }) => {
                        relay_info!("请先登录: {url}");
                    }
                    Err(err) => relay_warn!("登录检查失败: {err}"),
                },
            }
        }
        changed
    }

    fn apply(&mut self, event: ConversationEvent) {
        let conversation = std::mem::take(&mut self.conversation);
        let (conversation, effects) = conversation::update(conversation, event);
        self.conversation = conversation;
        for effect in effects {
            self.run_effect(effect);
        }
    }

    fn run_effect(&mut self, effect: ConversationEffect) {
        match effect {
            ConversationEffect::StartCompletion { request_id, input } => {
                self.engine.send_chat(request_id, input);
            }
            ConversationEffect::CancelCompletion { request_id } => {
                self.engine.cancel(request_id);
            }
            ConversationEffect::RequestPrefill => {
                self.post_to_host(BridgeMessage::PrefillRequest);
            }
        }
    }

    fn post_to_host(&self, message: BridgeMessage) {
        let _ = self.to_host.send(WindowEnvelope {
            source: self.window,
            origin: self.origin.clone(),
            value: message.to_value(),
        });
    }
}
