use std::sync::mpsc;

use relay_logging::relay_debug;
use serde_json::Value;
use sidechat_core::host::{self, HostConfig, HostEffect, HostEvent, HostState};
use sidechat_core::{BusSender, TabId, PORT_PANEL_CLOSED};

use crate::bus::{PortHandle, RuntimeBus, SurfaceCommand};

/// Bus endpoint name of the panel host document.
pub const PANEL_ENDPOINT: &str = "panel";

/// A postMessage headed into the iframe. Delivery is up to the shell,
/// which enforces the target origin the way a browser would.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IframePost {
    pub value: Value,
    pub target_origin: String,
}

/// Drives the panel host machine: bus traffic in, window posts out.
pub struct HostRuntime {
    state: HostState,
    bus: RuntimeBus,
    surface: mpsc::Sender<SurfaceCommand>,
    iframe: mpsc::Sender<IframePost>,
    active_tab: Box<dyn Fn() -> Option<TabId> + Send>,
    port: Option<PortHandle>,
}

impl HostRuntime {
    pub fn new(
        config: &HostConfig,
        bus: RuntimeBus,
        surface: mpsc::Sender<SurfaceCommand>,
        iframe: mpsc::Sender<IframePost>,
        active_tab: Box<dyn Fn() -> Option<TabId> + Send>,
    ) -> Self {
        let (state, effects) = HostState::new(config);
        let mut runtime = Self {
            state,
            bus,
            surface,
            iframe,
            active_tab,
            port: None,
        };
        for effect in effects {
            runtime.run_effect(effect);
        }
        runtime
    }

    pub fn state(&self) -> &HostState {
        &self.state
    }

    pub fn handle(&mut self, event: HostEvent) {
        let state = self.state.clone();
        let (state, effects) = host::update(state, event);
        self.state = state;
        for effect in effects {
            self.run_effect(effect);
        }
    }

    /// Tear down the panel-closed port, as the document going away would.
    pub fn disconnect(&mut self) {
        self.port = None;
    }

    fn run_effect(&mut self, effect: HostEffect) {
        match effect {
            HostEffect::SendBus(message) => {
                if self
                    .bus
                    .broadcast(PANEL_ENDPOINT, message.to_value(), BusSender::default())
                    .is_err()
                {
                    relay_debug!("bus send from panel had no receiver");
                }
            }
            HostEffect::OpenPanelClosedPort => {
                self.port = Some(self.bus.connect_port(PORT_PANEL_CLOSED));
            }
            HostEffect::QueryActiveTab => {
                let tab_id = (self.active_tab)();
                self.handle(HostEvent::ActiveTabResolved { tab_id });
            }
            HostEffect::LoadIframe { url } => {
                let _ = self.surface.send(SurfaceCommand::SetIframeSrc { url });
            }
            HostEffect::PostToIframe {
                window: _,
                message,
                target_origin,
            } => {
                let _ = self.iframe.send(IframePost {
                    value: message.to_value(),
                    target_origin,
                });
            }
            HostEffect::HideLoading => {
                let _ = self.surface.send(SurfaceCommand::HideLoading);
            }
            HostEffect::OpenOptionsPage => {
                let _ = self.surface.send(SurfaceCommand::OpenOptionsPage);
            }
        }
    }
}
