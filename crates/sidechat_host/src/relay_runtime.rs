use std::sync::mpsc;

use relay_logging::relay_debug;
use serde_json::Value;
use sidechat_core::relay::{self, RelayEffect, RelayEvent, RelayState, WindowId};
use sidechat_core::BusSender;

use crate::bus::{RuntimeBus, SurfaceCommand};

/// Bus endpoint name of the background context.
pub const BACKGROUND_ENDPOINT: &str = "background";

/// Drives the relay state machine and executes its effects against the
/// bus and the surface.
///
/// Execution is best-effort throughout: a broadcast with no receiver or
/// a surface that stopped listening is noted at debug level and
/// otherwise forgotten. The worst case is a missed prefill, recovered by
/// the panel re-requesting on its own ready signal.
pub struct RelayRuntime {
    state: RelayState,
    bus: RuntimeBus,
    surface: mpsc::Sender<SurfaceCommand>,
    current_window: Box<dyn Fn() -> Option<WindowId> + Send>,
}

impl RelayRuntime {
    pub fn new(
        bus: RuntimeBus,
        surface: mpsc::Sender<SurfaceCommand>,
        current_window: Box<dyn Fn() -> Option<WindowId> + Send>,
    ) -> Self {
        Self {
            state: RelayState::new(),
            bus,
            surface,
            current_window,
        }
    }

    pub fn state(&self) -> &RelayState {
        &self.state
    }

    /// A raw value arrived on the bus for the background context.
    pub fn on_bus_value(&mut self, value: Value, sender: BusSender) {
        self.handle(RelayEvent::BusMessage { value, sender });
    }

    pub fn handle(&mut self, event: RelayEvent) {
        let state = std::mem::take(&mut self.state);
        let (state, effects) = relay::update(state, event);
        self.state = state;
        for effect in effects {
            self.run_effect(effect);
        }
    }

    fn run_effect(&mut self, effect: RelayEffect) {
        match effect {
            RelayEffect::Broadcast {
                message,
                tab_id,
                revision,
                drop_after_send,
            } => {
                let delivered = self
                    .bus
                    .broadcast(BACKGROUND_ENDPOINT, message.to_value(), BusSender::default())
                    .is_ok();
                if !delivered {
                    relay_debug!("prefill for tab {tab_id} had no receiver; kept for later");
                }
                self.handle(RelayEvent::DeliveryOutcome {
                    tab_id,
                    revision,
                    drop_after_send,
                    delivered,
                });
            }
            RelayEffect::OpenPanel { window_id } => {
                let _ = self.surface.send(SurfaceCommand::OpenPanel { window_id });
            }
            RelayEffect::ClosePanel => {
                let _ = self.surface.send(SurfaceCommand::ClosePanel);
            }
            RelayEffect::RefreshCurrentWindow => {
                let window_id = (self.current_window)();
                self.handle(RelayEvent::CurrentWindowResolved { window_id });
            }
        }
    }
}
