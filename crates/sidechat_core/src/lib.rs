//! Sidechat core: pure message vocabulary and context state machines.
//!
//! Nothing in this crate performs IO. Each browser context (background
//! relay, panel host, chat ui) is a state value plus an `update` function
//! returning effects; the runtimes in `sidechat_host` execute those
//! effects against the actual transports.

pub mod bridge;
pub mod conversation;
pub mod host;
pub mod msg;
pub mod relay;
pub mod selection;

pub use bridge::{BridgeDirection, BridgeMessage, BRIDGE_CHANNEL};
pub use msg::{
    BusMessage, TabId, MSG_GENERATE, MSG_PANEL_OPENED, MSG_PREFILL, MSG_PREFILL_DONE,
    MSG_PREFILL_REQUEST, MSG_TOGGLE_PANEL, PORT_PANEL_CLOSED,
};
pub use relay::{
    BusSender, DocumentId, PendingPrefill, RelayEffect, RelayEvent, RelayState, Revision, WindowId,
};
