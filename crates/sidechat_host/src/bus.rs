use std::collections::HashMap;
use std::sync::{mpsc, Arc, Mutex};

use serde_json::Value;
use sidechat_core::relay::WindowId;
use sidechat_core::BusSender;

/// One delivery of a broadcast value, with the transport-stamped sender.
#[derive(Debug, Clone)]
pub struct BusDelivery {
    pub value: Value,
    pub sender: BusSender,
}

#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum BusError {
    /// Mirrors the transport's "Receiving end does not exist" rejection.
    #[error("receiving end does not exist")]
    NoReceiver,
}

/// In-process rendition of the extension broadcast bus.
///
/// Every attached endpoint except the sender sees each message, and a
/// broadcast nobody else is attached to hear fails, so callers treat
/// delivery as best-effort: swallow the error, keep their cache, try
/// again later. There is no acknowledgment or ordering protocol beyond
/// the per-endpoint channel.
#[derive(Clone, Default)]
pub struct RuntimeBus {
    inner: Arc<Mutex<BusInner>>,
}

#[derive(Default)]
struct BusInner {
    listeners: HashMap<String, mpsc::Sender<BusDelivery>>,
    port_disconnects: Option<mpsc::Sender<String>>,
}

impl RuntimeBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach an endpoint under `name`, replacing any previous listener
    /// with that name.
    pub fn attach(&self, name: &str) -> mpsc::Receiver<BusDelivery> {
        let (tx, rx) = mpsc::channel();
        self.inner
            .lock()
            .expect("bus lock")
            .listeners
            .insert(name.to_owned(), tx);
        rx
    }

    pub fn detach(&self, name: &str) {
        self.inner.lock().expect("bus lock").listeners.remove(name);
    }

    /// Broadcast `value` from `from` to every other endpoint. Endpoints
    /// whose receiver is gone are dropped from the registry on the way.
    pub fn broadcast(&self, from: &str, value: Value, sender: BusSender) -> Result<(), BusError> {
        let mut inner = self.inner.lock().expect("bus lock");
        let mut delivered = false;
        inner.listeners.retain(|name, tx| {
            if name == from {
                return true;
            }
            match tx.send(BusDelivery {
                value: value.clone(),
                sender: sender.clone(),
            }) {
                Ok(()) => {
                    delivered = true;
                    true
                }
                Err(_) => false,
            }
        });
        if delivered {
            Ok(())
        } else {
            Err(BusError::NoReceiver)
        }
    }

    /// Register the single subscriber told when named ports disconnect.
    pub fn set_port_listener(&self, tx: mpsc::Sender<String>) {
        self.inner.lock().expect("bus lock").port_disconnects = Some(tx);
    }

    /// Open a long-lived named connection. Dropping the handle is the
    /// disconnect signal.
    pub fn connect_port(&self, name: &str) -> PortHandle {
        PortHandle {
            name: name.to_owned(),
            notify: self
                .inner
                .lock()
                .expect("bus lock")
                .port_disconnects
                .clone(),
        }
    }
}

#[derive(Debug)]
pub struct PortHandle {
    name: String,
    notify: Option<mpsc::Sender<String>>,
}

impl Drop for PortHandle {
    fn drop(&mut self) {
        if let Some(notify) = &self.notify {
            let _ = notify.send(self.name.clone());
        }
    }
}

/// Commands for the enclosing shell: things a real browser chrome would
/// do that the terminal shell only simulates or logs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SurfaceCommand {
    OpenPanel { window_id: Option<WindowId> },
    ClosePanel,
    SetIframeSrc { url: String },
    HideLoading,
    OpenOptionsPage,
}
