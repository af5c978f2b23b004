use std::sync::{mpsc, Arc};
use std::thread;

use relay_logging::relay_debug;
use tokio_util::sync::CancellationToken;

use crate::auth::AuthClient;
use crate::chat::ChatBackend;
use crate::types::{EngineEvent, RequestId};

enum EngineCommand {
    SendChat { request_id: RequestId, input: String },
    CancelChat { request_id: RequestId },
    CheckLogin,
}

/// Handle to the engine thread. Commands go in over a channel; completed
/// requests come back as [`EngineEvent`]s drained with [`try_recv`].
///
/// Issuing a new send tears down whatever request is still in flight:
/// its cancellation token is cancelled before the fresh request starts.
///
/// [`try_recv`]: EngineHandle::try_recv
pub struct EngineHandle {
    cmd_tx: mpsc::Sender<EngineCommand>,
    event_rx: mpsc::Receiver<EngineEvent>,
}

impl EngineHandle {
    pub fn new(backend: Arc<dyn ChatBackend>, auth: AuthClient) -> Self {
        let (cmd_tx, cmd_rx) = mpsc::channel::<EngineCommand>();
        let (event_tx, event_rx) = mpsc::channel();
        let auth = Arc::new(auth);

        thread::spawn(move || {
            relay_logging::set_context("engine");
            let runtime = tokio::runtime::Runtime::new().expect("tokio runtime");
            let mut in_flight: Vec<(RequestId, CancellationToken)> = Vec::new();

            while let Ok(command) = cmd_rx.recv() {
                match command {
                    EngineCommand::SendChat { request_id, input } => {
                        for (stale_id, token) in in_flight.drain(..) {
                            relay_debug!("cancelling request {stale_id} superseded by {request_id}");
                            token.cancel();
                        }
                        let token = CancellationToken::new();
                        in_flight.push((request_id, token.clone()));

                        let backend = backend.clone();
                        let event_tx = event_tx.clone();
                        runtime.spawn(async move {
                            let result = backend.complete(&input, &token).await;
                            let _ = event_tx.send(EngineEvent::ChatCompleted { request_id, result });
                        });
                    }
                    EngineCommand::CancelChat { request_id } => {
                        in_flight.retain(|(id, token)| {
                            if *id == request_id {
                                token.cancel();
                                false
                            } else {
                                true
                            }
                        });
                    }
                    EngineCommand::CheckLogin => {
                        let auth = auth.clone();
                        let event_tx = event_tx.clone();
                        runtime.spawn(async move {
                            let result = auth.check_login().await;
                            let _ = event_tx.send(EngineEvent::LoginChecked { result });
                        });
                    }
                }
            }
        });

        Self { cmd_tx, event_rx }
    }

    pub fn send_chat(&self, request_id: RequestId, input: impl Into<String>) {
        let _ = self.cmd_tx.send(EngineCommand::SendChat {
            request_id,
            input: input.into(),
        });
    }

    pub fn cancel(&self, request_id: RequestId) {
        let _ = self.cmd_tx.send(EngineCommand::CancelChat { request_id });
    }

    pub fn check_login(&self) {
        let _ = self.cmd_tx.send(EngineCommand::CheckLogin);
    }

    pub fn try_recv(&self) -> Option<EngineEvent> {
        self.event_rx.try_recv().ok()
    }
}
