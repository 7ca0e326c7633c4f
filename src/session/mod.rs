//! # Session Loop
//!
//! Drives one streaming session: forwards queued requests to the transport
//! and routes every inbound message. The loop is the only owner of the
//! pending-callback table.
//!
//! ```text
//! producers ──▶ outbound queue ──▶ SessionLoop ──▶ transport ──▶ server
//!                                      │
//! server ──▶ transport inbound ───────▶┘──▶ InboundHandler (console / bot)
//! ```

use serde_json::Value;
use tokio::sync::mpsc;

use crate::error::ClientError;
use crate::protocol::transport::InboundItem;
use crate::protocol::{ClientMsg, MessageChannel, ServerCtrl, ServerData, ServerMsg, ServerPres};

pub mod client;
pub mod cookie;
pub mod pending;

pub use cookie::CookieStore;
pub use pending::{PendingAction, PendingCallbackTable};

pub use crate::requests::Outbound;

/// Producer side of the outbound queue
pub type OutboundSender = mpsc::UnboundedSender<Outbound>;

/// Consumer side of the outbound queue, owned by the session loop
pub type OutboundReceiver = mpsc::UnboundedReceiver<Outbound>;

/// Create an empty outbound queue
pub fn outbound_queue() -> (OutboundSender, OutboundReceiver) {
    mpsc::unbounded_channel()
}

/// Reacts to routed inbound messages
pub trait InboundHandler {
    /// Status line for every control response
    fn on_status(&mut self, ctrl: &ServerCtrl);

    /// A pending action whose request succeeded; runs before `on_status`
    fn on_completion(&mut self, action: PendingAction, ctrl: &ServerCtrl);

    fn on_data(&mut self, data: &ServerData);

    fn on_pres(&mut self, pres: &ServerPres) {
        tracing::trace!("Ignoring presence on '{}': {}", pres.topic, pres.what);
    }

    fn on_unhandled(&mut self, msg: &Value) {
        tracing::warn!("Message type not handled: {msg}");
    }
}

#[derive(Debug, Default)]
pub struct SessionLoop {
    pending: PendingCallbackTable,
}

impl SessionLoop {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pending(&self) -> &PendingCallbackTable {
        &self.pending
    }

    /// Run until the server ends the stream.
    ///
    /// Closing the outbound queue half-closes the transport; the loop then
    /// keeps draining inbound messages. The session ends with `Ok` when the
    /// server finishes after that, with `StreamClosed` when it finishes
    /// first, and with the transport's error when the stream fails.
    pub async fn run<H: InboundHandler>(
        &mut self,
        channel: MessageChannel,
        mut queue: OutboundReceiver,
        handler: &mut H,
    ) -> Result<(), ClientError> {
        let MessageChannel {
            outbound,
            mut inbound,
        } = channel;
        let mut outbound = Some(outbound);

        loop {
            tokio::select! {
                item = queue.recv(), if outbound.is_some() => match item {
                    Some(item) => {
                        if let Some(sender) = &outbound {
                            if let Err(e) = self.forward(sender, item) {
                                let queued = self.drain_failure(&mut inbound, handler);
                                return Err(queued.unwrap_or(e));
                            }
                        }
                    }
                    None => {
                        tracing::debug!("Outbound queue closed, half-closing the stream");
                        outbound = None;
                    }
                },
                msg = inbound.recv() => match msg {
                    Some(Ok(msg)) => self.dispatch(msg, handler),
                    Some(Err(e)) => {
                        tracing::error!("Session failed: {e}");
                        return Err(e);
                    }
                    None if outbound.is_none() => {
                        tracing::debug!("Server finished the stream");
                        return Ok(());
                    }
                    None => {
                        tracing::warn!("Server closed the stream");
                        return Err(ClientError::StreamClosed);
                    }
                },
            }
        }
    }

    fn forward(
        &mut self,
        sender: &mpsc::UnboundedSender<ClientMsg>,
        item: Outbound,
    ) -> Result<(), ClientError> {
        let Outbound { msg, on_success } = item;
        if let (Some(action), Some(id)) = (on_success, msg.id()) {
            self.pending.register(id, action);
        }
        tracing::debug!("Sending '{}' request {:?}", msg.kind(), msg.id());
        sender.send(msg).map_err(|_| ClientError::StreamClosed)
    }

    /// Route what the reader queued before the writer went away and return
    /// the stream error it reported, if any.
    fn drain_failure<H: InboundHandler>(
        &mut self,
        inbound: &mut mpsc::UnboundedReceiver<InboundItem>,
        handler: &mut H,
    ) -> Option<ClientError> {
        while let Ok(item) = inbound.try_recv() {
            match item {
                Ok(msg) => self.dispatch(msg, handler),
                Err(e) => {
                    tracing::error!("Session failed: {e}");
                    return Some(e);
                }
            }
        }
        None
    }

    fn dispatch<H: InboundHandler>(&mut self, msg: ServerMsg, handler: &mut H) {
        match msg {
            ServerMsg::Ctrl(ctrl) => {
                if let Some(action) = self.pending.resolve(&ctrl.id, ctrl.code) {
                    handler.on_completion(action, &ctrl);
                }
                handler.on_status(&ctrl);
            }
            ServerMsg::Data(data) => handler.on_data(&data),
            ServerMsg::Pres(pres) => handler.on_pres(&pres),
            ServerMsg::Unhandled(other) => handler.on_unhandled(&other),
        }
    }
}
