//! # Mock Transport for Testing
//!
//! In-process stand-in for the chat server. The test side receives every
//! request the client sends and decides what to answer, so request ids that
//! are only known at run time can be echoed back in control responses.

use std::collections::VecDeque;
use std::io;
use std::sync::Mutex;

use tokio::sync::mpsc;

use super::transport::{InboundItem, MessageChannel, Transport};
use super::{ClientMsg, Params, ServerCtrl, ServerData, ServerMsg};
use crate::error::ClientError;

/// Server side of one mocked session
pub struct MockServer {
    requests: mpsc::UnboundedReceiver<ClientMsg>,
    responses: Option<mpsc::UnboundedSender<InboundItem>>,
}

impl MockServer {
    /// Create a connected client channel and its server side
    pub fn channel() -> (MessageChannel, MockServer) {
        let (outbound, requests) = mpsc::unbounded_channel();
        let (responses, inbound) = mpsc::unbounded_channel();
        (
            MessageChannel { outbound, inbound },
            MockServer {
                requests,
                responses: Some(responses),
            },
        )
    }

    /// Next request sent by the client, `None` once the client half-closed
    pub async fn next_request(&mut self) -> Option<ClientMsg> {
        self.requests.recv().await
    }

    /// Send a raw message to the client
    pub fn respond(&self, msg: ServerMsg) -> bool {
        match &self.responses {
            Some(responses) => responses.send(Ok(msg)).is_ok(),
            None => false,
        }
    }

    /// Send a control response answering request `id`
    pub fn respond_ctrl(&self, id: &str, code: i32, text: &str, params: Params) -> bool {
        self.respond(ServerMsg::Ctrl(ServerCtrl {
            id: id.to_string(),
            topic: String::new(),
            code,
            text: text.to_string(),
            params,
        }))
    }

    /// Deliver a content message on `topic`
    pub fn push_data(&self, topic: &str, from: &str, content: serde_json::Value) -> bool {
        self.respond(ServerMsg::Data(ServerData {
            topic: topic.to_string(),
            from_user_id: from.to_string(),
            seq: 1,
            content,
        }))
    }

    /// Fail the stream with a transport error
    pub fn fail(&mut self, kind: io::ErrorKind) {
        if let Some(responses) = self.responses.take() {
            let _ = responses.send(Err(ClientError::Transport(io::Error::from(kind))));
        }
    }

    /// End the inbound stream
    pub fn hang_up(&mut self) {
        self.responses = None;
    }
}

/// Transport handing out pre-created mock sessions in order
#[derive(Default)]
pub struct MockTransport {
    sessions: Mutex<VecDeque<MessageChannel>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue one more session and return its server side
    pub fn push_session(&self) -> MockServer {
        let (channel, server) = MockServer::channel();
        if let Ok(mut sessions) = self.sessions.lock() {
            sessions.push_back(channel);
        }
        server
    }
}

impl Transport for MockTransport {
    async fn open(&self) -> Result<MessageChannel, ClientError> {
        let next = self
            .sessions
            .lock()
            .ok()
            .and_then(|mut sessions| sessions.pop_front());
        next.ok_or_else(|| ClientError::Connect {
            endpoint: "mock".to_string(),
            source: io::Error::from(io::ErrorKind::ConnectionRefused),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{ClientNote, NoteWhat};

    #[tokio::test]
    async fn mock_server_should_see_client_requests() {
        let (channel, mut server) = MockServer::channel();
        let note = ClientMsg::Note(ClientNote {
            topic: "grp1".to_string(),
            what: NoteWhat::Kp,
            seq: None,
        });
        channel.outbound.send(note.clone()).unwrap();
        assert_eq!(server.next_request().await, Some(note));

        drop(channel);
        assert_eq!(server.next_request().await, None);
    }

    #[tokio::test]
    async fn mock_transport_should_refuse_when_no_session_is_queued() {
        let transport = MockTransport::new();
        let _server = transport.push_session();
        assert!(transport.open().await.is_ok());
        assert!(matches!(
            transport.open().await,
            Err(ClientError::Connect { .. })
        ));
    }

    #[tokio::test]
    async fn hang_up_should_end_inbound_stream() {
        let (mut channel, mut server) = MockServer::channel();
        assert!(server.respond_ctrl("1", 200, "ok", Params::new()));
        server.hang_up();
        assert!(matches!(channel.inbound.recv().await, Some(Ok(ServerMsg::Ctrl(_)))));
        assert!(channel.inbound.recv().await.is_none());
    }
}
