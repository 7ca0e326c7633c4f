//! # Transport
//!
//! The bidirectional message stream to the chat server. A transport hands out
//! a [`MessageChannel`]: requests pushed into `outbound` are delivered in
//! order, responses arrive on `inbound` in the order the server emits them.
//! Dropping the outbound sender half-closes the stream; the inbound side ends
//! once the server finishes.

use serde::Deserialize;
use serde_json::Value;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::sync::mpsc;

use super::{ClientMsg, ServerMsg};
use crate::error::ClientError;

/// Item yielded by the inbound half of a channel
pub type InboundItem = Result<ServerMsg, ClientError>;

/// Both halves of one streaming session with the server
pub struct MessageChannel {
    pub outbound: mpsc::UnboundedSender<ClientMsg>,
    pub inbound: mpsc::UnboundedReceiver<InboundItem>,
}

/// Opens streaming sessions with the server
#[allow(async_fn_in_trait)]
pub trait Transport {
    async fn open(&self) -> Result<MessageChannel, ClientError>;
}

/// Newline-delimited JSON over TCP
#[derive(Debug, Clone)]
pub struct JsonLinesTransport {
    endpoint: String,
}

impl JsonLinesTransport {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl Transport for JsonLinesTransport {
    async fn open(&self) -> Result<MessageChannel, ClientError> {
        tracing::debug!("Connecting to '{}'", self.endpoint);
        let stream =
            TcpStream::connect(&self.endpoint)
                .await
                .map_err(|source| ClientError::Connect {
                    endpoint: self.endpoint.clone(),
                    source,
                })?;
        stream.set_nodelay(true)?;
        tracing::info!("Connected to '{}'", self.endpoint);

        let (read_half, write_half) = stream.into_split();
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();

        tokio::spawn(write_loop(write_half, outbound_rx));
        tokio::spawn(read_loop(read_half, inbound_tx));

        Ok(MessageChannel {
            outbound: outbound_tx,
            inbound: inbound_rx,
        })
    }
}

/// Encode one request as a single line, newline included
pub fn encode_line(msg: &ClientMsg) -> Result<Vec<u8>, ClientError> {
    let mut line = serde_json::to_vec(msg)?;
    line.push(b'\n');
    Ok(line)
}

/// Decode one line received from the server.
///
/// Only a line that is not JSON at all is an error. A known message kind
/// with an unexpected shape is reported and passed on as `Unhandled`.
pub fn decode_line(line: &str) -> Result<ServerMsg, ClientError> {
    let value: Value = serde_json::from_str(line)?;
    match ServerMsg::deserialize(&value) {
        Ok(msg) => Ok(msg),
        Err(e) => {
            tracing::warn!("Malformed server message: {e}");
            Ok(ServerMsg::Unhandled(value))
        }
    }
}

async fn write_loop(mut writer: OwnedWriteHalf, mut outbound: mpsc::UnboundedReceiver<ClientMsg>) {
    while let Some(msg) = outbound.recv().await {
        let line = match encode_line(&msg) {
            Ok(line) => line,
            Err(e) => {
                tracing::error!("Failed to encode {} request: {e}", msg.kind());
                continue;
            }
        };
        if let Err(e) = writer.write_all(&line).await {
            // Dropping the receiver makes the session's next send fail.
            tracing::error!("Failed to send {} request: {e}", msg.kind());
            return;
        }
        tracing::debug!("Sent {} request {:?}", msg.kind(), msg.id());
    }

    tracing::debug!("Outbound stream finished, half-closing connection");
    if let Err(e) = writer.shutdown().await {
        tracing::warn!("Failed to half-close connection: {e}");
    }
}

async fn read_loop(reader: OwnedReadHalf, inbound: mpsc::UnboundedSender<InboundItem>) {
    let mut lines = BufReader::new(reader).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => {
                if line.trim().is_empty() {
                    continue;
                }
                let decoded = decode_line(&line);
                let failed = decoded.is_err();
                if inbound.send(decoded).is_err() || failed {
                    return;
                }
            }
            Ok(None) => {
                tracing::debug!("Server finished the stream");
                return;
            }
            Err(e) => {
                let _ = inbound.send(Err(ClientError::Transport(e)));
                return;
            }
        }
    }
}
