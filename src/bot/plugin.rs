//! # Account-Event Endpoint
//!
//! TCP callback server the chat server notifies about account lifecycle
//! changes. Each connection carries one JSON `AccountEvent` per line; every
//! line is acknowledged with an empty object.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Semaphore;

use crate::config;
use crate::error::ClientError;
use crate::io::Console;
use crate::protocol::{AccountAction, AccountEvent};

const ACK: &[u8] = b"{}\n";

/// Pause after a failed accept, e.g. when out of file descriptors
const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

pub struct PluginServer {
    listener: TcpListener,
    workers: Arc<Semaphore>,
    console: Arc<dyn Console>,
}

impl PluginServer {
    pub async fn bind(addr: &str, console: Arc<dyn Console>) -> Result<Self, ClientError> {
        Self::bind_with_workers(addr, config::PLUGIN_WORKERS, console).await
    }

    /// Bind with at most `workers` events handled at once
    pub async fn bind_with_workers(
        addr: &str,
        workers: usize,
        console: Arc<dyn Console>,
    ) -> Result<Self, ClientError> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| ClientError::Listen {
                addr: addr.to_string(),
                source,
            })?;
        tracing::info!("Account-event endpoint listening on {addr} with {workers} workers");
        Ok(Self {
            listener,
            workers: Arc::new(Semaphore::new(workers)),
            console,
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr, ClientError> {
        Ok(self.listener.local_addr()?)
    }

    /// Accept connections forever.
    ///
    /// Connections are cheap; each event holds a worker permit while it is
    /// handled and acknowledged, so idle connections never block the rest.
    pub async fn serve(self) {
        loop {
            let (stream, peer) = match self.listener.accept().await {
                Ok(accepted) => accepted,
                Err(e) => {
                    tracing::warn!("Account-event endpoint failed to accept: {e}");
                    tokio::time::sleep(ACCEPT_BACKOFF).await;
                    continue;
                }
            };
            let console = self.console.clone();
            let workers = self.workers.clone();
            tokio::spawn(async move {
                if let Err(e) = handle_connection(stream, console.as_ref(), &workers).await {
                    tracing::warn!("Account-event connection from {peer} failed: {e}");
                }
            });
        }
    }
}

async fn handle_connection(
    stream: TcpStream,
    console: &dyn Console,
    workers: &Semaphore,
) -> Result<(), ClientError> {
    let (read_half, mut write_half) = stream.into_split();
    let mut lines = BufReader::new(read_half).lines();

    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        let Ok(_permit) = workers.acquire().await else {
            return Ok(());
        };
        match serde_json::from_str::<AccountEvent>(&line) {
            Ok(event) => console.print(&describe_account_event(&event)),
            Err(e) => tracing::warn!("Malformed account event: {e}"),
        }
        write_half.write_all(ACK).await?;
    }
    Ok(())
}

/// One-line summary of an account event
pub fn describe_account_event(event: &AccountEvent) -> String {
    let action = match event.action {
        AccountAction::Create => "created",
        AccountAction::Update => "updated",
        AccountAction::Delete => "deleted",
        AccountAction::Unknown => "unknown",
    };
    let public = event
        .public
        .as_ref()
        .map(|public| public.to_string())
        .unwrap_or_default();
    format!("Account {action}: {} {public}", event.user_id)
        .trim_end()
        .to_string()
}
