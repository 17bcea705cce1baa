// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Backbone WebSocket server: binds one address, accepts connections, and
//! runs the same snapshot+update exchange as [`crate::client`] from the
//! accepting side. Pre-upgrade admission is delegated to an [`AuthGate`] so
//! this crate doesn't need to know about invites, tickets, or node records.

use std::net::SocketAddr;
use std::sync::Arc;

use futures_util::{SinkExt, StreamExt};
use mesh_core::Doc;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{broadcast, mpsc};
use tokio_tungstenite::tungstenite::Message;
use tracing::{info, warn};

use crate::event::TransportEvent;
use crate::protocol::{Frame, ROOM};

/// Checked once per inbound connection, after the WebSocket upgrade but
/// before any document state is exchanged.
#[async_trait::async_trait]
pub trait AuthGate: Send + Sync {
    /// `None` means accepted; `Some(reason)` rejects the connection and the
    /// reason is sent back to the peer in a `Frame::Rejected`.
    async fn check(&self, node_id: &str) -> Option<String>;
}

pub struct Server {
    listener: TcpListener,
    local_addr: SocketAddr,
}

impl Server {
    pub async fn bind(addr: SocketAddr) -> std::io::Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        let local_addr = listener.local_addr()?;
        Ok(Self { listener, local_addr })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Accept connections until `shutdown` fires. Each connection is
    /// handled on its own task; a handler failure never brings the server
    /// down.
    pub async fn serve(
        self,
        doc: Arc<Doc>,
        auth: Arc<dyn AuthGate>,
        events: mpsc::Sender<TransportEvent>,
        mut shutdown: broadcast::Receiver<()>,
    ) {
        loop {
            tokio::select! {
                biased;
                _ = shutdown.recv() => return,
                accepted = self.listener.accept() => {
                    let Ok((stream, peer)) = accepted else { continue };
                    let doc = doc.clone();
                    let auth = auth.clone();
                    let events = events.clone();
                    let shutdown_rx = shutdown.resubscribe();
                    tokio::spawn(async move {
                        if let Err(e) = handle_connection(stream, peer, doc, auth, events, shutdown_rx).await {
                            warn!(%peer, error = %e, "backbone connection ended with an error");
                        }
                    });
                }
            }
        }
    }
}

async fn handle_connection(
    stream: TcpStream,
    peer: SocketAddr,
    doc: Arc<Doc>,
    auth: Arc<dyn AuthGate>,
    events: mpsc::Sender<TransportEvent>,
    mut shutdown: broadcast::Receiver<()>,
) -> Result<(), tokio_tungstenite::tungstenite::Error> {
    let ws = tokio_tungstenite::accept_async(stream).await?;
    let (mut write, mut read) = ws.split();

    let hello = loop {
        match read.next().await {
            Some(Ok(Message::Text(text))) => match Frame::from_text(&text) {
                Ok(Frame::Hello { node_id, room }) => break (node_id, room),
                _ => continue,
            },
            Some(Ok(_)) => continue,
            _ => return Ok(()),
        }
    };
    let (node_id, room) = hello;

    if room != ROOM {
        let _ = write.send(Message::Text(Frame::Rejected { reason: "wrong room".into() }.to_text().unwrap_or_default().into())).await;
        return Ok(());
    }
    if let Some(reason) = auth.check(&node_id).await {
        let _ = write.send(Message::Text(Frame::Rejected { reason: reason.clone() }.to_text().unwrap_or_default().into())).await;
        info!(%peer, %node_id, %reason, "rejected backbone connection");
        return Ok(());
    }

    info!(%peer, %node_id, "accepted backbone connection");
    if let Ok(bytes) = doc.compacted_snapshot() {
        write.send(Message::Text(Frame::Snapshot { doc: bytes }.to_text().unwrap_or_default().into())).await?;
    }

    let mut update_rx = doc.on_update();
    loop {
        tokio::select! {
            biased;
            _ = shutdown.recv() => return Ok(()),
            msg = read.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        match Frame::from_text(&text) {
                            Ok(Frame::Snapshot { doc: bytes }) => {
                                let _ = doc.merge_snapshot(&bytes);
                            }
                            Ok(Frame::Update { ops }) => {
                                doc.apply_update(&ops);
                            }
                            Ok(Frame::Ping) => {
                                write.send(Message::Text(Frame::Pong.to_text().unwrap_or_default().into())).await?;
                            }
                            _ => {}
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => {
                        let _ = events.send(TransportEvent::ConnectionError(format!("{node_id} disconnected"))).await;
                        return Ok(());
                    }
                    Some(Err(e)) => return Err(e),
                    _ => {}
                }
            }
            update = update_rx.recv() => {
                match update {
                    Ok(ops) => {
                        write.send(Message::Text(Frame::Update { ops }.to_text().unwrap_or_default().into())).await?;
                    }
                    Err(broadcast::error::RecvError::Lagged(_)) => {
                        if let Ok(bytes) = doc.compacted_snapshot() {
                            write.send(Message::Text(Frame::Snapshot { doc: bytes }.to_text().unwrap_or_default().into())).await?;
                        }
                    }
                    Err(broadcast::error::RecvError::Closed) => return Ok(()),
                }
            }
        }
    }
}

#[cfg(test)]
#[path = "server_tests.rs"]
mod tests;
