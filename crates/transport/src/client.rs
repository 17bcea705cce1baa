// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Reconnecting WebSocket client: used both by edge nodes talking to their
//! configured backbone peers, and by backbone nodes talking to every other
//! configured peer that isn't "self".

use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use mesh_core::{BackoffPolicy, Doc};
use tokio::sync::{broadcast, mpsc};
use tokio_tungstenite::tungstenite::Message;

use crate::event::{ConnectionStatus, TransportEvent};
use crate::protocol::{Frame, ROOM};

/// Runs until `shutdown` fires. Reconnects with jittered exponential
/// backoff on every disconnect or connect failure.
pub async fn run_client(
    url: String,
    node_id: String,
    doc: Arc<Doc>,
    events: mpsc::Sender<TransportEvent>,
    mut shutdown: broadcast::Receiver<()>,
) {
    let mut attempt = 0u32;
    loop {
        let connect_shutdown = shutdown.resubscribe();
        tokio::select! {
            biased;
            _ = shutdown.recv() => return,
            outcome = connect_and_sync(&url, &node_id, &doc, &events, connect_shutdown) => {
                match outcome {
                    ConnectOutcome::ShutdownRequested => return,
                    ConnectOutcome::Disconnected => {
                        let _ = events.send(TransportEvent::Sync(false)).await;
                        let _ = events.send(TransportEvent::Status(ConnectionStatus::Disconnected)).await;
                        attempt = attempt.saturating_add(1);
                    }
                }
            }
        }
        let delay = BackoffPolicy::DISPATCH.delay(attempt, unit_jitter());
        tokio::select! {
            _ = tokio::time::sleep(delay) => {}
            _ = shutdown.recv() => return,
        }
    }
}

enum ConnectOutcome {
    ShutdownRequested,
    Disconnected,
}

/// Pseudo-random jitter in `[-1.0, 1.0]` derived from the current instant,
/// avoiding a dependency on an RNG crate for this one call site.
fn unit_jitter() -> f64 {
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.subsec_nanos())
        .unwrap_or(0);
    ((nanos % 2000) as f64 / 1000.0) - 1.0
}

async fn connect_and_sync(
    url: &str,
    node_id: &str,
    doc: &Arc<Doc>,
    events: &mpsc::Sender<TransportEvent>,
    mut shutdown: broadcast::Receiver<()>,
) -> ConnectOutcome {
    let _ = events.send(TransportEvent::Status(ConnectionStatus::Connecting)).await;

    let (ws, _) = match tokio_tungstenite::connect_async(url).await {
        Ok(pair) => pair,
        Err(e) => {
            let _ = events.send(TransportEvent::ConnectionError(e.to_string())).await;
            return ConnectOutcome::Disconnected;
        }
    };
    let _ = events.send(TransportEvent::Status(ConnectionStatus::Connected)).await;

    let (mut write, mut read) = ws.split();
    let hello = Frame::Hello { node_id: node_id.to_string(), room: ROOM.to_string() };
    if send_frame(&mut write, &hello).await.is_err() {
        return ConnectOutcome::Disconnected;
    }
    // Offer our own state too: edits made while offline never reached the
    // peer via the update stream (that only carries writes made *after*
    // subscribing), so both sides exchange a full snapshot up front.
    if let Ok(bytes) = doc.compacted_snapshot() {
        if send_frame(&mut write, &Frame::Snapshot { doc: bytes }).await.is_err() {
            return ConnectOutcome::Disconnected;
        }
    }

    let mut update_rx = doc.on_update();
    let mut synced = false;

    loop {
        tokio::select! {
            biased;
            _ = shutdown.recv() => return ConnectOutcome::ShutdownRequested,
            msg = read.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        match Frame::from_text(&text) {
                            Ok(Frame::Snapshot { doc: bytes }) => {
                                if doc.merge_snapshot(&bytes).is_ok() && !synced {
                                    synced = true;
                                    let _ = events.send(TransportEvent::Sync(true)).await;
                                }
                            }
                            Ok(Frame::Update { ops }) => {
                                doc.apply_update(&ops);
                            }
                            Ok(Frame::Rejected { reason }) => {
                                let _ = events.send(TransportEvent::ConnectionError(reason)).await;
                                return ConnectOutcome::Disconnected;
                            }
                            Ok(Frame::Ping) => {
                                let _ = send_frame(&mut write, &Frame::Pong).await;
                            }
                            Ok(Frame::Pong) | Ok(Frame::Hello { .. }) => {}
                            Err(e) => {
                                let _ = events.send(TransportEvent::ConnectionError(e.to_string())).await;
                            }
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => return ConnectOutcome::Disconnected,
                    Some(Err(e)) => {
                        let _ = events.send(TransportEvent::ConnectionError(e.to_string())).await;
                        return ConnectOutcome::Disconnected;
                    }
                    _ => {}
                }
            }
            update = update_rx.recv() => {
                match update {
                    Ok(ops) => {
                        if send_frame(&mut write, &Frame::Update { ops }).await.is_err() {
                            return ConnectOutcome::Disconnected;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(_)) => {
                        // Missed local updates while busy with I/O; the next
                        // reconnect's snapshot merge will catch us up.
                    }
                    Err(broadcast::error::RecvError::Closed) => return ConnectOutcome::Disconnected,
                }
            }
        }
    }
}

async fn send_frame(
    write: &mut futures_util::stream::SplitSink<
        tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>,
        Message,
    >,
    frame: &Frame,
) -> Result<(), ()> {
    let text = frame.to_text().map_err(|_| ())?;
    write.send(Message::Text(text.into())).await.map_err(|_| ())
}

/// Elapsed-since helper used by reconnect metrics/logging call sites.
pub fn describe_delay(d: Duration) -> String {
    format!("{:.1}s", d.as_secs_f64())
}
