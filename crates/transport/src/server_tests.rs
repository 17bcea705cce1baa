// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::client::run_client;
use mesh_core::Doc;
use serde_json::json;
use std::time::Duration;

struct AllowAll;

#[async_trait::async_trait]
impl AuthGate for AllowAll {
    async fn check(&self, _node_id: &str) -> Option<String> {
        None
    }
}

struct DenyAll;

#[async_trait::async_trait]
impl AuthGate for DenyAll {
    async fn check(&self, _node_id: &str) -> Option<String> {
        Some("not allowed".into())
    }
}

#[tokio::test]
async fn client_sync_merges_server_state_and_propagates_local_writes() {
    let server_doc = Doc::new(1);
    server_doc.set("tasks", "t1", json!("from-server"));

    let server = Server::bind("127.0.0.1:0".parse().unwrap()).await.unwrap();
    let addr = server.local_addr();
    let (shutdown_tx, _) = broadcast::channel(1);
    let (events_tx, _events_rx) = mpsc::channel(16);

    tokio::spawn(server.serve(server_doc.clone(), Arc::new(AllowAll), events_tx, shutdown_tx.subscribe()));

    let client_doc = Doc::new(2);
    client_doc.set("tasks", "t2", json!("from-client"));
    let (client_events_tx, mut client_events_rx) = mpsc::channel(16);
    let url = format!("ws://{addr}");
    let client_shutdown = shutdown_tx.subscribe();
    tokio::spawn(run_client(url, "node-b".into(), client_doc.clone(), client_events_tx, client_shutdown));

    let mut synced = false;
    for _ in 0..50 {
        match tokio::time::timeout(Duration::from_millis(200), client_events_rx.recv()).await {
            Ok(Some(TransportEvent::Sync(true))) => {
                synced = true;
                break;
            }
            Ok(Some(_)) => continue,
            _ => break,
        }
    }
    assert!(synced, "client never reported sync(true)");

    assert_eq!(client_doc.get("tasks", "t1"), Some(json!("from-server")));

    let mut seen_on_server = false;
    for _ in 0..50 {
        if server_doc.get("tasks", "t2") == Some(json!("from-client")) {
            seen_on_server = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    assert!(seen_on_server, "server never received the client's offline write");

    let _ = shutdown_tx.send(());
}

#[tokio::test]
async fn rejected_connection_never_merges_state() {
    let server_doc = Doc::new(1);
    server_doc.set("tasks", "t1", json!("secret"));

    let server = Server::bind("127.0.0.1:0".parse().unwrap()).await.unwrap();
    let addr = server.local_addr();
    let (shutdown_tx, _) = broadcast::channel(1);
    let (events_tx, _events_rx) = mpsc::channel(16);
    tokio::spawn(server.serve(server_doc.clone(), Arc::new(DenyAll), events_tx, shutdown_tx.subscribe()));

    let client_doc = Doc::new(2);
    let (client_events_tx, mut client_events_rx) = mpsc::channel(16);
    let url = format!("ws://{addr}");
    tokio::spawn(run_client(url, "node-b".into(), client_doc.clone(), client_events_tx, shutdown_tx.subscribe()));

    let event = tokio::time::timeout(Duration::from_secs(2), client_events_rx.recv()).await;
    assert!(event.is_ok());

    assert_eq!(client_doc.get("tasks", "t1"), None);
    let _ = shutdown_tx.send(());
}
