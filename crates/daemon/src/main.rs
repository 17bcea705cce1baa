// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Process entry point: load configuration, recover the persisted document,
//! start the sync transport appropriate to this node's tier, and drive the
//! dispatcher and coordinator until an ordered shutdown is requested.

use std::sync::Arc;

use mesh_core::{Clock, Doc, NodeId, SystemClock};
use mesh_coordinator::{Coordinator, CoordinatorConfig};
use mesh_daemon::admission::AdmissionGate;
use mesh_daemon::config::Config;
use mesh_daemon::lifecycle::{self, Process};
use mesh_daemon::runtime::LoggingHostRuntime;
use mesh_engine::Dispatcher;
use tokio::sync::{broadcast, mpsc};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt().with_env_filter(EnvFilter::from_default_env()).init();

    if let Err(err) = run().await {
        error!(%err, "daemon exited with an error");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let state_dir = lifecycle::state_dir()?;
    let config = Config::load(state_dir.clone())?;

    let node_id = match &config.node_id_override {
        Some(id) => NodeId::from_string(id),
        None => NodeId::new(),
    };
    let site_id = mesh_core::seed_from_str(node_id.as_str());

    let process = Process::start(&state_dir, node_id.clone(), site_id)?;
    info!(node_id = %node_id, tier = %config.tier, "daemon starting");

    let (shutdown_tx, _shutdown_rx) = broadcast::channel::<()>(1);
    let mut tasks = Vec::new();

    if config.is_backbone() {
        tasks.push(spawn_backbone_server(&config, process.doc.clone(), &shutdown_tx));
    }
    for peer in &config.backbone_peers {
        if mesh_transport::is_self(&peer_host(peer), node_id.as_str()) {
            continue;
        }
        tasks.push(spawn_peer_client(peer.clone(), node_id.clone(), process.doc.clone(), &shutdown_tx));
    }

    if config.dispatch_incoming {
        let dispatcher = Dispatcher::new(process.doc.clone(), node_id.clone(), Arc::new(LoggingHostRuntime), SystemClock);
        tasks.push(tokio::spawn(dispatcher.run(shutdown_tx.subscribe())));
    }

    let coordinator_config = CoordinatorConfig {
        is_backbone: config.is_backbone(),
        fyi_agents: config.sla_sweep.fyi_agents.clone(),
        lock_sweep: mesh_coordinator::lock_sweep::LockSweepConfig {
            enabled: config.lock_sweep.enabled,
            every_seconds: config.lock_sweep.every_seconds,
            stale_seconds: config.lock_sweep.stale_seconds,
        },
        lock_sweep_dir: config.lock_sweep.enabled.then(|| state_dir.clone()),
    };
    let coordinator = Coordinator::new(process.doc.clone(), node_id.clone(), SystemClock, coordinator_config);
    tasks.push(tokio::spawn(coordinator.run(shutdown_tx.subscribe())));

    tokio::signal::ctrl_c().await?;
    info!("shutdown signal received");
    process.shutdown(&shutdown_tx, SystemClock.epoch_ms() / 1000);

    for task in tasks {
        let _ = task.await;
    }
    Ok(())
}

fn spawn_backbone_server(config: &Config, doc: Arc<Doc>, shutdown_tx: &broadcast::Sender<()>) -> tokio::task::JoinHandle<()> {
    let host = config.listen_host.clone().unwrap_or_else(|| mesh_transport::detect_bind_host().to_string());
    let port = config.listen_port;
    let auth_clock = SystemClock;
    let auth = Arc::new(AdmissionGate::new(doc.clone(), auth_clock));
    let shutdown_rx = shutdown_tx.subscribe();
    let (events_tx, mut events_rx) = mpsc::channel(16);
    tokio::spawn(async move {
        while let Some(event) = events_rx.recv().await {
            info!(?event, "backbone transport event");
        }
    });

    tokio::spawn(async move {
        let addr = match format!("{host}:{port}").parse() {
            Ok(addr) => addr,
            Err(err) => {
                error!(%err, %host, port, "invalid backbone bind address");
                return;
            }
        };
        match mesh_transport::Server::bind(addr).await {
            Ok(server) => {
                info!(%addr, "backbone server listening");
                server.serve(doc, auth, events_tx, shutdown_rx).await;
            }
            Err(err) => error!(%err, %addr, "failed to bind backbone server"),
        }
    })
}

/// Pull the bare host out of a `ws://host:port` peer URL for self-detection;
/// `mesh_transport::is_self` compares against loopback aliases and the local
/// node name, not full URLs.
fn peer_host(url: &str) -> String {
    let without_scheme = url.split_once("://").map_or(url, |(_, rest)| rest);
    let host = without_scheme.split(['/', ':']).next().unwrap_or(without_scheme);
    host.to_string()
}

fn spawn_peer_client(url: String, node_id: NodeId, doc: Arc<Doc>, shutdown_tx: &broadcast::Sender<()>) -> tokio::task::JoinHandle<()> {
    let shutdown_rx = shutdown_tx.subscribe();
    let (events_tx, mut events_rx) = mpsc::channel(16);
    let log_url = url.clone();
    tokio::spawn(async move {
        while let Some(event) = events_rx.recv().await {
            warn!(?event, url = %log_url, "peer transport event");
        }
    });
    tokio::spawn(mesh_transport::run_client(url, node_id.as_str().to_string(), doc, events_tx, shutdown_rx))
}
