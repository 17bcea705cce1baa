// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Process-level startup and shutdown: acquiring the state directory,
//! loading the persisted document, and the ordered stop sequence.

use std::fs::File;
use std::path::PathBuf;
use std::sync::Arc;

use chrono::Utc;
use fs2::FileExt;
use mesh_core::{Doc, NodeId};
use mesh_storage::{resolve_within, SnapshotWriter};
use thiserror::Error;
use tokio::sync::broadcast;
use tracing::{info, warn};

use mesh_coordinator::heartbeat;

#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("could not determine a state directory (set MESH_STATE_DIR)")]
    NoStateDir,
    #[error("failed to acquire exclusive lock on {0}: daemon already running?")]
    LockFailed(PathBuf),
    #[error("invalid configuration: {0}")]
    Config(#[source] serde_json::Error),
    #[error("snapshot error: {0}")]
    Snapshot(#[from] mesh_storage::SnapshotError),
    #[error("path traversal rejected: {0}")]
    PathGuard(#[from] mesh_storage::PathGuardError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// `MESH_STATE_DIR` > `XDG_STATE_HOME/mesh` > `~/.local/state/mesh`.
pub fn state_dir() -> Result<PathBuf, LifecycleError> {
    if let Ok(dir) = std::env::var("MESH_STATE_DIR") {
        return Ok(PathBuf::from(dir));
    }
    if let Ok(xdg) = std::env::var("XDG_STATE_HOME") {
        return Ok(PathBuf::from(xdg).join("mesh"));
    }
    let home = std::env::var("HOME").map_err(|_| LifecycleError::NoStateDir)?;
    Ok(PathBuf::from(home).join(".local/state/mesh"))
}

const SNAPSHOT_FILE_NAME: &str = "ansible-state.bin";
const LOCK_FILE_NAME: &str = "daemon.lock";

/// Process-held resources acquired during startup, torn down in [`Process::shutdown`].
pub struct Process {
    pub doc: Arc<Doc>,
    pub node_id: NodeId,
    snapshot_writer: SnapshotWriter,
    _lock_file: File,
}

impl Process {
    /// Acquire the exclusive lock, load (or create) the document from its
    /// snapshot, and return a handle ready to drive the rest of the
    /// lifecycle. `site_id` seeds the CRDT actor id for local mutations.
    pub fn start(state_dir: &PathBuf, node_id: NodeId, site_id: u64) -> Result<Self, LifecycleError> {
        std::fs::create_dir_all(state_dir)?;

        let lock_path = state_dir.join(LOCK_FILE_NAME);
        let lock_file = std::fs::OpenOptions::new().write(true).create(true).truncate(false).open(&lock_path)?;
        lock_file.try_lock_exclusive().map_err(|_| LifecycleError::LockFailed(lock_path))?;

        let snapshot_path = resolve_within(state_dir, SNAPSHOT_FILE_NAME)?;
        let doc = Doc::new(site_id);
        if let Some(snapshot) = mesh_storage::read(&snapshot_path)? {
            doc.load_snapshot(&snapshot.doc).map_err(|_| LifecycleError::Io(std::io::Error::other("corrupt snapshot")))?;
            info!(path = %snapshot_path.display(), "loaded persisted document snapshot");
        } else {
            info!("no snapshot found, starting with an empty document");
        }

        Ok(Self { doc, node_id, snapshot_writer: SnapshotWriter::new(snapshot_path), _lock_file: lock_file })
    }

    pub fn persist_snapshot(&self, force: bool) -> Result<bool, LifecycleError> {
        let bytes = self.doc.compacted_snapshot().map_err(|_| LifecycleError::Io(std::io::Error::other("snapshot encode failed")))?;
        Ok(self.snapshot_writer.maybe_write(bytes, Utc::now(), force)?)
    }

    /// Ordered stop: cancel background work via `shutdown_tx`, persist a
    /// final snapshot, and mark this node's pulse offline. The lock file is
    /// released when `self` drops.
    pub fn shutdown(&self, shutdown_tx: &broadcast::Sender<()>, now: u64) {
        let _ = shutdown_tx.send(());
        heartbeat::mark_offline(&self.doc, self.node_id.as_str(), now);
        if let Err(err) = self.persist_snapshot(true) {
            warn!(%err, "failed to persist final snapshot on shutdown");
        }
        info!("daemon shutdown complete");
    }
}

#[cfg(test)]
#[path = "lifecycle_tests.rs"]
mod tests;
