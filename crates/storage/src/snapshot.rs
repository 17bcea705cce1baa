// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Snapshot persistence: the replicated document is periodically flushed to
//! a single file under the state directory, written atomically (temp file +
//! rename) with rotating backups, and reloaded on startup before any
//! connection opens.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

/// Current snapshot schema version.
pub const CURRENT_SNAPSHOT_VERSION: u32 = 1;

/// Snapshots larger than this are refused on both read and write.
pub const MAX_SNAPSHOT_BYTES: u64 = 50 * 1024 * 1024;

/// Minimum interval between two consecutive writes to disk.
pub const WRITE_DEBOUNCE: Duration = Duration::from_secs(5);

const MAX_BAK_FILES: u32 = 3;

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("snapshot exceeds the {max} byte cap ({actual} bytes)")]
    TooLarge { actual: u64, max: u64 },
}

/// Envelope wrapping the document's compacted byte payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(rename = "v")]
    pub version: u32,
    pub created_at: DateTime<Utc>,
    /// Compacted CRDT document bytes (tombstones dropped).
    pub doc: Vec<u8>,
}

/// Pick the next `.bak` / `.bak.N` path, rotating older backups out. Keeps
/// up to [`MAX_BAK_FILES`] backups; the oldest is removed at capacity.
pub(crate) fn rotate_bak_path(path: &Path) -> PathBuf {
    let bak = |n: u32| {
        if n == 1 {
            path.with_extension("bak")
        } else {
            path.with_extension(format!("bak.{n}"))
        }
    };

    let oldest = bak(MAX_BAK_FILES);
    if oldest.exists() {
        let _ = fs::remove_file(&oldest);
    }
    for n in (1..MAX_BAK_FILES).rev() {
        let src = bak(n);
        if src.exists() {
            let _ = fs::rename(&src, bak(n + 1));
        }
    }
    bak(1)
}

/// Read a snapshot file, rejecting it outright if it exceeds the size cap
/// before any deserialization is attempted.
pub fn read(path: &Path) -> Result<Option<Snapshot>, SnapshotError> {
    if !path.exists() {
        return Ok(None);
    }
    let meta = fs::metadata(path)?;
    if meta.len() > MAX_SNAPSHOT_BYTES {
        return Err(SnapshotError::TooLarge { actual: meta.len(), max: MAX_SNAPSHOT_BYTES });
    }
    let compressed = fs::read(path)?;
    let bytes = zstd::decode_all(compressed.as_slice())?;
    Ok(Some(serde_json::from_slice(&bytes)?))
}

/// Write a snapshot atomically: serialize, zstd-compress, check the size cap
/// against the on-disk (compressed) bytes, write to a sibling temp file,
/// rotate the existing file to `.bak`, then rename the temp file into place.
pub fn write(path: &Path, snapshot: &Snapshot) -> Result<(), SnapshotError> {
    let json = serde_json::to_vec(snapshot)?;
    let bytes = zstd::encode_all(json.as_slice(), 0)?;
    if bytes.len() as u64 > MAX_SNAPSHOT_BYTES {
        return Err(SnapshotError::TooLarge { actual: bytes.len() as u64, max: MAX_SNAPSHOT_BYTES });
    }
    let tmp = path.with_extension("tmp");
    fs::write(&tmp, &bytes)?;
    if path.exists() {
        let bak = rotate_bak_path(path);
        fs::rename(path, bak)?;
    }
    fs::rename(&tmp, path)?;
    Ok(())
}

/// Debounced writer: `maybe_write` only performs the write if at least
/// [`WRITE_DEBOUNCE`] has elapsed since the last successful write, or if
/// `force` is set (used on shutdown, where the latest state must persist).
pub struct SnapshotWriter {
    path: PathBuf,
    last_write: Mutex<Option<Instant>>,
}

impl SnapshotWriter {
    pub fn new(path: PathBuf) -> Self {
        Self { path, last_write: Mutex::new(None) }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn maybe_write(&self, doc_bytes: Vec<u8>, now: DateTime<Utc>, force: bool) -> Result<bool, SnapshotError> {
        let elapsed_ok = {
            let last = self.last_write.lock();
            match *last {
                Some(t) => t.elapsed() >= WRITE_DEBOUNCE,
                None => true,
            }
        };
        if !elapsed_ok && !force {
            debug!("skipping snapshot write: debounce window not elapsed");
            return Ok(false);
        }
        let snapshot = Snapshot { version: CURRENT_SNAPSHOT_VERSION, created_at: now, doc: doc_bytes };
        match write(&self.path, &snapshot) {
            Ok(()) => {
                *self.last_write.lock() = Some(Instant::now());
                Ok(true)
            }
            Err(e) => {
                warn!(error = %e, "snapshot write failed");
                Err(e)
            }
        }
    }
}

#[cfg(test)]
#[path = "snapshot_tests.rs"]
mod tests;
