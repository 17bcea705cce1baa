// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Optional per-gateway cleanup of stale `*.jsonl.lock` files: not
//! coordinator-gated, since it's cleaning up this process's own state
//! directory rather than anything shared.

use std::fs;
use std::path::Path;
use std::time::{Duration, SystemTime};

use tracing::warn;

/// Tuning for [`sweep`].
#[derive(Debug, Clone, Copy)]
pub struct LockSweepConfig {
    pub enabled: bool,
    pub every_seconds: u64,
    pub stale_seconds: u64,
}

impl Default for LockSweepConfig {
    fn default() -> Self {
        Self { enabled: false, every_seconds: 300, stale_seconds: 3600 }
    }
}

/// Delete every `*.jsonl.lock` file directly under `dir` whose mtime is
/// older than `config.stale_seconds`. A lock file with a live owner is
/// expected to have its mtime refreshed by that owner, so age alone is the
/// staleness signal here — no PID is recorded in the lock file format this
/// crate writes. Returns the number of files removed.
pub fn sweep(dir: &Path, config: &LockSweepConfig, now: SystemTime) -> usize {
    if !config.enabled {
        return 0;
    }
    let Ok(entries) = fs::read_dir(dir) else { return 0 };

    let mut removed = 0;
    for entry in entries.flatten() {
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) != Some("lock") {
            continue;
        }
        let stem_is_jsonl = path.file_stem().and_then(|s| s.to_str()).is_some_and(|s| s.ends_with(".jsonl"));
        if !stem_is_jsonl {
            continue;
        }
        let Ok(meta) = entry.metadata() else { continue };
        let Ok(modified) = meta.modified() else { continue };
        let age = now.duration_since(modified).unwrap_or(Duration::ZERO);
        if age.as_secs() >= config.stale_seconds {
            if let Err(err) = fs::remove_file(&path) {
                warn!(path = %path.display(), %err, "failed to remove stale lock file");
                continue;
            }
            removed += 1;
        }
    }
    removed
}

#[cfg(test)]
#[path = "lock_sweep_tests.rs"]
mod tests;
