// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use std::fs::File;
use std::time::Duration;

#[test]
fn sweep_is_a_noop_when_disabled() {
    let dir = tempfile::tempdir().unwrap();
    File::create(dir.path().join("state.jsonl.lock")).unwrap();

    let config = LockSweepConfig { enabled: false, ..LockSweepConfig::default() };
    let removed = sweep(dir.path(), &config, SystemTime::now());
    assert_eq!(removed, 0);
    assert!(dir.path().join("state.jsonl.lock").exists());
}

#[test]
fn sweep_removes_lock_files_past_the_stale_threshold() {
    let dir = tempfile::tempdir().unwrap();
    File::create(dir.path().join("stale.jsonl.lock")).unwrap();
    File::create(dir.path().join("unrelated.txt")).unwrap();

    let config = LockSweepConfig { enabled: true, every_seconds: 300, stale_seconds: 60 };
    let future = SystemTime::now() + Duration::from_secs(120);
    let removed = sweep(dir.path(), &config, future);

    assert_eq!(removed, 1);
    assert!(!dir.path().join("stale.jsonl.lock").exists());
    assert!(dir.path().join("unrelated.txt").exists());
}

#[test]
fn sweep_leaves_lock_files_younger_than_the_stale_threshold() {
    let dir = tempfile::tempdir().unwrap();
    File::create(dir.path().join("fresh.jsonl.lock")).unwrap();

    let config = LockSweepConfig { enabled: true, every_seconds: 300, stale_seconds: 3600 };
    let removed = sweep(dir.path(), &config, SystemTime::now());

    assert_eq!(removed, 0);
    assert!(dir.path().join("fresh.jsonl.lock").exists());
}
