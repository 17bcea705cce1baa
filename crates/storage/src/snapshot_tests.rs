// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn write_then_read_round_trips() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("ansible-state.bin");
    let snap = Snapshot { version: CURRENT_SNAPSHOT_VERSION, created_at: Utc::now(), doc: vec![1, 2, 3] };
    write(&path, &snap).unwrap();
    let loaded = read(&path).unwrap().expect("snapshot present");
    assert_eq!(loaded.doc, vec![1, 2, 3]);
}

#[test]
fn missing_file_reads_as_none() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("missing.bin");
    assert!(read(&path).unwrap().is_none());
}

#[test]
fn oversized_payload_is_rejected_on_write() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("ansible-state.bin");
    // Pseudo-random bytes so zstd can't compress this under the cap.
    let huge: Vec<u8> = (0..(MAX_SNAPSHOT_BYTES + 1))
        .map(|i| (i.wrapping_mul(2654435761).wrapping_add(i >> 3)) as u8)
        .collect();
    let snap = Snapshot { version: CURRENT_SNAPSHOT_VERSION, created_at: Utc::now(), doc: huge };
    let err = write(&path, &snap).unwrap_err();
    assert!(matches!(err, SnapshotError::TooLarge { .. }));
    assert!(!path.exists());
}

#[test]
fn oversized_file_is_rejected_on_read_without_deserializing() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("ansible-state.bin");
    fs::write(&path, vec![b'a'; (MAX_SNAPSHOT_BYTES + 1) as usize]).unwrap();
    let err = read(&path).unwrap_err();
    assert!(matches!(err, SnapshotError::TooLarge { .. }));
}

#[test]
fn write_rotates_previous_file_to_bak() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("ansible-state.bin");
    let snap1 = Snapshot { version: CURRENT_SNAPSHOT_VERSION, created_at: Utc::now(), doc: vec![1] };
    let snap2 = Snapshot { version: CURRENT_SNAPSHOT_VERSION, created_at: Utc::now(), doc: vec![2] };
    write(&path, &snap1).unwrap();
    write(&path, &snap2).unwrap();
    assert!(path.with_extension("bak").exists());
    let loaded = read(&path).unwrap().unwrap();
    assert_eq!(loaded.doc, vec![2]);
}

#[test]
fn debounced_writer_skips_writes_within_the_window_unless_forced() {
    let dir = tempfile::tempdir().unwrap();
    let writer = SnapshotWriter::new(dir.path().join("ansible-state.bin"));
    assert!(writer.maybe_write(vec![1], Utc::now(), false).unwrap());
    assert!(!writer.maybe_write(vec![2], Utc::now(), false).unwrap());
    assert!(writer.maybe_write(vec![3], Utc::now(), true).unwrap());
    let loaded = read(writer.path()).unwrap().unwrap();
    assert_eq!(loaded.doc, vec![3]);
}
