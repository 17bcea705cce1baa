// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn plain_name_resolves_under_base() {
    let dir = tempfile::tempdir().unwrap();
    let resolved = resolve_within(dir.path(), "ansible-state.bin").unwrap();
    assert!(resolved.starts_with(dir.path().canonicalize().unwrap()));
}

#[test]
fn parent_traversal_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let err = resolve_within(dir.path(), "../escape.bin").unwrap_err();
    assert!(matches!(err, PathGuardError::Traversal));
}

#[test]
fn absolute_path_component_still_resolves_relative_to_base() {
    let dir = tempfile::tempdir().unwrap();
    let resolved = resolve_within(dir.path(), "nested/../state.bin").unwrap();
    assert_eq!(resolved.file_name().unwrap(), "state.bin");
}
