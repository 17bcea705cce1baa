// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn display_uses_snake_case_kind() {
    let err = ToolError::not_found("task");
    assert_eq!(err.to_string(), "not_found: task not found");
}

#[test]
fn ambiguous_carries_samples() {
    let err = ToolError::ambiguous("multiple tasks match", vec!["a".into(), "b".into()]);
    assert_eq!(err.kind, ErrorKind::AmbiguousId);
    assert_eq!(err.samples, vec!["a".to_string(), "b".to_string()]);
}

#[test]
fn serde_round_trip_omits_empty_samples() {
    let err = ToolError::invalid("bad title");
    let json = serde_json::to_value(&err).unwrap();
    assert!(json.get("samples").is_none());
}
